// ==========================================
// 电商仓储补货系统 - 销售需求聚合
// ==========================================
// 职责: 销售原始表 → 全局销量 + 分区销量
// 流程: 列解析 → SKU 规范化 → SKU 范围过滤 → 地区映射 → 分组求和
// 红线: 列解析失败为致命错误;单元格异常按 0 处理;地区未识别只计数不报错
// ==========================================

use crate::domain::region::resolve_region;
use crate::domain::records::SalesRecord;
use crate::domain::types::Zone;
use crate::importer::column_resolver::{
    default_sales_qty_rules, default_sales_region_rules, default_sales_sku_rules, ColumnResolver,
    ColumnRule, LOGICAL_QUANTITY, LOGICAL_REGION, LOGICAL_SKU,
};
use crate::importer::data_cleaner::{clean_sku, coerce_f64};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{cell, RawTable};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// 默认严格 SKU 模式（不含重复上架）
pub const DEFAULT_SKU_PATTERN_STRICT: &str = r"KBRV-\d+$";

/// 默认宽松 SKU 模式（含重复上架变体,如 KBRVX-12）
pub const DEFAULT_SKU_PATTERN_RELAXED: &str = r"^KBRV(?:[A-Z]*?)-\d+$";

// ==========================================
// SalesColumnRules - 销售表列匹配规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesColumnRules {
    pub sku: Vec<ColumnRule>,
    pub quantity: Vec<ColumnRule>,
    pub region: Vec<ColumnRule>,
}

impl Default for SalesColumnRules {
    fn default() -> Self {
        Self {
            sku: default_sales_sku_rules(),
            quantity: default_sales_qty_rules(),
            region: default_sales_region_rules(),
        }
    }
}

// ==========================================
// SkuFilter - 规划范围内的 SKU 判定
// ==========================================
#[derive(Debug, Clone)]
pub struct SkuFilter {
    pattern: Regex,
}

impl SkuFilter {
    /// 按是否包含重复上架选择严格/宽松模式（均忽略大小写）
    pub fn new(strict: &str, relaxed: &str, include_duplicates: bool) -> ImportResult<Self> {
        let source = if include_duplicates { relaxed } else { strict };
        let pattern = RegexBuilder::new(source).case_insensitive(true).build()?;
        Ok(Self { pattern })
    }

    pub fn with_defaults(include_duplicates: bool) -> ImportResult<Self> {
        Self::new(
            DEFAULT_SKU_PATTERN_STRICT,
            DEFAULT_SKU_PATTERN_RELAXED,
            include_duplicates,
        )
    }

    pub fn is_in_scope(&self, sku: &str) -> bool {
        self.pattern.is_match(sku)
    }
}

// ==========================================
// DemandSnapshot - 需求快照
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandSnapshot {
    /// SKU → 全部范围内行的销量合计（含地区未识别的行）
    pub global: BTreeMap<String, f64>,
    /// SKU → 分区 → 销量（仅地区已识别的行）
    pub by_zone: BTreeMap<String, BTreeMap<Zone, f64>>,
    pub in_scope_rows: usize,
    pub unresolved_region_rows: usize,
    pub out_of_scope_rows: usize,
}

impl DemandSnapshot {
    pub fn total_sales(&self, sku: &str) -> f64 {
        self.global.get(sku).copied().unwrap_or(0.0)
    }

    /// 某 SKU 的分区销量（无数据返回空表）
    pub fn zone_sales(&self, sku: &str) -> BTreeMap<Zone, f64> {
        self.by_zone.get(sku).cloned().unwrap_or_default()
    }
}

// ==========================================
// SalesAggregator - 销售聚合器
// ==========================================
pub struct SalesAggregator {
    sku_resolver: ColumnResolver,
    qty_resolver: ColumnResolver,
    region_resolver: ColumnResolver,
    filter: SkuFilter,
}

impl SalesAggregator {
    pub fn new(rules: &SalesColumnRules, filter: SkuFilter) -> ImportResult<Self> {
        Ok(Self {
            sku_resolver: ColumnResolver::new(LOGICAL_SKU, &rules.sku)?,
            qty_resolver: ColumnResolver::new(LOGICAL_QUANTITY, &rules.quantity)?,
            region_resolver: ColumnResolver::new(LOGICAL_REGION, &rules.region)?,
            filter,
        })
    }

    /// 解析为强类型销售行（仅范围内 SKU）,返回 (记录, 范围外行数)
    pub fn records(&self, table: &RawTable) -> ImportResult<(Vec<SalesRecord>, usize)> {
        let sku_col = self.sku_resolver.resolve(&table.headers)?;
        let qty_col = self.qty_resolver.resolve(&table.headers)?;
        let region_col = self.region_resolver.resolve(&table.headers)?;

        let mut records = Vec::with_capacity(table.rows.len());
        let mut out_of_scope = 0usize;

        for row in &table.rows {
            let raw_sku = cell(row, sku_col);
            let sku = clean_sku(raw_sku);
            if !self.filter.is_in_scope(&sku) {
                out_of_scope += 1;
                continue;
            }

            let region = cell(row, region_col).to_string();
            let resolved = resolve_region(&region);
            records.push(SalesRecord {
                raw_sku: raw_sku.to_string(),
                sku,
                quantity: coerce_f64(cell(row, qty_col)),
                zone: resolved.map(|(zone, _)| zone),
                warehouse_code: resolved.map(|(_, code)| code.to_string()),
                region,
            });
        }

        Ok((records, out_of_scope))
    }

    /// 聚合销售表
    pub fn aggregate(&self, table: &RawTable) -> ImportResult<DemandSnapshot> {
        let (records, out_of_scope_rows) = self.records(table)?;

        let mut snapshot = DemandSnapshot {
            in_scope_rows: records.len(),
            out_of_scope_rows,
            ..Default::default()
        };

        for record in &records {
            *snapshot.global.entry(record.sku.clone()).or_insert(0.0) += record.quantity;
            match record.zone {
                Some(zone) => {
                    *snapshot
                        .by_zone
                        .entry(record.sku.clone())
                        .or_default()
                        .entry(zone)
                        .or_insert(0.0) += record.quantity;
                }
                None => snapshot.unresolved_region_rows += 1,
            }
        }

        if snapshot.unresolved_region_rows > 0 {
            warn!(
                unresolved = snapshot.unresolved_region_rows,
                "销售行收货地区未识别,已计入全局销量但不参与分区分配"
            );
        }
        info!(
            in_scope = snapshot.in_scope_rows,
            out_of_scope = snapshot.out_of_scope_rows,
            skus = snapshot.global.len(),
            "销售需求聚合完成"
        );

        Ok(snapshot)
    }
}
