// ==========================================
// 电商仓储补货系统 - 库存供给聚合
// ==========================================
// 职责: 库存原始表 → SKU 可售库存
// 策略: 分层回退,永不失败（最坏情况按零库存处理并告警）
//   1. SKU + "Live on Website"
//   2. SKU + 首个匹配数量模式的列
//   3. SKU + 所有数值列之和
//   4. 无 SKU 表头但至少两列: 第 2 列作 SKU + 数值列之和
//   5. 其余: 空库存
// ==========================================

use crate::domain::records::InventoryRecord;
use crate::importer::column_resolver::{ColumnResolver, ColumnRule, LOGICAL_STOCK};
use crate::importer::data_cleaner::{clean_sku, coerce_f64};
use crate::importer::file_parser::{cell, RawTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

const SKU_HEADER: &str = "SKU";
const LIVE_HEADER: &str = "Live on Website";
const QTY_PATTERN: &str = "live on website|qty|quantity|live|live qty|liveqty";
const POSITIONAL_SKU_INDEX: usize = 1;

// ==========================================
// InventoryStrategy - 实际命中的回退层
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "column", rename_all = "snake_case")]
pub enum InventoryStrategy {
    LiveOnWebsite,
    QuantityColumn(String),
    NumericSum,
    PositionalSku,
    Empty,
}

impl InventoryStrategy {
    pub fn describe(&self) -> String {
        match self {
            InventoryStrategy::LiveOnWebsite => "SKU + Live on Website".to_string(),
            InventoryStrategy::QuantityColumn(col) => format!("SKU + {}", col),
            InventoryStrategy::NumericSum => "SKU + 数值列合计".to_string(),
            InventoryStrategy::PositionalSku => "第 2 列 SKU + 数值列合计".to_string(),
            InventoryStrategy::Empty => "零库存假设".to_string(),
        }
    }
}

// ==========================================
// SupplySnapshot - 供给快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplySnapshot {
    pub by_sku: BTreeMap<String, f64>,
    pub strategy: InventoryStrategy,
}

impl SupplySnapshot {
    pub fn stock(&self, sku: &str) -> f64 {
        self.by_sku.get(sku).copied().unwrap_or(0.0)
    }
}

impl Default for SupplySnapshot {
    fn default() -> Self {
        Self {
            by_sku: BTreeMap::new(),
            strategy: InventoryStrategy::Empty,
        }
    }
}

// ==========================================
// InventoryAggregator
// ==========================================
pub struct InventoryAggregator;

impl InventoryAggregator {
    /// 解析为强类型库存行（同 SKU 可能出现多行）
    pub fn records(table: &RawTable) -> (Vec<InventoryRecord>, InventoryStrategy) {
        let headers = &table.headers;
        let sku_col = table.column_index(SKU_HEADER);

        if let Some(sku_col) = sku_col {
            // 1. SKU + Live on Website
            if let Some(live_col) = table.column_index(LIVE_HEADER) {
                let records = single_column_records(table, sku_col, live_col);
                return (records, InventoryStrategy::LiveOnWebsite);
            }

            // 2. SKU + 匹配数量模式的列
            if let Some(qty_col) = quantity_column(headers, sku_col) {
                let records = single_column_records(table, sku_col, qty_col);
                return (
                    records,
                    InventoryStrategy::QuantityColumn(headers[qty_col].clone()),
                );
            }

            // 3. SKU + 数值列之和
            return (
                numeric_sum_records(table, sku_col),
                InventoryStrategy::NumericSum,
            );
        }

        // 4. 第 2 列作为 SKU
        if table.column_count() >= 2 {
            return (
                numeric_sum_records(table, POSITIONAL_SKU_INDEX),
                InventoryStrategy::PositionalSku,
            );
        }

        (Vec::new(), InventoryStrategy::Empty)
    }

    /// 聚合库存表（同 SKU 求和）
    pub fn aggregate(table: &RawTable) -> SupplySnapshot {
        let (records, strategy) = Self::records(table);

        let mut by_sku: BTreeMap<String, f64> = BTreeMap::new();
        for record in records {
            *by_sku.entry(record.sku).or_insert(0.0) += record.quantity;
        }

        if strategy == InventoryStrategy::Empty || by_sku.is_empty() {
            warn!(
                strategy = %strategy.describe(),
                "库存表无可用数据,按零库存处理"
            );
        } else {
            info!(strategy = %strategy.describe(), skus = by_sku.len(), "库存供给聚合完成");
        }

        SupplySnapshot { by_sku, strategy }
    }
}

fn quantity_column(headers: &[String], sku_col: usize) -> Option<usize> {
    let resolver = ColumnResolver::new(LOGICAL_STOCK, &[ColumnRule::pattern(QTY_PATTERN)]).ok()?;
    let candidates: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(idx, h)| if idx == sku_col { String::new() } else { h.clone() })
        .collect();
    resolver.find(&candidates)
}

fn single_column_records(table: &RawTable, sku_col: usize, qty_col: usize) -> Vec<InventoryRecord> {
    table
        .rows
        .iter()
        .map(|row| InventoryRecord {
            sku: clean_sku(cell(row, sku_col)),
            quantity: coerce_f64(cell(row, qty_col)),
        })
        .collect()
}

fn numeric_sum_records(table: &RawTable, sku_col: usize) -> Vec<InventoryRecord> {
    let numeric_cols: Vec<usize> = (0..table.column_count())
        .filter(|&idx| idx != sku_col && table.is_numeric_column(idx))
        .collect();

    if numeric_cols.is_empty() {
        return Vec::new();
    }

    table
        .rows
        .iter()
        .map(|row| InventoryRecord {
            sku: clean_sku(cell(row, sku_col)),
            quantity: numeric_cols.iter().map(|&idx| coerce_f64(cell(row, idx))).sum(),
        })
        .collect()
}
