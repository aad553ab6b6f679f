// ==========================================
// 电商仓储补货系统 - 单 SKU 箱数计算
// ==========================================
// 职责: PPCN 查找 + 净需求 + 整箱数
// 公式:
//   required = sales - stock - booked
//   boxes    = max(floor(required / ppcn), 0)   (ppcn <= 0 时为 0)
//   final    = boxes * ppcn
// 红线: 箱数不得为负;数量恒为 boxes * ppcn
// 上限: boxes <= i64::MAX / ppcn,保证 final 及各分区数量不溢出
// ==========================================

use crate::importer::data_cleaner::{clean_sku, try_parse_f64};
use crate::importer::file_parser::RawTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 默认每箱件数
pub const DEFAULT_PPCN: i64 = 16;

// ==========================================
// PpcnTable - SKU → 每箱件数
// ==========================================
// 同一 SKU 多行时以首行为准（首行数值无效即视为无覆盖）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpcnTable {
    entries: BTreeMap<String, Option<i64>>,
}

impl PpcnTable {
    /// 由参考表构造（需要 SKU 与 PPCN 两列,缺列返回空表）
    pub fn from_table(table: &RawTable) -> Self {
        let (Some(sku_col), Some(ppcn_col)) = (table.column_index("SKU"), table.column_index("PPCN"))
        else {
            return Self::default();
        };

        let mut entries = BTreeMap::new();
        for row in 0..table.rows.len() {
            let sku = clean_sku(table.cell(row, sku_col));
            if sku.is_empty() {
                continue;
            }
            let ppcn = try_parse_f64(table.cell(row, ppcn_col)).map(|v| v.trunc() as i64);
            entries.entry(sku).or_insert(ppcn);
        }
        Self { entries }
    }

    /// 由 (SKU, PPCN) 列表构造
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        let mut entries = BTreeMap::new();
        for (sku, ppcn) in pairs {
            entries.entry(clean_sku(sku.as_ref())).or_insert(Some(ppcn));
        }
        Self { entries }
    }

    /// 查找 PPCN（无记录或数值无效返回 None）
    pub fn get(&self, sku: &str) -> Option<i64> {
        self.entries.get(sku).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==========================================
// PpcnSources - PPCN 查找链
// ==========================================
// 顺序: 默认值 → 模式模板覆盖 → 主数据覆盖
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpcnSources {
    pub template: PpcnTable,
    pub master: PpcnTable,
    pub default_ppcn: i64,
}

impl Default for PpcnSources {
    fn default() -> Self {
        Self {
            template: PpcnTable::default(),
            master: PpcnTable::default(),
            default_ppcn: DEFAULT_PPCN,
        }
    }
}

impl PpcnSources {
    pub fn resolve(&self, sku: &str) -> i64 {
        self.master
            .get(sku)
            .or_else(|| self.template.get(sku))
            .unwrap_or(self.default_ppcn)
    }
}

// ==========================================
// SkuBoxCalculation - 单 SKU 计算结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuBoxCalculation {
    pub sku: String,
    pub sales: f64,
    pub stock: f64,
    pub booked_qty: i64,
    pub ppcn: i64,
    pub required_net_qty: f64,
    pub total_boxes: i64,
    pub final_qty: i64,
}

pub struct BoxCalculator;

impl BoxCalculator {
    pub fn calculate(sku: &str, sales: f64, stock: f64, booked_qty: i64, ppcn: i64) -> SkuBoxCalculation {
        let required_net_qty = sales - stock - booked_qty as f64;
        let total_boxes = Self::boxes_needed(required_net_qty, ppcn);

        SkuBoxCalculation {
            sku: sku.to_string(),
            sales,
            stock,
            booked_qty,
            ppcn,
            required_net_qty,
            total_boxes,
            final_qty: total_boxes.saturating_mul(ppcn),
        }
    }

    /// 整箱数（只取整箱,负需求按 0,超大需求截到 i64::MAX / ppcn）
    pub fn boxes_needed(required_net_qty: f64, ppcn: i64) -> i64 {
        if ppcn <= 0 || !required_net_qty.is_finite() {
            return 0;
        }
        let boxes = ((required_net_qty / ppcn as f64).floor() as i64).max(0);
        boxes.min(i64::MAX / ppcn)
    }
}
