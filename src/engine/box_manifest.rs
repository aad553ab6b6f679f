// ==========================================
// 电商仓储补货系统 - 装箱清单
// ==========================================
// 职责: 执行任务工作表 → 逐箱清单（供标签渲染使用,本模块不渲染）
// 规则:
// - 箱数 > 0 的行按 SKU 排序,每箱一条,数量 = PPCN（缺失或 <= 0 按 1）
// - 箱数 = 0 的行每 20 行合并成一个 "MIX SKU" 虚拟箱（数量 1）
// - 箱号从 1 连续编号,每条记录携带总箱数
// ==========================================

use crate::domain::consignment::TableRow;
use crate::engine::listing::DEFAULT_STANDARD_COST;
use crate::importer::data_cleaner::{coerce_value_f64, coerce_value_i64, value_to_text};
use serde::{Deserialize, Serialize};

pub const MIX_SKU: &str = "MIX SKU";
pub const MIX_FSN: &str = "MIX FSN";
pub const DEFAULT_DUMMY_GROUP_SIZE: usize = 20;

const SKU_COLUMN: &str = "SKU Id";
const BOXES_COLUMN: &str = "Editable Boxes";
const PPCN_COLUMN: &str = "PPCN";

// ==========================================
// BoxLabel - 单箱记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxLabel {
    #[serde(rename = "Box No")]
    pub box_no: usize,
    #[serde(rename = "Total Boxes")]
    pub total_boxes: usize,
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "FSN")]
    pub fsn: String,
    #[serde(rename = "EAN")]
    pub ean: String,
    #[serde(rename = "Qty")]
    pub qty: i64,
    #[serde(rename = "Value")]
    pub nominal_value: i64,
}

impl BoxLabel {
    pub fn is_mixed(&self) -> bool {
        self.sku == MIX_SKU
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestOptions {
    pub unit_cost: i64,
    pub dummy_group_size: usize,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            unit_cost: DEFAULT_STANDARD_COST,
            dummy_group_size: DEFAULT_DUMMY_GROUP_SIZE,
        }
    }
}

/// 生成装箱清单
pub fn build_box_manifest(data: &[TableRow], options: ManifestOptions) -> Vec<BoxLabel> {
    let boxes_of = |row: &TableRow| row.get(BOXES_COLUMN).map(coerce_value_f64).unwrap_or(0.0);
    let sku_of = |row: &TableRow| row.get(SKU_COLUMN).map(value_to_text).unwrap_or_default();

    let mut active: Vec<&TableRow> = data.iter().filter(|r| boxes_of(*r) > 0.0).collect();
    active.sort_by_key(|r| sku_of(*r));
    let zero_rows = data.iter().filter(|r| boxes_of(*r) == 0.0).count();

    let mut labels = Vec::new();
    for row in active {
        let count = row.get(BOXES_COLUMN).map(coerce_value_i64).unwrap_or(0);
        let ppcn = row
            .get(PPCN_COLUMN)
            .map(coerce_value_i64)
            .filter(|p| *p > 0)
            .unwrap_or(1);
        let sku = sku_of(row);
        let fsn = row.get("FSN").map(value_to_text).unwrap_or_default();
        let ean = row
            .get("EAN")
            .map(value_to_text)
            .unwrap_or_default()
            .replace(".0", "");
        for _ in 0..count.max(0) {
            labels.push(BoxLabel {
                box_no: 0,
                total_boxes: 0,
                sku: sku.clone(),
                fsn: fsn.clone(),
                ean: ean.clone(),
                qty: ppcn,
                nominal_value: options.unit_cost.saturating_mul(ppcn),
            });
        }
    }

    let group = options.dummy_group_size.max(1);
    let dummy_count = zero_rows.div_ceil(group);
    for _ in 0..dummy_count {
        labels.push(BoxLabel {
            box_no: 0,
            total_boxes: 0,
            sku: MIX_SKU.to_string(),
            fsn: MIX_FSN.to_string(),
            ean: String::new(),
            qty: 1,
            nominal_value: options.unit_cost,
        });
    }

    let total = labels.len();
    for (idx, label) in labels.iter_mut().enumerate() {
        label.box_no = idx + 1;
        label.total_boxes = total;
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<TableRow> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_manifest_expands_boxes_in_sku_order() {
        let data = rows(json!([
            {"SKU Id": "KBRV-2", "Editable Boxes": 1, "PPCN": 12, "EAN": "890.0"},
            {"SKU Id": "KBRV-1", "Editable Boxes": 2, "PPCN": 16},
        ]));
        let labels = build_box_manifest(&data, ManifestOptions::default());

        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0].sku, "KBRV-1");
        assert_eq!(labels[0].qty, 16);
        assert_eq!(labels[0].nominal_value, 350 * 16);
        assert_eq!(labels[2].sku, "KBRV-2");
        assert_eq!(labels[2].ean, "890");
        assert_eq!(labels.iter().map(|l| l.box_no).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(labels.iter().all(|l| l.total_boxes == 3));
    }

    #[test]
    fn test_zero_rows_pack_into_mix_boxes() {
        let mut items: Vec<serde_json::Value> = (0..21)
            .map(|i| json!({"SKU Id": format!("Z-{i}"), "Editable Boxes": 0, "PPCN": 16}))
            .collect();
        items.push(json!({"SKU Id": "KBRV-1", "Editable Boxes": 1, "PPCN": 16}));
        let labels = build_box_manifest(&rows(json!(items)), ManifestOptions::default());

        assert_eq!(labels.len(), 3);
        assert!(labels[1].is_mixed() && labels[2].is_mixed());
        assert_eq!(labels[2].qty, 1);
        assert_eq!(labels[2].nominal_value, 350);
        assert_eq!(labels[2].box_no, 3);
    }

    #[test]
    fn test_missing_or_non_positive_ppcn_counts_as_one() {
        let data = rows(json!([
            {"SKU Id": "KBRV-1", "Editable Boxes": 1},
            {"SKU Id": "KBRV-2", "Editable Boxes": 1, "PPCN": 0},
            {"SKU Id": "KBRV-3", "Editable Boxes": 1, "PPCN": "n/a"},
        ]));
        let labels = build_box_manifest(&data, ManifestOptions::default());

        assert_eq!(labels.len(), 3);
        assert!(labels.iter().all(|l| l.qty == 1));
        assert!(labels.iter().all(|l| l.nominal_value == 350));
    }

    #[test]
    fn test_empty_table_gives_empty_manifest() {
        assert!(build_box_manifest(&[], ManifestOptions::default()).is_empty());
    }
}
