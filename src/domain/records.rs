// ==========================================
// 电商仓储补货系统 - 规划记录模型
// ==========================================
// 职责: 销售/库存/预约/规划输出 的强类型记录
// 红线: 所有数值转换在导入边界完成,此处只存放已校验的值
// 对齐: 导出列名沿用历史表头 (SKU Id / Editable Boxes / Sales_30 ...)
// ==========================================

use crate::domain::types::Zone;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// SalesRecord - 销售行（一行 = 一条订单行）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub raw_sku: String,                      // 原始 SKU 文本
    pub sku: String,                          // 规范化 SKU
    pub quantity: f64,                        // 销量（非数值按 0）
    pub region: String,                       // 收货地区原文
    pub zone: Option<Zone>,                   // 解析出的分区
    pub warehouse_code: Option<String>,       // 解析出的仓库代码
}

// ==========================================
// InventoryRecord - 库存行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub sku: String,   // 规范化 SKU
    pub quantity: f64, // 可售库存
}

// ==========================================
// 在途预约
// ==========================================

/// 单个提货日的预约量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedQuantity {
    pub qty: i64,
    pub boxes: i64,
}

/// 单个 SKU 的预约汇总（每次查询重新计算,不做原地修改）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEntry {
    pub total_qty: i64,
    pub total_boxes: i64,
    pub dates: BTreeMap<String, BookedQuantity>, // 提货日 (YYYY-MM-DD) → 预约量
}

/// 预约快照: SKU → 预约汇总 + 参与统计的提货日集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSnapshot {
    pub entries: BTreeMap<String, BookingEntry>,
    pub dates: Vec<String>,
}

impl BookingSnapshot {
    /// 获取 SKU 的预约总量（无预约为 0）
    pub fn booked_qty(&self, sku: &str) -> i64 {
        self.entries.get(sku).map(|e| e.total_qty).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==========================================
// SkuPlanLine - 调拨明细行 (boxes > 0)
// ==========================================
// 不变式: allocated_qty == allocated_boxes * ppcn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuPlanLine {
    #[serde(rename = "SKU Id")]
    pub sku: String,
    #[serde(rename = "Zone")]
    pub zone: Zone,
    #[serde(rename = "Required Qty")]
    pub required_qty: f64,
    #[serde(rename = "Editable Boxes")]
    pub allocated_boxes: i64,
    #[serde(rename = "Editable Qty")]
    pub allocated_qty: i64,
    #[serde(rename = "PPCN")]
    pub ppcn: i64,
    #[serde(rename = "Stock")]
    pub stock: i64,
    #[serde(rename = "Qty_Booked")]
    pub booked_qty: i64,
}

// ==========================================
// SkuSummaryRow - 单 SKU 汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuSummaryRow {
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Sales_30")]
    pub sales: f64,
    #[serde(rename = "FBF_Qty")]
    pub stock: i64,
    #[serde(rename = "Qty_Booked")]
    pub booked_qty: i64,
    #[serde(rename = "Needed_Qty")]
    pub needed_qty: f64,
    #[serde(rename = "Boxes")]
    pub boxes: i64,
    #[serde(rename = "Final_Qty")]
    pub final_qty: i64,
    #[serde(rename = "PPCN")]
    pub ppcn: i64,
}

// ==========================================
// ZoneSummaryRow - (SKU, 分区) 汇总,四个分区全覆盖（含 0 行）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummaryRow {
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Zone")]
    pub zone: Zone,
    #[serde(rename = "Sales_30")]
    pub sales: f64,
    #[serde(rename = "FBF_Qty")]
    pub stock: i64,
    #[serde(rename = "Qty_Booked")]
    pub booked_qty: i64,
    #[serde(rename = "Needed_Qty")]
    pub needed_qty: f64,
    #[serde(rename = "Boxes")]
    pub boxes: i64,
    #[serde(rename = "Final_Qty")]
    pub final_qty: i64,
    #[serde(rename = "PPCN")]
    pub ppcn: i64,
}

// ==========================================
// CombinedZoneRow - 宽表（汇总 + 每分区一列箱数）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedZoneRow {
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Sales_30")]
    pub sales: f64,
    #[serde(rename = "FBF_Qty")]
    pub stock: i64,
    #[serde(rename = "Qty_Booked")]
    pub booked_qty: i64,
    #[serde(rename = "Needed_Qty")]
    pub needed_qty: f64,
    #[serde(rename = "Boxes")]
    pub boxes: i64,
    #[serde(rename = "Final_Qty")]
    pub final_qty: i64,
    #[serde(rename = "PPCN")]
    pub ppcn: i64,
    #[serde(rename = "South")]
    pub south: i64,
    #[serde(rename = "West")]
    pub west: i64,
    #[serde(rename = "East")]
    pub east: i64,
    #[serde(rename = "North")]
    pub north: i64,
}

impl CombinedZoneRow {
    /// 读取某分区的箱数列
    pub fn boxes_for(&self, zone: Zone) -> i64 {
        match zone {
            Zone::South => self.south,
            Zone::West => self.west,
            Zone::East => self.east,
            Zone::North => self.north,
        }
    }

    /// 写入某分区的箱数列
    pub fn set_boxes_for(&mut self, zone: Zone, boxes: i64) {
        match zone {
            Zone::South => self.south = boxes,
            Zone::West => self.west = boxes,
            Zone::East => self.east = boxes,
            Zone::North => self.north = boxes,
        }
    }
}
