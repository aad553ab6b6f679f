// ==========================================
// 电商仓储补货系统 - 分配报表组装
// ==========================================
// 职责: 单 SKU 计算结果 + 分区分配 → 四个报表视图
//   (a) 调拨明细（仅 boxes > 0）
//   (b) SKU 汇总
//   (c) 分区汇总（四个分区全覆盖）
//   (d) 宽表（汇总 + 每分区箱数列）
// 排序: SKU 忽略大小写（原文兜底）,同 SKU 按分区优先级
// ==========================================

use crate::domain::records::{CombinedZoneRow, SkuPlanLine, SkuSummaryRow, ZoneSummaryRow};
use crate::domain::types::{Zone, ZONE_PRIORITY};
use crate::engine::box_calculator::SkuBoxCalculation;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

// ===== 导出表头 =====
pub const PLAN_LINE_HEADERS: &[&str] = &[
    "SKU Id",
    "Zone",
    "Required Qty",
    "Editable Boxes",
    "Editable Qty",
    "PPCN",
    "Stock",
    "Qty_Booked",
];

pub const SUMMARY_HEADERS: &[&str] = &[
    "SKU",
    "Sales_30",
    "FBF_Qty",
    "Qty_Booked",
    "Needed_Qty",
    "Boxes",
    "Final_Qty",
    "PPCN",
];

pub const ZONE_SUMMARY_HEADERS: &[&str] = &[
    "SKU",
    "Zone",
    "Sales_30",
    "FBF_Qty",
    "Qty_Booked",
    "Needed_Qty",
    "Boxes",
    "Final_Qty",
    "PPCN",
];

pub const COMBINED_HEADERS: &[&str] = &[
    "SKU",
    "Sales_30",
    "FBF_Qty",
    "Qty_Booked",
    "Needed_Qty",
    "Boxes",
    "Final_Qty",
    "PPCN",
    "South",
    "West",
    "East",
    "North",
];

/// SKU 排序: 忽略大小写,原文兜底（保证全序）
pub fn sku_order(a: &str, b: &str) -> Ordering {
    a.to_uppercase()
        .cmp(&b.to_uppercase())
        .then_with(|| a.cmp(b))
}

// ==========================================
// SkuAllocation - 单 SKU 计算 + 分区分配
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuAllocation {
    pub calculation: SkuBoxCalculation,
    pub zones: BTreeMap<Zone, i64>,
}

// ==========================================
// AllocationReport - 报表视图集合
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    pub plan_lines: Vec<SkuPlanLine>,
    pub summary: Vec<SkuSummaryRow>,
    pub zone_summary: Vec<ZoneSummaryRow>,
    pub combined: Vec<CombinedZoneRow>,
}

impl AllocationReport {
    pub fn plan_lines_csv(&self) -> ImportResult<String> {
        export_csv(&self.plan_lines, PLAN_LINE_HEADERS)
    }

    pub fn summary_csv(&self) -> ImportResult<String> {
        export_csv(&self.summary, SUMMARY_HEADERS)
    }

    pub fn zone_summary_csv(&self) -> ImportResult<String> {
        export_csv(&self.zone_summary, ZONE_SUMMARY_HEADERS)
    }

    pub fn combined_csv(&self) -> ImportResult<String> {
        export_csv(&self.combined, COMBINED_HEADERS)
    }

    /// 分区工作视图: 该分区箱数 > 0 的宽表行,重排为汇总列
    pub fn zone_working_view(&self, zone: Zone) -> Vec<SkuSummaryRow> {
        self.combined
            .iter()
            .filter(|row| row.boxes_for(zone) > 0)
            .map(|row| {
                let boxes = row.boxes_for(zone).max(0);
                SkuSummaryRow {
                    sku: row.sku.clone(),
                    sales: row.sales,
                    stock: row.stock,
                    booked_qty: row.booked_qty,
                    needed_qty: row.needed_qty,
                    boxes,
                    final_qty: boxes * row.ppcn,
                    ppcn: row.ppcn,
                }
            })
            .collect()
    }

    pub fn zone_working_csv(&self, zone: Zone) -> ImportResult<String> {
        export_csv(&self.zone_working_view(zone), SUMMARY_HEADERS)
    }

    pub fn is_empty(&self) -> bool {
        self.plan_lines.is_empty()
    }
}

// ==========================================
// ReportAssembler
// ==========================================
pub struct ReportAssembler;

impl ReportAssembler {
    pub fn assemble(allocations: &[SkuAllocation]) -> AllocationReport {
        let mut ordered: Vec<&SkuAllocation> = allocations.iter().collect();
        ordered.sort_by(|a, b| sku_order(&a.calculation.sku, &b.calculation.sku));

        let mut report = AllocationReport::default();

        for allocation in ordered {
            let calc = &allocation.calculation;
            let stock = calc.stock.trunc() as i64;
            let boxes = calc.total_boxes.max(0);

            // (a) 调拨明细
            for zone in ZONE_PRIORITY {
                let zone_boxes = allocation.zones.get(&zone).copied().unwrap_or(0);
                if zone_boxes > 0 {
                    report.plan_lines.push(SkuPlanLine {
                        sku: calc.sku.clone(),
                        zone,
                        required_qty: calc.required_net_qty,
                        allocated_boxes: zone_boxes,
                        allocated_qty: zone_boxes * calc.ppcn,
                        ppcn: calc.ppcn,
                        stock,
                        booked_qty: calc.booked_qty,
                    });
                }
            }

            // (b) SKU 汇总
            report.summary.push(SkuSummaryRow {
                sku: calc.sku.clone(),
                sales: calc.sales,
                stock,
                booked_qty: calc.booked_qty,
                needed_qty: calc.required_net_qty,
                boxes,
                final_qty: boxes * calc.ppcn,
                ppcn: calc.ppcn,
            });

            // (c) 分区汇总 + (d) 宽表
            let mut combined = CombinedZoneRow {
                sku: calc.sku.clone(),
                sales: calc.sales,
                stock,
                booked_qty: calc.booked_qty,
                needed_qty: calc.required_net_qty,
                boxes,
                final_qty: boxes * calc.ppcn,
                ppcn: calc.ppcn,
                south: 0,
                west: 0,
                east: 0,
                north: 0,
            };
            for zone in ZONE_PRIORITY {
                let zone_boxes = allocation.zones.get(&zone).copied().unwrap_or(0).max(0);
                report.zone_summary.push(ZoneSummaryRow {
                    sku: calc.sku.clone(),
                    zone,
                    sales: calc.sales,
                    stock,
                    booked_qty: calc.booked_qty,
                    needed_qty: calc.required_net_qty,
                    boxes: zone_boxes,
                    final_qty: zone_boxes * calc.ppcn,
                    ppcn: calc.ppcn,
                });
                combined.set_boxes_for(zone, zone_boxes);
            }
            report.combined.push(combined);
        }

        report
    }
}

/// 序列化为 CSV（空表只写表头）
pub fn export_csv<T: Serialize>(rows: &[T], headers: &[&str]) -> ImportResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(headers)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ImportError::ExportError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ImportError::ExportError(e.to_string()))
}
