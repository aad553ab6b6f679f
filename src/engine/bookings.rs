// ==========================================
// 电商仓储补货系统 - 在途预约聚合引擎
// ==========================================
// 职责: 历史台账快照 → 未来提货日的已预约数量/箱数
// 计入条件: execution 任务 && is_booked != false && 日期可解析 && 日期 >= 今天
// 红线: 每次查询从台账重新计算,不缓存、不原地修改
// ==========================================

use crate::domain::consignment::ConsignmentTask;
use crate::domain::records::{BookedQuantity, BookingSnapshot};
use crate::importer::column_resolver::{
    default_booking_boxes_rules, default_booking_qty_rules, default_booking_sku_rules,
    ColumnResolver, LOGICAL_BOXES, LOGICAL_QUANTITY, LOGICAL_SKU,
};
use crate::importer::data_cleaner::{clean_sku_value, coerce_value_i64};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::RawTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

// ==========================================
// BookingsAggregator
// ==========================================
pub struct BookingsAggregator {
    sku_resolver: ColumnResolver,
    qty_resolver: ColumnResolver,
    boxes_resolver: ColumnResolver,
}

impl BookingsAggregator {
    pub fn new() -> ImportResult<Self> {
        Ok(Self {
            sku_resolver: ColumnResolver::new(LOGICAL_SKU, &default_booking_sku_rules())?,
            qty_resolver: ColumnResolver::new(LOGICAL_QUANTITY, &default_booking_qty_rules())?,
            boxes_resolver: ColumnResolver::new(LOGICAL_BOXES, &default_booking_boxes_rules())?,
        })
    }

    /// 任务是否计入在途预约
    pub fn counts_as_booking(task: &ConsignmentTask, today: NaiveDate) -> Option<NaiveDate> {
        if !task.is_execution() || !task.is_booked {
            return None;
        }
        task.pickup_date().filter(|d| *d >= today)
    }

    /// 聚合台账快照
    #[instrument(skip(self, tasks), fields(tasks = tasks.len(), today = %today))]
    pub fn aggregate(&self, tasks: &[ConsignmentTask], today: NaiveDate) -> BookingSnapshot {
        let mut snapshot = BookingSnapshot::default();
        let mut dates: BTreeSet<String> = BTreeSet::new();

        for task in tasks {
            let Some(pickup) = Self::counts_as_booking(task, today) else {
                continue;
            };
            let date_key = pickup.format("%Y-%m-%d").to_string();
            dates.insert(date_key.clone());

            let headers = RawTable::from_records(&task.data).headers;
            let Some(sku_col) = self.sku_resolver.find(&headers) else {
                debug!(task_id = %task.id, "任务工作表无 SKU 列,跳过");
                continue;
            };
            let sku_key = &headers[sku_col];
            let qty_key = self.qty_resolver.find(&headers).map(|i| headers[i].as_str());
            let box_key = self.boxes_resolver.find(&headers).map(|i| headers[i].as_str());

            for row in &task.data {
                let sku = row.get(sku_key).map(clean_sku_value).unwrap_or_default();
                if sku.is_empty() {
                    continue;
                }
                let qty = qty_key
                    .and_then(|k| row.get(k))
                    .map(coerce_value_i64)
                    .unwrap_or(0);
                let boxes = box_key
                    .and_then(|k| row.get(k))
                    .map(coerce_value_i64)
                    .unwrap_or(0);

                let entry = snapshot.entries.entry(sku).or_default();
                entry.total_qty += qty;
                entry.total_boxes += boxes;
                let per_date = entry.dates.entry(date_key.clone()).or_default();
                per_date.qty += qty;
                per_date.boxes += boxes;
            }
        }

        snapshot.dates = dates.into_iter().collect();
        debug!(
            skus = snapshot.entries.len(),
            dates = snapshot.dates.len(),
            "在途预约聚合完成"
        );
        snapshot
    }
}

// ==========================================
// 预约汇总视图
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSummaryRow {
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Total Qty")]
    pub qty: i64,
    #[serde(rename = "Total Boxes")]
    pub boxes: i64,
    /// "dd Mon:qty(boxes), ..."
    #[serde(rename = "Pickup Dates")]
    pub dates: String,
}

/// 生成预约汇总
///
/// 指定日期时只统计所选日期,并剔除所选日期内数量为 0 的 SKU
pub fn booked_summary(
    snapshot: &BookingSnapshot,
    selected_dates: Option<&[String]>,
) -> Vec<BookedSummaryRow> {
    let mut rows: Vec<BookedSummaryRow> = snapshot
        .entries
        .iter()
        .filter_map(|(sku, entry)| {
            let picked: Vec<(&String, &BookedQuantity)> = entry
                .dates
                .iter()
                .filter(|(d, _)| selected_dates.map_or(true, |sel| sel.contains(d)))
                .collect();

            let (qty, boxes) = match selected_dates {
                Some(_) => {
                    let qty: i64 = picked.iter().map(|(_, b)| b.qty).sum();
                    if qty == 0 {
                        return None;
                    }
                    (qty, picked.iter().map(|(_, b)| b.boxes).sum())
                }
                None => (entry.total_qty, entry.total_boxes),
            };

            let dates = picked
                .iter()
                .map(|(d, b)| format!("{}:{}({})", short_date(d), b.qty, b.boxes))
                .collect::<Vec<_>>()
                .join(", ");

            Some(BookedSummaryRow {
                sku: sku.clone(),
                qty,
                boxes,
                dates,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        a.sku
            .to_uppercase()
            .cmp(&b.sku.to_uppercase())
            .then_with(|| a.sku.cmp(&b.sku))
    });
    rows
}

fn short_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%d %b").to_string())
        .unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TaskType;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn task(id: &str, date: &str, task_type: TaskType, rows: serde_json::Value) -> ConsignmentTask {
        let mut t = ConsignmentTask::new(id, date, "Flipkart", task_type);
        t.data = serde_json::from_value(rows).unwrap();
        t
    }

    #[test]
    fn test_only_future_booked_execution_tasks_count() {
        let rows = json!([{"SKU Id": "KBRV-1", "Editable Qty": 32, "Editable Boxes": 2}]);
        let mut unbooked = task("C-3", "2026-03-12", TaskType::Execution, rows.clone());
        unbooked.is_booked = false;

        let tasks = vec![
            task("C-1", "2026-03-10", TaskType::Execution, rows.clone()),
            task("C-2", "2026-03-09", TaskType::Execution, rows.clone()),
            unbooked,
            task("P-1", "2026-03-20", TaskType::Planning, rows.clone()),
            task("C-4", "not a date", TaskType::Execution, rows),
        ];

        let snap = BookingsAggregator::new().unwrap().aggregate(&tasks, today());
        assert_eq!(snap.booked_qty("KBRV-1"), 32);
        assert_eq!(snap.dates, vec!["2026-03-10"]);
    }

    #[test]
    fn test_groups_by_sku_and_date_with_fallback_columns() {
        let tasks = vec![
            task(
                "C-1",
                "2026-03-11",
                TaskType::Execution,
                json!([
                    {"sku": "SKU:KBRV-1", "Quantity": "16.9", "Boxes": 1},
                    {"sku": "", "Quantity": 99, "Boxes": 9},
                    {"sku": "KBRV-2", "Quantity": "bad", "Boxes": 1}
                ]),
            ),
            task(
                "C-2",
                "2026-03-12",
                TaskType::Execution,
                json!([{"SKU Id": "KBRV-1", "Editable Qty": 48, "Editable Boxes": 3}]),
            ),
        ];

        let snap = BookingsAggregator::new().unwrap().aggregate(&tasks, today());
        let entry = &snap.entries["KBRV-1"];
        assert_eq!(entry.total_qty, 64);
        assert_eq!(entry.total_boxes, 4);
        assert_eq!(entry.dates["2026-03-11"], BookedQuantity { qty: 16, boxes: 1 });
        assert_eq!(snap.booked_qty("KBRV-2"), 0);
        assert!(!snap.entries.contains_key(""));
    }

    #[test]
    fn test_missing_qty_column_contributes_zero() {
        let tasks = vec![task(
            "C-1",
            "2026-03-11",
            TaskType::Execution,
            json!([{"SKU Id": "KBRV-1", "Zone": "South"}]),
        )];
        let snap = BookingsAggregator::new().unwrap().aggregate(&tasks, today());
        assert_eq!(snap.entries["KBRV-1"].total_qty, 0);
    }

    #[test]
    fn test_booked_summary_with_date_filter() {
        let tasks = vec![
            task(
                "C-1",
                "2026-03-11",
                TaskType::Execution,
                json!([{"SKU Id": "kbrv-2", "Editable Qty": 16, "Editable Boxes": 1}]),
            ),
            task(
                "C-2",
                "2026-03-12",
                TaskType::Execution,
                json!([
                    {"SKU Id": "KBRV-1", "Editable Qty": 32, "Editable Boxes": 2},
                    {"SKU Id": "kbrv-2", "Editable Qty": 16, "Editable Boxes": 1}
                ]),
            ),
        ];
        let snap = BookingsAggregator::new().unwrap().aggregate(&tasks, today());

        let all = booked_summary(&snap, None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].sku, "KBRV-1");
        assert_eq!(all[1].dates, "11 Mar:16(1), 12 Mar:16(1)");

        let selected = vec!["2026-03-11".to_string()];
        let filtered = booked_summary(&snap, Some(&selected));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].sku, "kbrv-2");
        assert_eq!(filtered[0].qty, 16);
    }
}
