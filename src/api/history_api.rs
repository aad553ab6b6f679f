// ==========================================
// 电商仓储补货系统 - 历史台账 API
// ==========================================
// 职责: 台账查询 / 手工发货建单 / 预约开关 / 删除 / 箱数修订与撤销 / 驾驶舱统计
// 红线: 每个写操作读-改-写整份台账（后写者胜）
// 红线: 箱数修订前必须保留备份,撤销只能回到备份
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::consignment::{ConsignmentTask, LedgerTable, TableRow};
use crate::domain::types::TaskType;
use crate::engine::bookings::{booked_summary, BookedSummaryRow, BookingsAggregator};
use crate::engine::box_calculator::PpcnTable;
use crate::engine::box_manifest::{build_box_manifest, BoxLabel, ManifestOptions};
use crate::importer::data_cleaner::{
    clean_sku, coerce_f64, coerce_i64, coerce_value_i64, number_value, value_to_text,
};
use crate::importer::file_parser::{cell, CsvParser, RawTable};
use crate::repository::history_repo::HistoryRepository;
use crate::repository::reference_repo::ReferenceRepository;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 手工发货单必需列
pub const SHIPMENT_SKU_COLUMN: &str = "SKU Id";
pub const SHIPMENT_QTY_COLUMN: &str = "Quantity Sent";

/// 箱数修订表必需列
pub const BOX_EDIT_COLUMN: &str = "Available Box (Edit)";

/// 编辑时间戳格式（如 05-Jan-2026 03:30 PM）
pub const EDIT_TIMESTAMP_FORMAT: &str = "%d-%b-%Y %I:%M %p";

const RECENT_ACTIVITY_LIMIT: usize = 5;

// ==========================================
// 请求 / 响应 DTO
// ==========================================

/// 手工发货建单请求
#[derive(Debug, Clone)]
pub struct ManualShipmentRequest {
    pub id: String,
    pub pickup_date: NaiveDate,
    pub channel: String,
    /// 发货明细 CSV（至少含 SKU Id / Quantity Sent）
    pub content: Vec<u8>,
    /// 透传字段（发货方 / 收货方等,原样写入台账）
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskActivity {
    pub id: String,
    pub date: String,
    pub channel: String,
    pub boxes: f64,
    pub qty: f64,
}

/// 驾驶舱统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub task_count: usize,
    pub total_boxes: f64,
    pub total_qty: f64,
    /// 最近提货日（dd-Mon-YYYY）
    pub last_shipment: Option<String>,
    pub boxes_by_channel: BTreeMap<String, f64>,
    /// 按日期倒序的最近任务
    pub recent: Vec<TaskActivity>,
}

/// 预约汇总视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedSummaryView {
    pub available_dates: Vec<String>,
    pub rows: Vec<BookedSummaryRow>,
}

// ==========================================
// HistoryApi
// ==========================================
pub struct HistoryApi {
    history: Arc<HistoryRepository>,
    reference: Arc<ReferenceRepository>,
    default_ppcn: i64,
}

impl HistoryApi {
    pub fn new(
        history: Arc<HistoryRepository>,
        reference: Arc<ReferenceRepository>,
        default_ppcn: i64,
    ) -> Self {
        Self {
            history,
            reference,
            default_ppcn,
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 列出任务（可按任务类型过滤,保持台账顺序）
    pub fn list_tasks(&self, task_type: Option<TaskType>) -> ApiResult<Vec<ConsignmentTask>> {
        let tasks = self.history.load()?;
        Ok(match task_type {
            Some(t) => tasks.into_iter().filter(|task| task.task_type == Some(t)).collect(),
            None => tasks,
        })
    }

    pub fn get_task(&self, id: &str) -> ApiResult<ConsignmentTask> {
        self.history
            .find(id)?
            .ok_or_else(|| ApiError::NotFound(format!("ConsignmentTask(id={})不存在", id)))
    }

    /// 驾驶舱统计（全部任务）
    pub fn dashboard_stats(&self) -> ApiResult<DashboardStats> {
        let tasks = self.history.load()?;

        let mut boxes_by_channel: BTreeMap<String, f64> = BTreeMap::new();
        let mut activity: Vec<(Option<NaiveDate>, TaskActivity)> = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let boxes = task.total_boxes();
            let qty = task.total_qty();
            *boxes_by_channel.entry(task.channel.clone()).or_insert(0.0) += boxes;
            activity.push((
                task.pickup_date(),
                TaskActivity {
                    id: task.id.clone(),
                    date: task.date.clone(),
                    channel: task.channel.clone(),
                    boxes,
                    qty,
                },
            ));
        }

        let last_shipment = activity
            .iter()
            .filter_map(|(d, _)| *d)
            .max()
            .map(|d| d.format("%d-%b-%Y").to_string());

        // 日期倒序,无法解析的排在最后
        activity.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(DashboardStats {
            task_count: tasks.len(),
            total_boxes: activity.iter().map(|(_, a)| a.boxes).sum(),
            total_qty: activity.iter().map(|(_, a)| a.qty).sum(),
            last_shipment,
            boxes_by_channel,
            recent: activity
                .into_iter()
                .take(RECENT_ACTIVITY_LIMIT)
                .map(|(_, a)| a)
                .collect(),
        })
    }

    /// 预约汇总
    ///
    /// # 参数
    /// - today: 只统计 today 及之后的提货日
    /// - selected_dates: 所选提货日（None 或空列表 = 全部）
    pub fn booked_summary(
        &self,
        today: NaiveDate,
        selected_dates: Option<&[String]>,
    ) -> ApiResult<BookedSummaryView> {
        let tasks = self.history.load()?;
        let snapshot = BookingsAggregator::new()?.aggregate(&tasks, today);
        let selected = selected_dates.filter(|d| !d.is_empty());
        Ok(BookedSummaryView {
            rows: booked_summary(&snapshot, selected),
            available_dates: snapshot.dates,
        })
    }

    /// 任务的逐箱清单
    pub fn box_manifest(&self, id: &str, options: ManifestOptions) -> ApiResult<Vec<BoxLabel>> {
        let task = self.get_task(id)?;
        Ok(build_box_manifest(&task.data, options))
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 手工发货建单（execution,默认已预约）
    ///
    /// # 规则
    /// - 主数据按 SKU 左连接（首行为准）,补充 EAN / FSN / PPCN 等列
    /// - Editable Qty = Quantity Sent（非数值按 0）
    /// - PPCN 取主数据数值,缺失或非正取默认值
    /// - Editable Boxes = Editable Qty / PPCN,保留 2 位小数
    #[instrument(skip(self, request), fields(task_id = %request.id, channel = %request.channel))]
    pub fn create_manual_shipment(&self, request: ManualShipmentRequest) -> ApiResult<ConsignmentTask> {
        let id = request.id.trim().to_string();
        if id.is_empty() {
            return Err(ApiError::InvalidInput("任务 ID 不能为空".to_string()));
        }
        if self.history.find(&id)?.is_some() {
            return Err(ApiError::DuplicateTaskId(id));
        }

        let shipment = CsvParser.parse_bytes(&request.content)?;
        let sku_col = require_column(&shipment, SHIPMENT_SKU_COLUMN)?;
        let qty_col = require_column(&shipment, SHIPMENT_QTY_COLUMN)?;

        let master = self.reference.load_master()?;
        if master.is_empty() {
            warn!("主数据为空,EAN / FSN 等列将缺失");
        }
        let master_rows = index_master(&master);
        let master_ppcn = PpcnTable::from_table(&master);

        let mut data: LedgerTable = Vec::with_capacity(shipment.rows.len());
        for (record, row) in shipment.to_records().into_iter().zip(&shipment.rows) {
            let sku = clean_sku(cell(row, sku_col));
            let mut merged = record;
            if let Some(master_row) = master_rows.get(&sku) {
                for (idx, header) in master.headers.iter().enumerate() {
                    merged
                        .entry(header.clone())
                        .or_insert_with(|| Value::String(cell(master_row, idx).to_string()));
                }
            }

            let qty = coerce_f64(cell(row, qty_col));
            let ppcn = master_ppcn
                .get(&sku)
                .filter(|p| *p > 0)
                .unwrap_or(self.default_ppcn);
            let boxes = (qty / ppcn as f64 * 100.0).round() / 100.0;

            merged.insert("Editable Qty".to_string(), number_value(qty));
            merged.insert("PPCN".to_string(), Value::from(ppcn));
            merged.insert("Editable Boxes".to_string(), number_value(boxes));
            data.push(merged);
        }

        let mut task = ConsignmentTask::new(
            id,
            request.pickup_date.format("%Y-%m-%d").to_string(),
            request.channel,
            TaskType::Execution,
        );
        task.data = data;
        task.original_data = Some(shipment.to_records());
        task.extra = request.extra;

        self.history.append(task.clone())?;
        info!(rows = task.data.len(), boxes = task.total_boxes(), "手工发货任务已创建");
        Ok(task)
    }

    /// 切换预约状态,返回切换后的值
    pub fn toggle_booked(&self, id: &str) -> ApiResult<bool> {
        let mut task = self.get_task(id)?;
        task.is_booked = !task.is_booked;
        let booked = task.is_booked;
        self.history.replace(task)?;
        info!(task_id = id, is_booked = booked, "预约状态已切换");
        Ok(booked)
    }

    /// 删除任务
    pub fn delete_task(&self, id: &str) -> ApiResult<()> {
        self.history.delete(id)?;
        info!(task_id = id, "任务已删除");
        Ok(())
    }

    /// 记录已打印箱号（重复记录忽略）,返回是否新增
    pub fn mark_box_printed(&self, id: &str, box_no: i64) -> ApiResult<bool> {
        let mut task = self.get_task(id)?;
        if task.printed_boxes.contains(&box_no) {
            return Ok(false);
        }
        task.printed_boxes.push(box_no);
        self.history.replace(task)?;
        Ok(true)
    }

    /// 按修订表改写箱数
    ///
    /// # 参数
    /// - edits: 至少含 SKU Id / Available Box (Edit) 两列（同 SKU 以末行为准）
    /// - now: 编辑时间
    ///
    /// # 规则
    /// - 尚无备份时先备份当前工作表
    /// - 命中 SKU 的行: Editable Boxes = 新箱数, Editable Qty = 新箱数 × PPCN（PPCN 非正按 1）
    #[instrument(skip(self, edits, now), fields(task_id = id))]
    pub fn apply_box_edits(
        &self,
        id: &str,
        edits: &RawTable,
        now: NaiveDateTime,
    ) -> ApiResult<ConsignmentTask> {
        let sku_col = require_column(edits, SHIPMENT_SKU_COLUMN)?;
        let box_col = require_column(edits, BOX_EDIT_COLUMN)?;

        let box_map: BTreeMap<String, i64> = edits
            .rows
            .iter()
            .map(|row| (cell(row, sku_col).to_string(), coerce_i64(cell(row, box_col))))
            .collect();

        let mut task = self.get_task(id)?;
        if task.backup_data.as_ref().map_or(true, |b| b.is_empty()) {
            task.backup_data = Some(task.data.clone());
        }

        let mut touched = 0usize;
        for row in task.data.iter_mut() {
            let sku = row.get(SHIPMENT_SKU_COLUMN).map(value_to_text).unwrap_or_default();
            let Some(&boxes) = box_map.get(&sku) else {
                continue;
            };
            apply_boxes(row, boxes);
            touched += 1;
        }

        task.edit_timestamp = Some(now.format(EDIT_TIMESTAMP_FORMAT).to_string());
        self.history.replace(task.clone())?;
        info!(rows = touched, "箱数修订已保存");
        Ok(task)
    }

    /// 撤销箱数修订（恢复备份,清除编辑时间）
    pub fn undo_box_edits(&self, id: &str) -> ApiResult<ConsignmentTask> {
        let mut task = self.get_task(id)?;
        let backup = match task.backup_data.take() {
            Some(backup) if !backup.is_empty() => backup,
            _ => return Err(ApiError::NothingToUndo(id.to_string())),
        };
        task.data = backup;
        task.edit_timestamp = None;
        self.history.replace(task.clone())?;
        info!(task_id = id, "箱数修订已撤销");
        Ok(task)
    }
}

fn require_column(table: &RawTable, name: &str) -> ApiResult<usize> {
    table
        .column_index(name)
        .ok_or_else(|| ApiError::MissingColumn(name.to_string()))
}

/// 主数据: 规范化 SKU → 首行
fn index_master(master: &RawTable) -> BTreeMap<String, &Vec<String>> {
    let mut index = BTreeMap::new();
    if let Some(sku_col) = master.column_index("SKU") {
        for row in &master.rows {
            index.entry(clean_sku(cell(row, sku_col))).or_insert(row);
        }
    }
    index
}

fn apply_boxes(row: &mut TableRow, boxes: i64) {
    let ppcn = row.get("PPCN").map(coerce_value_i64).unwrap_or(0);
    let ppcn = if ppcn > 0 { ppcn } else { 1 };
    row.insert("Editable Boxes".to_string(), Value::from(boxes));
    row.insert("Editable Qty".to_string(), Value::from(boxes.saturating_mul(ppcn)));
}
