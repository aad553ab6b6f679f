// ==========================================
// 电商仓储补货系统 - 调拨任务（历史台账条目）
// ==========================================
// 职责: 台账条目模型 + 读取时的缺省值规则
// 红线: 未识别字段（发货/收货地址等）原样保留,回写不得丢失
// 红线: 只有 execution 任务默认 is_booked = true
// ==========================================

use crate::domain::types::TaskType;
use crate::importer::data_cleaner::{coerce_value_f64, parse_flexible_date, value_to_text};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 工作表的一行（JSON 记录）
pub type TableRow = Map<String, Value>;

/// 工作表（JSON 记录列表,列顺序按首次出现保留）
pub type LedgerTable = Vec<TableRow>;

// ==========================================
// ConsignmentTask - 调拨任务
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LedgerRecord")]
pub struct ConsignmentTask {
    pub id: String,
    pub date: String,
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    pub is_booked: bool,
    pub data: LedgerTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_data: Option<LedgerTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_data: Option<LedgerTable>,
    pub printed_boxes: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConsignmentTask {
    /// 创建新任务（is_booked 按任务类型取缺省值）
    pub fn new(id: impl Into<String>, date: impl Into<String>, channel: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            channel: channel.into(),
            task_type: Some(task_type),
            is_booked: default_is_booked(Some(task_type)),
            data: Vec::new(),
            original_data: None,
            backup_data: None,
            printed_boxes: Vec::new(),
            mode_key: None,
            edit_timestamp: None,
            extra: Map::new(),
        }
    }

    pub fn is_execution(&self) -> bool {
        self.task_type == Some(TaskType::Execution)
    }

    pub fn is_planning(&self) -> bool {
        self.task_type == Some(TaskType::Planning)
    }

    /// 解析提货日期（无法解析返回 None）
    pub fn pickup_date(&self) -> Option<NaiveDate> {
        parse_flexible_date(&self.date)
    }

    /// 工作表 "Editable Boxes" 列合计
    pub fn total_boxes(&self) -> f64 {
        column_sum(&self.data, "Editable Boxes")
    }

    /// 工作表 "Editable Qty" 列合计
    pub fn total_qty(&self) -> f64 {
        column_sum(&self.data, "Editable Qty")
    }
}

/// is_booked 缺省值: 仅 execution 任务默认已预约
pub fn default_is_booked(task_type: Option<TaskType>) -> bool {
    task_type == Some(TaskType::Execution)
}

/// 工作表列名（按首次出现顺序去重）
pub fn table_headers(table: &[TableRow]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for row in table {
        for key in row.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }
    headers
}

fn column_sum(table: &[TableRow], column: &str) -> f64 {
    table
        .iter()
        .map(|row| row.get(column).map(coerce_value_f64).unwrap_or(0.0))
        .sum()
}

// ==========================================
// LedgerRecord - 台账原始条目（宽松反序列化）
// ==========================================
// 旧版台账字段类型不稳定（id 可能是数字、表格可能损坏）,
// 先按 Value 读入,再统一转换。
#[derive(Debug, Deserialize)]
struct LedgerRecord {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    date: Value,
    #[serde(default)]
    channel: Value,
    #[serde(default)]
    task_type: Option<Value>,
    #[serde(default)]
    is_booked: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    original_data: Option<Value>,
    #[serde(default)]
    backup_data: Option<Value>,
    #[serde(default)]
    printed_boxes: Option<Value>,
    #[serde(default)]
    mode_key: Option<Value>,
    #[serde(default)]
    edit_timestamp: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<LedgerRecord> for ConsignmentTask {
    fn from(raw: LedgerRecord) -> Self {
        let task_type = raw
            .task_type
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(|s| match s.trim().to_lowercase().as_str() {
                "planning" => Some(TaskType::Planning),
                "execution" => Some(TaskType::Execution),
                _ => None,
            });

        let is_booked = match raw.is_booked {
            Some(Value::Bool(b)) => b,
            _ => default_is_booked(task_type),
        };

        let printed_boxes = match raw.printed_boxes {
            Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_i64()).collect(),
            _ => Vec::new(),
        };

        Self {
            id: value_to_text(&raw.id),
            date: value_to_text(&raw.date),
            channel: value_to_text(&raw.channel),
            task_type,
            is_booked,
            data: raw.data.map(value_to_table).unwrap_or_default(),
            original_data: raw.original_data.map(value_to_table),
            backup_data: raw.backup_data.map(value_to_table),
            printed_boxes,
            mode_key: raw.mode_key.as_ref().and_then(|v| v.as_str()).map(str::to_string),
            edit_timestamp: raw
                .edit_timestamp
                .as_ref()
                .and_then(|v| v.as_str())
                .map(str::to_string),
            extra: raw.extra,
        }
    }
}

/// JSON → 工作表（非记录数组视为空表）
fn value_to_table(value: Value) -> LedgerTable {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
