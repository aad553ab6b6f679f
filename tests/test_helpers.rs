// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库 / 表格构造 / 台账任务构造
// ==========================================
#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::error::Error;
use tempfile::NamedTempFile;
use warehouse_ops::app::AppState;
use warehouse_ops::domain::consignment::{ConsignmentTask, TableRow};
use warehouse_ops::domain::types::TaskType;
use warehouse_ops::importer::file_parser::RawTable;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = warehouse_ops::db::open_sqlite_connection(&db_path)?;
    warehouse_ops::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 基于临时数据库创建完整应用状态
pub fn create_test_state() -> (NamedTempFile, AppState) {
    let (temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
    let state = AppState::new(db_path).expect("初始化 AppState 失败");
    (temp_file, state)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 固定的"今天"
pub fn today() -> NaiveDate {
    date(2026, 3, 10)
}

pub fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
    RawTable::new(
        headers.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

/// 销售表（SKU / Quantity / Delivery State）
pub fn sales_table(rows: &[(&str, f64, &str)]) -> RawTable {
    RawTable::new(
        vec!["SKU".into(), "Quantity".into(), "Delivery State".into()],
        rows.iter()
            .map(|(sku, qty, state)| vec![sku.to_string(), qty.to_string(), state.to_string()])
            .collect(),
    )
}

/// 库存表（SKU / Live on Website）
pub fn inventory_table(rows: &[(&str, i64)]) -> RawTable {
    RawTable::new(
        vec!["SKU".into(), "Live on Website".into()],
        rows.iter()
            .map(|(sku, qty)| vec![sku.to_string(), qty.to_string()])
            .collect(),
    )
}

/// 台账工作表行（SKU Id / Editable Boxes / Editable Qty / PPCN）
pub fn ledger_row(sku: &str, boxes: i64, qty: i64, ppcn: i64) -> TableRow {
    let value = json!({
        "SKU Id": sku,
        "Editable Boxes": boxes,
        "Editable Qty": qty,
        "PPCN": ppcn,
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// 发货任务（execution 默认已预约）
pub fn execution_task(id: &str, pickup: NaiveDate, rows: Vec<TableRow>) -> ConsignmentTask {
    let mut task = ConsignmentTask::new(
        id,
        pickup.format("%Y-%m-%d").to_string(),
        "Flipkart",
        TaskType::Execution,
    );
    task.data = rows;
    task
}
