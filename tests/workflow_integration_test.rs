// ==========================================
// 规划 + 台账 端到端测试
// ==========================================
// 职责: 验证 SQLite 台账上的完整业务流转
// 场景: 发货预约 → 下次规划扣减 / 规划保存重开 / 箱数修订撤销 / 重启后数据保留
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use serde_json::Map;
use test_helpers::*;
use warehouse_ops::api::{
    ApiError, ManualShipmentRequest, PlanRequest, PlanningSession, ZoneEdit,
};
use warehouse_ops::app::AppState;
use warehouse_ops::domain::types::{TaskType, WarehouseMode, Zone};
use warehouse_ops::engine::listing::LISTING_QTY_COLUMN;

const MASTER_CSV: &str = "SKU,PPCN,EAN,FSN\nKBRV-1,10,8901,FSN-1\nKBRV-2,12,8902,FSN-2\n";

fn plan(state: &AppState, task_id: &str) -> PlanningSession {
    state
        .planning_api
        .create_session(PlanRequest {
            task_id: task_id.to_string(),
            sales: sales_table(&[
                ("KBRV-1", 60.0, "Karnataka"),
                ("KBRV-1", 40.0, "Gujarat"),
                ("KBRV-2", 48.0, "Delhi"),
            ]),
            inventory: inventory_table(&[("KBRV-1", 0)]),
            mode: WarehouseMode::Single,
            channel: "Flipkart".to_string(),
            include_duplicates: false,
            today: today(),
        })
        .expect("规划失败")
}

fn boxes_for(session: &PlanningSession, sku: &str) -> i64 {
    session
        .summary()
        .iter()
        .find(|r| r.sku == sku)
        .map(|r| r.boxes)
        .unwrap_or(-1)
}

fn ship(state: &AppState, id: &str, csv: &str) {
    state
        .history_api
        .create_manual_shipment(ManualShipmentRequest {
            id: id.to_string(),
            pickup_date: date(2026, 3, 12),
            channel: "Flipkart".to_string(),
            content: csv.as_bytes().to_vec(),
            extra: Map::new(),
        })
        .expect("建单失败");
}

#[test]
fn test_booked_shipment_reduces_next_plan() {
    let (_db, state) = create_test_state();
    state.reference_repo.save_master(MASTER_CSV.as_bytes()).unwrap();

    let before = plan(&state, "TASK_1");
    assert_eq!(boxes_for(&before, "KBRV-1"), 10);
    assert_eq!(boxes_for(&before, "KBRV-2"), 4);

    ship(&state, "C-100", "SKU Id,Quantity Sent\nKBRV-1,30\n");
    let after = plan(&state, "TASK_2");
    assert_eq!(boxes_for(&after, "KBRV-1"), 7);
    assert_eq!(after.summary()[0].booked_qty, 30);

    // 取消预约后不再扣减
    assert!(!state.history_api.toggle_booked("C-100").unwrap());
    let unbooked = plan(&state, "TASK_3");
    assert_eq!(boxes_for(&unbooked, "KBRV-1"), 10);
}

#[test]
fn test_booked_summary_by_pickup_date() {
    let (_db, state) = create_test_state();
    state.reference_repo.save_master(MASTER_CSV.as_bytes()).unwrap();
    ship(&state, "C-1", "SKU Id,Quantity Sent\nKBRV-1,20\nKBRV-2,24\n");

    let all = state.history_api.booked_summary(today(), None).unwrap();
    assert_eq!(all.available_dates, vec!["2026-03-12".to_string()]);
    assert_eq!(all.rows.len(), 2);
    assert_eq!(all.rows[0].qty, 20);
    assert_eq!(all.rows[0].boxes, 2);
    assert_eq!(all.rows[0].dates, "12 Mar:20(2)");

    let other_day = vec!["2026-03-20".to_string()];
    let none = state
        .history_api
        .booked_summary(today(), Some(other_day.as_slice()))
        .unwrap();
    assert!(none.rows.is_empty());

    // 提货日已过去
    let later = state.history_api.booked_summary(date(2026, 3, 13), None).unwrap();
    assert!(later.rows.is_empty());
}

#[test]
fn test_planning_task_save_reopen_and_listing() {
    let (_db, state) = create_test_state();
    let api = &state.planning_api;

    let session = plan(&state, "TASK_1");
    api.save_session(&session, today()).unwrap();

    let mut reopened = api.open_session("TASK_1").unwrap();
    assert_eq!(reopened.editor_rows(), session.editor_rows());
    let touched = reopened.apply_zone_edit(&ZoneEdit {
        sku: "KBRV-2".to_string(),
        zone: Zone::North,
        select: false,
        boxes: 3,
        qty: 48,
    });
    assert_eq!(touched, 1);
    api.save_session(&reopened, today()).unwrap();

    let planning = state.history_api.list_tasks(Some(TaskType::Planning)).unwrap();
    assert_eq!(planning.len(), 1);
    assert_eq!(planning[0].data.len(), 2);
    assert!(!planning[0].is_booked);
    assert!(state
        .history_api
        .list_tasks(Some(TaskType::Execution))
        .unwrap()
        .is_empty());

    // 规划任务不计入在途预约
    let replanned = plan(&state, "TASK_2");
    assert_eq!(boxes_for(&replanned, "KBRV-1"), boxes_for(&session, "KBRV-1"));

    // 上架清单
    let mut header: Vec<String> = (0..16).map(|i| format!("Col{}", i)).collect();
    header[2] = "SKU".to_string();
    let row = |sku: &str| {
        let mut cells = vec![String::new(); 16];
        cells[2] = sku.to_string();
        cells.join(",")
    };
    let template = format!("{}\n{}\n{}\n", header.join(","), row("KBRV-2"), row("KBRV-1"));
    state
        .reference_repo
        .save_template(WarehouseMode::Single, template.as_bytes())
        .unwrap();

    let south = api.active_listings(&reopened, Some(Zone::South)).unwrap();
    assert_eq!(south.len(), 1);
    assert_eq!(south[0].rows.len(), 1);
    assert_eq!(south[0].cell(0, 2), "KBRV-1");

    let all = api.active_listings(&reopened, None).unwrap();
    assert_eq!(all[0].rows.len(), 2);
    assert_eq!(all[0].cell(0, 2), "KBRV-1");
    assert_eq!(all[0].cell(0, LISTING_QTY_COLUMN), "96");
}

#[test]
fn test_shipment_cannot_be_overwritten_by_planning_save() {
    let (_db, state) = create_test_state();
    ship(&state, "TASK_1", "SKU Id,Quantity Sent\nKBRV-1,16\n");

    let session = plan(&state, "TASK_1");
    assert!(matches!(
        state.planning_api.save_session(&session, today()),
        Err(ApiError::DuplicateTaskId(_))
    ));
}

#[test]
fn test_box_edits_and_undo_persist() {
    let (_db, state) = create_test_state();
    state.reference_repo.save_master(MASTER_CSV.as_bytes()).unwrap();
    ship(&state, "C-1", "SKU Id,Quantity Sent\nKBRV-1,30\nKBRV-2,24\n");

    let edits = table(&["SKU Id", "Available Box (Edit)"], &[&["KBRV-1", "5"]]);
    let now = date(2026, 3, 10).and_hms_opt(15, 30, 0).unwrap();
    let edited = state.history_api.apply_box_edits("C-1", &edits, now).unwrap();
    assert_eq!(edited.edit_timestamp.as_deref(), Some("10-Mar-2026 03:30 PM"));
    assert_eq!(edited.data[0]["Editable Qty"], 50);

    let reloaded = state.history_api.get_task("C-1").unwrap();
    assert_eq!(reloaded.data, edited.data);
    assert!(reloaded.backup_data.is_some());

    let restored = state.history_api.undo_box_edits("C-1").unwrap();
    assert_eq!(restored.data[0]["Editable Qty"], 30);
    assert!(restored.edit_timestamp.is_none());
    assert!(matches!(
        state.history_api.undo_box_edits("C-1"),
        Err(ApiError::NothingToUndo(_))
    ));
}

#[test]
fn test_ledger_survives_restart() {
    let (_db, db_path) = create_test_db().unwrap();
    {
        let state = AppState::new(db_path.clone()).unwrap();
        ship(&state, "C-1", "SKU Id,Quantity Sent\nKBRV-1,16\n");
        state
            .config_manager
            .set_global_config_value("default_ppcn", "8")
            .unwrap();
    }

    let state = AppState::new(db_path).unwrap();
    let tasks = state.history_api.list_tasks(None).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "C-1");
    assert!(tasks[0].is_booked);
    assert_eq!(state.planning_api.settings().unwrap().default_ppcn, 8);

    state.history_api.delete_task("C-1").unwrap();
    assert!(matches!(
        state.history_api.delete_task("C-1"),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn test_dashboard_and_manifest() {
    let (_db, state) = create_test_state();
    state.reference_repo.save_master(MASTER_CSV.as_bytes()).unwrap();
    ship(&state, "C-1", "SKU Id,Quantity Sent\nKBRV-1,30\nKBRV-2,24\n");

    let stats = state.history_api.dashboard_stats().unwrap();
    assert_eq!(stats.task_count, 1);
    assert_eq!(stats.total_boxes, 5.0);
    assert_eq!(stats.last_shipment.as_deref(), Some("12-Mar-2026"));

    let options = state.planning_api.manifest_options().unwrap();
    let labels = state.history_api.box_manifest("C-1", options).unwrap();
    assert_eq!(labels.len(), 5);
    assert!(labels.iter().all(|l| l.total_boxes == labels.len()));
    assert!(state.history_api.mark_box_printed("C-1", 1).unwrap());
    assert!(!state.history_api.mark_box_printed("C-1", 1).unwrap());
}
