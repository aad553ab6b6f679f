// ==========================================
// 导入 + 配置覆写集成测试
// ==========================================
// 职责: 验证文件读取、列规则覆写、SKU 范围规则与库存回退层在 API 层的组合行为
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use std::fs;
use std::path::PathBuf;
use test_helpers::*;
use warehouse_ops::api::{ApiError, PlanRequest, PlanningSession};
use warehouse_ops::app::AppState;
use warehouse_ops::config::config_keys;
use warehouse_ops::domain::types::WarehouseMode;
use warehouse_ops::importer::file_parser::RawTable;

fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn session(
    state: &AppState,
    sales: RawTable,
    inventory: RawTable,
    include_duplicates: bool,
) -> Result<PlanningSession, ApiError> {
    state.planning_api.create_session(PlanRequest {
        task_id: "TASK_1".to_string(),
        sales,
        inventory,
        mode: WarehouseMode::Multi,
        channel: "Flipkart".to_string(),
        include_duplicates,
        today: today(),
    })
}

#[test]
fn test_configured_column_rules_drive_sales_parsing() {
    let (_db, state) = create_test_state();
    let dir = tempfile::tempdir().unwrap();
    let sales_path = write(
        &dir,
        "orders.csv",
        "Item SKU,Units,Ship To State\nKBRV-1,32,Kerala\nKBRV-1,16,Goa\n",
    );

    // 默认规则找不到列,且列数不足以走位置回退
    let sales = state.planning_api.read_sales_file(&sales_path).unwrap();
    let err = session(&state, sales.clone(), inventory_table(&[]), false).unwrap_err();
    assert!(matches!(err, ApiError::MissingColumn(ref logical) if logical == "sku"));

    let config = &state.config_manager;
    config
        .set_global_config_value(config_keys::SALES_SKU_RULES, r#"[{"kind":"exact","name":"Item SKU"}]"#)
        .unwrap();
    config
        .set_global_config_value(config_keys::SALES_QTY_RULES, r#"[{"kind":"pattern","regex":"^units$"}]"#)
        .unwrap();
    config
        .set_global_config_value(config_keys::SALES_REGION_RULES, r#"[{"kind":"contains","substring":"State"}]"#)
        .unwrap();

    let planned = session(&state, sales, inventory_table(&[]), false).unwrap();
    assert_eq!(planned.summary()[0].sales, 48.0);
    assert_eq!(planned.summary()[0].boxes, 3);
}

#[test]
fn test_malformed_rule_config_falls_back_to_defaults() {
    let (_db, state) = create_test_state();
    state
        .config_manager
        .set_global_config_value(config_keys::SALES_SKU_RULES, "not json")
        .unwrap();

    let settings = state.planning_api.settings().unwrap();
    assert_eq!(
        settings.sales_rules.sku,
        warehouse_ops::importer::column_resolver::default_sales_sku_rules()
    );

    let planned = session(
        &state,
        sales_table(&[("KBRV-1", 16.0, "Delhi")]),
        inventory_table(&[]),
        false,
    )
    .unwrap();
    assert_eq!(planned.summary()[0].boxes, 1);
}

#[test]
fn test_uncompilable_rule_pattern_does_not_block_planning() {
    let (_db, state) = create_test_state();
    state
        .config_manager
        .set_global_config_value(config_keys::SALES_SKU_RULES, r#"[{"kind":"pattern","regex":"("}]"#)
        .unwrap();

    let planned = session(
        &state,
        sales_table(&[("KBRV-1", 32.0, "Delhi")]),
        inventory_table(&[]),
        false,
    )
    .unwrap();
    assert_eq!(planned.summary()[0].sku, "KBRV-1");
    assert_eq!(planned.summary()[0].boxes, 2);
}

#[test]
fn test_duplicate_listing_skus_need_relaxed_mode() {
    let (_db, state) = create_test_state();
    let sales = sales_table(&[("KBRV-1", 16.0, "Delhi"), ("KBRVX-12", 32.0, "Delhi")]);

    let strict = session(&state, sales.clone(), inventory_table(&[]), false).unwrap();
    let strict_skus: Vec<&str> = strict.summary().iter().map(|r| r.sku.as_str()).collect();
    assert_eq!(strict_skus, vec!["KBRV-1"]);

    let relaxed = session(&state, sales, inventory_table(&[]), true).unwrap();
    let relaxed_skus: Vec<&str> = relaxed.summary().iter().map(|r| r.sku.as_str()).collect();
    assert_eq!(relaxed_skus, vec!["KBRV-1", "KBRVX-12"]);
}

#[test]
fn test_inventory_without_sku_header_uses_second_column() {
    let (_db, state) = create_test_state();
    let dir = tempfile::tempdir().unwrap();
    let inv_path = write(
        &dir,
        "stock.csv",
        "Warehouse,Product,Shelf A,Shelf B\nW1,KBRV-1,10,6\nW2,KBRV-1,4,0\n",
    );

    let inventory = state.planning_api.read_inventory_file(&inv_path).unwrap();
    let planned = session(
        &state,
        sales_table(&[("KBRV-1", 52.0, "Delhi")]),
        inventory,
        false,
    )
    .unwrap();

    let summary = &planned.summary()[0];
    assert_eq!(summary.stock, 20);
    assert_eq!(summary.boxes, 2);
    assert_eq!(
        planned.diagnostics().unwrap().inventory_strategy,
        warehouse_ops::importer::InventoryStrategy::PositionalSku
    );
}

#[test]
fn test_unreadable_inputs_are_import_errors() {
    let (_db, state) = create_test_state();
    let dir = tempfile::tempdir().unwrap();

    let legacy = write(&dir, "sales.xls", "binary");
    assert!(matches!(
        state.planning_api.read_sales_file(&legacy),
        Err(ApiError::ImportError(ref msg)) if msg.contains("xls")
    ));

    let missing = dir.path().join("nope.csv");
    assert!(matches!(
        state.planning_api.read_inventory_file(&missing),
        Err(ApiError::ImportError(_))
    ));

    let bytes = b"SKU,Quantity,Delivery State\nKBRV-1,16,Delhi\n";
    let table = state.planning_api.read_sales_bytes(bytes, "upload.CSV").unwrap();
    assert_eq!(table.rows.len(), 1);
}
