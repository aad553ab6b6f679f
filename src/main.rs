// ==========================================
// 电商仓储补货系统 - 命令行入口
// ==========================================
// 子命令: 规划 / 台账查询 / 手工发货 / 预约开关 / 箱数修订 / 参考表 / 配置
// 约定: 日志写 stderr,结果写 stdout（--json 输出结构化结果）
// ==========================================

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};

use warehouse_ops::api::{new_task_id, ManualShipmentRequest, PlanRequest};
use warehouse_ops::app::{get_default_db_path, AppState};
use warehouse_ops::domain::types::{TaskType, WarehouseMode, Zone, ZONE_PRIORITY};
use warehouse_ops::engine::listing::table_to_csv;
use warehouse_ops::engine::report::export_csv;
use warehouse_ops::importer::file_parser::CsvParser;
use warehouse_ops::logging;

#[derive(Parser)]
#[command(name = "warehouse-ops", about = "多分区仓储补货规划与调拨台账", version)]
struct Cli {
    /// 数据库路径（默认: WAREHOUSE_OPS_DB_PATH 或用户数据目录）
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[arg(long, global = true, action = ArgAction::SetTrue, help = "以 JSON 输出结果")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行补货规划并导出报表
    Plan(PlanArgs),
    /// 列出台账任务
    Tasks {
        #[arg(long = "type")]
        task_type: Option<TaskType>,
    },
    /// 驾驶舱统计
    Stats,
    /// 在途预约汇总
    Booked {
        /// 只看所选提货日（YYYY-MM-DD,可重复）
        #[arg(long = "date")]
        dates: Vec<String>,
    },
    /// 切换任务预约状态
    ToggleBooked { id: String },
    /// 删除任务
    DeleteTask { id: String },
    /// 手工发货建单
    Ship(ShipArgs),
    /// 应用箱数修订表（SKU Id / Available Box (Edit)）
    EditBoxes { id: String, file: PathBuf },
    /// 撤销箱数修订
    UndoEdits { id: String },
    /// 导出任务的逐箱清单
    Manifest {
        id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// 标记已打印的箱号
    MarkPrinted { id: String, box_no: i64 },
    /// 由已保存的规划任务生成上架清单
    Listing {
        id: String,
        /// 单个分区（缺省为全部分区）
        #[arg(long)]
        zone: Option<Zone>,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// 上传上架模板（含 PPCN 覆盖）
    Template {
        #[arg(long, default_value = "single")]
        mode: WarehouseMode,
        file: PathBuf,
    },
    /// 上传主数据（必须含 PPCN 列）
    Master { file: PathBuf },
    /// 配置读写
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::Args)]
struct PlanArgs {
    /// 销售报表（.csv / .xlsx）
    #[arg(long)]
    sales: PathBuf,
    /// 库存报表（.csv / .xlsx）
    #[arg(long)]
    inventory: PathBuf,
    #[arg(long, default_value = "single")]
    mode: WarehouseMode,
    #[arg(long, default_value = "Flipkart")]
    channel: String,
    /// 包含重复上架 SKU（宽松 SKU 规则）
    #[arg(long, action = ArgAction::SetTrue)]
    include_duplicates: bool,
    /// 保存前应用的修订表（SKU Id / Select / Editable Qty / Editable Boxes）
    #[arg(long)]
    edits: Option<PathBuf>,
    /// 报表输出目录
    #[arg(long, default_value = ".")]
    out: PathBuf,
    /// 把勾选行保存为规划任务
    #[arg(long, action = ArgAction::SetTrue)]
    save: bool,
}

#[derive(clap::Args)]
struct ShipArgs {
    #[arg(long)]
    id: String,
    /// 提货日（YYYY-MM-DD）
    #[arg(long)]
    date: NaiveDate,
    #[arg(long, default_value = "Flipkart")]
    channel: String,
    /// 发货明细 CSV（SKU Id / Quantity Sent）
    file: PathBuf,
    /// 透传字段 key=value（可重复）
    #[arg(long = "field")]
    fields: Vec<String>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// 显示全部 global 配置
    Show,
    Get { key: String },
    Set { key: String, value: String },
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    tracing::info!(version = warehouse_ops::VERSION, db_path = %db_path, "{}", warehouse_ops::APP_NAME);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Plan(args) => run_plan(&state, args, today, cli.json)?,
        Commands::Tasks { task_type } => {
            let tasks = state.history_api.list_tasks(task_type)?;
            if cli.json {
                print_json(&tasks)?;
            } else {
                for task in &tasks {
                    println!(
                        "{}\t{}\t{}\t{}\tbooked={}\tboxes={}",
                        task.id,
                        task.date,
                        task.channel,
                        task.task_type.map(|t| t.to_string()).unwrap_or_default(),
                        task.is_booked,
                        task.total_boxes()
                    );
                }
            }
        }
        Commands::Stats => {
            let stats = state.history_api.dashboard_stats()?;
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("任务数: {}", stats.task_count);
                println!("总箱数: {}", stats.total_boxes);
                println!("总件数: {}", stats.total_qty);
                println!("最近提货: {}", stats.last_shipment.as_deref().unwrap_or("-"));
                for (channel, boxes) in &stats.boxes_by_channel {
                    println!("  {}: {} 箱", channel, boxes);
                }
            }
        }
        Commands::Booked { dates } => {
            let view = state.history_api.booked_summary(today, Some(dates.as_slice()))?;
            if cli.json {
                print_json(&view)?;
            } else {
                println!("可选提货日: {}", view.available_dates.join(", "));
                print!(
                    "{}",
                    export_csv(&view.rows, &["SKU", "Total Qty", "Total Boxes", "Pickup Dates"])?
                );
            }
        }
        Commands::ToggleBooked { id } => {
            let booked = state.history_api.toggle_booked(&id)?;
            println!("{} booked={}", id, booked);
        }
        Commands::DeleteTask { id } => {
            state.history_api.delete_task(&id)?;
            println!("已删除 {}", id);
        }
        Commands::Ship(args) => {
            let content = fs::read(&args.file)
                .with_context(|| format!("无法读取发货明细 {}", args.file.display()))?;
            let task = state.history_api.create_manual_shipment(ManualShipmentRequest {
                id: args.id,
                pickup_date: args.date,
                channel: args.channel,
                content,
                extra: parse_fields(&args.fields)?,
            })?;
            println!("已创建发货任务 {}（{} 箱）", task.id, task.total_boxes());
        }
        Commands::EditBoxes { id, file } => {
            let edits = read_csv(&file)?;
            let task = state
                .history_api
                .apply_box_edits(&id, &edits, Local::now().naive_local())?;
            println!("已修订 {}（{} 箱）", task.id, task.total_boxes());
        }
        Commands::UndoEdits { id } => {
            let task = state.history_api.undo_box_edits(&id)?;
            println!("已撤销 {} 的修订（{} 箱）", task.id, task.total_boxes());
        }
        Commands::Manifest { id, out } => {
            let labels = state
                .history_api
                .box_manifest(&id, state.planning_api.manifest_options()?)?;
            if cli.json {
                print_json(&labels)?;
            } else {
                let csv = export_csv(
                    &labels,
                    &["Box No", "Total Boxes", "SKU", "FSN", "EAN", "Qty", "Value"],
                )?;
                match out {
                    Some(path) => write_file(&path, &csv)?,
                    None => print!("{}", csv),
                }
            }
        }
        Commands::MarkPrinted { id, box_no } => {
            let added = state.history_api.mark_box_printed(&id, box_no)?;
            println!("{} 箱 {} {}", id, box_no, if added { "已标记" } else { "已是打印状态" });
        }
        Commands::Listing { id, zone, out } => {
            let session = state.planning_api.open_session(&id)?;
            let chunks = state.planning_api.active_listings(&session, zone)?;
            if chunks.is_empty() {
                println!("没有可上架的 SKU");
            }
            let label = zone.map(|z| z.as_str()).unwrap_or("All");
            for (idx, chunk) in chunks.iter().enumerate() {
                let path = out.join(format!("Active_Listing_{}_{}_part{}.csv", id, label, idx + 1));
                write_file(&path, &table_to_csv(chunk)?)?;
            }
        }
        Commands::Template { mode, file } => {
            let content = fs::read(&file).with_context(|| format!("无法读取 {}", file.display()))?;
            let table = state.reference_repo.save_template(mode, &content)?;
            println!("{} 模板已更新（{} 行）", mode, table.rows.len());
        }
        Commands::Master { file } => {
            let content = fs::read(&file).with_context(|| format!("无法读取 {}", file.display()))?;
            let table = state.reference_repo.save_master(&content)?;
            println!("主数据已更新（{} 行）", table.rows.len());
        }
        Commands::Config(command) => match command {
            ConfigCommands::Show => println!("{}", state.config_manager.get_config_snapshot()?),
            ConfigCommands::Get { key } => {
                match state.config_manager.get_global_config_value(&key)? {
                    Some(value) => println!("{}", value),
                    None => println!("{} 未设置（使用默认值）", key),
                }
            }
            ConfigCommands::Set { key, value } => {
                state.config_manager.set_global_config_value(&key, &value)?;
                println!("{} = {}", key, value);
            }
        },
    }

    Ok(())
}

/// 规划: 读文件 → 计算 → (可选)修订 → 导出 → (可选)保存
fn run_plan(state: &AppState, args: PlanArgs, today: NaiveDate, json: bool) -> Result<()> {
    let api = &state.planning_api;
    let sales = api
        .read_sales_file(&args.sales)
        .with_context(|| format!("无法读取销售报表 {}", args.sales.display()))?;
    let inventory = api
        .read_inventory_file(&args.inventory)
        .with_context(|| format!("无法读取库存报表 {}", args.inventory.display()))?;

    let mut session = api.create_session(PlanRequest {
        task_id: new_task_id(Utc::now().naive_utc()),
        sales,
        inventory,
        mode: args.mode,
        channel: args.channel,
        include_duplicates: args.include_duplicates,
        today,
    })?;
    if session.is_empty() {
        bail!("{}", session.message());
    }

    if let Some(path) = &args.edits {
        let touched = session.apply_uploaded_edits(&read_csv(path)?)?;
        tracing::info!(rows = touched, "已应用修订表");
    }

    fs::create_dir_all(&args.out)
        .with_context(|| format!("无法创建输出目录 {}", args.out.display()))?;
    if let Some(report) = session.report() {
        write_file(&args.out.join("zone_plan_lines.csv"), &report.plan_lines_csv()?)?;
        write_file(&args.out.join("sku_summary.csv"), &report.summary_csv()?)?;
        write_file(&args.out.join("zone_summary.csv"), &report.zone_summary_csv()?)?;
        write_file(&args.out.join("combined_zones.csv"), &report.combined_csv()?)?;
        for zone in ZONE_PRIORITY {
            let path = args.out.join(format!("working_{}.csv", zone.as_str().to_lowercase()));
            write_file(&path, &report.zone_working_csv(zone)?)?;
        }
    }
    write_file(&args.out.join("editor.csv"), &session.editor_csv()?)?;

    if json {
        print_json(&session.sku_view())?;
    } else {
        for row in session.sku_view() {
            println!("{}\tPPCN={}\tboxes={}\tqty={}", row.sku, row.ppcn, row.boxes, row.qty);
        }
    }

    if args.save {
        let task = api.save_session(&session, today)?;
        println!("已保存规划任务 {}（{} 行）", task.id, task.data.len());
    }
    Ok(())
}

fn read_csv(path: &Path) -> Result<warehouse_ops::importer::RawTable> {
    let bytes = fs::read(path).with_context(|| format!("无法读取 {}", path.display()))?;
    Ok(CsvParser.parse_bytes(&bytes)?)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("无法写入 {}", path.display()))?;
    tracing::info!(path = %path.display(), "已导出");
    Ok(())
}

fn parse_fields(fields: &[String]) -> Result<Map<String, Value>> {
    let mut extra = Map::new();
    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            bail!("透传字段格式应为 key=value: {}", field);
        };
        extra.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
    }
    Ok(extra)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
