// ==========================================
// 电商仓储补货系统 - 规划 API
// ==========================================
// 职责: 读取销售/库存文件 → 运行规划 → 会话保存/重开 → 上架清单
// 红线: 规划本身是纯计算,台账只在显式保存时写入
// 红线: 配置每次调用现读,不缓存
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::planning_session::PlanningSession;
use crate::config::{PlannerConfigReader, PlannerSettings};
use crate::domain::consignment::ConsignmentTask;
use crate::domain::types::{WarehouseMode, Zone};
use crate::engine::box_manifest::ManifestOptions;
use crate::engine::listing::{build_active_listing, split_by_quantity_limit, LISTING_QTY_COLUMN};
use crate::engine::planner::{PlanInputs, ZoneAllocationPlanner};
use crate::importer::file_parser::{RawTable, UniversalFileParser};
use crate::repository::history_repo::HistoryRepository;
use crate::repository::reference_repo::ReferenceRepository;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 规划请求
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub task_id: String,
    pub sales: RawTable,
    pub inventory: RawTable,
    pub mode: WarehouseMode,
    pub channel: String,
    pub include_duplicates: bool,
    pub today: NaiveDate,
}

/// 规划任务 ID（TASK_ + Unix 秒）
pub fn new_task_id(now: NaiveDateTime) -> String {
    format!("TASK_{}", now.and_utc().timestamp())
}

// ==========================================
// PlanningApi
// ==========================================
pub struct PlanningApi {
    history: Arc<HistoryRepository>,
    reference: Arc<ReferenceRepository>,
    config: Arc<dyn PlannerConfigReader>,
}

impl PlanningApi {
    pub fn new(
        history: Arc<HistoryRepository>,
        reference: Arc<ReferenceRepository>,
        config: Arc<dyn PlannerConfigReader>,
    ) -> Self {
        Self {
            history,
            reference,
            config,
        }
    }

    /// 当前生效的规划参数
    pub fn settings(&self) -> ApiResult<PlannerSettings> {
        Ok(PlannerSettings::from_reader(self.config.as_ref())?)
    }

    /// 箱标签参数（单价 / 虚拟分组大小）
    pub fn manifest_options(&self) -> ApiResult<ManifestOptions> {
        let settings = self.settings()?;
        Ok(ManifestOptions {
            unit_cost: settings.standard_cost,
            dummy_group_size: settings.dummy_box_group_size,
        })
    }

    // ==========================================
    // 文件读取
    // ==========================================

    /// 读取销售报表（Excel 优先读取配置的工作表）
    pub fn read_sales_file<P: AsRef<Path>>(&self, path: P) -> ApiResult<RawTable> {
        let sheet = self.settings()?.sales_sheet_name;
        Ok(UniversalFileParser::new(Some(sheet)).parse_path(path)?)
    }

    pub fn read_sales_bytes(&self, bytes: &[u8], file_name: &str) -> ApiResult<RawTable> {
        let sheet = self.settings()?.sales_sheet_name;
        Ok(UniversalFileParser::new(Some(sheet)).parse_bytes(bytes, file_name)?)
    }

    pub fn read_inventory_file<P: AsRef<Path>>(&self, path: P) -> ApiResult<RawTable> {
        Ok(UniversalFileParser::new(None).parse_path(path)?)
    }

    pub fn read_inventory_bytes(&self, bytes: &[u8], file_name: &str) -> ApiResult<RawTable> {
        Ok(UniversalFileParser::new(None).parse_bytes(bytes, file_name)?)
    }

    // ==========================================
    // 规划会话
    // ==========================================

    /// 运行一次规划并返回新会话
    #[instrument(skip(self, request), fields(task_id = %request.task_id, mode = %request.mode))]
    pub fn create_session(&self, request: PlanRequest) -> ApiResult<PlanningSession> {
        if request.channel.trim().is_empty() {
            return Err(ApiError::InvalidInput("渠道不能为空".to_string()));
        }

        let settings = self.settings()?;
        let ledger = self.history.load()?;
        let ppcn = self.reference.ppcn_sources(request.mode, settings.default_ppcn)?;

        let planner = ZoneAllocationPlanner::new(settings);
        let plan = planner.plan(&PlanInputs {
            sales: &request.sales,
            inventory: &request.inventory,
            ledger: &ledger,
            today: request.today,
            ppcn: &ppcn,
            include_duplicates: request.include_duplicates,
        })?;

        if !plan.is_success() {
            warn!(message = %plan.message, "规划结果为空");
        }
        Ok(PlanningSession::from_plan(
            request.task_id,
            request.mode,
            request.channel,
            plan,
        ))
    }

    /// 重开已保存的规划任务
    pub fn open_session(&self, task_id: &str) -> ApiResult<PlanningSession> {
        let task = self
            .history
            .find(task_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ConsignmentTask(id={})不存在", task_id)))?;
        PlanningSession::from_task(&task)
    }

    /// 保存会话勾选行为规划任务
    ///
    /// # 规则
    /// - 同 ID 的规划任务被覆盖（重开后再次保存）
    /// - 同 ID 的发货任务不可覆盖
    #[instrument(skip(self, session), fields(task_id = %session.task_id))]
    pub fn save_session(&self, session: &PlanningSession, date: NaiveDate) -> ApiResult<ConsignmentTask> {
        let task = session.to_task(date)?;
        match self.history.find(&task.id)? {
            Some(existing) if existing.is_planning() => self.history.replace(task.clone())?,
            Some(_) => return Err(ApiError::DuplicateTaskId(task.id)),
            None => self.history.append(task.clone())?,
        }
        info!(rows = task.data.len(), channel = %task.channel, "规划任务已保存");
        Ok(task)
    }

    // ==========================================
    // 上架清单
    // ==========================================

    /// 生成上架清单（zone = None 表示全部分区,按汇总 Final_Qty）
    ///
    /// # 返回
    /// - 按数量上限拆分后的清单块（无可上架 SKU 时为空）
    pub fn active_listings(&self, session: &PlanningSession, zone: Option<Zone>) -> ApiResult<Vec<RawTable>> {
        let settings = self.settings()?;
        let template = self.reference.load_template(session.mode)?;
        if template.is_empty() {
            return Err(ApiError::NotFound(format!(
                "上架模板({})不存在",
                session.mode
            )));
        }

        let quantities = match zone {
            Some(z) => session.zone_quantities(z),
            None => session.all_zone_quantities(),
        };
        let listing = build_active_listing(&template, &quantities, settings.standard_cost)?;
        if listing.is_empty() {
            return Ok(Vec::new());
        }
        Ok(split_by_quantity_limit(
            &listing,
            LISTING_QTY_COLUMN,
            settings.listing_qty_limit,
        ))
    }
}
