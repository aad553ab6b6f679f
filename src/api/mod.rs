// ==========================================
// 电商仓储补货系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行与上层界面调用
// ==========================================

pub mod error;
pub mod history_api;
pub mod planning_api;
pub mod planning_session;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use history_api::{
    BookedSummaryView, DashboardStats, HistoryApi, ManualShipmentRequest, TaskActivity,
};
pub use planning_api::{new_task_id, PlanRequest, PlanningApi};
pub use planning_session::{EditorRow, PlanningSession, SkuEdit, SkuEditorRow, ZoneEdit};
