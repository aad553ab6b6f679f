// ==========================================
// 电商仓储补货系统 - 核心库
// ==========================================
// 系统定位: 多分区仓储补货规划 + 调拨台账
// 技术栈: Rust + SQLite
// 红线: 规划是纯计算,人工最终决定保存与发货
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{TaskType, WarehouseMode, Zone};

// 领域实体
pub use domain::{ConsignmentTask, SkuPlanLine, SkuSummaryRow};

// 引擎
pub use engine::{AllocationPlan, PlanInputs, PpcnSources, ZoneAllocationPlanner};

// API
pub use api::{ApiError, ApiResult, HistoryApi, PlanningApi, PlanningSession};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "电商仓储补货系统";
