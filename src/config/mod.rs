// ==========================================
// 电商仓储补货系统 - 配置层
// ==========================================
// 职责: 规划参数管理,支持覆写与默认值回退
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod planner_config_trait;
pub mod planner_settings;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use planner_config_trait::PlannerConfigReader;
pub use planner_settings::{PlannerSettings, DEFAULT_SALES_SHEET};
