// ==========================================
// 电商仓储补货系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 红线: 一个进程一份数据库连接,所有仓储共享
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{HistoryApi, PlanningApi};
use crate::config::config_manager::ConfigManager;
use crate::config::PlannerConfigReader;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version};
use crate::repository::{
    DocumentStore, HistoryRepository, ReferenceRepository, SqliteDocumentStore,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 历史台账API
    pub history_api: Arc<HistoryApi>,

    /// 补货规划API
    pub planning_api: Arc<PlanningApi>,

    /// 配置管理
    pub config_manager: Arc<ConfigManager>,

    /// 参考表仓储（模板 / 主数据上传）
    pub reference_repo: Arc<ReferenceRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 打开数据库并建表,然后按 仓储 → 配置 → API 的顺序组装
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let version = read_schema_version(&conn).map_err(|e| format!("读取schema版本失败: {}", e))?;
        tracing::debug!(schema_version = ?version, "数据库就绪");
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(conn.clone()));
        let history_repo = Arc::new(HistoryRepository::new(store.clone()));
        let reference_repo = Arc::new(ReferenceRepository::new(store));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let default_ppcn = config_manager
            .get_default_ppcn()
            .map_err(|e| format!("读取默认PPCN失败: {}", e))?;

        // ==========================================
        // 初始化API层
        // ==========================================
        let history_api = Arc::new(HistoryApi::new(
            history_repo.clone(),
            reference_repo.clone(),
            default_ppcn,
        ));
        let planning_api = Arc::new(PlanningApi::new(
            history_repo,
            reference_repo.clone(),
            config_manager.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            history_api,
            planning_api,
            config_manager,
            reference_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// # 规则
/// 1. 环境变量 WAREHOUSE_OPS_DB_PATH（非空时）
/// 2. 用户数据目录下 warehouse-ops/warehouse_ops.db（debug 构建用 warehouse-ops-dev）
/// 3. 当前目录 ./warehouse_ops.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("WAREHOUSE_OPS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./warehouse_ops.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        let dir = data_dir.join("warehouse-ops-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("warehouse-ops");

        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("warehouse_ops.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_on_temp_db() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert!(state.history_api.list_tasks(None).unwrap().is_empty());
        assert_eq!(state.planning_api.settings().unwrap().default_ppcn, 16);
    }
}
