// ==========================================
// 电商仓储补货系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope,当前仅使用 global)
// ==========================================

use crate::config::planner_config_trait::PlannerConfigReader;
use crate::config::planner_settings::DEFAULT_SALES_SHEET;
use crate::db::open_sqlite_connection;
use crate::engine::box_calculator::DEFAULT_PPCN;
use crate::engine::box_manifest::DEFAULT_DUMMY_GROUP_SIZE;
use crate::engine::listing::{DEFAULT_LISTING_QTY_LIMIT, DEFAULT_STANDARD_COST};
use crate::importer::column_resolver::{
    default_sales_qty_rules, default_sales_region_rules, default_sales_sku_rules, ColumnResolver,
    ColumnRule,
};
use crate::importer::sales_aggregator::{DEFAULT_SKU_PATTERN_RELAXED, DEFAULT_SKU_PATTERN_STRICT};
use crate::repository::error::{RepositoryError, RepositoryResult};
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        tracing::info!(config_key = key, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON 对象,键升序）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let config_map = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<BTreeMap<String, String>, _>>()?;

        Ok(serde_json::to_string(&config_map)?)
    }

    /// 读取并解析数值配置（格式错误回退默认值）
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr + Copy + PartialOrd + Default + std::fmt::Display,
    {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(v) if v > T::default() => Ok(v),
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, default = %default, "配置值无效，使用默认值");
                Ok(default)
            }
        }
    }

    /// 读取正则配置（无法编译回退默认值）
    fn get_pattern_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default.to_string());
        };
        match Regex::new(&raw) {
            Ok(_) => Ok(raw),
            Err(e) => {
                tracing::warn!(config_key = key, raw_value = %raw, error = %e, "正则配置无效，使用默认值");
                Ok(default.to_string())
            }
        }
    }

    /// 读取列规则配置（JSON 数组,格式错误/为空/正则无法编译 回退默认值）
    fn get_rules_or_default(
        &self,
        key: &str,
        default: fn() -> Vec<ColumnRule>,
    ) -> RepositoryResult<Vec<ColumnRule>> {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default());
        };
        let rules = match serde_json::from_str::<Vec<ColumnRule>>(&raw) {
            Ok(rules) if !rules.is_empty() => rules,
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, "列规则配置格式错误，使用默认值");
                return Ok(default());
            }
        };
        match ColumnResolver::new(key, &rules) {
            Ok(_) => Ok(rules),
            Err(e) => {
                tracing::warn!(config_key = key, raw_value = %raw, error = %e, "列规则无法编译，使用默认值");
                Ok(default())
            }
        }
    }
}

// ==========================================
// PlannerConfigReader Trait 实现
// ==========================================
impl PlannerConfigReader for ConfigManager {
    fn get_default_ppcn(&self) -> RepositoryResult<i64> {
        self.get_parsed_or_default(config_keys::DEFAULT_PPCN, DEFAULT_PPCN)
    }

    fn get_sku_pattern_strict(&self) -> RepositoryResult<String> {
        self.get_pattern_or_default(config_keys::SKU_PATTERN_STRICT, DEFAULT_SKU_PATTERN_STRICT)
    }

    fn get_sku_pattern_relaxed(&self) -> RepositoryResult<String> {
        self.get_pattern_or_default(config_keys::SKU_PATTERN_RELAXED, DEFAULT_SKU_PATTERN_RELAXED)
    }

    fn get_sales_sku_rules(&self) -> RepositoryResult<Vec<ColumnRule>> {
        self.get_rules_or_default(config_keys::SALES_SKU_RULES, default_sales_sku_rules)
    }

    fn get_sales_qty_rules(&self) -> RepositoryResult<Vec<ColumnRule>> {
        self.get_rules_or_default(config_keys::SALES_QTY_RULES, default_sales_qty_rules)
    }

    fn get_sales_region_rules(&self) -> RepositoryResult<Vec<ColumnRule>> {
        self.get_rules_or_default(config_keys::SALES_REGION_RULES, default_sales_region_rules)
    }

    fn get_sales_sheet_name(&self) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(config_keys::SALES_SHEET_NAME)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SALES_SHEET.to_string()))
    }

    fn get_standard_cost(&self) -> RepositoryResult<i64> {
        self.get_parsed_or_default(config_keys::STANDARD_COST, DEFAULT_STANDARD_COST)
    }

    fn get_listing_qty_limit(&self) -> RepositoryResult<i64> {
        self.get_parsed_or_default(config_keys::LISTING_QTY_LIMIT, DEFAULT_LISTING_QTY_LIMIT)
    }

    fn get_dummy_box_group_size(&self) -> RepositoryResult<usize> {
        self.get_parsed_or_default(config_keys::DUMMY_BOX_GROUP_SIZE, DEFAULT_DUMMY_GROUP_SIZE)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 箱规
    pub const DEFAULT_PPCN: &str = "default_ppcn";

    // SKU 范围
    pub const SKU_PATTERN_STRICT: &str = "sku_pattern_strict";
    pub const SKU_PATTERN_RELAXED: &str = "sku_pattern_relaxed";

    // 销售表列规则 (JSON)
    pub const SALES_SKU_RULES: &str = "sales_sku_rules";
    pub const SALES_QTY_RULES: &str = "sales_qty_rules";
    pub const SALES_REGION_RULES: &str = "sales_region_rules";
    pub const SALES_SHEET_NAME: &str = "sales_sheet_name";

    // 导出
    pub const STANDARD_COST: &str = "standard_cost";
    pub const LISTING_QTY_LIMIT: &str = "listing_qty_limit";
    pub const DUMMY_BOX_GROUP_SIZE: &str = "dummy_box_group_size";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::planner_settings::PlannerSettings;
    use crate::db::init_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let settings = PlannerSettings::from_reader(&manager()).unwrap();
        assert_eq!(settings, PlannerSettings::default());
    }

    #[test]
    fn test_overrides_and_malformed_values() {
        let cfg = manager();
        cfg.set_global_config_value(config_keys::DEFAULT_PPCN, "24").unwrap();
        cfg.set_global_config_value(config_keys::LISTING_QTY_LIMIT, "abc").unwrap();
        cfg.set_global_config_value(config_keys::STANDARD_COST, "-5").unwrap();
        cfg.set_global_config_value(config_keys::SKU_PATTERN_STRICT, "([").unwrap();
        cfg.set_global_config_value(
            config_keys::SALES_SKU_RULES,
            r#"[{"kind":"exact","name":"Seller SKU"},{"kind":"position","index":2}]"#,
        )
        .unwrap();
        cfg.set_global_config_value(config_keys::SALES_QTY_RULES, "not json").unwrap();

        let settings = PlannerSettings::from_reader(&cfg).unwrap();
        assert_eq!(settings.default_ppcn, 24);
        assert_eq!(settings.listing_qty_limit, DEFAULT_LISTING_QTY_LIMIT);
        assert_eq!(settings.standard_cost, DEFAULT_STANDARD_COST);
        assert_eq!(settings.sku_pattern_strict, DEFAULT_SKU_PATTERN_STRICT);
        assert_eq!(
            settings.sales_rules.sku,
            vec![ColumnRule::exact("Seller SKU"), ColumnRule::position(2)]
        );
        assert_eq!(settings.sales_rules.quantity, default_sales_qty_rules());
    }

    #[test]
    fn test_uncompilable_rule_pattern_falls_back() {
        let cfg = manager();
        cfg.set_global_config_value(config_keys::SALES_SKU_RULES, r#"[{"kind":"pattern","regex":"("}]"#)
            .unwrap();
        cfg.set_global_config_value(
            config_keys::SALES_REGION_RULES,
            r#"[{"kind":"exact","name":"State"},{"kind":"pattern","regex":"[a-"}]"#,
        )
        .unwrap();

        let settings = PlannerSettings::from_reader(&cfg).unwrap();
        assert_eq!(settings.sales_rules.sku, default_sales_sku_rules());
        assert_eq!(settings.sales_rules.region, default_sales_region_rules());
    }

    #[test]
    fn test_snapshot_lists_global_values() {
        let cfg = manager();
        cfg.set_global_config_value(config_keys::SALES_SHEET_NAME, "Orders").unwrap();
        cfg.set_global_config_value(config_keys::DEFAULT_PPCN, "12").unwrap();

        let snapshot = cfg.get_config_snapshot().unwrap();
        assert_eq!(snapshot, r#"{"default_ppcn":"12","sales_sheet_name":"Orders"}"#);
        assert_eq!(cfg.get_sales_sheet_name().unwrap(), "Orders");
    }
}
