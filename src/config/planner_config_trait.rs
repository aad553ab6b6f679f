// ==========================================
// 电商仓储补货系统 - 规划配置读取 Trait
// ==========================================
// 职责: 定义规划引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// 红线: 配置值格式错误时回退默认值,不得中断规划
// ==========================================

use crate::importer::column_resolver::ColumnRule;
use crate::repository::error::RepositoryResult;

// ==========================================
// PlannerConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait PlannerConfigReader: Send + Sync {
    // ===== 箱规 =====

    /// 默认每箱件数
    ///
    /// # 默认值
    /// - 16
    fn get_default_ppcn(&self) -> RepositoryResult<i64>;

    // ===== SKU 范围 =====

    /// 严格 SKU 模式（不含重复上架）
    ///
    /// # 默认值
    /// - `KBRV-\d+$`
    fn get_sku_pattern_strict(&self) -> RepositoryResult<String>;

    /// 宽松 SKU 模式（含重复上架）
    ///
    /// # 默认值
    /// - `^KBRV(?:[A-Z]*?)-\d+$`
    fn get_sku_pattern_relaxed(&self) -> RepositoryResult<String>;

    // ===== 销售表列规则 (JSON ColumnRule 列表) =====

    fn get_sales_sku_rules(&self) -> RepositoryResult<Vec<ColumnRule>>;

    fn get_sales_qty_rules(&self) -> RepositoryResult<Vec<ColumnRule>>;

    fn get_sales_region_rules(&self) -> RepositoryResult<Vec<ColumnRule>>;

    /// 销售工作簿优先读取的工作表
    ///
    /// # 默认值
    /// - "Sales Report"
    fn get_sales_sheet_name(&self) -> RepositoryResult<String>;

    // ===== 导出 =====

    /// 上架清单标准成本
    ///
    /// # 默认值
    /// - 350
    fn get_standard_cost(&self) -> RepositoryResult<i64>;

    /// 上架清单单文件数量上限
    ///
    /// # 默认值
    /// - 4999
    fn get_listing_qty_limit(&self) -> RepositoryResult<i64>;

    /// 混装箱每箱容纳的零箱行数
    ///
    /// # 默认值
    /// - 20
    fn get_dummy_box_group_size(&self) -> RepositoryResult<usize>;
}
