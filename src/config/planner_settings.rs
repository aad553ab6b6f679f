// ==========================================
// 电商仓储补货系统 - 规划参数快照
// ==========================================
// 职责: 一次规划运行所用的全部配置,读取后不再变化
// ==========================================

use crate::config::planner_config_trait::PlannerConfigReader;
use crate::engine::box_calculator::DEFAULT_PPCN;
use crate::engine::box_manifest::DEFAULT_DUMMY_GROUP_SIZE;
use crate::engine::listing::{DEFAULT_LISTING_QTY_LIMIT, DEFAULT_STANDARD_COST};
use crate::importer::sales_aggregator::{
    SalesColumnRules, DEFAULT_SKU_PATTERN_RELAXED, DEFAULT_SKU_PATTERN_STRICT,
};
use crate::repository::error::RepositoryResult;
use serde::{Deserialize, Serialize};

/// 销售工作簿默认工作表
pub const DEFAULT_SALES_SHEET: &str = "Sales Report";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerSettings {
    pub default_ppcn: i64,
    pub sku_pattern_strict: String,
    pub sku_pattern_relaxed: String,
    pub sales_rules: SalesColumnRules,
    pub sales_sheet_name: String,
    pub standard_cost: i64,
    pub listing_qty_limit: i64,
    pub dummy_box_group_size: usize,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            default_ppcn: DEFAULT_PPCN,
            sku_pattern_strict: DEFAULT_SKU_PATTERN_STRICT.to_string(),
            sku_pattern_relaxed: DEFAULT_SKU_PATTERN_RELAXED.to_string(),
            sales_rules: SalesColumnRules::default(),
            sales_sheet_name: DEFAULT_SALES_SHEET.to_string(),
            standard_cost: DEFAULT_STANDARD_COST,
            listing_qty_limit: DEFAULT_LISTING_QTY_LIMIT,
            dummy_box_group_size: DEFAULT_DUMMY_GROUP_SIZE,
        }
    }
}

impl PlannerSettings {
    /// 从配置读取器生成快照
    pub fn from_reader(reader: &dyn PlannerConfigReader) -> RepositoryResult<Self> {
        Ok(Self {
            default_ppcn: reader.get_default_ppcn()?,
            sku_pattern_strict: reader.get_sku_pattern_strict()?,
            sku_pattern_relaxed: reader.get_sku_pattern_relaxed()?,
            sales_rules: SalesColumnRules {
                sku: reader.get_sales_sku_rules()?,
                quantity: reader.get_sales_qty_rules()?,
                region: reader.get_sales_region_rules()?,
            },
            sales_sheet_name: reader.get_sales_sheet_name()?,
            standard_cost: reader.get_standard_cost()?,
            listing_qty_limit: reader.get_listing_qty_limit()?,
            dummy_box_group_size: reader.get_dummy_box_group_size()?,
        })
    }
}
