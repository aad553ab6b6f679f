// ==========================================
// 电商仓储补货系统 - 列解析器
// ==========================================
// 职责: 按有序匹配规则把逻辑列映射到实际表头位置
// 规则: 逐条尝试,首个命中即返回;全部落空 = MissingColumn
// 红线: 匹配规则是数据（可由配置覆盖）,不是散落的 if/else
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

// ===== 逻辑列名 =====
pub const LOGICAL_SKU: &str = "sku";
pub const LOGICAL_QUANTITY: &str = "quantity";
pub const LOGICAL_REGION: &str = "region";
pub const LOGICAL_BOXES: &str = "boxes";
pub const LOGICAL_STOCK: &str = "stock";

// ==========================================
// ColumnRule - 单条匹配规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnRule {
    /// 表头完全等于 name
    Exact { name: String },
    /// 表头包含子串（区分大小写）
    Contains { substring: String },
    /// 表头匹配正则（忽略大小写）
    Pattern { regex: String },
    /// 固定列位置（0 起）
    Position { index: usize },
}

impl ColumnRule {
    pub fn exact(name: &str) -> Self {
        ColumnRule::Exact {
            name: name.to_string(),
        }
    }

    pub fn contains(substring: &str) -> Self {
        ColumnRule::Contains {
            substring: substring.to_string(),
        }
    }

    pub fn pattern(regex: &str) -> Self {
        ColumnRule::Pattern {
            regex: regex.to_string(),
        }
    }

    pub fn position(index: usize) -> Self {
        ColumnRule::Position { index }
    }
}

enum CompiledRule {
    Exact(String),
    Contains(String),
    Pattern(Regex),
    Position(usize),
}

impl CompiledRule {
    fn find(&self, headers: &[String]) -> Option<usize> {
        match self {
            CompiledRule::Exact(name) => headers.iter().position(|h| h == name),
            CompiledRule::Contains(sub) => headers.iter().position(|h| h.contains(sub.as_str())),
            CompiledRule::Pattern(re) => headers.iter().position(|h| re.is_match(h)),
            CompiledRule::Position(idx) => (*idx < headers.len()).then_some(*idx),
        }
    }
}

// ==========================================
// ColumnResolver - 逻辑列解析器
// ==========================================
pub struct ColumnResolver {
    logical: String,
    rules: Vec<CompiledRule>,
}

impl ColumnResolver {
    /// 编译规则列表（正则无效时返回 InvalidRule）
    pub fn new(logical: &str, rules: &[ColumnRule]) -> ImportResult<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            compiled.push(match rule {
                ColumnRule::Exact { name } => CompiledRule::Exact(name.clone()),
                ColumnRule::Contains { substring } => CompiledRule::Contains(substring.clone()),
                ColumnRule::Pattern { regex } => {
                    let re = RegexBuilder::new(regex)
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| ImportError::InvalidRule {
                            logical: logical.to_string(),
                            message: e.to_string(),
                        })?;
                    CompiledRule::Pattern(re)
                }
                ColumnRule::Position { index } => CompiledRule::Position(*index),
            });
        }

        Ok(Self {
            logical: logical.to_string(),
            rules: compiled,
        })
    }

    pub fn logical(&self) -> &str {
        &self.logical
    }

    /// 解析列位置,所有规则落空时返回 None
    pub fn find(&self, headers: &[String]) -> Option<usize> {
        self.rules.iter().find_map(|rule| rule.find(headers))
    }

    /// 解析列位置,所有规则落空时返回 MissingColumn
    pub fn resolve(&self, headers: &[String]) -> ImportResult<usize> {
        self.find(headers).ok_or_else(|| ImportError::MissingColumn {
            logical: self.logical.clone(),
        })
    }
}

// ==========================================
// 默认规则集
// ==========================================

/// 销售表 SKU 列: "SKU" → 第 6 列
pub fn default_sales_sku_rules() -> Vec<ColumnRule> {
    vec![ColumnRule::exact("SKU"), ColumnRule::position(5)]
}

/// 销售表 数量列: "Quantity" → 第 14 列
pub fn default_sales_qty_rules() -> Vec<ColumnRule> {
    vec![ColumnRule::exact("Quantity"), ColumnRule::position(13)]
}

/// 销售表 收货地区列: 含 "Delivery State" → 第 51 列
pub fn default_sales_region_rules() -> Vec<ColumnRule> {
    vec![ColumnRule::contains("Delivery State"), ColumnRule::position(50)]
}

/// 台账工作表 SKU 列
pub fn default_booking_sku_rules() -> Vec<ColumnRule> {
    vec![ColumnRule::pattern("^sku")]
}

/// 台账工作表 数量列
pub fn default_booking_qty_rules() -> Vec<ColumnRule> {
    vec![
        ColumnRule::pattern("editable qty"),
        ColumnRule::pattern("quantity"),
        ColumnRule::pattern("qty"),
    ]
}

/// 台账工作表 箱数列
pub fn default_booking_boxes_rules() -> Vec<ColumnRule> {
    vec![
        ColumnRule::pattern("editable boxes"),
        ColumnRule::pattern("boxes"),
        ColumnRule::pattern("box"),
    ]
}
