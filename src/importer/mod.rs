// ==========================================
// 电商仓储补货系统 - 导入层
// ==========================================
// 职责: 外部表格读取、列解析、清洗、需求/供给聚合
// 支持: Excel (.xlsx), CSV
// ==========================================

// 模块声明
pub mod column_resolver;
pub mod data_cleaner;
pub mod error;
pub mod file_parser;
pub mod inventory_aggregator;
pub mod sales_aggregator;

// 重导出核心类型
pub use column_resolver::{ColumnResolver, ColumnRule};
pub use data_cleaner::{clean_sku, clean_sku_value, coerce_f64, coerce_i64};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, RawTable, UniversalFileParser};
pub use inventory_aggregator::{InventoryAggregator, InventoryStrategy, SupplySnapshot};
pub use sales_aggregator::{DemandSnapshot, SalesAggregator, SalesColumnRules, SkuFilter};
