// ==========================================
// 电商仓储补货系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、静态参考数据
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod consignment;
pub mod records;
pub mod region;
pub mod types;

// 重导出核心类型
pub use consignment::{default_is_booked, table_headers, ConsignmentTask, LedgerTable, TableRow};
pub use records::{
    BookedQuantity, BookingEntry, BookingSnapshot, CombinedZoneRow, InventoryRecord, SalesRecord,
    SkuPlanLine, SkuSummaryRow, ZoneSummaryRow,
};
pub use region::{resolve_region, REGION_TABLE};
pub use types::{TaskType, WarehouseMode, Zone, ZONE_PRIORITY};
