// ==========================================
// 电商仓储补货系统 - 引擎层
// ==========================================
// 职责: 实现补货规划规则（预约/箱数/分区分配/报表/导出）
// 红线: Engine 不拼 SQL,不读写持久化状态
// ==========================================

pub mod bookings;
pub mod box_calculator;
pub mod box_manifest;
pub mod listing;
pub mod planner;
pub mod report;
pub mod zone_distribution;

// 重导出核心引擎
pub use bookings::{booked_summary, BookedSummaryRow, BookingsAggregator};
pub use box_calculator::{BoxCalculator, PpcnSources, PpcnTable, SkuBoxCalculation, DEFAULT_PPCN};
pub use box_manifest::{build_box_manifest, BoxLabel, ManifestOptions};
pub use listing::{build_active_listing, split_by_quantity_limit};
pub use planner::{AllocationPlan, PlanDiagnostics, PlanInputs, ZoneAllocationPlanner};
pub use report::{AllocationReport, ReportAssembler, SkuAllocation};
pub use zone_distribution::distribute_boxes;
