// ==========================================
// 电商仓储补货系统 - 分区补货规划引擎
// ==========================================
// 流程: 需求/供给/预约聚合 → 单 SKU 箱数 → 分区分配 → 报表组装
// 红线: 纯函数,不读写任何持久化状态;同输入同输出
// 红线: 列解析失败整体失败,不产出部分计划
// ==========================================

use crate::config::PlannerSettings;
use crate::domain::consignment::ConsignmentTask;
use crate::engine::bookings::BookingsAggregator;
use crate::engine::box_calculator::{BoxCalculator, PpcnSources};
use crate::engine::report::{AllocationReport, ReportAssembler, SkuAllocation};
use crate::engine::zone_distribution::distribute_boxes;
use crate::domain::records::BookingSnapshot;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::RawTable;
use crate::importer::inventory_aggregator::{InventoryAggregator, InventoryStrategy};
use crate::importer::sales_aggregator::{SalesAggregator, SkuFilter};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, instrument};

pub const PLAN_STATUS_SUCCESS: &str = "Success";
pub const PLAN_STATUS_EMPTY: &str = "Calculated rows are empty.";

// ==========================================
// PlanInputs - 规划输入
// ==========================================
pub struct PlanInputs<'a> {
    pub sales: &'a RawTable,
    pub inventory: &'a RawTable,
    pub ledger: &'a [ConsignmentTask],
    pub today: NaiveDate,
    pub ppcn: &'a PpcnSources,
    /// 是否包含重复上架 SKU（宽松模式）
    pub include_duplicates: bool,
}

// ==========================================
// PlanDiagnostics - 规划诊断信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDiagnostics {
    pub in_scope_rows: usize,
    pub out_of_scope_rows: usize,
    pub unresolved_region_rows: usize,
    pub inventory_strategy: InventoryStrategy,
    pub booked_dates: Vec<String>,
    pub sku_count: usize,
}

// ==========================================
// AllocationPlan - 规划结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub report: AllocationReport,
    pub message: String,
    pub diagnostics: PlanDiagnostics,
    pub bookings: BookingSnapshot,
}

impl AllocationPlan {
    pub fn is_success(&self) -> bool {
        self.message == PLAN_STATUS_SUCCESS
    }
}

// ==========================================
// ZoneAllocationPlanner
// ==========================================
pub struct ZoneAllocationPlanner {
    settings: PlannerSettings,
}

impl ZoneAllocationPlanner {
    pub fn new(settings: PlannerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    /// 执行一次规划
    #[instrument(skip(self, inputs), fields(today = %inputs.today, include_duplicates = inputs.include_duplicates))]
    pub fn plan(&self, inputs: &PlanInputs<'_>) -> ImportResult<AllocationPlan> {
        // 1. 聚合（三路相互独立）
        let filter = SkuFilter::new(
            &self.settings.sku_pattern_strict,
            &self.settings.sku_pattern_relaxed,
            inputs.include_duplicates,
        )?;
        let demand = SalesAggregator::new(&self.settings.sales_rules, filter)?.aggregate(inputs.sales)?;
        let supply = InventoryAggregator::aggregate(inputs.inventory);
        let bookings = BookingsAggregator::new()?.aggregate(inputs.ledger, inputs.today);

        // 2. SKU 全集 = 销售 SKU ∪ 预约 SKU
        let skus: BTreeSet<&String> = demand.global.keys().chain(bookings.entries.keys()).collect();

        // 3. 单 SKU 计算 + 分区分配
        let mut allocations = Vec::with_capacity(skus.len());
        for sku in &skus {
            let sales = demand.total_sales(sku);
            let calculation = BoxCalculator::calculate(
                sku,
                sales,
                supply.stock(sku),
                bookings.booked_qty(sku),
                inputs.ppcn.resolve(sku),
            );
            let zones = distribute_boxes(calculation.total_boxes, &demand.zone_sales(sku), sales);
            allocations.push(SkuAllocation { calculation, zones });
        }

        // 4. 报表
        let report = ReportAssembler::assemble(&allocations);
        let message = if report.is_empty() {
            PLAN_STATUS_EMPTY
        } else {
            PLAN_STATUS_SUCCESS
        };

        info!(
            skus = skus.len(),
            plan_lines = report.plan_lines.len(),
            unresolved_regions = demand.unresolved_region_rows,
            status = message,
            "分区补货规划完成"
        );

        Ok(AllocationPlan {
            diagnostics: PlanDiagnostics {
                in_scope_rows: demand.in_scope_rows,
                out_of_scope_rows: demand.out_of_scope_rows,
                unresolved_region_rows: demand.unresolved_region_rows,
                inventory_strategy: supply.strategy,
                booked_dates: bookings.dates.clone(),
                sku_count: skus.len(),
            },
            report,
            message: message.to_string(),
            bookings,
        })
    }
}
