// ==========================================
// 电商仓储补货系统 - 规划会话
// ==========================================
// 流程: 计算结果 → 编辑器行（带勾选）→ 分区/SKU/上传修订 → 重置 → 保存为规划任务
// 红线: 会话是显式对象,不存在全局会话状态
// 红线: 编辑器行始终按 SKU 排序（忽略大小写,稳定排序）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::consignment::{ConsignmentTask, LedgerTable, TableRow};
use crate::domain::records::{SkuPlanLine, SkuSummaryRow};
use crate::domain::types::{TaskType, WarehouseMode, Zone};
use crate::engine::listing::{all_zone_quantities, zone_quantities};
use crate::engine::planner::{AllocationPlan, PlanDiagnostics};
use crate::engine::report::{sku_order, AllocationReport};
use crate::importer::data_cleaner::{
    clean_sku, clean_sku_value, coerce_value_f64, coerce_value_i64, number_value, try_parse_f64,
    value_to_text,
};
use crate::importer::file_parser::{cell, RawTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const SELECT_COLUMN: &str = "Select";

/// 编辑器导出列
pub const EDITOR_HEADERS: &[&str] = &[
    "Select",
    "SKU Id",
    "Zone",
    "Required Qty",
    "Editable Boxes",
    "Editable Qty",
    "PPCN",
    "Stock",
    "Qty_Booked",
];

/// 上传表中 Select 列的真值写法
const TRUTHY: &[&str] = &["true", "1", "yes", "y", "t"];

// ==========================================
// EditorRow - 编辑器行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorRow {
    #[serde(rename = "Select")]
    pub select: bool,
    #[serde(flatten)]
    pub line: SkuPlanLine,
}

impl EditorRow {
    pub fn selected(line: SkuPlanLine) -> Self {
        Self { select: true, line }
    }

    fn to_record(&self) -> TableRow {
        let l = &self.line;
        let mut row = TableRow::new();
        row.insert(SELECT_COLUMN.to_string(), Value::Bool(self.select));
        row.insert("SKU Id".to_string(), Value::String(l.sku.clone()));
        row.insert("Zone".to_string(), Value::String(l.zone.as_str().to_string()));
        row.insert("Required Qty".to_string(), number_value(l.required_qty));
        row.insert("Editable Boxes".to_string(), Value::from(l.allocated_boxes));
        row.insert("Editable Qty".to_string(), Value::from(l.allocated_qty));
        row.insert("PPCN".to_string(), Value::from(l.ppcn));
        row.insert("Stock".to_string(), Value::from(l.stock));
        row.insert("Qty_Booked".to_string(), Value::from(l.booked_qty));
        row
    }

    /// 台账工作表行 → 编辑器行（分区无法识别返回 None）
    fn from_record(row: &TableRow) -> Option<Self> {
        let zone: Zone = value_to_text(row.get("Zone")?).parse().ok()?;
        let int = |key: &str| row.get(key).map(coerce_value_i64).unwrap_or(0);
        Some(Self {
            select: row.get(SELECT_COLUMN).map_or(true, is_truthy),
            line: SkuPlanLine {
                sku: row.get("SKU Id").map(clean_sku_value).unwrap_or_default(),
                zone,
                required_qty: row.get("Required Qty").map(coerce_value_f64).unwrap_or(0.0),
                allocated_boxes: int("Editable Boxes"),
                allocated_qty: int("Editable Qty"),
                ppcn: int("PPCN"),
                stock: int("Stock"),
                booked_qty: int("Qty_Booked"),
            },
        })
    }
}

// ==========================================
// SkuEditorRow - 全部分区视图（按 SKU 聚合）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuEditorRow {
    #[serde(rename = "Select")]
    pub select: bool,
    #[serde(rename = "SKU Id")]
    pub sku: String,
    #[serde(rename = "PPCN")]
    pub ppcn: i64,
    #[serde(rename = "Stock")]
    pub stock: i64,
    #[serde(rename = "Qty_Booked")]
    pub booked_qty: i64,
    #[serde(rename = "Required Qty")]
    pub required_qty: f64,
    #[serde(rename = "Editable Boxes")]
    pub boxes: i64,
    #[serde(rename = "Editable Qty")]
    pub qty: i64,
}

/// 单分区修订
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneEdit {
    pub sku: String,
    pub zone: Zone,
    pub select: bool,
    pub boxes: i64,
    pub qty: i64,
}

/// SKU 级修订（跨分区按比例重算）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuEdit {
    pub sku: String,
    /// 仅修订该 PPCN 的行（None = 全部）
    pub ppcn: Option<i64>,
    pub select: bool,
    pub boxes: i64,
    pub qty: i64,
}

// ==========================================
// PlanningSession
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningSession {
    pub task_id: String,
    pub mode: WarehouseMode,
    pub channel: String,
    message: String,
    calculated: Vec<EditorRow>,
    editor: Vec<EditorRow>,
    summary: Vec<SkuSummaryRow>,
    report: Option<AllocationReport>,
    diagnostics: Option<PlanDiagnostics>,
}

impl PlanningSession {
    /// 由规划结果创建会话（全部行默认勾选）
    pub fn from_plan(
        task_id: impl Into<String>,
        mode: WarehouseMode,
        channel: impl Into<String>,
        plan: AllocationPlan,
    ) -> Self {
        let calculated: Vec<EditorRow> = plan
            .report
            .plan_lines
            .iter()
            .cloned()
            .map(EditorRow::selected)
            .collect();
        Self {
            task_id: task_id.into(),
            mode,
            channel: channel.into(),
            message: plan.message,
            editor: calculated.clone(),
            calculated,
            summary: plan.report.summary.clone(),
            report: Some(plan.report),
            diagnostics: Some(plan.diagnostics),
        }
    }

    /// 重新打开已保存的规划任务
    pub fn from_task(task: &ConsignmentTask) -> ApiResult<Self> {
        if !task.is_planning() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "任务 {} 不是规划任务",
                task.id
            )));
        }

        let mut rows: Vec<EditorRow> = Vec::with_capacity(task.data.len());
        for record in &task.data {
            match EditorRow::from_record(record) {
                Some(row) => rows.push(row),
                None => warn!(task_id = %task.id, "规划任务行缺少有效分区,已跳过"),
            }
        }
        sort_rows(&mut rows);

        let summary = task
            .original_data
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(summary_from_record)
            .collect();

        let mode = task
            .mode_key
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or(WarehouseMode::Single);

        Ok(Self {
            task_id: task.id.clone(),
            mode,
            channel: task.channel.clone(),
            message: String::new(),
            editor: rows.clone(),
            calculated: rows,
            summary,
            report: None,
            diagnostics: None,
        })
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn editor_rows(&self) -> &[EditorRow] {
        &self.editor
    }

    pub fn summary(&self) -> &[SkuSummaryRow] {
        &self.summary
    }

    /// 完整报表（仅新计算的会话有）
    pub fn report(&self) -> Option<&AllocationReport> {
        self.report.as_ref()
    }

    pub fn diagnostics(&self) -> Option<&PlanDiagnostics> {
        self.diagnostics.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.editor.is_empty()
    }

    pub fn zone_rows(&self, zone: Zone) -> Vec<&EditorRow> {
        self.editor.iter().filter(|r| r.line.zone == zone).collect()
    }

    pub fn selected_rows(&self) -> Vec<&EditorRow> {
        self.editor.iter().filter(|r| r.select).collect()
    }

    /// 全部分区视图: 按 (SKU, PPCN, Stock, Qty_Booked) 聚合
    ///
    /// Select 为组内全部勾选
    pub fn sku_view(&self) -> Vec<SkuEditorRow> {
        let mut groups: Vec<SkuEditorRow> = Vec::new();
        for row in &self.editor {
            let l = &row.line;
            match groups.iter_mut().find(|g| {
                g.sku == l.sku && g.ppcn == l.ppcn && g.stock == l.stock && g.booked_qty == l.booked_qty
            }) {
                Some(group) => {
                    group.select &= row.select;
                    group.required_qty += l.required_qty;
                    group.boxes += l.allocated_boxes;
                    group.qty += l.allocated_qty;
                }
                None => groups.push(SkuEditorRow {
                    select: row.select,
                    sku: l.sku.clone(),
                    ppcn: l.ppcn,
                    stock: l.stock,
                    booked_qty: l.booked_qty,
                    required_qty: l.required_qty,
                    boxes: l.allocated_boxes,
                    qty: l.allocated_qty,
                }),
            }
        }
        groups.sort_by(|a, b| sku_order(&a.sku, &b.sku));
        groups
    }

    /// 全部分区上架数量（汇总 Final_Qty）
    pub fn all_zone_quantities(&self) -> BTreeMap<String, i64> {
        all_zone_quantities(&self.summary)
    }

    /// 单分区上架数量（编辑器行 Editable Qty）
    pub fn zone_quantities(&self, zone: Zone) -> BTreeMap<String, i64> {
        zone_quantities(self.editor.iter().map(|r| &r.line), zone)
    }

    // ==========================================
    // 修订
    // ==========================================

    /// 单分区修订,返回命中行数
    pub fn apply_zone_edit(&mut self, edit: &ZoneEdit) -> usize {
        let mut touched = 0;
        for row in self
            .editor
            .iter_mut()
            .filter(|r| r.line.sku == edit.sku && r.line.zone == edit.zone)
        {
            row.select = edit.select;
            row.line.allocated_boxes = edit.boxes;
            row.line.allocated_qty = edit.qty;
            touched += 1;
        }
        debug!(sku = %edit.sku, zone = %edit.zone, rows = touched, "分区修订");
        touched
    }

    /// SKU 级修订,返回命中行数
    ///
    /// # 规则
    /// - 数量/箱数按各行现值比例缩放并四舍五入
    /// - 现值合计为 0 时全部计入首行
    pub fn apply_sku_edit(&mut self, edit: &SkuEdit) -> usize {
        let idxs: Vec<usize> = self
            .editor
            .iter()
            .enumerate()
            .filter(|(_, r)| r.line.sku == edit.sku && edit.ppcn.map_or(true, |p| r.line.ppcn == p))
            .map(|(i, _)| i)
            .collect();
        if idxs.is_empty() {
            return 0;
        }

        let current_qty: Vec<i64> = idxs.iter().map(|&i| self.editor[i].line.allocated_qty).collect();
        let current_boxes: Vec<i64> = idxs.iter().map(|&i| self.editor[i].line.allocated_boxes).collect();
        let new_qty = rescale(&current_qty, edit.qty);
        let new_boxes = rescale(&current_boxes, edit.boxes);

        for (k, &i) in idxs.iter().enumerate() {
            let row = &mut self.editor[i];
            row.select = edit.select;
            row.line.allocated_qty = new_qty[k];
            row.line.allocated_boxes = new_boxes[k];
        }
        debug!(sku = %edit.sku, rows = idxs.len(), qty = edit.qty, "SKU 修订");
        idxs.len()
    }

    /// 应用上传的修订表（需 SKU Id 列;Select / Editable Qty / Editable Boxes 可选）
    ///
    /// 数量与箱数在该 SKU 的各行间平均分配,余数依次给前几行
    pub fn apply_uploaded_edits(&mut self, table: &RawTable) -> ApiResult<usize> {
        let sku_col = table
            .column_index("SKU Id")
            .ok_or_else(|| ApiError::MissingColumn("SKU Id".to_string()))?;
        let select_col = table.column_index(SELECT_COLUMN);
        let qty_col = table.column_index("Editable Qty");
        let box_col = table.column_index("Editable Boxes");

        let mut touched = 0;
        for upload in &table.rows {
            let sku = clean_sku(cell(upload, sku_col));
            let idxs: Vec<usize> = self
                .editor
                .iter()
                .enumerate()
                .filter(|(_, r)| r.line.sku == sku)
                .map(|(i, _)| i)
                .collect();
            if idxs.is_empty() {
                continue;
            }

            if let Some(col) = select_col {
                let select = TRUTHY.contains(&cell(upload, col).trim().to_lowercase().as_str());
                for &i in &idxs {
                    self.editor[i].select = select;
                }
            }
            if let Some(q) = qty_col.and_then(|c| try_parse_f64(cell(upload, c))) {
                for (k, share) in split_evenly(q.trunc() as i64, idxs.len()).into_iter().enumerate() {
                    self.editor[idxs[k]].line.allocated_qty = share;
                }
            }
            if let Some(b) = box_col.and_then(|c| try_parse_f64(cell(upload, c))) {
                for (k, share) in split_evenly(b.trunc() as i64, idxs.len()).into_iter().enumerate() {
                    self.editor[idxs[k]].line.allocated_boxes = share;
                }
            }
            touched += idxs.len();
        }

        sort_rows(&mut self.editor);
        Ok(touched)
    }

    /// 重置为计算结果
    pub fn reset(&mut self) {
        self.editor = self.calculated.clone();
    }

    // ==========================================
    // 导出 / 保存
    // ==========================================

    /// 编辑器表导出为 CSV
    pub fn editor_csv(&self) -> ApiResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let to_api = |e: csv::Error| ApiError::ImportError(e.to_string());
        writer.write_record(EDITOR_HEADERS).map_err(to_api)?;
        for row in &self.editor {
            let l = &row.line;
            writer
                .write_record([
                    row.select.to_string(),
                    l.sku.clone(),
                    l.zone.to_string(),
                    l.required_qty.to_string(),
                    l.allocated_boxes.to_string(),
                    l.allocated_qty.to_string(),
                    l.ppcn.to_string(),
                    l.stock.to_string(),
                    l.booked_qty.to_string(),
                ])
                .map_err(to_api)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ApiError::InternalError(e.to_string()))
    }

    /// 勾选行 → 规划任务（不占用库存,默认未预约）
    pub fn to_task(&self, date: NaiveDate) -> ApiResult<ConsignmentTask> {
        let data: LedgerTable = self.selected_rows().iter().map(|r| r.to_record()).collect();
        if data.is_empty() {
            return Err(ApiError::BusinessRuleViolation("没有勾选任何行,无法保存".to_string()));
        }

        let summary = self
            .summary
            .iter()
            .map(|row| match serde_json::to_value(row) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Err(ApiError::InternalError("汇总行序列化结果不是对象".to_string())),
                Err(e) => Err(ApiError::InternalError(e.to_string())),
            })
            .collect::<ApiResult<LedgerTable>>()?;

        let mut task = ConsignmentTask::new(
            self.task_id.clone(),
            date.format("%Y-%m-%d").to_string(),
            self.channel.clone(),
            TaskType::Planning,
        );
        task.data = data;
        task.original_data = Some(summary);
        task.mode_key = Some(self.mode.as_str().to_string());
        Ok(task)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        other => TRUTHY.contains(&value_to_text(other).trim().to_lowercase().as_str()),
    }
}

fn sort_rows(rows: &mut [EditorRow]) {
    rows.sort_by(|a, b| sku_order(&a.line.sku, &b.line.sku));
}

/// 按现值比例缩放到 target（四舍五入）;现值合计为 0 时全部给首项、其余为 0
fn rescale(current: &[i64], target: i64) -> Vec<i64> {
    let total: i64 = current.iter().sum();
    if total > 0 {
        let factor = target as f64 / total as f64;
        current
            .iter()
            .map(|&v| (v as f64 * factor).round() as i64)
            .collect()
    } else {
        let mut out = vec![0; current.len()];
        if let Some(first) = out.first_mut() {
            *first = target;
        }
        out
    }
}

/// 平均分配,余数依次给前几项
fn split_evenly(total: i64, parts: usize) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }
    let n = parts as i64;
    let per = total.div_euclid(n);
    let remainder = total - per * n;
    (0..n).map(|k| if k < remainder { per + 1 } else { per }).collect()
}

fn summary_from_record(row: &TableRow) -> SkuSummaryRow {
    let int = |key: &str| row.get(key).map(coerce_value_i64).unwrap_or(0);
    let float = |key: &str| row.get(key).map(coerce_value_f64).unwrap_or(0.0);
    SkuSummaryRow {
        sku: row.get("SKU").map(clean_sku_value).unwrap_or_default(),
        sales: float("Sales_30"),
        stock: int("FBF_Qty"),
        booked_qty: int("Qty_Booked"),
        needed_qty: float("Needed_Qty"),
        boxes: int("Boxes"),
        final_qty: int("Final_Qty"),
        ppcn: int("PPCN"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(sku: &str, zone: Zone, boxes: i64, ppcn: i64) -> SkuPlanLine {
        SkuPlanLine {
            sku: sku.to_string(),
            zone,
            required_qty: 100.0,
            allocated_boxes: boxes,
            allocated_qty: boxes * ppcn,
            ppcn,
            stock: 10,
            booked_qty: 0,
        }
    }

    fn session() -> PlanningSession {
        let plan_lines = vec![
            line("KBRV-1", Zone::South, 3, 16),
            line("KBRV-1", Zone::West, 2, 16),
            line("kbrv-2", Zone::North, 1, 12),
        ];
        let rows: Vec<EditorRow> = plan_lines.into_iter().map(EditorRow::selected).collect();
        PlanningSession {
            task_id: "TASK_1".to_string(),
            mode: WarehouseMode::Single,
            channel: "Flipkart".to_string(),
            message: "Success".to_string(),
            editor: rows.clone(),
            calculated: rows,
            summary: vec![SkuSummaryRow {
                sku: "KBRV-1".to_string(),
                sales: 120.0,
                stock: 10,
                booked_qty: 0,
                needed_qty: 110.0,
                boxes: 5,
                final_qty: 80,
                ppcn: 16,
            }],
            report: None,
            diagnostics: None,
        }
    }

    #[test]
    fn test_sku_edit_rescales_proportionally() {
        let mut s = session();
        let touched = s.apply_sku_edit(&SkuEdit {
            sku: "KBRV-1".to_string(),
            ppcn: Some(16),
            select: true,
            boxes: 10,
            qty: 160,
        });
        assert_eq!(touched, 2);
        assert_eq!(s.editor_rows()[0].line.allocated_qty, 96);
        assert_eq!(s.editor_rows()[1].line.allocated_qty, 64);
        assert_eq!(s.editor_rows()[0].line.allocated_boxes, 6);
        assert_eq!(s.editor_rows()[1].line.allocated_boxes, 4);

        let view = s.sku_view();
        assert_eq!(view[0].qty, 160);
        assert_eq!(view[1].sku, "kbrv-2");
    }

    #[test]
    fn test_sku_edit_on_zero_rows_goes_to_first() {
        assert_eq!(rescale(&[0, 0, 0], 7), vec![7, 0, 0]);
        assert_eq!(split_evenly(7, 3), vec![3, 2, 2]);
    }

    #[test]
    fn test_zone_edit_and_reset() {
        let mut s = session();
        let touched = s.apply_zone_edit(&ZoneEdit {
            sku: "KBRV-1".to_string(),
            zone: Zone::West,
            select: false,
            boxes: 4,
            qty: 64,
        });
        assert_eq!(touched, 1);
        assert_eq!(s.selected_rows().len(), 2);
        assert_eq!(s.zone_quantities(Zone::West)["KBRV-1"], 64);

        s.reset();
        assert_eq!(s.selected_rows().len(), 3);
        assert_eq!(s.zone_quantities(Zone::West)["KBRV-1"], 32);
    }

    #[test]
    fn test_uploaded_edits_split_evenly() {
        let mut s = session();
        let upload = RawTable::new(
            vec!["SKU Id".into(), "Select".into(), "Editable Qty".into()],
            vec![
                vec!["KBRV-1".into(), "yes".into(), "33".into()],
                vec!["kbrv-2".into(), "no".into(), "x".into()],
            ],
        );
        let touched = s.apply_uploaded_edits(&upload).unwrap();
        assert_eq!(touched, 3);
        assert_eq!(s.editor_rows()[0].line.allocated_qty, 17);
        assert_eq!(s.editor_rows()[1].line.allocated_qty, 16);
        assert!(!s.editor_rows()[2].select);
        assert_eq!(s.editor_rows()[2].line.allocated_qty, 12);

        let missing = RawTable::new(vec!["SKU".into()], vec![]);
        assert!(matches!(
            s.apply_uploaded_edits(&missing),
            Err(ApiError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_save_and_reopen_planning_task() {
        let mut s = session();
        s.apply_zone_edit(&ZoneEdit {
            sku: "kbrv-2".to_string(),
            zone: Zone::North,
            select: false,
            boxes: 1,
            qty: 12,
        });
        let task = s.to_task(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()).unwrap();
        assert!(task.is_planning());
        assert!(!task.is_booked);
        assert_eq!(task.data.len(), 2);
        assert_eq!(task.mode_key.as_deref(), Some("single"));
        assert_eq!(task.data[0]["Select"], Value::Bool(true));

        let reopened = PlanningSession::from_task(&task).unwrap();
        assert_eq!(reopened.editor_rows().len(), 2);
        assert_eq!(reopened.editor_rows()[0].line, s.editor_rows()[0].line);
        assert_eq!(reopened.summary(), s.summary());
        assert_eq!(reopened.all_zone_quantities()["KBRV-1"], 80);
    }

    #[test]
    fn test_nothing_selected_cannot_be_saved() {
        let mut s = session();
        for sku in ["KBRV-1", "kbrv-2"] {
            s.apply_sku_edit(&SkuEdit {
                sku: sku.to_string(),
                ppcn: None,
                select: false,
                boxes: 0,
                qty: 0,
            });
        }
        assert!(matches!(
            s.to_task(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()),
            Err(ApiError::BusinessRuleViolation(_))
        ));
    }

    #[test]
    fn test_editor_csv_header() {
        let csv = session().editor_csv().unwrap();
        assert!(csv.starts_with("Select,SKU Id,Zone,Required Qty,Editable Boxes"));
        assert_eq!(csv.lines().count(), 4);
    }
}
