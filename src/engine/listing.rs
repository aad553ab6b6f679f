// ==========================================
// 电商仓储补货系统 - 上架清单导出
// ==========================================
// 职责: 按上架模板生成补货上架清单,并按数量上限拆分
// 模板: 至少 16 列,含 "SKU" 列;第 15 列写数量,第 16 列写标准成本
// ==========================================

use crate::domain::records::{SkuPlanLine, SkuSummaryRow};
use crate::domain::types::Zone;
use crate::engine::report::sku_order;
use crate::importer::column_resolver::LOGICAL_SKU;
use crate::importer::data_cleaner::{clean_sku, coerce_i64};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{cell, RawTable};
use std::collections::BTreeMap;
use tracing::debug;

/// 数量列位置（O 列）
pub const LISTING_QTY_COLUMN: usize = 14;
/// 成本列位置（P 列）
pub const LISTING_COST_COLUMN: usize = 15;
pub const MIN_TEMPLATE_COLUMNS: usize = 16;

pub const DEFAULT_STANDARD_COST: i64 = 350;
pub const DEFAULT_LISTING_QTY_LIMIT: i64 = 4999;

/// 全部分区: SKU → 汇总 Final_Qty（负数按 0）
pub fn all_zone_quantities(summary: &[SkuSummaryRow]) -> BTreeMap<String, i64> {
    summary
        .iter()
        .map(|row| (row.sku.clone(), row.final_qty.max(0)))
        .collect()
}

/// 单个分区: SKU → 该分区明细行数量合计（负数按 0）
pub fn zone_quantities<'a, I>(lines: I, zone: Zone) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = &'a SkuPlanLine>,
{
    let mut quantities: BTreeMap<String, i64> = BTreeMap::new();
    for line in lines.into_iter().filter(|l| l.zone == zone) {
        *quantities.entry(line.sku.clone()).or_insert(0) += line.allocated_qty;
    }
    for qty in quantities.values_mut() {
        *qty = (*qty).max(0);
    }
    quantities
}

/// 生成上架清单
///
/// # 规则
/// - 只保留模板中需要补货的 SKU 行
/// - 按 SKU 排序（忽略大小写,同 SKU 保持模板顺序）
/// - 写入数量与标准成本后,丢弃数量为 0 的行
pub fn build_active_listing(
    template: &RawTable,
    sku_qty: &BTreeMap<String, i64>,
    standard_cost: i64,
) -> ImportResult<RawTable> {
    if template.is_empty() {
        return Err(ImportError::InvalidTemplate("模板为空".to_string()));
    }
    if template.column_count() < MIN_TEMPLATE_COLUMNS {
        return Err(ImportError::InvalidTemplate(format!(
            "模板至少需要 {} 列,实际 {} 列",
            MIN_TEMPLATE_COLUMNS,
            template.column_count()
        )));
    }
    let sku_col = template
        .column_index("SKU")
        .ok_or_else(|| ImportError::MissingColumn {
            logical: LOGICAL_SKU.to_string(),
        })?;

    let mut rows: Vec<(String, Vec<String>)> = template
        .rows
        .iter()
        .filter_map(|row| {
            let sku = clean_sku(cell(row, sku_col));
            let qty = sku_qty.get(&sku).copied()?;
            if qty <= 0 {
                return None;
            }
            let mut out: Vec<String> = (0..template.column_count())
                .map(|idx| cell(row, idx).to_string())
                .collect();
            out[LISTING_QTY_COLUMN] = qty.to_string();
            out[LISTING_COST_COLUMN] = standard_cost.to_string();
            Some((sku, out))
        })
        .collect();

    rows.sort_by(|a, b| sku_order(&a.0, &b.0));
    debug!(rows = rows.len(), "上架清单已生成");

    Ok(RawTable::new(
        template.headers.clone(),
        rows.into_iter().map(|(_, row)| row).collect(),
    ))
}

/// 按数量上限拆分（单行超限自成一块）
pub fn split_by_quantity_limit(table: &RawTable, qty_col: usize, limit: i64) -> Vec<RawTable> {
    let mut chunks: Vec<Vec<Vec<String>>> = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();
    let mut current_sum = 0i64;

    for row in &table.rows {
        let qty = coerce_i64(cell(row, qty_col));
        if qty > limit {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_sum = 0;
            }
            chunks.push(vec![row.clone()]);
            continue;
        }
        if current_sum + qty > limit {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.push(row.clone());
            current_sum = qty;
        } else {
            current.push(row.clone());
            current_sum += qty;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .map(|rows| RawTable::new(table.headers.clone(), rows))
        .collect()
}

/// 表格写为 CSV 文本
pub fn table_to_csv(table: &RawTable) -> ImportResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ImportError::ExportError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ImportError::ExportError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(skus: &[&str]) -> RawTable {
        let mut headers: Vec<String> = (0..16).map(|i| format!("C{}", i)).collect();
        headers[0] = "SKU".to_string();
        let rows = skus
            .iter()
            .map(|sku| {
                let mut row = vec![String::new(); 16];
                row[0] = sku.to_string();
                row
            })
            .collect();
        RawTable::new(headers, rows)
    }

    #[test]
    fn test_build_active_listing() {
        let tpl = template(&["KBRV-2", "KBRV-1", "KBRV-3", "KBRV-9"]);
        let qty: BTreeMap<String, i64> = [
            ("KBRV-1".to_string(), 32),
            ("KBRV-2".to_string(), 16),
            ("KBRV-3".to_string(), 0),
        ]
        .into_iter()
        .collect();

        let listing = build_active_listing(&tpl, &qty, DEFAULT_STANDARD_COST).unwrap();
        assert_eq!(listing.rows.len(), 2);
        assert_eq!(listing.cell(0, 0), "KBRV-1");
        assert_eq!(listing.cell(0, LISTING_QTY_COLUMN), "32");
        assert_eq!(listing.cell(1, LISTING_COST_COLUMN), "350");
    }

    #[test]
    fn test_narrow_template_rejected() {
        let tpl = RawTable::new(vec!["SKU".into()], vec![vec!["KBRV-1".into()]]);
        let result = build_active_listing(&tpl, &BTreeMap::new(), 350);
        assert!(matches!(result, Err(ImportError::InvalidTemplate(_))));
    }

    #[test]
    fn test_split_by_quantity_limit() {
        let table = RawTable::new(
            vec!["SKU".into(), "Q".into()],
            [("A", "3000"), ("B", "1999"), ("C", "1"), ("D", "6000"), ("E", "10")]
                .iter()
                .map(|(s, q)| vec![s.to_string(), q.to_string()])
                .collect(),
        );
        let chunks = split_by_quantity_limit(&table, 1, 4999);
        let skus: Vec<Vec<&str>> = chunks
            .iter()
            .map(|c| c.rows.iter().map(|r| r[0].as_str()).collect())
            .collect();
        assert_eq!(skus, vec![vec!["A", "B"], vec!["C"], vec!["D"], vec!["E"]]);
    }

    #[test]
    fn test_zone_quantities_sum_per_sku() {
        let line = |sku: &str, zone: Zone, qty: i64| SkuPlanLine {
            sku: sku.to_string(),
            zone,
            required_qty: 0.0,
            allocated_boxes: qty / 16,
            allocated_qty: qty,
            ppcn: 16,
            stock: 0,
            booked_qty: 0,
        };
        let lines = vec![
            line("KBRV-1", Zone::South, 32),
            line("KBRV-1", Zone::South, 16),
            line("KBRV-1", Zone::West, 16),
        ];
        let south = zone_quantities(&lines, Zone::South);
        assert_eq!(south.get("KBRV-1"), Some(&48));
        assert!(zone_quantities(&lines, Zone::North).is_empty());
    }
}
