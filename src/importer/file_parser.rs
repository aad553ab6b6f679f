// ==========================================
// 电商仓储补货系统 - 表格文件解析器
// ==========================================
// 支持: Excel (.xlsx) / CSV (.csv),来源可以是路径或内存字节
// 输出: RawTable（表头已去空白,单元格均为文本,空白行已跳过）
// ==========================================

use crate::domain::consignment::{table_headers, TableRow};
use crate::importer::data_cleaner::{try_parse_f64, value_to_text};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{Reader, Xlsx};
use csv::ReaderBuilder;
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;

// ==========================================
// RawTable - 原始表格
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// 由 JSON 记录表构造（列顺序按首次出现）
    pub fn from_records(records: &[TableRow]) -> Self {
        let headers = table_headers(records);
        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| record.get(h).map(value_to_text).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }

    /// 转为 JSON 记录表（单元格保持文本）
    pub fn to_records(&self) -> Vec<TableRow> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(idx, h)| (h.clone(), Value::String(cell(row, idx).to_string())))
                    .collect()
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// 按表头名查找列位置（完全匹配）
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// 读取单元格（越界返回空串）
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows.get(row).map(|r| cell(r, col)).unwrap_or("")
    }

    /// 数值列判定: 至少一个非空单元格,且所有非空单元格都可解析为数值
    pub fn is_numeric_column(&self, col: usize) -> bool {
        let mut seen = false;
        for row in &self.rows {
            let value = cell(row, col).trim();
            if value.is_empty() {
                continue;
            }
            if try_parse_f64(value).is_none() {
                return false;
            }
            seen = true;
        }
        seen
    }
}

/// 行内单元格（越界返回空串）
pub fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

// ==========================================
// CSV Parser
// ==========================================
pub struct CsvParser;

impl CsvParser {
    pub fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(normalize_header)
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();

            // 跳过完全空白的行
            if row.iter().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(row);
        }

        Ok(RawTable { headers, rows })
    }
}

// ==========================================
// Excel Parser
// ==========================================
pub struct ExcelParser {
    /// 优先读取的工作表（不存在时回退到第一个工作表）
    pub preferred_sheet: Option<String>,
}

impl ExcelParser {
    pub fn new(preferred_sheet: Option<String>) -> Self {
        Self { preferred_sheet }
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<RawTable> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = match &self.preferred_sheet {
            Some(preferred) if sheet_names.iter().any(|s| s == preferred) => preferred.clone(),
            _ => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut rows_iter = range.rows();
        let header_row = match rows_iter.next() {
            Some(row) => row,
            None => return Ok(RawTable::default()),
        };
        let headers: Vec<String> = header_row
            .iter()
            .map(|c| normalize_header(&c.to_string()))
            .collect();

        let mut rows = Vec::new();
        for data_row in rows_iter {
            let row: Vec<String> = data_row
                .iter()
                .map(|c| c.to_string().trim().to_string())
                .collect();
            if row.iter().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(row);
        }

        tracing::debug!(sheet = %sheet_name, rows = rows.len(), "Excel 工作表已读取");
        Ok(RawTable { headers, rows })
    }
}

// ==========================================
// 通用解析器（根据扩展名自动选择）
// ==========================================
#[derive(Default)]
pub struct UniversalFileParser {
    pub preferred_sheet: Option<String>,
}

impl UniversalFileParser {
    pub fn new(preferred_sheet: Option<String>) -> Self {
        Self { preferred_sheet }
    }

    /// 从文件路径解析
    pub fn parse_path<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<RawTable> {
        let path = file_path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.parse_bytes(&bytes, &file_name)
    }

    /// 从内存字节解析（file_name 仅用于判断格式）
    pub fn parse_bytes(&self, bytes: &[u8], file_name: &str) -> ImportResult<RawTable> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_bytes(bytes),
            "xlsx" => ExcelParser::new(self.preferred_sheet.clone()).parse_bytes(bytes),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}
