// ==========================================
// 电商仓储补货系统 - 数据清洗器
// ==========================================
// 职责: SKU 规范化 / 数值强制转换 / 日期宽松解析
// 红线: "失败按 0 处理" 必须走这里的显式函数,不允许散落的吞错
// 红线: SKU 规范化必须幂等
// ==========================================

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

const SKU_MARKER: &str = "SKU:";

/// 日期格式（按优先级）
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%d-%b-%Y", "%d %b %Y", "%Y%m%d",
];

/// 日期时间格式（按优先级）
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

// ==========================================
// SKU 规范化
// ==========================================

/// 规范化 SKU
///
/// # 规则
/// 1. 去掉所有单/双引号
/// 2. 去首尾空白
/// 3. 去掉前缀 "SKU:"（忽略大小写,可重复出现）
/// 4. 再次去首尾空白
///
/// 幂等: clean_sku(clean_sku(x)) == clean_sku(x)
pub fn clean_sku(value: &str) -> String {
    let unquoted: String = value.chars().filter(|c| *c != '"' && *c != '\'').collect();
    let mut rest = unquoted.trim();
    while rest.len() >= SKU_MARKER.len()
        && rest.is_char_boundary(SKU_MARKER.len())
        && rest[..SKU_MARKER.len()].eq_ignore_ascii_case(SKU_MARKER)
    {
        rest = rest[SKU_MARKER.len()..].trim();
    }
    rest.to_string()
}

/// 规范化 JSON 单元格中的 SKU（非字符串先转文本）
pub fn clean_sku_value(value: &Value) -> String {
    clean_sku(&value_to_text(value))
}

/// JSON 值转文本（null → 空串）
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

// ==========================================
// 数值强制转换
// ==========================================

/// 文本 → f64（空白/非数值/NaN/无穷 → 0.0）
pub fn coerce_f64(value: &str) -> f64 {
    try_parse_f64(value).unwrap_or(0.0)
}

/// 文本 → i64（先按 f64 解析,向零截断）
pub fn coerce_i64(value: &str) -> i64 {
    coerce_f64(value).trunc() as i64
}

/// JSON 单元格 → f64（规则同 coerce_f64）
pub fn coerce_value_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => coerce_f64(s),
        _ => 0.0,
    }
}

/// JSON 单元格 → i64（向零截断）
pub fn coerce_value_i64(value: &Value) -> i64 {
    coerce_value_f64(value).trunc() as i64
}

/// f64 → JSON 数值（整数值写成整数,非有限值写成 null）
pub fn number_value(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Value::from(value as i64);
    }
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// 文本是否可解析为有限数值
pub fn try_parse_f64(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

// ==========================================
// 日期解析
// ==========================================

/// 宽松解析日期（日期 / 日期时间 / RFC3339）,失败返回 None
pub fn parse_flexible_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}
