// ==========================================
// 电商仓储补货系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 缺列为致命错误（必须指明逻辑列名）,其余异常就地降级为 0
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 列解析错误 =====
    #[error("缺少必需列: {logical}（所有匹配规则均未命中）")]
    MissingColumn { logical: String },

    #[error("列匹配规则无效 ({logical}): {message}")]
    InvalidRule { logical: String, message: String },

    #[error("SKU 匹配模式无效: {0}")]
    InvalidSkuPattern(String),

    #[error("参考模板无效: {0}")]
    InvalidTemplate(String),

    // ===== 导出错误 =====
    #[error("报表导出失败: {0}")]
    ExportError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::XlsxError>
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<regex::Error>
impl From<regex::Error> for ImportError {
    fn from(err: regex::Error) -> Self {
        ImportError::InvalidSkuPattern(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
