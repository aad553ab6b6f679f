// ==========================================
// 电商仓储补货系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,把导入/仓储错误转换为用户可读的消息
// 红线: 错误信息必须包含显式原因（逻辑列名 / 任务 ID）
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("任务 ID 已存在: {0}")]
    DuplicateTaskId(String),

    #[error("任务没有可撤销的编辑: {0}")]
    NothingToUndo(String),

    // ==========================================
    // 导入错误
    // ==========================================
    /// 逻辑列无法解析（整次规划失败）
    #[error("缺少必需列: {0}")]
    MissingColumn(String),

    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::DuplicateId(id) => ApiError::DuplicateTaskId(id),
            RepositoryError::SerializationError(msg) => ApiError::InternalError(msg),
            RepositoryError::DocumentParseError { document, message } => {
                ApiError::ValidationError(format!("{}: {}", document, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MissingColumn { logical } => ApiError::MissingColumn(logical),
            ImportError::InvalidRule { .. }
            | ImportError::InvalidSkuPattern(_)
            | ImportError::InvalidTemplate(_) => ApiError::ValidationError(err.to_string()),
            ImportError::Other(err) => ApiError::Other(err),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_keeps_logical_name() {
        let err: ApiError = ImportError::MissingColumn {
            logical: "region".to_string(),
        }
        .into();
        assert!(matches!(&err, ApiError::MissingColumn(name) if name == "region"));
        assert!(err.to_string().contains("region"));
    }

    #[test]
    fn test_ledger_errors_map_to_business_errors() {
        let dup: ApiError = RepositoryError::DuplicateId("C-1".to_string()).into();
        assert!(matches!(dup, ApiError::DuplicateTaskId(_)));

        let missing: ApiError = RepositoryError::NotFound {
            entity: "ConsignmentTask".to_string(),
            id: "C-9".to_string(),
        }
        .into();
        assert!(missing.to_string().contains("C-9"));
    }
}
