// ==========================================
// 电商仓储补货系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 文档存储 / 历史台账 / 参考表,屏蔽存储细节
// 约束: 所有查询使用参数化
// ==========================================

pub mod document_store;
pub mod error;
pub mod history_repo;
pub mod reference_repo;

// 重导出核心仓储
pub use document_store::{DocumentStore, InMemoryDocumentStore, SqliteDocumentStore};
pub use error::{RepositoryError, RepositoryResult};
pub use history_repo::{HistoryRepository, HISTORY_DOCUMENT};
pub use reference_repo::{
    template_document, ReferenceRepository, MASTER_DOCUMENT, TEMPLATE_MULTI_DOCUMENT,
    TEMPLATE_SINGLE_DOCUMENT,
};
