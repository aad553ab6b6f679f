// ==========================================
// 电商仓储补货系统 - 参考表仓储
// ==========================================
// 存储: 文档存储中的 CSV 文档
// - active_listing_single.csv / active_listing_multi.csv: 上架模板（含 PPCN 覆盖）
// - master_data.csv: 主数据（SKU / PPCN / EAN / FSN ...）
// 红线: 文档缺失视为空表;主数据必须含 PPCN 列才允许写入
// ==========================================

use crate::domain::types::WarehouseMode;
use crate::engine::box_calculator::{PpcnSources, PpcnTable};
use crate::importer::file_parser::{CsvParser, RawTable};
use crate::repository::document_store::DocumentStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::sync::Arc;
use tracing::{info, warn};

pub const TEMPLATE_SINGLE_DOCUMENT: &str = "active_listing_single.csv";
pub const TEMPLATE_MULTI_DOCUMENT: &str = "active_listing_multi.csv";
pub const MASTER_DOCUMENT: &str = "master_data.csv";

/// 模式对应的模板文档名
pub fn template_document(mode: WarehouseMode) -> &'static str {
    match mode {
        WarehouseMode::Single => TEMPLATE_SINGLE_DOCUMENT,
        WarehouseMode::Multi => TEMPLATE_MULTI_DOCUMENT,
    }
}

// ==========================================
// ReferenceRepository
// ==========================================
pub struct ReferenceRepository {
    store: Arc<dyn DocumentStore>,
}

impl ReferenceRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 读取上架模板
    pub fn load_template(&self, mode: WarehouseMode) -> RepositoryResult<RawTable> {
        self.load_table(template_document(mode))
    }

    /// 读取主数据
    pub fn load_master(&self) -> RepositoryResult<RawTable> {
        self.load_table(MASTER_DOCUMENT)
    }

    /// 写入上架模板（必须是可解析的 CSV）
    pub fn save_template(&self, mode: WarehouseMode, content: &[u8]) -> RepositoryResult<RawTable> {
        let name = template_document(mode);
        let table = parse_document(name, content)?;
        if table.column_index("SKU").is_none() {
            return Err(parse_failure(name, "缺少 SKU 列"));
        }
        self.store.put(name, content)?;
        info!(document = name, rows = table.rows.len(), columns = table.column_count(), "上架模板已更新");
        Ok(table)
    }

    /// 写入主数据（必须含 PPCN 列）
    pub fn save_master(&self, content: &[u8]) -> RepositoryResult<RawTable> {
        let table = parse_document(MASTER_DOCUMENT, content)?;
        if table.column_index("PPCN").is_none() {
            return Err(parse_failure(MASTER_DOCUMENT, "Column 'PPCN' missing."));
        }
        self.store.put(MASTER_DOCUMENT, content)?;
        info!(rows = table.rows.len(), "主数据已同步");
        Ok(table)
    }

    /// 组装 PPCN 查找链（模式模板 + 主数据 + 默认值）
    ///
    /// # 参数
    /// - mode: 仓库模式,决定使用哪份模板
    /// - default_ppcn: 两表均无数值时的默认值
    pub fn ppcn_sources(&self, mode: WarehouseMode, default_ppcn: i64) -> RepositoryResult<PpcnSources> {
        let template = PpcnTable::from_table(&self.load_template(mode)?);
        let master = PpcnTable::from_table(&self.load_master()?);
        if master.is_empty() {
            warn!("主数据为空,PPCN 仅取模板或默认值");
        }
        Ok(PpcnSources {
            template,
            master,
            default_ppcn,
        })
    }

    fn load_table(&self, name: &str) -> RepositoryResult<RawTable> {
        match self.store.get(name)? {
            Some(bytes) => parse_document(name, &bytes),
            None => Ok(RawTable::default()),
        }
    }
}

fn parse_document(name: &str, content: &[u8]) -> RepositoryResult<RawTable> {
    CsvParser
        .parse_bytes(content)
        .map_err(|e| parse_failure(name, &e.to_string()))
}

fn parse_failure(name: &str, message: &str) -> RepositoryError {
    RepositoryError::DocumentParseError {
        document: name.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::document_store::InMemoryDocumentStore;

    fn repo() -> ReferenceRepository {
        ReferenceRepository::new(Arc::new(InMemoryDocumentStore::new()))
    }

    #[test]
    fn test_missing_documents_are_empty_tables() {
        let repo = repo();
        assert!(repo.load_master().unwrap().is_empty());
        assert!(repo.load_template(WarehouseMode::Multi).unwrap().is_empty());

        let sources = repo.ppcn_sources(WarehouseMode::Single, 16).unwrap();
        assert_eq!(sources.resolve("KBRV-1"), 16);
    }

    #[test]
    fn test_master_overrides_mode_template() {
        let repo = repo();
        repo.save_template(WarehouseMode::Single, b"SKU,PPCN\nKBRV-1,12\nKBRV-2,8\n")
            .unwrap();
        repo.save_template(WarehouseMode::Multi, b"SKU,PPCN\nKBRV-1,24\n")
            .unwrap();
        repo.save_master(b"SKU,PPCN,EAN\nKBRV-1,10,890\nKBRV-3,abc,891\n")
            .unwrap();

        let single = repo.ppcn_sources(WarehouseMode::Single, 16).unwrap();
        assert_eq!(single.resolve("KBRV-1"), 10);
        assert_eq!(single.resolve("KBRV-2"), 8);
        assert_eq!(single.resolve("KBRV-3"), 16);

        let multi = repo.ppcn_sources(WarehouseMode::Multi, 20).unwrap();
        assert_eq!(multi.resolve("KBRV-2"), 20);
    }

    #[test]
    fn test_master_without_ppcn_is_rejected() {
        let repo = repo();
        let err = repo.save_master(b"SKU,EAN\nKBRV-1,890\n").unwrap_err();
        assert!(matches!(err, RepositoryError::DocumentParseError { .. }));
        assert!(repo.load_master().unwrap().is_empty());
    }
}
