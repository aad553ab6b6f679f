// ==========================================
// 电商仓储补货系统 - 文档存储
// ==========================================
// 职责: 以文件名为键的二进制文档存取（台账 JSON / 参考 CSV）
// 实现: SQLite（document_store 表）/ 内存
// 红线: 整文档替换,单条 UPSERT 完成,读者不会看到半写状态
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// DocumentStore Trait
// ==========================================
pub trait DocumentStore: Send + Sync {
    /// 读取文档（不存在返回 None）
    fn get(&self, name: &str) -> RepositoryResult<Option<Vec<u8>>>;

    /// 写入文档（存在则整体替换）
    fn put(&self, name: &str, content: &[u8]) -> RepositoryResult<()>;

    /// 文档是否存在
    fn exists(&self, name: &str) -> RepositoryResult<bool>;

    /// 删除文档（返回是否确有删除）
    fn delete(&self, name: &str) -> RepositoryResult<bool>;

    /// 列出全部文档名（升序）
    fn list(&self) -> RepositoryResult<Vec<String>>;
}

// ==========================================
// SqliteDocumentStore
// ==========================================
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, name: &str) -> RepositoryResult<Option<Vec<u8>>> {
        let conn = self.get_conn()?;
        let content = conn
            .query_row(
                "SELECT content FROM document_store WHERE name = ?1",
                params![name],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(content)
    }

    fn put(&self, name: &str, content: &[u8]) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO document_store (name, content, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(name) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at
            "#,
            params![name, content],
        )?;
        tracing::debug!(document = name, bytes = content.len(), "文档已写入");
        Ok(())
    }

    fn exists(&self, name: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM document_store WHERE name = ?1",
                params![name],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    fn delete(&self, name: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM document_store WHERE name = ?1", params![name])?;
        Ok(rows > 0)
    }

    fn list(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT name FROM document_store ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

// ==========================================
// InMemoryDocumentStore
// ==========================================
#[derive(Default)]
pub struct InMemoryDocumentStore {
    docs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn docs(&self) -> RepositoryResult<std::sync::MutexGuard<BTreeMap<String, Vec<u8>>>> {
        self.docs
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, name: &str) -> RepositoryResult<Option<Vec<u8>>> {
        Ok(self.docs()?.get(name).cloned())
    }

    fn put(&self, name: &str, content: &[u8]) -> RepositoryResult<()> {
        self.docs()?.insert(name.to_string(), content.to_vec());
        Ok(())
    }

    fn exists(&self, name: &str) -> RepositoryResult<bool> {
        Ok(self.docs()?.contains_key(name))
    }

    fn delete(&self, name: &str) -> RepositoryResult<bool> {
        Ok(self.docs()?.remove(name).is_some())
    }

    fn list(&self) -> RepositoryResult<Vec<String>> {
        Ok(self.docs()?.keys().cloned().collect())
    }
}
