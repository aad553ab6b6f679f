// ==========================================
// 电商仓储补货系统 - 历史台账仓储
// ==========================================
// 存储: 文档存储中的 consignment_history.json（任务数组）
// 红线: Repository 不做业务逻辑,只做读写映射
// 红线: 写入为整文档替换（后写者胜）
// ==========================================

use crate::domain::consignment::ConsignmentTask;
use crate::repository::document_store::DocumentStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// 台账文档名
pub const HISTORY_DOCUMENT: &str = "consignment_history.json";

// ==========================================
// HistoryRepository
// ==========================================
pub struct HistoryRepository {
    store: Arc<dyn DocumentStore>,
}

impl HistoryRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 读取台账快照（文档不存在视为空台账）
    ///
    /// # 返回
    /// - Ok(Vec<ConsignmentTask>): 已补齐缺省值的任务列表
    /// - Err(DocumentParseError): 文档不是 JSON 数组（不静默清空,防止回写覆盖）
    pub fn load(&self) -> RepositoryResult<Vec<ConsignmentTask>> {
        let Some(bytes) = self.store.get(HISTORY_DOCUMENT)? else {
            return Ok(Vec::new());
        };

        let parse_error = |message: String| RepositoryError::DocumentParseError {
            document: HISTORY_DOCUMENT.to_string(),
            message,
        };

        let raw: Value = serde_json::from_slice(&bytes).map_err(|e| parse_error(e.to_string()))?;
        let Value::Array(entries) = raw else {
            return Err(parse_error("台账根节点不是数组".to_string()));
        };

        // 条目无法解析即整体失败,避免下次写回时丢失
        let mut tasks = Vec::with_capacity(entries.len());
        for (idx, entry) in entries.into_iter().enumerate() {
            if !entry.is_object() {
                warn!(index = idx, "台账条目不是对象");
                return Err(parse_error(format!("第 {} 条不是对象", idx)));
            }
            let task = serde_json::from_value::<ConsignmentTask>(entry).map_err(|e| {
                warn!(index = idx, error = %e, "台账条目解析失败");
                parse_error(format!("第 {} 条: {}", idx, e))
            })?;
            tasks.push(task);
        }
        Ok(tasks)
    }

    /// 整体写回台账
    pub fn save(&self, tasks: &[ConsignmentTask]) -> RepositoryResult<()> {
        let bytes = serde_json::to_vec(tasks)?;
        self.store.put(HISTORY_DOCUMENT, &bytes)?;
        info!(tasks = tasks.len(), "台账已保存");
        Ok(())
    }

    /// 按 ID 查找
    pub fn find(&self, id: &str) -> RepositoryResult<Option<ConsignmentTask>> {
        Ok(self.load()?.into_iter().find(|t| t.id == id))
    }

    /// 追加任务（ID 重复时拒绝）
    pub fn append(&self, task: ConsignmentTask) -> RepositoryResult<()> {
        let mut tasks = self.load()?;
        if tasks.iter().any(|t| t.id == task.id) {
            return Err(RepositoryError::DuplicateId(task.id));
        }
        tasks.push(task);
        self.save(&tasks)
    }

    /// 替换同 ID 任务
    pub fn replace(&self, task: ConsignmentTask) -> RepositoryResult<()> {
        let mut tasks = self.load()?;
        let slot = tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| not_found(&task.id))?;
        *slot = task;
        self.save(&tasks)
    }

    /// 删除任务并重写台账
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let mut tasks = self.load()?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(not_found(id));
        }
        self.save(&tasks)
    }
}

fn not_found(id: &str) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "ConsignmentTask".to_string(),
        id: id.to_string(),
    }
}
