//! 执行历史：只追加的命令执行记录
//!
//! 每次成功分发追加一条 HistoryEntry；条目创建后不可修改、不可删除，顺序即插入顺序。
//! Prompt 只取尾部窗口（history_size / summary_window）。

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::dispatch::Parameters;

/// 由实现返回结果的 `status` 字段推导出的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Failed,
}

impl EntryStatus {
    /// `status` 为 "success" 或 "accepted" 视为成功，其余（包括缺失）均为失败
    pub fn from_result(result: &Value) -> Self {
        match result.get("status").and_then(Value::as_str) {
            Some("success") | Some("accepted") => EntryStatus::Success,
            _ => EntryStatus::Failed,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, EntryStatus::Success)
    }
}

/// 单次命令尝试的记录
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub command_id: i64,
    pub command_name: String,
    pub parameters: Parameters,
    pub result: Value,
    pub status: EntryStatus,
    /// 调用方给出的决策理由
    pub context: String,
}

impl HistoryEntry {
    pub fn new(
        command_id: i64,
        command_name: impl Into<String>,
        parameters: Parameters,
        result: Value,
        context: impl Into<String>,
    ) -> Self {
        let status = EntryStatus::from_result(&result);
        Self {
            timestamp: Utc::now(),
            command_id,
            command_name: command_name.into(),
            parameters,
            result,
            status,
            context: context.into(),
        }
    }

    /// 便捷读取某个参数
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// 便捷读取实现结果中的字段
    pub fn result_field(&self, name: &str) -> Option<&Value> {
        self.result.get(name)
    }
}

/// 只追加的执行历史；追加入口仅对 crate 内部开放（由 LlmProcessor 在分发成功后调用）
#[derive(Debug, Clone, Default)]
pub struct ExecutionHistory {
    entries: Vec<HistoryEntry>,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// 最近 `size` 条（不足则全部），保持原有顺序
    pub fn window(&self, size: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(size);
        &self.entries[start..]
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ExecutionHistory {
    type Item = &'a HistoryEntry;
    type IntoIter = std::slice::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: i64) -> HistoryEntry {
        HistoryEntry::new(id, format!("cmd{id}"), Parameters::new(), json!({"status": "success"}), "")
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(EntryStatus::from_result(&json!({"status": "success"})), EntryStatus::Success);
        assert_eq!(EntryStatus::from_result(&json!({"status": "accepted"})), EntryStatus::Success);
        assert_eq!(EntryStatus::from_result(&json!({"status": "error"})), EntryStatus::Failed);
        assert_eq!(EntryStatus::from_result(&json!({"value": 3})), EntryStatus::Failed);
        assert_eq!(EntryStatus::from_result(&json!("success")), EntryStatus::Failed);
    }

    #[test]
    fn test_window_keeps_tail_in_order() {
        let mut history = ExecutionHistory::new();
        for id in 1..=5 {
            history.push(entry(id));
        }
        let ids: Vec<i64> = history.window(3).iter().map(|e| e.command_id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert_eq!(history.window(10).len(), 5);
        assert!(history.window(0).is_empty());
    }

    #[test]
    fn test_entry_serializes_lowercase_status() {
        let e = HistoryEntry::new(1, "add", Parameters::new(), json!({"status": "error"}), "why");
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["context"], "why");
        assert!(v["timestamp"].as_str().is_some());
    }
}
