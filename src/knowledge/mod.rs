//! 知识提炼（Best Practices）
//!
//! 每 summary_interval 步执行一次，两次独立的推理调用：
//! 1. 提取：目标 + 命令目录 + 最近 summary_window 条历史 -> 新片段；调用失败或为空时用占位片段
//! 2. 合并：旧知识 + 新片段 -> 合并结果；成功则整体替换知识，失败则退化为「旧知识 + 换行 + 新片段」
//!
//! 整个周期从不向调用方返回错误，失败只记日志。

use std::sync::Arc;

use crate::catalog::{CommandCatalog, GoalDescriptor};
use crate::core::HistoryEntry;
use crate::llm::LlmClient;
use crate::prompt::{extraction_prompt, merge_prompt};

pub const NO_NEW_FINDINGS: &str =
    "No new best practices, useful findings and extracted helpful knowledge found.";

/// 提炼节奏：第 step 次分发后是否需要提炼
pub fn is_due(step: u64, interval: u64) -> bool {
    interval > 0 && step > 0 && step % interval == 0
}

/// 单次提炼的结果与两个阶段的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distillation {
    /// 新的知识状态（总是有值）
    pub knowledge: String,
    /// 提取阶段产出的片段（失败时为占位片段）
    pub fragment: String,
    pub extraction_ok: bool,
    pub merge_ok: bool,
}

pub struct KnowledgeDistiller {
    llm: Arc<dyn LlmClient>,
    summary_window: usize,
}

impl KnowledgeDistiller {
    pub fn new(llm: Arc<dyn LlmClient>, summary_window: usize) -> Self {
        Self { llm, summary_window }
    }

    /// `history` 为完整历史，这里自行截取尾部窗口
    pub async fn distill(
        &self,
        previous: &str,
        catalog: &CommandCatalog,
        goal: &GoalDescriptor,
        history: &[HistoryEntry],
    ) -> Distillation {
        let start = history.len().saturating_sub(self.summary_window);
        let window = &history[start..];

        let prompt = extraction_prompt(catalog, goal, window, self.summary_window);
        let (fragment, extraction_ok) = match self.call("extraction", &prompt).await {
            Some(text) => (text, true),
            None => (NO_NEW_FINDINGS.to_string(), false),
        };

        let prompt = merge_prompt(previous, &fragment);
        let (knowledge, merge_ok) = match self.call("merge", &prompt).await {
            Some(merged) => (merged, true),
            None => {
                tracing::warn!("knowledge merge failed, appending raw fragment");
                (format!("{previous}\n{fragment}"), false)
            }
        };

        tracing::info!(
            window = window.len(),
            extraction_ok,
            merge_ok,
            knowledge_chars = knowledge.chars().count(),
            "knowledge distilled"
        );

        Distillation {
            knowledge,
            fragment,
            extraction_ok,
            merge_ok,
        }
    }

    /// 失败或空回复都返回 None
    async fn call(&self, stage: &str, prompt: &str) -> Option<String> {
        match self.llm.complete_prompt(prompt).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                tracing::warn!(stage, "empty response while distilling knowledge");
                None
            }
            Err(e) => {
                tracing::warn!(stage, error = %e, "Error calling LLM for best practices");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Parameters;
    use crate::llm::MockLlmClient;
    use serde_json::json;

    fn fixtures() -> (CommandCatalog, GoalDescriptor, Vec<HistoryEntry>) {
        let catalog =
            CommandCatalog::from_value(json!({"functions": [{"id": 1, "name": "add"}]})).unwrap();
        let goal = GoalDescriptor::new(json!({"target": 14}));
        let history = (1..=4)
            .map(|i| HistoryEntry::new(i, "add", Parameters::new(), json!({"status": "success"}), format!("ctx-{i}")))
            .collect();
        (catalog, goal, history)
    }

    #[test]
    fn test_is_due() {
        let fired: Vec<u64> = (1..=16).filter(|s| is_due(*s, 5)).collect();
        assert_eq!(fired, vec![5, 10, 15]);
        assert!(!is_due(0, 5));
        assert!(!is_due(3, 0));
    }

    #[tokio::test]
    async fn test_merge_success_replaces_knowledge() {
        let (catalog, goal, history) = fixtures();
        let llm = Arc::new(MockLlmClient::with_responses(["- fragment", "  merged knowledge \n"]));
        let distiller = KnowledgeDistiller::new(llm.clone(), 2);
        let out = distiller.distill("old", &catalog, &goal, &history).await;
        assert_eq!(out.knowledge, "merged knowledge");
        assert!(out.extraction_ok && out.merge_ok);

        let prompts = llm.prompts();
        assert!(prompts[0].contains("ctx-4") && prompts[0].contains("ctx-3"));
        assert!(!prompts[0].contains("ctx-2"));
        assert!(prompts[1].contains("old") && prompts[1].contains("- fragment"));
    }

    #[tokio::test]
    async fn test_merge_failure_concatenates() {
        let (catalog, goal, history) = fixtures();
        let llm = MockLlmClient::with_responses(["- fragment"]);
        llm.push_error("merge down");
        let distiller = KnowledgeDistiller::new(Arc::new(llm), 15);
        let out = distiller.distill("old", &catalog, &goal, &history).await;
        assert_eq!(out.knowledge, "old\n- fragment");
        assert!(out.extraction_ok);
        assert!(!out.merge_ok);
    }

    #[tokio::test]
    async fn test_extraction_failure_uses_placeholder_and_still_merges() {
        let (catalog, goal, history) = fixtures();
        let llm = Arc::new(MockLlmClient::new());
        llm.push_error("extract down");
        llm.push_response("merged");
        let distiller = KnowledgeDistiller::new(llm.clone(), 15);
        let out = distiller.distill("old", &catalog, &goal, &history).await;
        assert_eq!(out.fragment, NO_NEW_FINDINGS);
        assert_eq!(out.knowledge, "merged");
        assert!(llm.prompts()[1].contains(NO_NEW_FINDINGS));
    }

    #[tokio::test]
    async fn test_both_stages_fail() {
        let (catalog, goal, history) = fixtures();
        let llm = MockLlmClient::with_responses(["   "]);
        llm.push_response("");
        let distiller = KnowledgeDistiller::new(Arc::new(llm), 15);
        let out = distiller.distill("old", &catalog, &goal, &history).await;
        assert_eq!(out.knowledge, format!("old\n{NO_NEW_FINDINGS}"));
        assert!(!out.extraction_ok && !out.merge_ok);
    }
}
