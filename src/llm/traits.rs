//! LLM 客户端抽象
//!
//! 推理服务对核心而言只是「prompt 字符串 -> 回复字符串（或失败）」；所有后端（OpenAI 兼容 / Mock）实现 LlmClient。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::Message;

/// 推理调用失败：由调用点吸收为回退值，不会越过 get_next_action 或提炼流程
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Mock 脚本已耗尽或脚本中预置的失败
    #[error("scripted failure: {0}")]
    Script(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 单条 user 消息的便捷封装（决策与提炼都只发送一个 prompt）
    async fn complete_prompt(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete(&[Message::user(prompt)]).await
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
