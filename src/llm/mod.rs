//! LLM 层：推理服务边界（OpenAI 兼容客户端 / 本地与托管部署配置 / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod profiles;
pub mod traits;

pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use profiles::{
    create_hosted_client, create_local_client, Profile, DEFAULT_MODEL, HOSTED_BASE_URL,
    LOCAL_API_KEY, LOCAL_BASE_URL,
};
pub use traits::{LlmClient, LlmError};
