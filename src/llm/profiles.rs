//! 推理服务部署配置
//!
//! - local：固定回环端点（LM Studio 默认 http://127.0.0.1:1234/v1），占位凭据 `lm-studio`
//! - hosted：api.openai.com，凭据来自环境变量（默认 `OPENAI_API_KEY`）
//! - mock：脚本化客户端，离线运行
//!
//! 选择发生在配置阶段，不影响编排逻辑。

use std::str::FromStr;

use crate::llm::OpenAiClient;

pub const LOCAL_BASE_URL: &str = "http://127.0.0.1:1234/v1";
pub const LOCAL_API_KEY: &str = "lm-studio";
pub const HOSTED_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Local,
    Hosted,
    Mock,
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Profile::Local),
            "hosted" | "openai" => Ok(Profile::Hosted),
            "mock" => Ok(Profile::Mock),
            other => Err(format!("unknown llm provider '{other}' (expected local, hosted or mock)")),
        }
    }
}

/// 创建本地端点客户端；base_url / api_key 为空时使用 LM Studio 默认值
pub fn create_local_client(
    model: &str,
    base_url: Option<&str>,
    api_key: Option<&str>,
    timeout_secs: u64,
) -> OpenAiClient {
    OpenAiClient::new(
        Some(base_url.unwrap_or(LOCAL_BASE_URL)),
        model,
        Some(api_key.unwrap_or(LOCAL_API_KEY)),
    )
    .with_request_timeout(timeout_secs)
}

/// 创建托管端点客户端；凭据从 `api_key_env` 指定的环境变量读取
pub fn create_hosted_client(
    model: &str,
    base_url: Option<&str>,
    api_key_env: &str,
    timeout_secs: u64,
) -> OpenAiClient {
    let api_key = std::env::var(api_key_env).ok();
    if api_key.is_none() {
        tracing::warn!("{} is not set, hosted requests will be rejected", api_key_env);
    }
    OpenAiClient::new(
        Some(base_url.unwrap_or(HOSTED_BASE_URL)),
        model,
        api_key.as_deref(),
    )
    .with_request_timeout(timeout_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parse() {
        assert_eq!("local".parse::<Profile>().unwrap(), Profile::Local);
        assert_eq!("OpenAI".parse::<Profile>().unwrap(), Profile::Hosted);
        assert_eq!(" mock ".parse::<Profile>().unwrap(), Profile::Mock);
        assert!("deepseek".parse::<Profile>().is_err());
    }
}
