//! 决策：模型回复解析后的结构化结果（analysis + action）

pub mod parser;

pub use parser::{
    extract_json_payload, normalize_decision, parse_decision, try_parse_decision, DecisionParseError,
    ACTION_DEFAULTS, ANALYSIS_DEFAULTS, PARSE_ERROR_REASONING,
};

use serde::{Deserialize, Serialize};

use crate::dispatch::Parameters;

/// 决策来源：正常解析 / 解析失败回退 / 推理调用失败回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecisionOrigin {
    #[default]
    Parsed,
    ParseFallback,
    TransportFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub current_situation: String,
    pub history_consideration: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub command_id: i64,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_outcome: Option<String>,
}

/// get_next_action 的返回值；analysis 的三个字符串字段保证存在
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub analysis: Analysis,
    pub action: Action,
    #[serde(skip)]
    pub origin: DecisionOrigin,
}

impl Decision {
    /// 回退决策：command_id 0、空参数
    fn fallback(reasoning: String, origin: DecisionOrigin) -> Self {
        Self {
            analysis: Analysis {
                current_situation: "Error occurred".to_string(),
                history_consideration: "Error occurred".to_string(),
                reasoning,
            },
            action: Action {
                command_id: 0,
                parameters: Parameters::new(),
                expected_outcome: None,
            },
            origin,
        }
    }

    /// 模型回复无法解码时的固定回退
    pub fn parse_fallback() -> Self {
        Self::fallback(PARSE_ERROR_REASONING.to_string(), DecisionOrigin::ParseFallback)
    }

    /// 推理调用本身失败时的回退，reasoning 携带错误描述
    pub fn transport_fallback(error: impl std::fmt::Display) -> Self {
        Self::fallback(format!("Error: {error}"), DecisionOrigin::TransportFallback)
    }

    pub fn is_fallback(&self) -> bool {
        !matches!(self.origin, DecisionOrigin::Parsed)
    }
}
