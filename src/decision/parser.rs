//! 模型回复解析
//!
//! 1. 去首尾空白；若含 ```json 代码块（标签大小写不敏感，取第一个）则取其内容，否则剥掉首尾反引号
//! 2. 解码为 JSON 对象；失败则返回固定回退决策并告警（不报错）
//! 3. 解码成功后执行规范化：按 ANALYSIS_DEFAULTS / ACTION_DEFAULTS 表补齐缺失字段，并把顶层 reasoning 提升进 analysis

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::decision::{Action, Analysis, Decision, DecisionOrigin};
use crate::dispatch::Parameters;

pub const PARSE_ERROR_REASONING: &str = "Error parsing response";

/// analysis 补齐表：(字段, analysis 整体缺失时的默认值, analysis 存在但缺该字段时的默认值)
pub const ANALYSIS_DEFAULTS: [(&str, &str, &str); 3] = [
    (
        "reasoning",
        "No reasoning provided",
        "No explicit reasoning provided, proceeding with the action",
    ),
    (
        "current_situation",
        "No situation analysis provided",
        "Current situation assessment not provided",
    ),
    (
        "history_consideration",
        "No history consideration provided",
        "History consideration not provided",
    ),
];

/// action 补齐表：(字段, 默认值的 JSON 字面量)
pub const ACTION_DEFAULTS: [(&str, &str); 2] = [("command_id", "0"), ("parameters", "{}")];

static JSON_FENCE_RE: OnceLock<Regex> = OnceLock::new();

#[derive(Error, Debug)]
pub enum DecisionParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// 取出待解码的 JSON 文本
pub fn extract_json_payload(raw: &str) -> String {
    let content = raw.trim();
    let re = JSON_FENCE_RE.get_or_init(|| {
        Regex::new(r"(?is)```json\s*(.*?)\s*```").expect("static regex is valid")
    });
    match re.captures(content).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => content.trim_matches('`').trim().to_string(),
    }
}

/// 解析并规范化；解码失败返回错误（供需要区分的调用方使用）
pub fn try_parse_decision(raw: &str) -> Result<Decision, DecisionParseError> {
    let payload = extract_json_payload(raw);
    let value: Value =
        serde_json::from_str(&payload).map_err(|e| DecisionParseError::InvalidJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(normalize_decision(map)),
        Value::Array(_) => Err(DecisionParseError::NotAnObject("array")),
        Value::String(_) => Err(DecisionParseError::NotAnObject("string")),
        Value::Number(_) => Err(DecisionParseError::NotAnObject("number")),
        Value::Bool(_) => Err(DecisionParseError::NotAnObject("bool")),
        Value::Null => Err(DecisionParseError::NotAnObject("null")),
    }
}

/// 解析模型回复；任何解码失败都得到固定回退决策
pub fn parse_decision(raw: &str) -> Decision {
    match try_parse_decision(raw) {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(error = %e, "Could not parse LLM response as JSON, returning fallback action");
            Decision::parse_fallback()
        }
    }
}

/// 对已解码的对象做规范化，任何输入都得到完整的 Decision
pub fn normalize_decision(mut root: Map<String, Value>) -> Decision {
    let analysis_missing = !matches!(root.get("analysis"), Some(Value::Object(_)));
    let mut analysis = take_object(&mut root, "analysis");
    analysis.retain(|_, v| !v.is_null());

    // analysis 缺失时整块取缺省值（已含 reasoning），不提升顶层 reasoning
    if !analysis_missing && !analysis.contains_key("reasoning") {
        if let Some(reasoning) = root.remove("reasoning").filter(|v| !v.is_null()) {
            analysis.insert("reasoning".to_string(), reasoning);
        }
    }
    for (field, block_default, field_default) in ANALYSIS_DEFAULTS {
        if !analysis.contains_key(field) {
            let default = if analysis_missing { block_default } else { field_default };
            analysis.insert(field.to_string(), Value::String(default.to_string()));
        }
    }

    let mut action = take_object(&mut root, "action");
    action.retain(|_, v| !v.is_null());
    for (field, default) in ACTION_DEFAULTS {
        if !action.contains_key(field) {
            let value = serde_json::from_str(default).unwrap_or(Value::Null);
            action.insert(field.to_string(), value);
        }
    }

    Decision {
        analysis: Analysis {
            current_situation: text_field(&analysis, "current_situation"),
            history_consideration: text_field(&analysis, "history_consideration"),
            reasoning: text_field(&analysis, "reasoning"),
        },
        action: Action {
            command_id: command_id(action.get("command_id")),
            parameters: match action.remove("parameters") {
                Some(Value::Object(p)) => p,
                _ => Parameters::new(),
            },
            expected_outcome: action.get("expected_outcome").map(value_to_text),
        },
        origin: DecisionOrigin::Parsed,
    }
}

fn take_object(root: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match root.remove(key) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).map(value_to_text).unwrap_or_default()
}

/// 字符串原样返回，其它标量/结构转为 JSON 文本
fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 接受整数、整数值的浮点与数字字符串；其余视为 0
fn command_id(v: Option<&Value>) -> i64 {
    match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FULL: &str = r#"{
        "analysis": {
            "current_situation": "nothing done yet",
            "history_consideration": "empty history",
            "reasoning": "start by adding"
        },
        "action": {
            "command_id": 1,
            "parameters": {"a": 4, "b": 3},
            "expected_outcome": "7"
        }
    }"#;

    #[test]
    fn test_full_response() {
        let d = parse_decision(FULL);
        assert_eq!(d.origin, DecisionOrigin::Parsed);
        assert_eq!(d.action.command_id, 1);
        assert_eq!(d.action.parameters["a"], json!(4));
        assert_eq!(d.action.expected_outcome.as_deref(), Some("7"));
        assert_eq!(d.analysis.reasoning, "start by adding");
    }

    #[test]
    fn test_fenced_equals_unfenced() {
        let fenced = format!("Here you go:\n```json\n{FULL}\n```\nGood luck");
        assert_eq!(parse_decision(&fenced), parse_decision(FULL));
        let upper = format!("```JSON\n{FULL}\n```");
        assert_eq!(parse_decision(&upper), parse_decision(FULL));
    }

    #[test]
    fn test_first_fenced_block_wins() {
        let raw = r#"```json
{"action": {"command_id": 2}}
```
```json
{"action": {"command_id": 3}}
```"#;
        assert_eq!(parse_decision(raw).action.command_id, 2);
    }

    #[test]
    fn test_bare_backticks_stripped() {
        let raw = format!("``{FULL}``");
        assert_eq!(parse_decision(&raw).action.command_id, 1);
    }

    #[test]
    fn test_undecodable_yields_fallback() {
        for raw in ["", "not json at all", "{\"action\": ", "```json\n{oops}\n```", "[1, 2]"] {
            let d = parse_decision(raw);
            assert_eq!(d.origin, DecisionOrigin::ParseFallback);
            assert_eq!(d.analysis.reasoning, PARSE_ERROR_REASONING);
            assert_eq!(d.analysis.current_situation, "Error occurred");
            assert_eq!(d.analysis.history_consideration, "Error occurred");
            assert_eq!(d.action.command_id, 0);
            assert!(d.action.parameters.is_empty());
        }
    }

    #[test]
    fn test_missing_analysis_gets_block_defaults() {
        let d = parse_decision(r#"{"action": {"command_id": 2, "parameters": {}}}"#);
        assert_eq!(d.analysis.reasoning, "No reasoning provided");
        assert_eq!(d.analysis.current_situation, "No situation analysis provided");
        assert_eq!(d.analysis.history_consideration, "No history consideration provided");
    }

    #[test]
    fn test_top_level_reasoning_hoisted() {
        let d = parse_decision(
            r#"{"reasoning": "because", "analysis": {"current_situation": "ok"}, "action": {"command_id": 1}}"#,
        );
        assert_eq!(d.analysis.reasoning, "because");
        assert_eq!(d.analysis.current_situation, "ok");
        assert_eq!(d.analysis.history_consideration, "History consideration not provided");

    }

    #[test]
    fn test_top_level_reasoning_ignored_without_analysis() {
        let d = parse_decision(r#"{"reasoning": "top", "action": {"command_id": 1}}"#);
        assert_eq!(d.analysis.reasoning, "No reasoning provided");
        assert_eq!(d.analysis.current_situation, "No situation analysis provided");
        assert_eq!(d.action.command_id, 1);
    }

    #[test]
    fn test_analysis_reasoning_not_overwritten() {
        let d = parse_decision(
            r#"{"reasoning": "top", "analysis": {"reasoning": "inner"}, "action": {"command_id": 1}}"#,
        );
        assert_eq!(d.analysis.reasoning, "inner");
    }

    #[test]
    fn test_partial_analysis_field_defaults() {
        let d = parse_decision(r#"{"analysis": {"history_consideration": null}, "action": {"command_id": 1}}"#);
        assert_eq!(
            d.analysis.reasoning,
            "No explicit reasoning provided, proceeding with the action"
        );
        assert_eq!(d.analysis.current_situation, "Current situation assessment not provided");
        assert_eq!(d.analysis.history_consideration, "History consideration not provided");
    }

    #[test]
    fn test_action_normalization() {
        let d = parse_decision(r#"{"analysis": {"reasoning": 42}}"#);
        assert_eq!(d.analysis.reasoning, "42");
        assert_eq!(d.action.command_id, 0);
        assert!(d.action.parameters.is_empty());
        assert_eq!(d.action.expected_outcome, None);

        let d = parse_decision(r#"{"action": {"command_id": "3", "parameters": "bad"}}"#);
        assert_eq!(d.action.command_id, 3);
        assert!(d.action.parameters.is_empty());

        let d = parse_decision(r#"{"action": {"command_id": 2.0}}"#);
        assert_eq!(d.action.command_id, 2);
    }

    #[test]
    fn test_try_parse_reports_kind() {
        assert!(matches!(
            try_parse_decision("\"text\""),
            Err(DecisionParseError::NotAnObject("string"))
        ));
        assert!(matches!(try_parse_decision("{"), Err(DecisionParseError::InvalidJson(_))));
    }

    #[test]
    fn test_serialized_shape() {
        let v = serde_json::to_value(parse_decision(FULL)).unwrap();
        assert!(v.get("origin").is_none());
        assert_eq!(v["action"]["command_id"], json!(1));
        assert_eq!(v["analysis"]["reasoning"], json!("start by adding"));
    }
}
