//! 命令目录与目标描述
//!
//! 命令目录（functions.json）描述可用动作：id、name、参数（含 required 标记）；目标描述（goal.yaml）是不透明的结构化数据，
//! 原样回显到 Prompt。两者加载后只读，加载失败属于配置错误，构造时直接返回。

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::core::ProcessorError;
use crate::dispatch::Parameters;

/// 单个参数的声明；除 `required` 外的字段（type、description 等）只用于回显
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParameterSpec {
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
}

/// 目录中的一条命令定义
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
}

impl CommandSpec {
    /// 标记为 required 的参数名（按字典序）
    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }
}

/// 预分发校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandValidation {
    pub valid: bool,
    pub message: String,
}

impl CommandValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    fn invalid(message: String) -> Self {
        Self {
            valid: false,
            message,
        }
    }
}

/// 命令目录：保留原始文档（用于 Prompt 回显）与解析后的命令列表
#[derive(Debug, Clone)]
pub struct CommandCatalog {
    document: Value,
    commands: Vec<CommandSpec>,
}

impl CommandCatalog {
    /// 从 JSON 文档构造；文档可以是 `{"functions": [...]}` 或直接是命令数组
    pub fn from_value(document: Value) -> Result<Self, String> {
        let list = match &document {
            Value::Object(map) => map
                .get("functions")
                .cloned()
                .ok_or_else(|| "missing 'functions' array".to_string())?,
            Value::Array(_) => document.clone(),
            _ => return Err("catalog must be an object or an array".to_string()),
        };
        let commands: Vec<CommandSpec> =
            serde_json::from_value(list).map_err(|e| format!("invalid command definition: {e}"))?;

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for cmd in &commands {
            if !ids.insert(cmd.id) {
                return Err(format!("duplicate command id {}", cmd.id));
            }
            if !names.insert(cmd.name.as_str()) {
                return Err(format!("duplicate command name '{}'", cmd.name));
            }
        }

        Ok(Self { document, commands })
    }

    pub fn from_json_str(s: &str) -> Result<Self, String> {
        let document: Value = serde_json::from_str(s).map_err(|e| e.to_string())?;
        Self::from_value(document)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProcessorError> {
        let path = path.as_ref();
        let err = |message: String| ProcessorError::CatalogLoad {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
        Self::from_json_str(&text).map_err(err)
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    pub fn get(&self, id: i64) -> Option<&CommandSpec> {
        self.commands.iter().find(|c| c.id == id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// 检查 required 参数是否齐全；纯函数，无副作用
    pub fn validate(&self, command_id: i64, params: &Parameters) -> CommandValidation {
        let Some(spec) = self.get(command_id) else {
            return CommandValidation::invalid(format!("Unknown command_id: {command_id}"));
        };
        let missing: Vec<&str> = spec
            .required_parameters()
            .filter(|name| !params.contains_key(*name))
            .collect();
        if missing.is_empty() {
            CommandValidation::ok()
        } else {
            CommandValidation::invalid(format!(
                "Missing required parameters: {}",
                missing.join(", ")
            ))
        }
    }

    /// Prompt 中的目录段：完整原始文档，2 空格缩进
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.document).unwrap_or_else(|_| "{}".to_string())
    }
}

/// 目标描述：核心不解释其内容，只负责加载与回显
#[derive(Debug, Clone, PartialEq)]
pub struct GoalDescriptor(Value);

impl GoalDescriptor {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// YAML 是 JSON 的超集，JSON 文档同样可以用这里加载
    pub fn from_yaml_str(s: &str) -> Result<Self, String> {
        serde_yaml::from_str::<Value>(s)
            .map(Self)
            .map_err(|e| e.to_string())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProcessorError> {
        let path = path.as_ref();
        let err = |message: String| ProcessorError::GoalLoad {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
        Self::from_yaml_str(&text).map_err(err)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "null".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CATALOG: &str = r#"{
        "functions": [
            {"id": 1, "name": "add", "parameters": {
                "a": {"type": "number", "required": true},
                "b": {"type": "number", "required": true}
            }},
            {"id": 2, "name": "note", "parameters": {"text": {"type": "string"}}}
        ]
    }"#;

    fn params(v: Value) -> Parameters {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_validate_names_missing_parameter() {
        let catalog = CommandCatalog::from_json_str(CATALOG).unwrap();
        let v = catalog.validate(1, &params(json!({"a": 1})));
        assert!(!v.valid);
        assert!(v.message.contains('b'));
        assert!(!v.message.contains("a,"));
    }

    #[test]
    fn test_validate_ok_and_optional() {
        let catalog = CommandCatalog::from_json_str(CATALOG).unwrap();
        assert!(catalog.validate(1, &params(json!({"a": 1, "b": 2}))).valid);
        assert!(catalog.validate(2, &Parameters::new()).valid);
    }

    #[test]
    fn test_validate_unknown_command() {
        let catalog = CommandCatalog::from_json_str(CATALOG).unwrap();
        let v = catalog.validate(99, &Parameters::new());
        assert!(!v.valid);
        assert!(v.message.contains("99"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let doc = json!({"functions": [
            {"id": 1, "name": "a"},
            {"id": 1, "name": "b"}
        ]});
        assert!(CommandCatalog::from_value(doc).is_err());
    }

    #[test]
    fn test_bare_array_accepted() {
        let catalog = CommandCatalog::from_value(json!([{"id": 3, "name": "x"}])).unwrap();
        assert_eq!(catalog.get_by_name("x").map(|c| c.id), Some(3));
    }

    #[test]
    fn test_goal_from_yaml() {
        let goal = GoalDescriptor::from_yaml_str("target: 14\nsteps:\n  - add\n  - multiply\n").unwrap();
        assert_eq!(goal.value()["target"], json!(14));
        assert_eq!(goal.value()["steps"][1], json!("multiply"));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = CommandCatalog::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ProcessorError::CatalogLoad { .. }));
    }
}
