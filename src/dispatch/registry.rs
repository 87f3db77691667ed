//! 命令实现注册表
//!
//! 按名称存储 Arc<dyn CommandHandler>，同名后注册覆盖先注册；invoke 调用实现并输出结构化审计日志（JSON）。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::dispatch::{CommandHandler, Parameters};

/// 审计日志中参数预览的最大字符数
const ARGS_PREVIEW_CHARS: usize = 200;

#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: impl CommandHandler + 'static) {
        self.register_arc(name, Arc::new(handler));
    }

    pub fn register_arc(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::debug!(command = %name, "implementation replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// 调用已注册实现；未注册返回 None
    pub async fn invoke(&self, name: &str, params: Parameters) -> Option<Result<Value, String>> {
        let handler = self.get(name)?;
        let start = Instant::now();
        let preview = args_preview(&params);
        let result = handler.invoke(params).await;

        let outcome = match &result {
            Ok(v) => v.get("status").and_then(Value::as_str).unwrap_or("missing").to_string(),
            Err(_) => "raised".to_string(),
        };
        let audit = serde_json::json!({
            "event": "command_audit",
            "command": name,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": preview,
        });
        tracing::info!(audit = %audit.to_string(), "command");

        Some(result)
    }
}

fn args_preview(params: &Parameters) -> String {
    let s = Value::Object(params.clone()).to_string();
    if s.chars().count() > ARGS_PREVIEW_CHARS {
        format!("{}...", s.chars().take(ARGS_PREVIEW_CHARS).collect::<String>())
    } else {
        s
    }
}
