//! 处理器构建器：按配置选择推理后端、加载目录与目标、挂载镜像
//!
//! 命令实现由调用方在 build 之后通过 register_function 注册。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::{CommandCatalog, GoalDescriptor};
use crate::config::AppConfig;
use crate::core::{LlmProcessor, ProcessorError};
use crate::llm::{create_hosted_client, create_local_client, LlmClient, MockLlmClient, Profile};
use crate::mirror::PromptMirror;

/// 根据 [llm] 段选择推理后端（local / hosted / mock）
pub fn create_llm_from_config(
    cfg: &AppConfig,
    catalog: &CommandCatalog,
) -> Result<Arc<dyn LlmClient>, ProcessorError> {
    let profile: Profile = cfg.llm.provider.parse().map_err(ProcessorError::Config)?;
    let model = cfg.llm.model.as_str();
    let timeout = cfg.llm.timeouts.request;

    let llm: Arc<dyn LlmClient> = match profile {
        Profile::Local => {
            let base = cfg.llm.base_url.as_deref().unwrap_or(cfg.llm.local.base_url.as_str());
            tracing::info!("Using local LLM at {} ({})", base, model);
            Arc::new(create_local_client(
                model,
                Some(base),
                Some(&cfg.llm.local.api_key),
                timeout,
            ))
        }
        Profile::Hosted => {
            let base = cfg.llm.base_url.as_deref().unwrap_or(cfg.llm.hosted.base_url.as_str());
            tracing::info!("Using hosted LLM at {} ({})", base, model);
            Arc::new(create_hosted_client(
                model,
                Some(base),
                &cfg.llm.hosted.api_key_env,
                timeout,
            ))
        }
        Profile::Mock => {
            tracing::warn!("Using Mock LLM, decisions always pick the first catalog command");
            Arc::new(MockLlmClient::new().with_fallback(mock_reply(catalog)))
        }
    };
    Ok(llm)
}

/// Mock 后端的固定回复：选目录中第一个命令、不带参数
fn mock_reply(catalog: &CommandCatalog) -> String {
    let command_id = catalog.commands().first().map(|c| c.id).unwrap_or(0);
    serde_json::json!({
        "analysis": {
            "current_situation": "Mock provider",
            "history_consideration": "Mock provider ignores history",
            "reasoning": "No model configured; choosing the first available command"
        },
        "action": {
            "command_id": command_id,
            "parameters": {},
            "expected_outcome": "Exercise the dispatch path"
        }
    })
    .to_string()
}

/// LlmProcessor 构建器
pub struct ProcessorBuilder {
    config: AppConfig,
    functions_file: PathBuf,
    goal_file: PathBuf,
    llm: Option<Arc<dyn LlmClient>>,
    mirror: Option<Arc<dyn PromptMirror>>,
}

impl ProcessorBuilder {
    pub fn new(config: AppConfig, functions_file: impl Into<PathBuf>, goal_file: impl Into<PathBuf>) -> Self {
        Self {
            config,
            functions_file: functions_file.into(),
            goal_file: goal_file.into(),
            llm: None,
            mirror: None,
        }
    }

    /// 从场景目录取 functions.json 与 goal.yaml
    pub fn for_scenario_dir(config: AppConfig, dir: &Path) -> Self {
        Self::new(config, dir.join("functions.json"), dir.join("goal.yaml"))
    }

    /// 指定推理客户端（不再按配置创建）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn PromptMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn build(self) -> Result<LlmProcessor, ProcessorError> {
        let catalog = CommandCatalog::load(&self.functions_file)?;
        let goal = GoalDescriptor::load(&self.goal_file)?;
        let llm = match self.llm {
            Some(llm) => llm,
            None => create_llm_from_config(&self.config, &catalog)?,
        };
        tracing::info!(
            commands = catalog.commands().len(),
            history_size = self.config.processor.history_size,
            summary_interval = self.config.processor.summary_interval,
            summary_window = self.config.processor.summary_window,
            "processor configured"
        );
        let processor = LlmProcessor::new(catalog, goal, llm, self.config.processor)?;
        Ok(match self.mirror {
            Some(mirror) => processor.with_mirror(mirror),
            None => processor,
        })
    }
}
