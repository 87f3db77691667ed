//! 单步决策编排器
//!
//! LlmProcessor 持有执行历史、知识状态、步数计数、命令目录、目标与实现注册表，对外暴露两个操作：
//! - get_next_action：组装 Prompt -> 调用推理服务一次 -> 解析为 Decision；不修改任何状态
//! - execute_command：查目录 -> 查实现 -> 调用 -> 写历史 -> 计步 -> 按节奏提炼知识；唯一的状态修改入口
//!
//! 每个实例独立，步骤严格串行；需要并行运行多个智能体时各自构造实例。

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::catalog::{CommandCatalog, CommandValidation, GoalDescriptor};
use crate::config::ProcessorSection;
use crate::core::{ExecutionHistory, HistoryEntry, ProcessorError};
use crate::decision::{parse_decision, Decision};
use crate::dispatch::{CommandHandler, CommandRegistry, Parameters};
use crate::knowledge::{is_due, KnowledgeDistiller};
use crate::llm::LlmClient;
use crate::mirror::PromptMirror;
use crate::prompt::{decision_prompt, DecisionPromptInput};

pub struct LlmProcessor {
    catalog: CommandCatalog,
    goal: GoalDescriptor,
    llm: Arc<dyn LlmClient>,
    registry: CommandRegistry,
    distiller: KnowledgeDistiller,
    settings: ProcessorSection,
    history: ExecutionHistory,
    /// Best Practices：每次提炼后整体替换
    knowledge: String,
    steps: u64,
    mirror: Option<Arc<dyn PromptMirror>>,
}

impl LlmProcessor {
    /// summary_interval 为 0 属于配置错误
    pub fn new(
        catalog: CommandCatalog,
        goal: GoalDescriptor,
        llm: Arc<dyn LlmClient>,
        settings: ProcessorSection,
    ) -> Result<Self, ProcessorError> {
        if settings.summary_interval == 0 {
            return Err(ProcessorError::Config(
                "processor.summary_interval must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            distiller: KnowledgeDistiller::new(llm.clone(), settings.summary_window),
            catalog,
            goal,
            llm,
            registry: CommandRegistry::new(),
            settings,
            history: ExecutionHistory::new(),
            knowledge: String::new(),
            steps: 0,
            mirror: None,
        })
    }

    /// 从 functions.json 与 goal.yaml 构造
    pub fn from_files(
        functions_file: impl AsRef<Path>,
        goal_file: impl AsRef<Path>,
        llm: Arc<dyn LlmClient>,
        settings: ProcessorSection,
    ) -> Result<Self, ProcessorError> {
        let catalog = CommandCatalog::load(functions_file)?;
        let goal = GoalDescriptor::load(goal_file)?;
        Self::new(catalog, goal, llm, settings)
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn PromptMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// 注册命令实现；同名后注册覆盖
    pub fn register_function(&mut self, name: impl Into<String>, handler: impl CommandHandler + 'static) {
        self.registry.register(name, handler);
    }

    pub fn register_function_arc(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.registry.register_arc(name, handler);
    }

    /// 组装当前决策 Prompt；若挂了镜像则顺带发布
    pub fn generate_prompt(&self) -> String {
        let prompt = decision_prompt(&DecisionPromptInput {
            knowledge: &self.knowledge,
            catalog: &self.catalog,
            goal: &self.goal,
            history: self.history.window(self.settings.history_size),
            history_size: self.settings.history_size,
        });
        if let Some(mirror) = &self.mirror {
            mirror.publish(&prompt);
        }
        prompt
    }

    /// 询问模型下一步动作；推理失败与解析失败都得到带标记的回退决策
    pub async fn get_next_action(&self) -> Decision {
        let prompt = self.generate_prompt();
        tracing::debug!(prompt = %prompt, "prompt to LLM");

        match self.llm.complete_prompt(&prompt).await {
            Ok(raw) => {
                tracing::debug!(response = %raw, "LLM raw response");
                parse_decision(&raw)
            }
            Err(e) => {
                tracing::error!("Error calling LLM: {}", e);
                Decision::transport_fallback(e)
            }
        }
    }

    /// 分发前校验 required 参数（可选路径，无副作用）
    pub fn validate_command_params(&self, command_id: i64, params: &Parameters) -> CommandValidation {
        self.catalog.validate(command_id, params)
    }

    /// 执行命令并记录历史；未知 id / 未注册实现立即返回错误且不写历史，实现自身的 Err 原样传播
    pub async fn execute_command(
        &mut self,
        command_id: i64,
        parameters: Parameters,
        context: impl Into<String>,
    ) -> Result<Value, ProcessorError> {
        let name = self
            .catalog
            .get(command_id)
            .ok_or(ProcessorError::UnknownCommand(command_id))?
            .name
            .clone();

        let result = self
            .registry
            .invoke(&name, parameters.clone())
            .await
            .ok_or_else(|| ProcessorError::UnregisteredImplementation(name.clone()))?
            .map_err(|message| ProcessorError::ImplementationFailed {
                command: name.clone(),
                message,
            })?;

        let entry = HistoryEntry::new(command_id, name, parameters, result.clone(), context);
        tracing::info!(
            step = self.steps + 1,
            command = %entry.command_name,
            status = ?entry.status,
            "command recorded"
        );
        self.history.push(entry);
        self.steps += 1;

        if is_due(self.steps, self.settings.summary_interval) {
            self.update_knowledge().await;
        }

        Ok(result)
    }

    /// 按决策执行：command_id / parameters 来自 action，context 为 analysis.reasoning
    pub async fn execute_decision(&mut self, decision: &Decision) -> Result<Value, ProcessorError> {
        self.execute_command(
            decision.action.command_id,
            decision.action.parameters.clone(),
            decision.analysis.reasoning.clone(),
        )
        .await
    }

    async fn update_knowledge(&mut self) {
        tracing::info!(step = self.steps, "distilling knowledge");
        let distilled = self
            .distiller
            .distill(&self.knowledge, &self.catalog, &self.goal, self.history.entries())
            .await;
        self.knowledge = distilled.knowledge;
    }

    /// 调整提炼节奏；只影响之后的步数判断，不补做错过的倍数
    pub fn set_summary_interval(&mut self, interval: u64) -> Result<(), ProcessorError> {
        if interval == 0 {
            return Err(ProcessorError::Config(
                "processor.summary_interval must be at least 1".to_string(),
            ));
        }
        self.settings.summary_interval = interval;
        Ok(())
    }

    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }

    pub fn knowledge(&self) -> &str {
        &self.knowledge
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    pub fn goal(&self) -> &GoalDescriptor {
        &self.goal
    }

    pub fn settings(&self) -> &ProcessorSection {
        &self.settings
    }

    pub fn registered_functions(&self) -> Vec<String> {
        self.registry.names()
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }
}
