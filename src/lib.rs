//! Stride - 单步 LLM 决策编排器
//!
//! 每一步：组装 Prompt（知识 + 命令目录 + 目标 + 最近历史）-> 询问模型 -> 解析决策（失败时回退）
//! -> 分发到注册的命令实现 -> 记录历史；按固定步数间隔把近期历史提炼进累积知识。
//!
//! 模块划分：
//! - **catalog**: 命令目录（functions.json）与目标描述（goal.yaml）的加载、查找与参数校验
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 执行历史、LlmProcessor、构建器、步进驱动
//! - **decision**: 决策结构与模型输出解析（含回退与缺省补齐）
//! - **dispatch**: 命令实现 trait（同步 / 异步统一调用）与注册表
//! - **knowledge**: 两阶段知识提炼（抽取 -> 合并）
//! - **llm**: 推理服务抽象与实现（OpenAI 兼容 / Mock），本地与托管两种部署配置
//! - **mirror**: 当前 Prompt 的镜像（可选 `web` 特性提供网页）
//! - **observability**: 日志初始化
//! - **prompt**: 决策 / 抽取 / 合并三类 Prompt 的文本组装
//! - **scenarios**: 内置场景（计算器、咖啡机、迷宫）

pub mod catalog;
pub mod config;
pub mod core;
pub mod decision;
pub mod dispatch;
pub mod knowledge;
pub mod llm;
pub mod mirror;
pub mod observability;
pub mod prompt;
pub mod scenarios;

pub use catalog::{CommandCatalog, CommandSpec, CommandValidation, GoalDescriptor};
pub use crate::core::{
    EntryStatus, ExecutionHistory, HistoryEntry, LlmProcessor, ProcessorBuilder, ProcessorError,
    RunReport, StepRunner,
};
pub use decision::{parse_decision, Action, Analysis, Decision, DecisionOrigin};
pub use dispatch::{async_fn, sync_fn, CommandHandler, CommandRegistry, Parameters};
pub use scenarios::Scenario;
