//! 核心编排层：错误、执行历史、处理器、构建器、步进驱动

pub mod builder;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod runner;

pub use builder::{create_llm_from_config, ProcessorBuilder};
pub use error::ProcessorError;
pub use history::{EntryStatus, ExecutionHistory, HistoryEntry};
pub use orchestrator::LlmProcessor;
pub use runner::{RunReport, StepRunner};
