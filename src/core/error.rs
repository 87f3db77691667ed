//! 处理器错误类型
//!
//! 可恢复的问题（模型输出格式错误、推理服务不可达）不会出现在这里，它们在决策/提炼内部被吸收为回退值；
//! 这里只保留配置错误与编程错误（未知命令、未注册实现、实现自身抛错），由调用方处理。

use thiserror::Error;

/// LlmProcessor 构造与分发过程中可能出现的错误
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to load command catalog {path}: {message}")]
    CatalogLoad { path: String, message: String },

    #[error("Failed to load goal {path}: {message}")]
    GoalLoad { path: String, message: String },

    /// 场景环境数据（如迷宫文件）无法加载
    #[error("Failed to load scenario data {path}: {message}")]
    ScenarioLoad { path: String, message: String },

    #[error("Unknown command ID: {0}")]
    UnknownCommand(i64),

    #[error("No implementation registered for command: {0}")]
    UnregisteredImplementation(String),

    /// 实现本身返回 Err：原样向上传播，不写历史、不计步
    #[error("Implementation of '{command}' failed: {message}")]
    ImplementationFailed { command: String, message: String },
}
