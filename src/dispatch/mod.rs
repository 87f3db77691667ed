//! 命令分发层：统一的命令实现抽象（同步 / 异步）与按名注册表

pub mod handler;
pub mod registry;

pub use handler::{async_fn, sync_fn, AsyncFn, CommandHandler, SyncFn};
pub use registry::CommandRegistry;

/// 传给实现的参数：参数名 -> JSON 值
pub type Parameters = serde_json::Map<String, serde_json::Value>;
