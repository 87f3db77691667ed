//! Prompt 可视化镜像
//!
//! 被动接收最新组装的 Prompt 供展示；发布是即发即弃的，不阻塞也不影响组装。
//! WatchMirror 把最新值放在 tokio watch 通道里；启用 `web` feature 后可用 serve_mirror 在浏览器里查看。

#[cfg(feature = "web")]
pub mod web;

#[cfg(feature = "web")]
pub use web::serve_mirror;

use tokio::sync::watch;

/// Prompt 接收端
pub trait PromptMirror: Send + Sync {
    fn publish(&self, prompt: &str);
}

/// 基于 watch 通道的镜像：只保留最新一条
#[derive(Debug, Clone)]
pub struct WatchMirror {
    tx: watch::Sender<String>,
}

impl WatchMirror {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(String::new());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> String {
        self.tx.borrow().clone()
    }
}

impl Default for WatchMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptMirror for WatchMirror {
    fn publish(&self, prompt: &str) {
        // 没有订阅者时 send 会失败，send_replace 总能写入
        self.tx.send_replace(prompt.to_string());
    }
}
