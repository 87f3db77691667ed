//! Prompt 镜像网页
//!
//! GET /        页面，每 2 秒拉取一次 /prompt
//! GET /prompt  当前 Prompt 纯文本

use std::net::SocketAddr;

use axum::{extract::State, response::Html, routing::get, Router};
use tokio::sync::watch;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>LLM Processor Prompt</title>
    <style>
        body { font-family: monospace; padding: 20px; max-width: 1200px; margin: 0 auto; background-color: #1e1e1e; color: #d4d4d4; }
        pre { white-space: pre-wrap; background-color: #2d2d2d; padding: 15px; border-radius: 5px; }
        h1 { color: #569cd6; }
    </style>
    <script>
        function refreshContent() {
            fetch('/prompt', { headers: { 'Accept': 'text/plain' } })
                .then(response => response.text())
                .then(text => { document.getElementById('prompt-content').textContent = text; })
                .catch(error => console.error('Error:', error));
        }
        setInterval(refreshContent, 2000);
        window.onload = refreshContent;
    </script>
</head>
<body>
    <h1>LLM Processor Prompt</h1>
    <pre id="prompt-content"></pre>
</body>
</html>
"#;

pub fn router(rx: watch::Receiver<String>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/prompt", get(current_prompt))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(rx)
}

async fn index() -> Html<&'static str> {
    Html(PAGE)
}

async fn current_prompt(State(rx): State<watch::Receiver<String>>) -> String {
    rx.borrow().clone()
}

/// 在后台任务中启动镜像服务；绑定失败直接返回错误，运行期错误只记日志
pub async fn serve_mirror(
    addr: SocketAddr,
    rx: watch::Receiver<String>,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Prompt mirror: http://{}", addr);
    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(rx)).await {
            tracing::warn!("prompt mirror stopped: {}", e);
        }
    }))
}
