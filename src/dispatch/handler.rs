//! 命令实现抽象
//!
//! 所有实现都通过 CommandHandler::invoke 调用并被 await；同步闭包用 SyncFn 包装，返回 Future 的闭包用 AsyncFn 包装，
//! 分发方无需区分两者。
//!
//! 约定：业务上的失败应返回带 `"status": "error"` 的结果；返回 Err 表示实现自身出错，会原样传播给调用方。

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::dispatch::Parameters;

/// 命令实现 trait：接收参数映射，返回结果（需包含 `status` 字段）
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn invoke(&self, params: Parameters) -> Result<Value, String>;
}

/// 同步闭包适配器
pub struct SyncFn<F>(F);

/// 异步闭包适配器
pub struct AsyncFn<F>(F);

/// 包装同步实现：`sync_fn(|p| Ok(json!({"status": "success"})))`
pub fn sync_fn<F>(f: F) -> SyncFn<F>
where
    F: Fn(Parameters) -> Result<Value, String> + Send + Sync,
{
    SyncFn(f)
}

/// 包装异步实现：`async_fn(|p| async move { Ok(json!({"status": "success"})) })`
pub fn async_fn<F, Fut>(f: F) -> AsyncFn<F>
where
    F: Fn(Parameters) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, String>> + Send + 'static,
{
    AsyncFn(f)
}

#[async_trait]
impl<F> CommandHandler for SyncFn<F>
where
    F: Fn(Parameters) -> Result<Value, String> + Send + Sync,
{
    async fn invoke(&self, params: Parameters) -> Result<Value, String> {
        (self.0)(params)
    }
}

#[async_trait]
impl<F, Fut> CommandHandler for AsyncFn<F>
where
    F: Fn(Parameters) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, String>> + Send + 'static,
{
    async fn invoke(&self, params: Parameters) -> Result<Value, String> {
        (self.0)(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sync_and_async_invoke_uniformly() {
        let double = sync_fn(|p: Parameters| {
            let x = p.get("x").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!({"status": "success", "value": x * 2}))
        });
        let delayed = async_fn(|p: Parameters| async move {
            tokio::task::yield_now().await;
            let x = p.get("x").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!({"status": "success", "value": x + 1}))
        });

        let handlers: Vec<Box<dyn CommandHandler>> = vec![Box::new(double), Box::new(delayed)];
        let mut params = Parameters::new();
        params.insert("x".into(), json!(5));

        let mut values = Vec::new();
        for h in &handlers {
            values.push(h.invoke(params.clone()).await.unwrap()["value"].clone());
        }
        assert_eq!(values, vec![json!(10), json!(6)]);
    }
}
