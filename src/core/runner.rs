//! 步进驱动循环
//!
//! get_next_action -> （可选校验）-> execute_command，直到目标判定成立、步数用尽或被取消。
//! 终止策略完全在这里，LlmProcessor 本身不决定何时停止。

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::{ExecutionHistory, LlmProcessor, ProcessorError};
use crate::decision::Decision;

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    /// 实际分发的步数
    pub steps: usize,
    pub goal_reached: bool,
    pub cancelled: bool,
    /// 每一步模型给出的决策（按顺序）
    pub decisions: Vec<Decision>,
}

pub struct StepRunner {
    max_steps: usize,
    validate_before_dispatch: bool,
    cancel_token: CancellationToken,
}

impl StepRunner {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps,
            validate_before_dispatch: false,
            cancel_token: CancellationToken::new(),
        }
    }

    /// 分发前校验 required 参数；不通过只告警，仍然分发（由实现返回错误状态）
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_before_dispatch = enabled;
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 驱动 processor 直到 goal_reached 返回 true；未知命令等错误直接返回
    pub async fn run<G>(
        &self,
        processor: &mut LlmProcessor,
        goal_reached: G,
    ) -> Result<RunReport, ProcessorError>
    where
        G: Fn(&ExecutionHistory) -> bool,
    {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", run_id = %run_id);
        self.drive(processor, goal_reached, run_id)
            .instrument(span)
            .await
    }

    async fn drive<G>(
        &self,
        processor: &mut LlmProcessor,
        goal_reached: G,
        run_id: Uuid,
    ) -> Result<RunReport, ProcessorError>
    where
        G: Fn(&ExecutionHistory) -> bool,
    {
        let mut report = RunReport {
            run_id,
            steps: 0,
            goal_reached: false,
            cancelled: false,
            decisions: Vec::new(),
        };

        for step in 1..=self.max_steps {
            if self.cancel_token.is_cancelled() {
                tracing::info!(step, "run cancelled");
                report.cancelled = true;
                break;
            }
            tracing::info!(step, max_steps = self.max_steps, "step");

            let decision = tokio::select! {
                d = processor.get_next_action() => d,
                _ = self.cancel_token.cancelled() => {
                    tracing::info!(step, "run cancelled while waiting for a decision");
                    report.cancelled = true;
                    break;
                }
            };
            tracing::info!(
                command_id = decision.action.command_id,
                fallback = decision.is_fallback(),
                reasoning = %decision.analysis.reasoning,
                "decision"
            );

            if self.validate_before_dispatch {
                let check = processor
                    .validate_command_params(decision.action.command_id, &decision.action.parameters);
                if !check.valid {
                    tracing::warn!(command_id = decision.action.command_id, "{}", check.message);
                }
            }

            let result = processor.execute_decision(&decision).await?;
            tracing::info!(result = %result, "action result");
            report.decisions.push(decision);
            report.steps = step;

            if goal_reached(processor.history()) {
                tracing::info!(step, "goal achieved");
                report.goal_reached = true;
                break;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CommandCatalog, GoalDescriptor};
    use crate::config::ProcessorSection;
    use crate::dispatch::sync_fn;
    use crate::llm::MockLlmClient;
    use serde_json::json;
    use std::sync::Arc;

    fn processor(llm: MockLlmClient) -> LlmProcessor {
        let catalog = CommandCatalog::from_value(json!([{"id": 1, "name": "tick"}])).unwrap();
        let mut p = LlmProcessor::new(
            catalog,
            GoalDescriptor::new(json!({"ticks": 3})),
            Arc::new(llm),
            ProcessorSection {
                history_size: 10,
                summary_interval: 100,
                summary_window: 10,
            },
        )
        .unwrap();
        p.register_function("tick", sync_fn(|_| Ok(json!({"status": "success"}))));
        p
    }

    const TICK: &str = r#"{"action": {"command_id": 1, "parameters": {}}}"#;

    #[tokio::test]
    async fn test_stops_when_goal_reached() {
        let mut p = processor(MockLlmClient::new().with_fallback(TICK));
        let report = StepRunner::new(10)
            .run(&mut p, |h| h.len() >= 3)
            .await
            .unwrap();
        assert!(report.goal_reached);
        assert_eq!(report.steps, 3);
        assert_eq!(report.decisions.len(), 3);
        assert_eq!(p.history().len(), 3);
    }

    #[tokio::test]
    async fn test_step_budget_exhausted() {
        let mut p = processor(MockLlmClient::new().with_fallback(TICK));
        let report = StepRunner::new(2).run(&mut p, |_| false).await.unwrap();
        assert!(!report.goal_reached);
        assert_eq!(report.steps, 2);
    }

    #[tokio::test]
    async fn test_fallback_decision_surfaces_unknown_command() {
        let mut p = processor(MockLlmClient::new().with_fallback("not json"));
        let result = StepRunner::new(3).with_validation(true).run(&mut p, |_| false).await;
        assert!(matches!(result, Err(ProcessorError::UnknownCommand(0))));
        assert!(p.history().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_step() {
        let mut p = processor(MockLlmClient::new().with_fallback(TICK));
        let runner = StepRunner::new(5);
        runner.cancel_token().cancel();
        let report = runner.run(&mut p, |_| false).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.steps, 0);
    }
}
