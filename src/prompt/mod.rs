//! Prompt 组装
//!
//! 纯函数：同样的输入总是得到逐字节相同的输出，不含随机性与 I/O。
//! - decision_prompt：单步决策（知识 / 准则 / 命令目录 / 目标 / 历史窗口 / 回复格式）
//! - extraction_prompt、merge_prompt：知识提炼的两个阶段

use crate::catalog::{CommandCatalog, GoalDescriptor};
use crate::core::HistoryEntry;

const DECISION_GUIDELINES: &str = "\
- Analyze the execution history to understand what has been tried
- Consider the current state in relation to the goal
- Choose ONE next action that brings you closer to the goal
- Provide clear reasoning for why this specific action is the best next step
- Do not try to plan multiple steps ahead - focus only on the immediate next action";

const RESPONSE_FORMAT: &str = r#"Analyze the current state and provide a single next action. Your response must be a JSON object:

{
  "analysis": {
    "current_situation": "Brief assessment of the current state",
    "history_consideration": "How past actions influence this decision",
    "reasoning": "Detailed explanation of why this specific action is the best next step"
  },
  "action": {
    "command_id": 0,
    "parameters": {
      // Parameters for the chosen command
    },
    "expected_outcome": "What you expect this action to achieve towards the goal"
  }
}"#;

/// 决策 Prompt 的全部输入
#[derive(Debug, Clone, Copy)]
pub struct DecisionPromptInput<'a> {
    pub knowledge: &'a str,
    pub catalog: &'a CommandCatalog,
    pub goal: &'a GoalDescriptor,
    /// 已截取好的历史窗口
    pub history: &'a [HistoryEntry],
    /// 窗口大小（写入标题）
    pub history_size: usize,
}

pub fn history_to_json(history: &[HistoryEntry]) -> String {
    serde_json::to_string_pretty(history).unwrap_or_else(|_| "[]".to_string())
}

pub fn decision_prompt(input: &DecisionPromptInput<'_>) -> String {
    format!(
        "# LLM Processor Task\n\n\
         ## Best Practices, Useful Findings and Extracted Helpful Knowledge\n{knowledge}\n\n\
         ## Decision Making Guidelines\n{guidelines}\n\n\
         ## Available Commands\n{catalog}\n\n\
         ## Goal Configuration\n{goal}\n\n\
         ## Execution History (Last N={size} Actions)\n{history}\n\n\
         ## Your Response Format\n{format}",
        knowledge = input.knowledge,
        guidelines = DECISION_GUIDELINES,
        catalog = input.catalog.to_prompt_json(),
        goal = input.goal.to_prompt_json(),
        size = input.history_size,
        history = history_to_json(input.history),
        format = RESPONSE_FORMAT,
    )
}

/// 提炼第一阶段：从最近窗口中抽取新的发现
pub fn extraction_prompt(
    catalog: &CommandCatalog,
    goal: &GoalDescriptor,
    window: &[HistoryEntry],
    summary_window: usize,
) -> String {
    format!(
        "\nYou are tasked with extracting new 'best practices, useful findings and extracted helpful knowledge' \
         from the recent {count} steps of the agent. \nHere are the details:\n\n\
         ## Goal:\n{goal}\n\n\
         ## Functions:\n{catalog}\n\n\
         ## Recent Execution History (Last B={summary_window} steps):\n{history}\n\n\
         Please summarize any new best practices, useful findings and extracted helpful knowledge \
         (concise bullet points) that are gleaned specifically from these steps.\n\
         Return them in plain text.\n",
        count = window.len(),
        goal = goal.to_prompt_json(),
        catalog = catalog.to_prompt_json(),
        history = history_to_json(window),
    )
}

/// 提炼第二阶段：把已有知识与新片段合并为一份
pub fn merge_prompt(previous: &str, fragment: &str) -> String {
    format!(
        "\nYou have two sets of best practices, useful findings and extracted helpful knowledge:\n\n\
         1) The previous knowledge:\n{previous}\n\n\
         2) The newly extracted knowledge:\n{fragment}\n\n\
         Please merge them into a single, coherent set of best practices, useful findings and extracted helpful knowledge. \n\
         Make sure to avoid duplication and preserve important details.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Parameters;
    use serde_json::json;

    fn catalog() -> CommandCatalog {
        CommandCatalog::from_value(json!({"functions": [{"id": 1, "name": "add"}]})).unwrap()
    }

    fn entries(n: i64) -> Vec<HistoryEntry> {
        (1..=n)
            .map(|i| {
                HistoryEntry::new(i, "add", Parameters::new(), json!({"status": "success"}), format!("step-{i}"))
            })
            .collect()
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let catalog = catalog();
        let goal = GoalDescriptor::new(json!({"target": 14}));
        let history = entries(1);
        let prompt = decision_prompt(&DecisionPromptInput {
            knowledge: "KNOWLEDGE-MARKER",
            catalog: &catalog,
            goal: &goal,
            history: &history,
            history_size: 10,
        });
        let order = [
            "KNOWLEDGE-MARKER",
            "## Decision Making Guidelines",
            "## Available Commands",
            "\"name\": \"add\"",
            "## Goal Configuration",
            "\"target\": 14",
            "## Execution History (Last N=10 Actions)",
            "step-1",
            "## Your Response Format",
            "\"expected_outcome\"",
        ];
        let mut cursor = 0;
        for marker in order {
            let pos = prompt[cursor..]
                .find(marker)
                .unwrap_or_else(|| panic!("{marker} missing or out of order"));
            cursor += pos + marker.len();
        }
    }

    #[test]
    fn test_decision_prompt_is_deterministic() {
        let catalog = catalog();
        let goal = GoalDescriptor::new(json!({"target": 14}));
        let history = entries(3);
        let input = DecisionPromptInput {
            knowledge: "k",
            catalog: &catalog,
            goal: &goal,
            history: &history,
            history_size: 2,
        };
        assert_eq!(decision_prompt(&input), decision_prompt(&input));
    }

    #[test]
    fn test_extraction_and_merge_prompts() {
        let catalog = catalog();
        let goal = GoalDescriptor::new(json!("reach 14"));
        let window = entries(2);
        let p = extraction_prompt(&catalog, &goal, &window, 15);
        assert!(p.contains("recent 2 steps"));
        assert!(p.contains("Last B=15 steps"));
        assert!(p.contains("step-2"));

        let m = merge_prompt("OLD", "NEW");
        assert!(m.find("OLD").unwrap() < m.find("NEW").unwrap());
    }
}
