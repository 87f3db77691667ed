//! 内置场景：计算器、咖啡机、迷宫
//!
//! 每个场景的命令目录与目标描述放在 `config/scenarios/<name>/` 下（functions.json、goal.yaml，迷宫另有 maze.txt）。

pub mod calculator;
pub mod coffee_maker;
pub mod maze_solver;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::core::{ExecutionHistory, LlmProcessor, ProcessorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Calculator,
    CoffeeMaker,
    MazeSolver,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Calculator, Scenario::CoffeeMaker, Scenario::MazeSolver];

    /// 场景文档所在的子目录名
    pub fn dir_name(self) -> &'static str {
        match self {
            Scenario::Calculator => "calculator",
            Scenario::CoffeeMaker => "coffee_maker",
            Scenario::MazeSolver => "maze_solver",
        }
    }

    /// 为 processor 注册该场景的全部命令实现；dir 为场景文档目录
    pub fn install(self, processor: &mut LlmProcessor, dir: &Path) -> Result<(), ProcessorError> {
        match self {
            Scenario::Calculator => calculator::register(processor),
            Scenario::CoffeeMaker => {
                coffee_maker::register(processor);
            }
            Scenario::MazeSolver => {
                let maze = maze_solver::MazeEnvironment::load(dir.join("maze.txt"), maze_solver::DEFAULT_START)?;
                maze_solver::register(processor, maze);
            }
        }
        tracing::debug!(scenario = %self, functions = ?processor.registered_functions(), "scenario installed");
        Ok(())
    }

    pub fn is_goal_achieved(self, history: &ExecutionHistory) -> bool {
        match self {
            Scenario::Calculator => calculator::is_goal_achieved(history),
            Scenario::CoffeeMaker => coffee_maker::is_goal_achieved(history),
            Scenario::MazeSolver => maze_solver::is_goal_achieved(history),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "calculator" => Ok(Scenario::Calculator),
            "coffee_maker" | "coffee" => Ok(Scenario::CoffeeMaker),
            "maze_solver" | "maze" => Ok(Scenario::MazeSolver),
            other => Err(format!(
                "unknown scenario '{}', expected calculator, coffee_maker or maze_solver",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scenario_names() {
        assert_eq!("coffee-maker".parse::<Scenario>(), Ok(Scenario::CoffeeMaker));
        assert_eq!("Maze".parse::<Scenario>(), Ok(Scenario::MazeSolver));
        assert!("chess".parse::<Scenario>().is_err());
        for s in Scenario::ALL {
            assert_eq!(s.to_string().parse::<Scenario>(), Ok(s));
        }
    }
}
