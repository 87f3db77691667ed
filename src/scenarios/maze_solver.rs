//! 迷宫场景：从文本加载网格，`#` 墙、`.` 空地、`X` 出口，起点默认 (1, 1)

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};

use crate::core::{ExecutionHistory, LlmProcessor, ProcessorError};
use crate::dispatch::{sync_fn, Parameters};

pub const EXIT_MESSAGE: &str = "Reached the exit!";
pub const DEFAULT_START: (usize, usize) = (1, 1);

const DIRECTIONS: [(&str, (i64, i64)); 4] = [
    ("north", (0, -1)),
    ("south", (0, 1)),
    ("east", (1, 0)),
    ("west", (-1, 0)),
];

#[derive(Debug, Clone)]
pub struct MazeEnvironment {
    grid: Vec<Vec<char>>,
    position: (usize, usize),
    visited: HashSet<(usize, usize)>,
    exit: (usize, usize),
}

impl MazeEnvironment {
    pub fn parse(text: &str, start: (usize, usize)) -> Result<Self, String> {
        let grid: Vec<Vec<char>> = text
            .lines()
            .map(|l| l.trim().chars().collect::<Vec<_>>())
            .filter(|row| !row.is_empty())
            .collect();
        let exit = grid
            .iter()
            .enumerate()
            .find_map(|(y, row)| row.iter().position(|&c| c == 'X').map(|x| (x, y)))
            .ok_or_else(|| "No exit found in maze".to_string())?;
        match grid.get(start.1).and_then(|row| row.get(start.0)).copied() {
            Some('#') | None => return Err(format!("Start position {:?} is not an open cell", start)),
            _ => {}
        }
        Ok(Self {
            grid,
            position: start,
            visited: HashSet::from([start]),
            exit,
        })
    }

    pub fn load(path: impl AsRef<Path>, start: (usize, usize)) -> Result<Self, ProcessorError> {
        let path = path.as_ref();
        let scenario_err = |message: String| ProcessorError::ScenarioLoad {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| scenario_err(e.to_string()))?;
        Self::parse(&text, start).map_err(scenario_err)
    }

    pub fn position(&self) -> (usize, usize) {
        self.position
    }

    pub fn exit(&self) -> (usize, usize) {
        self.exit
    }

    fn cell(&self, x: i64, y: i64) -> Option<char> {
        if x < 0 || y < 0 {
            return None;
        }
        self.grid.get(y as usize)?.get(x as usize).copied()
    }

    fn neighbour(&self, offset: (i64, i64)) -> (i64, i64) {
        (self.position.0 as i64 + offset.0, self.position.1 as i64 + offset.1)
    }

    /// 四个方向相邻格子的内容；越界方向不出现
    pub fn adjacent_cells(&self) -> Map<String, Value> {
        DIRECTIONS
            .iter()
            .filter_map(|(name, offset)| {
                let (x, y) = self.neighbour(*offset);
                self.cell(x, y).map(|c| (name.to_string(), Value::from(c.to_string())))
            })
            .collect()
    }

    fn look_around(&self) -> Value {
        json!({
            "status": "success",
            "message": "Observed adjacent cells",
            "cells": self.adjacent_cells()
        })
    }

    fn step(&mut self, params: &Parameters) -> Value {
        let direction = params.get("direction").and_then(Value::as_str).unwrap_or_default();
        let Some((_, offset)) = DIRECTIONS.iter().find(|(name, _)| *name == direction) else {
            return json!({
                "status": "error",
                "message": format!("Unknown direction '{}', expected north, south, east or west", direction)
            });
        };
        let (x, y) = self.neighbour(*offset);
        match self.cell(x, y) {
            None => json!({"status": "error", "message": "Cannot move outside maze"}),
            Some('#') => json!({"status": "error", "message": "Cannot move into wall"}),
            Some(c) => {
                self.position = (x as usize, y as usize);
                self.visited.insert(self.position);
                let message = if c == 'X' {
                    EXIT_MESSAGE.to_string()
                } else {
                    format!("Moved {}", direction)
                };
                json!({
                    "status": "success",
                    "message": message,
                    "position": [self.position.0, self.position.1]
                })
            }
        }
    }

    fn status(&self) -> Value {
        json!({
            "status": "success",
            "position": [self.position.0, self.position.1],
            "visited_count": self.visited.len(),
            "exit_position": [self.exit.0, self.exit.1]
        })
    }
}

/// 注册 look_around / move / check_status，三者共享同一个迷宫环境
pub fn register(processor: &mut LlmProcessor, maze: MazeEnvironment) -> Arc<Mutex<MazeEnvironment>> {
    let env = Arc::new(Mutex::new(maze));

    let e = Arc::clone(&env);
    processor.register_function(
        "look_around",
        sync_fn(move |_| Ok(e.lock().map_err(|e| e.to_string())?.look_around())),
    );
    let e = Arc::clone(&env);
    processor.register_function(
        "move",
        sync_fn(move |params: Parameters| Ok(e.lock().map_err(|e| e.to_string())?.step(&params))),
    );
    let e = Arc::clone(&env);
    processor.register_function(
        "check_status",
        sync_fn(move |_| Ok(e.lock().map_err(|e| e.to_string())?.status())),
    );
    env
}

/// 存在一次成功的 move 且结果消息为到达出口
pub fn is_goal_achieved(history: &ExecutionHistory) -> bool {
    history.iter().any(|e| {
        e.command_name == "move"
            && e.status.is_success()
            && e.result_field("message").and_then(Value::as_str) == Some(EXIT_MESSAGE)
    })
}
