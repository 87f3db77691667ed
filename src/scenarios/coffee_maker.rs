//! 咖啡机场景
//!
//! 开机 -> throttle 累计加热至少 120 秒 -> 按每杯 15 克加粉 -> 开始冲煮。
//! 机器状态保存在共享的 CoffeeMachine 中，各命令实现持有同一份 Arc。

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::core::{ExecutionHistory, LlmProcessor};
use crate::dispatch::{sync_fn, Parameters};

pub const REQUIRED_HEATING_SECS: u64 = 120;
pub const GRAMS_PER_CUP: u64 = 15;
pub const TARGET_CUPS: u64 = 2;

#[derive(Debug, Default)]
pub struct CoffeeMachine {
    powered: bool,
    /// 本次开机以来累计的加热秒数
    heating_secs: u64,
    /// 最近一次成功加粉的克数
    coffee_grams: Option<u64>,
}

impl CoffeeMachine {
    fn power(&mut self, params: &Parameters) -> Value {
        let Some(state) = params.get("power").and_then(Value::as_str) else {
            return error("Missing required parameter 'power'");
        };
        match state {
            "on" | "off" => {
                self.powered = state == "on";
                self.heating_secs = 0;
                self.coffee_grams = None;
                json!({"status": "success", "message": format!("Machine powered {}", state)})
            }
            other => error(&format!("Unknown power state '{}', expected 'on' or 'off'", other)),
        }
    }

    fn throttle(&mut self, params: &Parameters) -> Value {
        if self.powered {
            if let Some(secs) = params.get("wait_time").and_then(Value::as_u64) {
                self.heating_secs += secs;
            }
        }
        json!({"status": "accepted"})
    }

    fn ensure_ready(&self) -> Result<(), Value> {
        if !self.powered {
            return Err(error("Machine is not powered on"));
        }
        Ok(())
    }

    fn add_coffee(&mut self, params: &Parameters) -> Value {
        if let Err(e) = self.ensure_ready() {
            return e;
        }
        if self.heating_secs < REQUIRED_HEATING_SECS {
            return error(&format!(
                "Machine needs more heating time (current: {}s, required: {}s)",
                self.heating_secs, REQUIRED_HEATING_SECS
            ));
        }
        let Some(grams) = params.get("amount_grams").and_then(Value::as_u64) else {
            return error("Missing required parameter 'amount_grams'");
        };
        self.coffee_grams = Some(grams);
        json!({"status": "success", "message": format!("Added {}g coffee", grams)})
    }

    fn start_brewing(&mut self, params: &Parameters) -> Value {
        if let Err(e) = self.ensure_ready() {
            return e;
        }
        let Some(grams) = self.coffee_grams else {
            return error("No coffee grounds added");
        };
        let Some(cups) = params.get("cups").and_then(Value::as_u64) else {
            return error("Missing required parameter 'cups'");
        };
        if grams != cups * GRAMS_PER_CUP {
            return error(&format!(
                "Wrong amount of coffee. Need {}g for {} cups",
                cups * GRAMS_PER_CUP,
                cups
            ));
        }
        json!({"status": "success", "message": format!("Successfully brewing {} cups of coffee", cups)})
    }
}

fn error(message: &str) -> Value {
    json!({"status": "error", "message": message})
}

/// 以共享状态注册四个命令实现
pub fn register(processor: &mut LlmProcessor) -> Arc<Mutex<CoffeeMachine>> {
    let machine = Arc::new(Mutex::new(CoffeeMachine::default()));

    type Op = fn(&mut CoffeeMachine, &Parameters) -> Value;
    let ops: [(&str, Op); 4] = [
        ("power_coffee_machine", CoffeeMachine::power),
        ("throttle", CoffeeMachine::throttle),
        ("add_coffee", CoffeeMachine::add_coffee),
        ("start_brewing", CoffeeMachine::start_brewing),
    ];
    for (name, op) in ops {
        let machine = Arc::clone(&machine);
        processor.register_function(
            name,
            sync_fn(move |params: Parameters| {
                let mut m = machine.lock().map_err(|e| e.to_string())?;
                Ok(op(&mut m, &params))
            }),
        );
    }
    machine
}

/// 目标判定只看历史：首次成功开机后 throttle 累计 >= 120 秒，
/// 之后成功加粉 30 克，再之后成功冲煮 2 杯
pub fn is_goal_achieved(history: &ExecutionHistory) -> bool {
    let entries = history.entries();
    let Some(power_on) = entries.iter().position(|e| {
        e.command_name == "power_coffee_machine"
            && e.status.is_success()
            && e.parameter("power").and_then(Value::as_str) == Some("on")
    }) else {
        return false;
    };

    let heating: u64 = entries[power_on + 1..]
        .iter()
        .filter(|e| e.command_name == "throttle" && e.status.is_success())
        .filter_map(|e| e.parameter("wait_time").and_then(Value::as_u64))
        .sum();
    if heating < REQUIRED_HEATING_SECS {
        return false;
    }

    let Some(added) = entries[power_on + 1..].iter().position(|e| {
        e.command_name == "add_coffee"
            && e.status.is_success()
            && e.parameter("amount_grams").and_then(Value::as_u64) == Some(TARGET_CUPS * GRAMS_PER_CUP)
    }) else {
        return false;
    };
    let added = power_on + 1 + added;

    entries[added + 1..].iter().any(|e| {
        e.command_name == "start_brewing"
            && e.status.is_success()
            && e.parameter("cups").and_then(Value::as_u64) == Some(TARGET_CUPS)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(v: Value) -> Parameters {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_add_coffee_requires_power_and_heat() {
        let mut m = CoffeeMachine::default();
        let r = m.add_coffee(&params(json!({"amount_grams": 30})));
        assert_eq!(r["message"], "Machine is not powered on");

        m.power(&params(json!({"power": "on"})));
        m.throttle(&params(json!({"wait_time": 60})));
        let r = m.add_coffee(&params(json!({"amount_grams": 30})));
        assert_eq!(
            r["message"],
            "Machine needs more heating time (current: 60s, required: 120s)"
        );

        m.throttle(&params(json!({"wait_time": 60})));
        let r = m.add_coffee(&params(json!({"amount_grams": 30})));
        assert_eq!(r["status"], "success");
    }

    #[test]
    fn test_brewing_checks_grams_per_cup() {
        let mut m = CoffeeMachine::default();
        m.power(&params(json!({"power": "on"})));
        m.throttle(&params(json!({"wait_time": 120})));
        m.add_coffee(&params(json!({"amount_grams": 20})));
        let r = m.start_brewing(&params(json!({"cups": 2})));
        assert_eq!(r["message"], "Wrong amount of coffee. Need 30g for 2 cups");

        m.add_coffee(&params(json!({"amount_grams": 30})));
        let r = m.start_brewing(&params(json!({"cups": 2})));
        assert_eq!(r["status"], "success");
    }

    #[test]
    fn test_power_cycle_resets_heating() {
        let mut m = CoffeeMachine::default();
        m.power(&params(json!({"power": "on"})));
        m.throttle(&params(json!({"wait_time": 120})));
        m.power(&params(json!({"power": "off"})));
        m.power(&params(json!({"power": "on"})));
        let r = m.add_coffee(&params(json!({"amount_grams": 30})));
        assert_eq!(r["status"], "error");
    }

    #[test]
    fn test_throttle_is_always_accepted() {
        let mut m = CoffeeMachine::default();
        let r = m.throttle(&params(json!({"wait_time": 30})));
        assert_eq!(r["status"], "accepted");
        assert_eq!(m.heating_secs, 0);
    }
}
