//! 计算器场景：add / multiply / submit_result，目标是提交 14

use serde_json::{json, Number, Value};

use crate::core::{ExecutionHistory, LlmProcessor};
use crate::dispatch::{async_fn, sync_fn, Parameters};

pub const TARGET: i64 = 14;

/// 两个操作数都是整数时结果保持整数，否则按浮点计算
fn combine(params: &Parameters, int_op: fn(i64, i64) -> Option<i64>, float_op: fn(f64, f64) -> f64) -> Option<Value> {
    let a = params.get("a")?;
    let b = params.get("b")?;
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(v) = int_op(x, y) {
            return Some(Value::from(v));
        }
    }
    let v = float_op(a.as_f64()?, b.as_f64()?);
    Number::from_f64(v).map(Value::Number)
}

fn missing_operands() -> Value {
    json!({"status": "error", "message": "Parameters 'a' and 'b' must both be numbers"})
}

fn add(params: Parameters) -> Result<Value, String> {
    Ok(match combine(&params, i64::checked_add, |x, y| x + y) {
        Some(value) => json!({
            "status": "success",
            "message": format!("Added {} + {}", params["a"], params["b"]),
            "value": value
        }),
        None => missing_operands(),
    })
}

fn multiply(params: Parameters) -> Result<Value, String> {
    Ok(match combine(&params, i64::checked_mul, |x, y| x * y) {
        Some(value) => json!({
            "status": "success",
            "message": format!("Multiplied {} * {}", params["a"], params["b"]),
            "value": value
        }),
        None => missing_operands(),
    })
}

pub fn register(processor: &mut LlmProcessor) {
    processor.register_function("add", sync_fn(add));
    processor.register_function("multiply", sync_fn(multiply));
    processor.register_function(
        "submit_result",
        async_fn(|params: Parameters| async move {
            Ok(match params.get("value") {
                Some(value) => json!({
                    "status": "success",
                    "message": format!("Submitted result: {}", value),
                    "value": value
                }),
                None => json!({"status": "error", "message": "Missing required parameter 'value'"}),
            })
        }),
    );
}

/// 存在一次成功的 submit_result 且提交值等于 14
pub fn is_goal_achieved(history: &ExecutionHistory) -> bool {
    history.iter().any(|e| {
        e.command_name == "submit_result"
            && e.status.is_success()
            && e.parameter("value").and_then(Value::as_f64) == Some(TARGET as f64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(v: Value) -> Parameters {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_integer_operands_stay_integer() {
        let r = add(params(json!({"a": 4, "b": 3}))).unwrap();
        assert_eq!(r["value"], json!(7));
        assert_eq!(r["message"], "Added 4 + 3");
        let r = multiply(params(json!({"a": 7, "b": 2}))).unwrap();
        assert_eq!(r["value"], json!(14));
    }

    #[test]
    fn test_float_operands() {
        let r = multiply(params(json!({"a": 2.5, "b": 2}))).unwrap();
        assert_eq!(r["value"].as_f64(), Some(5.0));
    }

    #[test]
    fn test_missing_operand_is_error_status() {
        let r = add(params(json!({"a": 1}))).unwrap();
        assert_eq!(r["status"], "error");
    }
}
