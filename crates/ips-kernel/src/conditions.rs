//! Condition evaluation
//!
//! A condition is a JSON list of rule groups. Only a single group with
//! variable rules is supported; date and time rules are not.

use std::cmp::Ordering;

use ips_core::constants::comparison;
use ips_core::{KernelError, KernelResult, ObjectId, Value};

use crate::kernel::Kernel;

impl Kernel {
    /// Evaluate a condition against the current variable values
    pub fn is_condition_passing(&self, condition: &str) -> KernelResult<bool> {
        let parsed: serde_json::Value = serde_json::from_str(condition)
            .map_err(|e| KernelError::invalid(format!("cannot parse condition: {}", e)))?;
        let groups = parsed
            .as_array()
            .ok_or_else(|| KernelError::invalid("condition must be a list of rule groups"))?;

        match groups.as_slice() {
            [] => Ok(true),
            [group] => self.is_group_passing(group),
            _ => Err(KernelError::not_implemented("conditions with several rule groups")),
        }
    }

    fn is_group_passing(&self, group: &serde_json::Value) -> KernelResult<bool> {
        let rules = group
            .get("rules")
            .ok_or_else(|| KernelError::invalid("rule group without rules"))?;

        for key in ["date", "time", "dayOfTheWeek"] {
            if rules.get(key).is_some_and(is_set) {
                return Err(KernelError::not_implemented(format!("{} rules", key)));
            }
        }

        let mut results = Vec::new();
        if let Some(variable_rules) = rules.get("variable").and_then(|r| r.as_array()) {
            for rule in variable_rules {
                results.push(self.is_variable_rule_passing(rule)?);
            }
        }

        match group.get("operation").and_then(|o| o.as_i64()).unwrap_or(0) {
            0 => Ok(results.iter().all(|passed| *passed)),
            1 => Ok(results.iter().any(|passed| *passed)),
            other => Err(KernelError::invalid(format!("unknown operation {}", other))),
        }
    }

    fn is_variable_rule_passing(&self, rule: &serde_json::Value) -> KernelResult<bool> {
        let current = self.get_value(object_id(rule.get("variableID"))?)?;
        let expected = match rule.get("type").and_then(|t| t.as_i64()).unwrap_or(0) {
            0 => rule
                .get("value")
                .and_then(json_to_value)
                .ok_or_else(|| KernelError::invalid("rule without comparison value"))?,
            _ => self.get_value(object_id(rule.get("value"))?)?,
        };

        let ordering = loose_cmp(&current, &expected);
        let operator = rule
            .get("comparison")
            .and_then(|c| c.as_i64())
            .ok_or_else(|| KernelError::invalid("rule without comparison"))?;
        Ok(match operator {
            comparison::EQUAL => ordering == Some(Ordering::Equal),
            comparison::NOT_EQUAL => ordering != Some(Ordering::Equal),
            comparison::GREATER => ordering == Some(Ordering::Greater),
            comparison::GREATER_OR_EQUAL => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
            comparison::SMALLER => ordering == Some(Ordering::Less),
            comparison::SMALLER_OR_EQUAL => {
                matches!(ordering, Some(Ordering::Less | Ordering::Equal))
            }
            other => return Err(KernelError::invalid(format!("unknown comparison {}", other))),
        })
    }
}

fn is_set(rule: &serde_json::Value) -> bool {
    match rule {
        serde_json::Value::Null => false,
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(fields) => !fields.is_empty(),
        _ => true,
    }
}

fn object_id(json: Option<&serde_json::Value>) -> KernelResult<ObjectId> {
    json.and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .map(ObjectId::new)
        .ok_or_else(|| KernelError::invalid("rule references an invalid object id"))
}

/// Scalar JSON to a value; arrays, objects and null have no counterpart
pub(crate) fn json_to_value(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Bool(v) => Some(Value::Boolean(*v)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .or_else(|| n.as_f64().map(Value::Float)),
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Boolean(v) => *v,
        Value::Integer(v) => *v != 0,
        Value::Float(v) => *v != 0.0,
        Value::String(s) => !s.is_empty() && s != "0",
    }
}

fn parse_numeric(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Loose comparison across value types
///
/// Booleans compare by truthiness, numeric strings compare as numbers and
/// any other string against a number compares textually.
pub(crate) fn loose_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => Some(truthy(a).cmp(&truthy(b))),
        (Value::String(x), Value::String(y)) => match (parse_numeric(x), parse_numeric(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => Some(x.cmp(y)),
        },
        (Value::String(s), number) => match parse_numeric(s) {
            Some(x) => x.partial_cmp(&number.numeric()?),
            None => Some(s.as_str().cmp(number.to_string().as_str())),
        },
        (number, Value::String(s)) => loose_cmp(&Value::String(s.clone()), number).map(Ordering::reverse),
        _ => a.numeric()?.partial_cmp(&b.numeric()?),
    }
}
