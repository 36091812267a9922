//! Tagged value used for variables, properties and attributes

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{KernelError, KernelResult};
use crate::ids::VariableType;

/// A typed value
///
/// The variant always matches the declared type of the slot holding it.
/// Conversions never coerce between variants; they fail with
/// [`KernelError::TypeMismatch`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Default value of a declared type (false / 0 / 0.0 / "")
    pub fn default_for(value_type: VariableType) -> Self {
        match value_type {
            VariableType::Boolean => Value::Boolean(false),
            VariableType::Integer => Value::Integer(0),
            VariableType::Float => Value::Float(0.0),
            VariableType::String => Value::String(String::new()),
        }
    }

    pub fn value_type(&self) -> VariableType {
        match self {
            Value::Boolean(_) => VariableType::Boolean,
            Value::Integer(_) => VariableType::Integer,
            Value::Float(_) => VariableType::Float,
            Value::String(_) => VariableType::String,
        }
    }

    /// Fail with `TypeMismatch` unless this value is of `expected` type
    pub fn check_type(&self, name: &str, expected: VariableType) -> KernelResult<()> {
        let actual = self.value_type();
        if actual == expected {
            Ok(())
        } else {
            Err(KernelError::TypeMismatch {
                name: name.to_string(),
                expected,
                actual,
            })
        }
    }

    pub fn as_bool(&self) -> KernelResult<bool> {
        match self {
            Value::Boolean(v) => Ok(*v),
            other => Err(other.mismatch(VariableType::Boolean)),
        }
    }

    pub fn as_integer(&self) -> KernelResult<i64> {
        match self {
            Value::Integer(v) => Ok(*v),
            other => Err(other.mismatch(VariableType::Integer)),
        }
    }

    pub fn as_float(&self) -> KernelResult<f64> {
        match self {
            Value::Float(v) => Ok(*v),
            other => Err(other.mismatch(VariableType::Float)),
        }
    }

    pub fn as_str(&self) -> KernelResult<&str> {
        match self {
            Value::String(v) => Ok(v),
            other => Err(other.mismatch(VariableType::String)),
        }
    }

    /// Numeric view used for ordering and threshold comparisons
    ///
    /// Booleans order as 0 and 1; strings have no numeric view.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Value::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::String(_) => None,
        }
    }

    /// Convert a JSON value into a value of the declared type
    ///
    /// Integral JSON numbers are accepted for float slots since JSON does not
    /// distinguish `1` from `1.0`. Everything else must match exactly.
    pub fn from_json(
        name: &str,
        value_type: VariableType,
        json: &serde_json::Value,
    ) -> KernelResult<Self> {
        let converted = match (value_type, json) {
            (VariableType::Boolean, serde_json::Value::Bool(b)) => Some(Value::Boolean(*b)),
            (VariableType::Integer, serde_json::Value::Number(n)) => n.as_i64().map(Value::Integer),
            (VariableType::Float, serde_json::Value::Number(n)) => n.as_f64().map(Value::Float),
            (VariableType::String, serde_json::Value::String(s)) => Some(Value::String(s.clone())),
            _ => None,
        };

        converted.ok_or_else(|| KernelError::TypeMismatch {
            name: name.to_string(),
            expected: value_type,
            actual: json_type(json),
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Boolean(v) => serde_json::Value::Bool(*v),
            Value::Integer(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Value::from(*v),
            Value::String(v) => serde_json::Value::String(v.clone()),
        }
    }

    fn mismatch(&self, expected: VariableType) -> KernelError {
        KernelError::TypeMismatch {
            name: "value".to_string(),
            expected,
            actual: self.value_type(),
        }
    }
}

/// Closest declared type of a JSON value, for error reporting
fn json_type(json: &serde_json::Value) -> VariableType {
    match json {
        serde_json::Value::Bool(_) => VariableType::Boolean,
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => VariableType::Integer,
        serde_json::Value::Number(_) => VariableType::Float,
        _ => VariableType::String,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
