//! Physical signal values.
//!
//! A decoded signal is either a number, a named choice from the signal's value table,
//! or the "invalid" marker. Equality is explicit per variant: numbers compare by value
//! across `Integer`/`Unsigned`/`Float`, named choices compare by raw key and label.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::attributes::Comments;

/// Decoded (or to-be-encoded) values keyed by signal name.
pub type SignalValues = BTreeMap<String, Value>;

/// Entry of a signal's value table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NamedChoice {
    /// Raw (pre-scaling) integer the label stands for.
    pub raw: i64,
    pub label: String,
    /// Per-language descriptions. Not part of equality.
    #[serde(default, skip_serializing_if = "Comments::is_empty")]
    pub comments: Comments,
}

impl NamedChoice {
    pub fn new(raw: i64, label: impl Into<String>) -> Self {
        Self {
            raw,
            label: label.into(),
            comments: Comments::new(),
        }
    }
}

impl PartialEq for NamedChoice {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.label == other.label
    }
}

impl fmt::Display for NamedChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Value of one signal in one frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    /// Exact integer (raw value, or physical value of an integer-scaled signal).
    Integer(i64),
    /// Exact integer above `i64::MAX`, only produced by 64-bit unsigned fields.
    Unsigned(u64),
    Float(f64),
    /// Value-table entry.
    Named(NamedChoice),
    /// The frame carried the signal's configured invalid sentinel.
    Invalid,
}

impl Value {
    /// Numeric view. `None` for named choices and the invalid marker.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Unsigned(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Named(_) | Value::Invalid => None,
        }
    }

    /// Integer view; floats only when they carry no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Exact integer view across `Integer` and `Unsigned`.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Integer(v) => Some(*v as i128),
            Value::Unsigned(v) => Some(*v as i128),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&NamedChoice> {
        match self {
            Value::Named(choice) => Some(choice),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Value::Invalid)
    }

    /// Formats the value with its unit: numbers get `"<value> <unit>"`,
    /// named choices and the invalid marker never carry the unit.
    ///
    /// ```
    /// use can_codec::{NamedChoice, Value};
    ///
    /// assert_eq!(Value::Float(1.5).format_with_unit(Some("m")), "1.5 m");
    /// assert_eq!(Value::Named(NamedChoice::new(2, "Error")).format_with_unit(Some("m")), "Error");
    /// assert_eq!(Value::Integer(3).format_with_unit(None), "3");
    /// ```
    pub fn format_with_unit(&self, unit: Option<&str>) -> String {
        match (self, unit) {
            (Value::Integer(_) | Value::Unsigned(_) | Value::Float(_), Some(u))
                if !u.is_empty() =>
            {
                format!("{} {}", self, u)
            }
            _ => self.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(_) | Value::Unsigned(_), Value::Integer(_) | Value::Unsigned(_)) => {
                self.as_i128() == other.as_i128()
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Unsigned(a), Value::Float(b)) | (Value::Float(b), Value::Unsigned(a)) => {
                *a as f64 == *b
            }
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            (Value::Named(a), Value::Named(b)) => a == b,
            (Value::Invalid, Value::Invalid) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Unsigned(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Named(choice) => write!(f, "{}", choice),
            Value::Invalid => f.write_str("<invalid>"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Unsigned(v),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<NamedChoice> for Value {
    fn from(choice: NamedChoice) -> Self {
        Value::Named(choice)
    }
}
