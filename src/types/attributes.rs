use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque attribute bag carried by databases, nodes, messages and signals.
///
/// Format parsers drop vendor metadata here (e.g. `GenMsgCycleTime`, AUTOSAR E2E or
/// SecOC properties); the codec never interprets it.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Per-language descriptions keyed by language code (`"EN"`, `"DE"`, ...).
pub type Comments = BTreeMap<String, String>;

/// Language a plain `with_comment` files its text under.
pub const DEFAULT_LANGUAGE: &str = "EN";

/// The default-language comment, else the first one in language-code order.
pub(crate) fn preferred_comment(comments: &Comments) -> Option<&str> {
    comments
        .get(DEFAULT_LANGUAGE)
        .or_else(|| comments.values().next())
        .map(String::as_str)
}

/// Concrete attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Hex(u64), // kept numeric, hex only when displayed
    Float(f64),
    Enum(String),
}

impl AttributeValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Hex(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) | AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => write!(f, "{}", s),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Hex(h) => write!(f, "0x{:X}", h),
            AttributeValue::Float(x) => {
                // compact, no trailing zeros
                let mut s = format!("{}", x);
                if s.contains('.') {
                    while s.ends_with('0') {
                        s.pop();
                    }
                    if s.ends_with('.') {
                        s.pop();
                    }
                }
                write!(f, "{}", s)
            }
            AttributeValue::Enum(s) => write!(f, "{}", s),
        }
    }
}
