//! Runtime value model
//!
//! Values are what the state oracle hands back for an entity and what
//! expressions evaluate to. Entity states arrive as strings most of the time
//! ("on", "23.5"), so the accessors here coerce loosely.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A dynamically typed runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Unknown or missing state
    #[default]
    Null,

    Bool(bool),

    Number(f64),

    String(String),

    Duration(Duration),

    /// Clock time of day
    Time(NaiveTime),

    Timestamp(NaiveDateTime),

    Array(Vec<Value>),

    Object(IndexMap<String, Value>),

    /// A declared entity, passed to actions by reference rather than by state
    Entity {
        /// Canonical `site.area.device.entity` path
        path: String,
        /// External entity id bound by the declaration's `id` property
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

impl Value {
    /// Check if the value is Null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the value as a number, parsing numeric strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Get the value as a string slice if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a clock time
    ///
    /// Timestamps contribute their time part; strings are parsed as
    /// `HH:MM` or `HH:MM:SS`.
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            Value::Timestamp(ts) => Some(ts.time()),
            Value::String(s) => {
                let s = s.trim();
                NaiveTime::parse_from_str(s, "%H:%M:%S")
                    .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                    .ok()
            }
            _ => None,
        }
    }

    /// Interpret the value as a boolean
    ///
    /// Strings follow entity state conventions: empty, "false", "no", "off",
    /// "0" and "none" are false, everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => is_truthy_str(s),
            Value::Duration(d) => !d.is_zero(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Time(_) | Value::Timestamp(_) | Value::Entity { .. } => true,
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Duration(_) => "duration",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Entity { .. } => "entity",
        }
    }

    /// Convert to JSON for collaborators that speak serde_json
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Duration(d) => serde_json::Value::from(d.as_secs()),
            Value::Time(t) => serde_json::Value::String(t.format("%H:%M:%S").to_string()),
            Value::Timestamp(ts) => {
                serde_json::Value::String(ts.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Entity { path, id } => match id {
                Some(id) => serde_json::Value::String(id.clone()),
                None => serde_json::Value::String(path.clone()),
            },
        }
    }
}

fn is_truthy_str(value: &str) -> bool {
    let trimmed = value.trim().to_lowercase();

    if trimmed.is_empty() {
        return false;
    }

    !matches!(trimmed.as_str(), "false" | "no" | "off" | "0" | "none")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Duration(d) => write!(f, "{}s", d.as_secs()),
            Value::Time(t) => {
                if t.second() == 0 {
                    write!(f, "{}", t.format("%H:%M"))
                } else {
                    write!(f, "{}", t.format("%H:%M:%S"))
                }
            }
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S")),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Entity { path, .. } => write!(f, "{}", path),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Value::Time(t)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}
