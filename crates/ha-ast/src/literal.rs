//! Literal values and the small sublanguages behind them

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Expression, Property};

/// A literal value as written in source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Bool(bool),
    Number(Number),
    String(String),
    Duration(DurationLiteral),
    ClockTime(ClockTime),
    /// `YYYY-MM-DDTHH:MM:SS`
    Timestamp(NaiveDateTime),
    Object(Vec<Property>),
    Array(Vec<Expression>),
}

/// Numeric literal, keeping whether it was written as an integer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Number::Int(_))
    }
}

/// Unit of a duration literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
}

impl DurationUnit {
    pub fn seconds(self) -> u64 {
        match self {
            DurationUnit::Seconds => 1,
            DurationUnit::Minutes => 60,
            DurationUnit::Hours => 3600,
        }
    }

    pub fn suffix(self) -> char {
        match self {
            DurationUnit::Seconds => 's',
            DurationUnit::Minutes => 'm',
            DurationUnit::Hours => 'h',
        }
    }

    pub fn from_suffix(c: char) -> Option<Self> {
        match c {
            's' => Some(DurationUnit::Seconds),
            'm' => Some(DurationUnit::Minutes),
            'h' => Some(DurationUnit::Hours),
            _ => None,
        }
    }
}

/// `N{s,m,h}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DurationLiteral {
    pub value: u64,
    pub unit: DurationUnit,
}

impl DurationLiteral {
    pub fn new(value: u64, unit: DurationUnit) -> Self {
        Self { value, unit }
    }

    pub fn seconds(value: u64) -> Self {
        Self::new(value, DurationUnit::Seconds)
    }

    pub fn minutes(value: u64) -> Self {
        Self::new(value, DurationUnit::Minutes)
    }

    pub fn hours(value: u64) -> Self {
        Self::new(value, DurationUnit::Hours)
    }

    /// Elapsed seconds, saturating on overflow
    pub fn as_secs(&self) -> u64 {
        self.value.saturating_mul(self.unit.seconds())
    }

    pub fn to_std(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.as_secs())
    }

    /// Elapsed time as a chrono duration, for comparing against timestamps
    pub fn to_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.as_secs()).unwrap_or(i64::MAX / 1000))
    }
}

impl fmt::Display for DurationLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

/// `HH:MM` time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
}

impl ClockTime {
    /// Returns `None` unless hour < 24 and minute < 60
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Whether `time` lies in `[start, end]`, wrapping past midnight when start > end
    pub fn contains(start: ClockTime, end: ClockTime, time: NaiveTime) -> bool {
        let (start, end) = (start.to_naive_time(), end.to_naive_time());
        if start <= end {
            start <= time && time <= end
        } else {
            time >= start || time <= end
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Number(Number::Int(i)) => write!(f, "{}", i),
            Literal::Number(Number::Float(x)) => write!(f, "{:?}", x),
            Literal::String(s) => write!(f, "'{}'", s),
            Literal::Duration(d) => write!(f, "{}", d),
            Literal::ClockTime(t) => write!(f, "{}", t),
            Literal::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S")),
            Literal::Object(props) => {
                write!(f, "{{")?;
                for (i, p) in props.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", p.key, p.value)?;
                }
                write!(f, "}}")
            }
            Literal::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}
