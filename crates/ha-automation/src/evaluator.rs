//! Expression evaluation against a state oracle
//!
//! Conditions see entity references as the entity's current value. Action
//! arguments see them as the entity itself, so executors know *which* light
//! to switch rather than what state it is in.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use ha_ast::{
    BinaryOp, ClockTime, ConditionExpression, Expression, FunctionCall, Literal, RangeExpression,
};
use ha_core::Value;
use ha_validator::SymbolTable;
use regex::Regex;
use tracing::{trace, warn};

use crate::{EvalError, EvalResult, StateOracle};

/// How a bare reference evaluates; operands of operators and calls always
/// read entity state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refs {
    State,
    Entity,
}

/// Evaluates expressions at one instant
pub struct Evaluator<'a> {
    symbols: &'a SymbolTable,
    oracle: &'a dyn StateOracle,
    now: NaiveDateTime,
}

impl<'a> Evaluator<'a> {
    /// `now` is wall-clock time as seen by `now()` and `time()`
    pub fn new(symbols: &'a SymbolTable, oracle: &'a dyn StateOracle, now: NaiveDateTime) -> Self {
        Self {
            symbols,
            oracle,
            now,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Evaluate a condition, treating any evaluation error as unsatisfied
    pub fn condition(&self, condition: &ConditionExpression) -> bool {
        match self.try_condition(condition) {
            Ok(satisfied) => {
                trace!(%condition, satisfied, "Evaluated condition");
                satisfied
            }
            Err(e) => {
                warn!(%condition, error = %e, "Condition evaluation failed");
                false
            }
        }
    }

    pub fn try_condition(&self, condition: &ConditionExpression) -> EvalResult<bool> {
        match condition {
            ConditionExpression::Single { expr, .. } => Ok(self.evaluate(expr)?.is_truthy()),
            ConditionExpression::All { exprs, .. } => {
                for expr in exprs {
                    if !self.evaluate(expr)?.is_truthy() {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ConditionExpression::Any { exprs, .. } => {
                for expr in exprs {
                    if self.evaluate(expr)?.is_truthy() {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Evaluate with references resolved to entity state
    pub fn evaluate(&self, expr: &Expression) -> EvalResult<Value> {
        self.eval(expr, Refs::State)
    }

    /// Evaluate an action argument; references become [`Value::Entity`]
    pub fn argument(&self, expr: &Expression) -> EvalResult<Value> {
        self.eval(expr, Refs::Entity)
    }

    pub fn arguments(&self, call: &FunctionCall) -> EvalResult<Vec<Value>> {
        call.args.iter().map(|arg| self.argument(arg)).collect()
    }

    fn eval(&self, expr: &Expression, refs: Refs) -> EvalResult<Value> {
        match expr {
            // operands and call arguments always see entity state
            Expression::Binary { left, op, right } => self.binary(left, *op, right),
            Expression::InRange { left, range } => {
                let value = self.evaluate(left)?;
                self.in_range(&value, range).map(Value::Bool)
            }
            Expression::Paren { inner } => self.eval(inner, refs),
            Expression::FunctionCall(call) => self.call(call),
            Expression::Reference { path, .. } => self.reference(path, refs),
            Expression::Literal { value } => self.literal(value, refs),
        }
    }

    fn truthy(&self, expr: &Expression) -> EvalResult<bool> {
        Ok(self.evaluate(expr)?.is_truthy())
    }

    fn binary(
        &self,
        left: &Expression,
        op: BinaryOp,
        right: &Expression,
    ) -> EvalResult<Value> {
        let result = match op {
            BinaryOp::And => self.truthy(left)? && self.truthy(right)?,
            BinaryOp::Or => self.truthy(left)? || self.truthy(right)?,
            BinaryOp::Eq => values_equal(&self.evaluate(left)?, &self.evaluate(right)?),
            BinaryOp::Ne => !values_equal(&self.evaluate(left)?, &self.evaluate(right)?),
            BinaryOp::Gt => self.order(left, op, right)?.is_gt(),
            BinaryOp::Ge => self.order(left, op, right)?.is_ge(),
            BinaryOp::Lt => self.order(left, op, right)?.is_lt(),
            BinaryOp::Le => self.order(left, op, right)?.is_le(),
        };
        Ok(Value::Bool(result))
    }

    fn order(
        &self,
        left: &Expression,
        op: BinaryOp,
        right: &Expression,
    ) -> EvalResult<Ordering> {
        compare(&self.evaluate(left)?, &self.evaluate(right)?, op.symbol())
    }

    fn in_range(&self, value: &Value, range: &RangeExpression) -> EvalResult<bool> {
        match range {
            RangeExpression::Time { start, end } => {
                let time = value.as_time().ok_or(EvalError::TypeMismatch {
                    left: value.type_name(),
                    op: "in",
                    right: "time range",
                })?;
                Ok(ClockTime::contains(*start, *end, time))
            }
            RangeExpression::Value { start, end } => {
                let start = self.evaluate(start)?;
                let end = self.evaluate(end)?;
                Ok(compare(&start, value, "in")?.is_le() && compare(value, &end, "in")?.is_le())
            }
        }
    }

    fn call(&self, call: &FunctionCall) -> EvalResult<Value> {
        if call.target.is_none() {
            match call.name.as_str() {
                "now" => {
                    no_arguments(call)?;
                    return Ok(Value::Timestamp(self.now));
                }
                "time" => {
                    no_arguments(call)?;
                    return Ok(Value::Time(self.now.time()));
                }
                "all" => {
                    for arg in &call.args {
                        if !self.truthy(arg)? {
                            return Ok(Value::Bool(false));
                        }
                    }
                    return Ok(Value::Bool(true));
                }
                "any" => {
                    for arg in &call.args {
                        if self.truthy(arg)? {
                            return Ok(Value::Bool(true));
                        }
                    }
                    return Ok(Value::Bool(false));
                }
                "not" => {
                    let [arg] = call.args.as_slice() else {
                        return Err(bad_arguments(call, "one argument"));
                    };
                    return Ok(Value::Bool(!self.truthy(arg)?));
                }
                "matches" => {
                    let [value, pattern] = call.args.as_slice() else {
                        return Err(bad_arguments(call, "a value and a pattern"));
                    };
                    let value = self.evaluate(value)?;
                    let pattern = self.evaluate(pattern)?;
                    return matches_pattern(&value, &pattern).map(Value::Bool);
                }
                _ => {}
            }
        }

        let args = call
            .args
            .iter()
            .map(|arg| self.evaluate(arg))
            .collect::<EvalResult<Vec<_>>>()?;
        self.oracle.call(call.target.as_deref(), &call.name, &args)
    }

    fn reference(&self, path: &[String], refs: Refs) -> EvalResult<Value> {
        let symbol = self
            .symbols
            .resolve(path)
            .map_err(|_| EvalError::Unresolved(path.join(".")))?;

        Ok(match refs {
            Refs::State => self.oracle.resolve(symbol).unwrap_or(Value::Null),
            Refs::Entity => Value::Entity {
                path: symbol.path.clone(),
                id: symbol.external_id.clone(),
            },
        })
    }

    fn literal(&self, literal: &Literal, refs: Refs) -> EvalResult<Value> {
        Ok(match literal {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(n.as_f64()),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Duration(d) => Value::Duration(d.to_std()),
            Literal::ClockTime(t) => Value::Time(t.to_naive_time()),
            Literal::Timestamp(ts) => Value::Timestamp(*ts),
            Literal::Object(properties) => {
                let map = properties
                    .iter()
                    .map(|p| -> EvalResult<(String, Value)> {
                        Ok((p.key.clone(), self.eval(&p.value, refs)?))
                    })
                    .collect::<EvalResult<_>>()?;
                Value::Object(map)
            }
            Literal::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.eval(item, refs))
                    .collect::<EvalResult<_>>()?,
            ),
        })
    }
}

fn no_arguments(call: &FunctionCall) -> EvalResult<()> {
    if call.args.is_empty() {
        Ok(())
    } else {
        Err(bad_arguments(call, "no arguments"))
    }
}

fn bad_arguments(call: &FunctionCall, expected: &'static str) -> EvalError {
    EvalError::BadArguments {
        name: call.qualified_name(),
        expected,
    }
}

fn matches_pattern(value: &Value, pattern: &Value) -> EvalResult<bool> {
    let Value::String(pattern) = pattern else {
        return Err(EvalError::BadArguments {
            name: "matches".to_string(),
            expected: "a string pattern",
        });
    };

    let re = Regex::new(pattern).map_err(|e| EvalError::InvalidRegex {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;

    if value.is_null() {
        return Ok(false);
    }
    Ok(re.is_match(&value.to_string()))
}

/// "on"/"true" and "off"/"false", as entity states spell booleans
fn bool_word(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "on" | "true" => Some(true),
        "off" | "false" => Some(false),
        _ => None,
    }
}

/// Loose equality between runtime values
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            bool_word(s) == Some(*b)
        }
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.trim().parse::<f64>().map_or(false, |v| v == *n)
        }
        (Value::Time(_), _) | (_, Value::Time(_)) => match (left.as_time(), right.as_time()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        (Value::Entity { path: a, .. }, Value::Entity { path: b, .. }) => a == b,
        _ => left == right,
    }
}

/// Ordering between runtime values; `op` only labels the error
pub fn compare(left: &Value, right: &Value, op: &'static str) -> EvalResult<Ordering> {
    let ordering = match (left, right) {
        (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Time(_), _) | (_, Value::Time(_)) => {
            left.as_time().zip(right.as_time()).map(|(a, b)| a.cmp(&b))
        }
        (Value::String(a), Value::String(b)) => match (left.as_f64(), right.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => Some(a.cmp(b)),
        },
        _ => left
            .as_f64()
            .zip(right.as_f64())
            .and_then(|(x, y)| x.partial_cmp(&y)),
    };

    ordering.ok_or(EvalError::TypeMismatch {
        left: left.type_name(),
        op,
        right: right.type_name(),
    })
}
