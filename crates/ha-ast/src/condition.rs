use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DurationLiteral, Expression};

/// The condition of a `when` clause or a `wait`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionExpression {
    Single {
        expr: Expression,
        #[serde(skip_serializing_if = "Option::is_none")]
        for_duration: Option<DurationLiteral>,
    },
    /// Conjunction; a bare `{ ... }` block is an implicit `all`
    All {
        exprs: Vec<Expression>,
        #[serde(skip_serializing_if = "Option::is_none")]
        for_duration: Option<DurationLiteral>,
    },
    Any {
        exprs: Vec<Expression>,
        #[serde(skip_serializing_if = "Option::is_none")]
        for_duration: Option<DurationLiteral>,
    },
}

impl ConditionExpression {
    pub fn single(expr: Expression) -> Self {
        ConditionExpression::Single {
            expr,
            for_duration: None,
        }
    }

    /// The `for` guard, if any
    pub fn for_duration(&self) -> Option<DurationLiteral> {
        match self {
            ConditionExpression::Single { for_duration, .. }
            | ConditionExpression::All { for_duration, .. }
            | ConditionExpression::Any { for_duration, .. } => *for_duration,
        }
    }

    /// Top-level expressions of the condition
    pub fn expressions(&self) -> &[Expression] {
        match self {
            ConditionExpression::Single { expr, .. } => std::slice::from_ref(expr),
            ConditionExpression::All { exprs, .. } | ConditionExpression::Any { exprs, .. } => {
                exprs
            }
        }
    }
}

impl fmt::Display for ConditionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (keyword, exprs, guard) = match self {
            ConditionExpression::Single { expr, for_duration } => {
                write!(f, "{}", expr)?;
                if let Some(d) = for_duration {
                    write!(f, " for {}", d)?;
                }
                return Ok(());
            }
            ConditionExpression::All { exprs, for_duration } => ("all", exprs, for_duration),
            ConditionExpression::Any { exprs, for_duration } => ("any", exprs, for_duration),
        };

        write!(f, "{}", keyword)?;
        if let Some(d) = guard {
            write!(f, " for {}", d)?;
        }
        write!(f, " {{")?;
        for expr in exprs {
            write!(f, " {};", expr)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let cond = ConditionExpression::Any {
            exprs: vec![Expression::reference(["a"]), Expression::reference(["b"])],
            for_duration: Some(DurationLiteral::seconds(30)),
        };
        assert_eq!(cond.for_duration(), Some(DurationLiteral::seconds(30)));
        assert_eq!(cond.expressions().len(), 2);
        assert_eq!(cond.to_string(), "any for 30s { a; b; }");

        let single = ConditionExpression::single(Expression::reference(["x"]));
        assert_eq!(single.for_duration(), None);
        assert_eq!(single.expressions().len(), 1);
    }
}
