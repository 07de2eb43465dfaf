use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ClockTime, Literal, Span};

/// An expression inside a condition, an action argument or a property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
    InRange {
        left: Box<Expression>,
        range: Box<RangeExpression>,
    },
    Paren {
        inner: Box<Expression>,
    },
    FunctionCall(FunctionCall),
    /// Dotted lookup path, at least one segment
    Reference { path: Vec<String>, span: Span },
    Literal { value: Literal },
}

impl Expression {
    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn paren(inner: Expression) -> Self {
        Expression::Paren {
            inner: Box::new(inner),
        }
    }

    pub fn literal(value: Literal) -> Self {
        Expression::Literal { value }
    }

    pub fn reference<S: Into<String>>(path: impl IntoIterator<Item = S>) -> Self {
        Expression::Reference {
            path: path.into_iter().map(Into::into).collect(),
            span: Span::default(),
        }
    }

    /// Binary operator at the root, looking through nothing
    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self {
            Expression::Binary { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Visit every reference in this expression tree, depth first
    pub fn for_each_reference<'a>(&'a self, f: &mut impl FnMut(&'a [String], Span)) {
        match self {
            Expression::Binary { left, right, .. } => {
                left.for_each_reference(f);
                right.for_each_reference(f);
            }
            Expression::InRange { left, range } => {
                left.for_each_reference(f);
                if let RangeExpression::Value { start, end } = range.as_ref() {
                    start.for_each_reference(f);
                    end.for_each_reference(f);
                }
            }
            Expression::Paren { inner } => inner.for_each_reference(f),
            Expression::FunctionCall(call) => {
                for arg in &call.args {
                    arg.for_each_reference(f);
                }
            }
            Expression::Reference { path, span } => f(path, *span),
            Expression::Literal { value } => match value {
                Literal::Object(props) => {
                    for prop in props {
                        prop.value.for_each_reference(f);
                    }
                }
                Literal::Array(items) => {
                    for item in items {
                        item.for_each_reference(f);
                    }
                }
                _ => {}
            },
        }
    }
}

/// Binary operators, comparison and logical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// `target.name(args)` or `name(args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Dotted target joined with `.`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub name: String,
    pub args: Vec<Expression>,
    pub span: Span,
}

impl FunctionCall {
    pub fn new(target: Option<String>, name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self {
            target,
            name: name.into(),
            args,
            span: Span::default(),
        }
    }

    /// `target.name` or `name`
    pub fn qualified_name(&self) -> String {
        match &self.target {
            Some(target) => format!("{}.{}", target, self.name),
            None => self.name.clone(),
        }
    }
}

/// Right-hand side of `in`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RangeExpression {
    /// Clock times, may wrap past midnight
    Time { start: ClockTime, end: ClockTime },
    Value { start: Expression, end: Expression },
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Binary { left, op, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Expression::InRange { left, range } => write!(f, "{} in {}", left, range),
            Expression::Paren { inner } => write!(f, "({})", inner),
            Expression::FunctionCall(call) => write!(f, "{}", call),
            Expression::Reference { path, .. } => write!(f, "{}", path.join(".")),
            Expression::Literal { value } => write!(f, "{}", value),
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.qualified_name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for RangeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeExpression::Time { start, end } => write!(f, "{}..{}", start, end),
            RangeExpression::Value { start, end } => write!(f, "{}..{}", start, end),
        }
    }
}
