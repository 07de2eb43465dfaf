//! Expression evaluation errors

use thiserror::Error;

/// Why an expression could not be evaluated
///
/// The engine treats any of these as "condition not satisfied" for the
/// evaluation that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Reference '{0}' does not resolve to an entity")]
    Unresolved(String),

    #[error("Cannot evaluate {left} {op} {right}")]
    TypeMismatch {
        left: &'static str,
        op: &'static str,
        right: &'static str,
    },

    #[error("Function '{name}' expects {expected}")]
    BadArguments { name: String, expected: &'static str },

    #[error("Invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
}

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;
