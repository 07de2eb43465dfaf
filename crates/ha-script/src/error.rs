//! Action execution errors

use thiserror::Error;

/// Raised by an [`crate::ActionExecutor`]; opaque to the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("No handler registered for action: {0}")]
    NotFound(String),

    #[error("Invalid arguments for {action}: {message}")]
    InvalidArguments { action: String, message: String },

    #[error("Action {action} failed: {message}")]
    Failed { action: String, message: String },
}

/// Result type for action execution
pub type ActionResult<T> = Result<T, ActionError>;
