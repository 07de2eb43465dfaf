use serde::{Deserialize, Serialize};

use crate::{ConditionExpression, DurationLiteral, FunctionCall, Span};

/// Ordered statements of a `when` clause
pub type ActionBlock = Vec<ActionStatement>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionStatement {
    /// `do call;`
    Invoke { call: FunctionCall },
    /// `wait <condition> for <duration> (timeout <duration>)?;`
    WaitFor {
        condition: ConditionExpression,
        for_duration: DurationLiteral,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<DurationLiteral>,
        span: Span,
    },
}
