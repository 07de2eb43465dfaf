//! Context type for tracking the origin and causality of events and actions

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Context for tracking the origin and causality of events and action calls
///
/// Every event carries a Context. When an automation fires, the action calls
/// it issues carry a child of the triggering event's context, so a chain of
/// reactions can be traced back to the state change that started it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Unique identifier for this context (ULID)
    pub id: String,

    /// Parent context ID for tracking causality chains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Display name of the automation that produced this context (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation: Option<String>,
}

impl Context {
    /// Create a new context with a fresh ULID
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
            parent_id: None,
            automation: None,
        }
    }

    /// Create a new context with a specific ID
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            automation: None,
        }
    }

    /// Create a child context with this context as parent
    pub fn child(&self) -> Self {
        Self {
            id: Ulid::new().to_string(),
            parent_id: Some(self.id.clone()),
            automation: self.automation.clone(),
        }
    }

    /// Create a child context attributed to an automation
    pub fn child_for_automation(&self, automation: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            parent_id: Some(self.id.clone()),
            automation: Some(automation.into()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
