//! Action call type emitted when an automation fires

use crate::{Context, Value};
use serde::{Deserialize, Serialize};

/// Represents a call to an external action
///
/// Actions are written as `target.name(args)` or `name(args)` inside a
/// `do` block. Arguments are already evaluated; entity references arrive as
/// [`Value::Entity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCall {
    /// Dotted target the action is invoked on (e.g. "home.kitchen.light.ceiling")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// The action name (e.g. "turn_on", "notify")
    pub name: String,

    /// Evaluated arguments in call order
    pub args: Vec<Value>,

    /// Context tracking which event and automation caused this call
    pub context: Context,
}

impl ActionCall {
    /// Create a new action call
    pub fn new(
        target: Option<String>,
        name: impl Into<String>,
        args: Vec<Value>,
        context: Context,
    ) -> Self {
        Self {
            target,
            name: name.into(),
            args,
            context,
        }
    }

    /// Create a call with no target and no arguments
    pub fn simple(name: impl Into<String>, context: Context) -> Self {
        Self::new(None, name, Vec::new(), context)
    }

    /// Full action identifier used for handler lookup (`target.name` or `name`)
    pub fn action_id(&self) -> String {
        match &self.target {
            Some(target) => format!("{}.{}", target, self.name),
            None => self.name.clone(),
        }
    }

    /// Get an argument by position
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// External entity ids referenced by the arguments
    ///
    /// Arrays of entities are flattened.
    pub fn entity_ids(&self) -> Vec<String> {
        fn collect(value: &Value, out: &mut Vec<String>) {
            match value {
                Value::Entity { id: Some(id), .. } => out.push(id.clone()),
                Value::Array(items) => items.iter().for_each(|v| collect(v, out)),
                _ => {}
            }
        }

        let mut out = Vec::new();
        for arg in &self.args {
            collect(arg, &mut out);
        }
        out
    }
}
