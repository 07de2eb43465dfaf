//! The action executor seam

use std::sync::{Arc, Mutex};

use ha_core::ActionCall;

use crate::ActionResult;

/// Carries out action calls issued by fired clauses
///
/// `invoke` must not block: long-running work belongs on the executor's
/// own tasks. An error is logged by the runner and the block continues.
pub trait ActionExecutor: Send + Sync {
    fn invoke(&self, call: ActionCall) -> ActionResult<()>;
}

impl<T: ActionExecutor + ?Sized> ActionExecutor for Arc<T> {
    fn invoke(&self, call: ActionCall) -> ActionResult<()> {
        (**self).invoke(call)
    }
}

/// Executor that only remembers what it was asked to do
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<ActionCall>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ActionCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// `target.name` of every recorded call, in order
    pub fn action_ids(&self) -> Vec<String> {
        self.calls().iter().map(ActionCall::action_id).collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl ActionExecutor for RecordingExecutor {
    fn invoke(&self, call: ActionCall) -> ActionResult<()> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        Ok(())
    }
}
