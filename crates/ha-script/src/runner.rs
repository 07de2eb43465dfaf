//! Action block runner
//!
//! A block runs statement by statement until it ends or reaches a `wait`.
//! A wait never blocks: the runner hands back a [`PendingWait`] holding the
//! resume point, and whoever owns it polls it again on later events.

use chrono::{DateTime, Duration, Utc};
use ha_ast::{ActionBlock, ActionStatement, FunctionCall};
use ha_automation::{ConditionState, Edge, Evaluator};
use ha_core::{ActionCall, Context};
use tracing::{debug, warn};

use crate::ActionExecutor;

/// A suspended action block
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWait {
    /// Index of the `wait` statement in its block
    pub wait_index: usize,
    pub suspended_at: DateTime<Utc>,
    /// `None` waits forever
    pub deadline: Option<DateTime<Utc>>,
    /// How long the condition must hold
    pub for_duration: Duration,
    pub state: ConditionState,
    /// Context of the run, reused for the statements after the wait
    pub context: Context,
}

impl PendingWait {
    /// Statement to continue with once the wait completes
    pub fn resume_at(&self) -> usize {
        self.wait_index + 1
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

/// How a run or a poll ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every statement ran
    Completed,
    /// Stopped at a wait that is still pending
    Suspended(PendingWait),
    /// A wait timed out; the rest of the block was dropped
    Abandoned,
}

/// Runs action blocks at one instant
pub struct ScriptRunner<'a> {
    evaluator: Evaluator<'a>,
    executor: &'a dyn ActionExecutor,
    now: DateTime<Utc>,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(evaluator: Evaluator<'a>, executor: &'a dyn ActionExecutor, now: DateTime<Utc>) -> Self {
        Self {
            evaluator,
            executor,
            now,
        }
    }

    pub fn evaluator(&self) -> &Evaluator<'a> {
        &self.evaluator
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Run `block` starting at statement `from`
    pub fn run(&self, block: &ActionBlock, from: usize, context: &Context) -> RunOutcome {
        for (index, statement) in block.iter().enumerate().skip(from) {
            match statement {
                ActionStatement::Invoke { call } => self.invoke(call, context),
                ActionStatement::WaitFor {
                    for_duration,
                    timeout,
                    ..
                } => {
                    let wait = PendingWait {
                        wait_index: index,
                        suspended_at: self.now,
                        deadline: timeout.map(|t| self.now + t.to_chrono()),
                        for_duration: for_duration.to_chrono(),
                        state: ConditionState::new(),
                        context: context.clone(),
                    };
                    debug!(
                        statement = index,
                        deadline = ?wait.deadline,
                        "Action block suspended at wait"
                    );
                    return RunOutcome::Suspended(wait);
                }
            }
        }
        RunOutcome::Completed
    }

    /// Check a pending wait against the current state
    ///
    /// The condition is checked before the deadline, so a wait satisfied on
    /// the same event that reaches its timeout still resumes.
    pub fn poll(&self, block: &ActionBlock, mut wait: PendingWait) -> RunOutcome {
        let Some(ActionStatement::WaitFor { condition, .. }) = block.get(wait.wait_index) else {
            warn!(statement = wait.wait_index, "Pending wait no longer points at a wait");
            return RunOutcome::Abandoned;
        };

        let satisfied = self.evaluator.condition(condition);
        if wait
            .state
            .update(satisfied, self.now, Some(wait.for_duration), Edge::Level)
        {
            debug!(statement = wait.wait_index, "Wait completed, resuming");
            return self.run(block, wait.resume_at(), &wait.context);
        }

        if wait.is_expired(self.now) {
            debug!(
                statement = wait.wait_index,
                skipped = block.len() - wait.resume_at(),
                "Wait timed out, abandoning the rest of the block"
            );
            return RunOutcome::Abandoned;
        }

        RunOutcome::Suspended(wait)
    }

    fn invoke(&self, call: &FunctionCall, context: &Context) {
        let action = call.qualified_name();
        let args = match self.evaluator.arguments(call) {
            Ok(args) => args,
            Err(e) => {
                warn!(%action, error = %e, "Could not evaluate action arguments");
                return;
            }
        };

        let call = ActionCall::new(call.target.clone(), call.name.clone(), args, context.child());
        debug!(%action, args = call.args.len(), "Invoking action");

        if let Err(e) = self.executor.invoke(call) {
            warn!(%action, error = %e, "Action failed");
        }
    }
}
