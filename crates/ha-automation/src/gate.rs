//! Per-clause firing state
//!
//! A [`ConditionState`] is the two-state machine behind every `when` clause
//! and every `wait`: Inactive until the condition is observed true, then
//! Active with the instant it became true. [`ClauseGate`] layers the clause's
//! decorator options (edge sensitivity, cooldown) on top.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::trace;

use crate::options::{ClauseOptions, Edge};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConditionState {
    pub is_active: bool,
    pub active_since: Option<DateTime<Utc>>,
}

impl ConditionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one evaluation result; returns true when the clause should fire
    ///
    /// Without a guard every satisfying evaluation fires (only the first one
    /// with [`Edge::Rising`]). With a guard the state must have been active
    /// for at least the guard duration; firing then resets it to Inactive.
    pub fn update(
        &mut self,
        satisfied: bool,
        now: DateTime<Utc>,
        guard: Option<Duration>,
        edge: Edge,
    ) -> bool {
        if !satisfied {
            self.reset();
            return false;
        }

        let entered = !self.is_active;
        if entered {
            self.is_active = true;
            self.active_since = Some(now);
        }

        match guard {
            None => entered || edge == Edge::Level,
            Some(guard) => {
                let since = self.active_since.unwrap_or(now);
                if now - since >= guard {
                    self.reset();
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.is_active = false;
        self.active_since = None;
    }

    /// How long the condition has been continuously true
    pub fn active_for(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.active_since.map(|since| now - since)
    }
}

/// Condition state of one `when` clause plus its firing rules
#[derive(Debug, Clone)]
pub struct ClauseGate {
    options: ClauseOptions,
    guard: Option<Duration>,
    state: ConditionState,
    last_fired: Option<DateTime<Utc>>,
}

impl ClauseGate {
    pub fn new(options: ClauseOptions, guard: Option<Duration>) -> Self {
        Self {
            options,
            guard,
            state: ConditionState::new(),
            last_fired: None,
        }
    }

    pub fn options(&self) -> &ClauseOptions {
        &self.options
    }

    pub fn state(&self) -> &ConditionState {
        &self.state
    }

    pub fn guard(&self) -> Option<Duration> {
        self.guard
    }

    /// Feed one evaluation result; returns true when the clause may fire
    ///
    /// The cooldown window only starts once the firing is [`commit`]ted.
    ///
    /// [`commit`]: ClauseGate::commit
    pub fn check(&mut self, satisfied: bool, now: DateTime<Utc>) -> bool {
        if !self
            .state
            .update(satisfied, now, self.guard, self.options.edge)
        {
            return false;
        }

        if let (Some(cooldown), Some(last)) = (self.options.cooldown, self.last_fired) {
            if now - last < cooldown {
                trace!(?cooldown, "Clause fired within cooldown, suppressed");
                return false;
            }
        }

        true
    }

    /// Record that the clause actually ran at `now`
    pub fn commit(&mut self, now: DateTime<Utc>) {
        self.last_fired = Some(now);
    }

    pub fn last_fired(&self) -> Option<DateTime<Utc>> {
        self.last_fired
    }

    /// [`check`](ClauseGate::check) and commit in one step
    pub fn update(&mut self, satisfied: bool, now: DateTime<Utc>) -> bool {
        let fires = self.check(satisfied, now);
        if fires {
            self.commit(now);
        }
        fires
    }
}
