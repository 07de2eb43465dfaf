//! Engine options read from decorators
//!
//! Unknown decorators and malformed arguments are ignored here; the
//! validator has already reported the malformed ones.

use chrono::Duration;
use ha_ast::{find_decorator, Automation, Decorator, DecoratorArg, WhenClause};
use serde::{Deserialize, Serialize};

/// What happens when a clause fires while its previous run is suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Ignore the new firing while a run is pending
    #[default]
    Single,

    /// Discard the pending run and start from the top
    Restart,
}

/// Which satisfying evaluations fire an unguarded clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    /// Every one
    #[default]
    Level,

    /// Only the first after the condition was false
    Rising,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClauseOptions {
    pub mode: ExecutionMode,
    pub cooldown: Option<Duration>,
    pub edge: Edge,
    pub debounce: Option<Duration>,
}

impl ClauseOptions {
    /// Options for one clause; clause decorators win over automation ones
    pub fn for_clause(automation: &Automation, clause: &WhenClause) -> Self {
        let mode = match identifier(&automation.decorators, "mode") {
            Some("restart") => ExecutionMode::Restart,
            _ => ExecutionMode::Single,
        };
        let edge = match identifier(&clause.decorators, "edge") {
            Some("rising") => Edge::Rising,
            _ => Edge::Level,
        };

        Self {
            mode,
            cooldown: duration(&clause.decorators, "cooldown")
                .or_else(|| duration(&automation.decorators, "cooldown")),
            edge,
            debounce: duration(&clause.decorators, "debounce"),
        }
    }

    /// The duration guard: the clause's `for`, else `@debounce`
    pub fn guard(&self, clause: &WhenClause) -> Option<Duration> {
        clause
            .condition
            .for_duration()
            .map(|d| d.to_chrono())
            .or(self.debounce)
    }
}

fn identifier<'a>(decorators: &'a [Decorator], name: &str) -> Option<&'a str> {
    match find_decorator(decorators, name)?.args.as_slice() {
        [DecoratorArg::Identifier(value)] => Some(value),
        _ => None,
    }
}

fn duration(decorators: &[Decorator], name: &str) -> Option<Duration> {
    match find_decorator(decorators, name)?.args.as_slice() {
        [DecoratorArg::Duration(d)] => Some(d.to_chrono()),
        _ => None,
    }
}
