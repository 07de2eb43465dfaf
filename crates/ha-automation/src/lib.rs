//! Condition half of the automation engine
//!
//! This crate decides *whether* a `when` clause fires:
//!
//! ```text
//! EVENT → Evaluator (condition vs. StateOracle) → ClauseGate (duration, edge, cooldown) → fire?
//! ```
//!
//! - [`StateOracle`] - where entity values come from
//! - [`Evaluator`] - evaluates expressions and conditions at one instant
//! - [`ConditionState`] - the Inactive/Active duration-gate state machine
//! - [`ClauseOptions`] - engine options read from `@mode`, `@cooldown`, `@edge`, `@debounce`
//!
//! Running the action block is the job of `ha-script`.

pub mod error;
pub mod evaluator;
pub mod gate;
pub mod options;
pub mod oracle;

pub use error::{EvalError, EvalResult};
pub use evaluator::{compare, values_equal, Evaluator};
pub use gate::{ClauseGate, ConditionState};
pub use options::{ClauseOptions, Edge, ExecutionMode};
pub use oracle::StateOracle;
