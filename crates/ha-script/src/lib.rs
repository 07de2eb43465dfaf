//! Action half of the automation engine
//!
//! Runs the action block of a fired `when` clause:
//!
//! - `do`/`call` statements become [`ha_core::ActionCall`]s handed to an
//!   [`ActionExecutor`]. A failing action is logged and the block goes on.
//! - `wait` statements suspend the block as a [`PendingWait`] that is polled
//!   on later events until its condition holds long enough or it times out.
//!
//! # Key Types
//!
//! - [`ActionExecutor`] - Carries out action calls
//! - [`ScriptRunner`] - Runs and resumes action blocks
//! - [`PendingWait`] - A suspended block's resume point

pub mod error;
pub mod executor;
pub mod runner;

pub use error::{ActionError, ActionResult};
pub use executor::{ActionExecutor, RecordingExecutor};
pub use runner::{PendingWait, RunOutcome, ScriptRunner};
