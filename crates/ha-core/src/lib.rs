//! Core runtime types for the home automation language
//!
//! This crate provides the fundamental types shared by the automation engine
//! and its collaborators: Value, Event, Context, ActionCall and Clock.

mod action_call;
mod clock;
mod context;
mod event;
mod value;

pub use action_call::ActionCall;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use context::Context;
pub use event::{Event, EventKind, EventOrigin};
pub use value::Value;

/// Standard event types understood by the engine
pub mod events {
    /// Event type for entity state changes
    pub const STATE_CHANGED: &str = "state_changed";

    /// Synthetic event used to discover elapsed duration gates and wait timeouts
    pub const TICK: &str = "tick";

    /// Wildcard used by bus subscribers that want every event
    pub const MATCH_ALL: &str = "*";
}
