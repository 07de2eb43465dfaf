//! Runtime for the home automation language
//!
//! Ties the front-end and the engine halves together:
//!
//! ```text
//! source → ha-parser → ha-validator → AutomationEngine ← events (EventBus)
//!                                          │
//!                                          ├─ StateOracle (StateStore)
//!                                          └─ ActionExecutor (ActionRegistry)
//! ```
//!
//! # Key Types
//!
//! - [`AutomationEngine`] - Per-clause duration gates and pending waits
//! - [`LanguageRuntime`] - Parse, validate and activate programs
//! - [`AutomationService`] - Async loop feeding bus events and ticks to the engine

pub mod engine;
pub mod error;
pub mod runtime;
pub mod service;

pub use engine::{AutomationEngine, ClauseKey, EventOutcome};
pub use error::{LoadError, LoadResult};
pub use runtime::{compile, compile_file, CompiledProgram, LanguageRuntime};
pub use service::AutomationService;
