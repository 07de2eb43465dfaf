//! Semantic validation for the home automation language
//!
//! Builds a path-keyed [`SymbolTable`] from the topology declarations and
//! checks every reference, decorator and wait statement in the automations
//! against it. Problems accumulate as [`Diagnostic`]s; validation never stops
//! at the first one.

mod decorators;
mod diagnostic;
mod symbols;
mod validator;

pub use diagnostic::{Diagnostic, NodeKind, ValidationReport};
pub use symbols::{EntitySymbol, ResolveError, SymbolTable};
pub use validator::{validate, SemanticValidator};
