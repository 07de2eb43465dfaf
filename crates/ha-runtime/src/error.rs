//! Program loading errors

use ha_parser::SyntaxError;
use ha_validator::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for program loading
pub type LoadResult<T> = Result<T, LoadError>;

/// Why a program could not be activated
///
/// Loading never partially succeeds: on any error the engine keeps
/// whatever program it had before.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// Every diagnostic, in the order the validator found them
    #[error("program has {} validation error(s), first: {}", .0.len(), first_message(.0))]
    Validation(Vec<Diagnostic>),

    #[error("failed to read program {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn first_message(diagnostics: &[Diagnostic]) -> &str {
    diagnostics.first().map_or("none", |d| d.message.as_str())
}
