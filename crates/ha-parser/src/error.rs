//! Syntax error reporting

use thiserror::Error;

/// Parse failure at the furthest position any alternative reached
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}, column {column}: expected {}, found {found}", join_expected(.expected))]
pub struct SyntaxError {
    /// Byte offset into the source
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column, in characters
    pub column: usize,
    /// Alternatives that would have been accepted at `offset`
    pub expected: Vec<String>,
    /// Short description of what was there instead
    pub found: String,
}

/// Result type for parse operations
pub type ParseResult<T> = Result<T, SyntaxError>;

impl SyntaxError {
    pub(crate) fn at(source: &str, offset: usize, expected: Vec<String>) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(nl) => before[nl + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };

        Self {
            offset,
            line,
            column,
            expected,
            found: describe_found(&source[offset..]),
        }
    }
}

fn describe_found(rest: &str) -> String {
    let token: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace())
        .take(16)
        .collect();

    if token.is_empty() {
        "end of input".to_string()
    } else {
        format!("`{}`", token)
    }
}

fn join_expected(expected: &[String]) -> String {
    match expected {
        [] => "valid syntax".to_string(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}
