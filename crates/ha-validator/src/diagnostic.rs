use ha_ast::Span;
use serde::Serialize;
use std::fmt;

use crate::SymbolTable;

/// Kind of node a diagnostic is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Site,
    Area,
    Device,
    Entity,
    Property,
    Reference,
    Decorator,
    Wait,
}

/// One validation problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub node: NodeKind,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, node: NodeKind, span: Span) -> Self {
        Self {
            message: message.into(),
            node,
            span,
        }
    }

    /// 1-based line and column of the offending node in `source`
    pub fn location(&self, source: &str) -> (usize, usize) {
        let offset = self.span.start.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(nl) => before[nl + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        (line, column)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of validating one program
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// In the order they were found
    pub diagnostics: Vec<Diagnostic>,
    pub symbols: SymbolTable,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The symbol table when valid, otherwise every diagnostic
    pub fn into_result(self) -> Result<SymbolTable, Vec<Diagnostic>> {
        if self.diagnostics.is_empty() {
            Ok(self.symbols)
        } else {
            Err(self.diagnostics)
        }
    }
}
