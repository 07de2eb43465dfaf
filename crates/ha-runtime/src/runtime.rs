//! Program loading: parse, validate, activate

use ha_ast::Program;
use ha_validator::SymbolTable;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::engine::AutomationEngine;
use crate::error::{LoadError, LoadResult};

/// A parsed program that passed validation
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub program: Program,
    pub symbols: SymbolTable,
}

/// Parse and validate source text
///
/// Succeeds only when the program parses and validates with zero
/// diagnostics; otherwise every diagnostic is returned, in order.
pub fn compile(source: &str) -> LoadResult<CompiledProgram> {
    let program = ha_parser::parse(source)?;
    let report = ha_validator::validate(&program);

    match report.into_result() {
        Ok(symbols) => Ok(CompiledProgram { program, symbols }),
        Err(diagnostics) => {
            for d in &diagnostics {
                let (line, column) = d.location(source);
                warn!(line, column, node = ?d.node, "{}", d.message);
            }
            Err(LoadError::Validation(diagnostics))
        }
    }
}

/// Read and compile a program file
pub fn compile_file(path: impl AsRef<Path>) -> LoadResult<CompiledProgram> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    compile(&source)
}

/// An engine plus the loading pipeline in front of it
pub struct LanguageRuntime {
    engine: AutomationEngine,
}

impl LanguageRuntime {
    pub fn new(engine: AutomationEngine) -> Self {
        Self { engine }
    }

    /// Compile `source` and activate it, replacing the current program
    ///
    /// On error the previously loaded program stays active, state included.
    pub fn load(&mut self, source: &str) -> LoadResult<()> {
        let compiled = compile(source)?;
        self.activate(compiled);
        Ok(())
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> LoadResult<()> {
        let path = path.as_ref();
        let compiled = compile_file(path)?;
        info!(path = %path.display(), "Activating program");
        self.activate(compiled);
        Ok(())
    }

    pub fn activate(&mut self, compiled: CompiledProgram) {
        self.engine.load(compiled.program, compiled.symbols);
    }

    pub fn engine(&self) -> &AutomationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AutomationEngine {
        &mut self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ha_core::ManualClock;
    use ha_script::RecordingExecutor;
    use ha_validator::NodeKind;
    use std::sync::Arc;

    struct NoState;

    impl ha_automation::StateOracle for NoState {
        fn resolve(&self, _: &ha_validator::EntitySymbol) -> Option<ha_core::Value> {
            None
        }
    }

    fn runtime() -> LanguageRuntime {
        LanguageRuntime::new(AutomationEngine::new(
            Arc::new(NoState),
            Arc::new(RecordingExecutor::new()),
            Arc::new(ManualClock::new()),
        ))
    }

    const VALID: &str = "
        home h { area 'Hall' hall { device 'Door' door { entities: [
            binary_sensor contact = 'binary_sensor.door'
        ]; } } }
        automation 'Door' { when h.hall.door.contact == 'on' { do notify(); } }";

    #[test]
    fn test_compile_valid_program() {
        let compiled = compile(VALID).unwrap();
        assert_eq!(compiled.program.automations.len(), 1);
        assert_eq!(compiled.symbols.entity_count(), 1);
    }

    #[test]
    fn test_syntax_error_aborts_loading() {
        let err = compile("home h { area kitchen { } }").unwrap_err();
        assert!(matches!(err, LoadError::Syntax(_)));
    }

    #[test]
    fn test_validation_reports_every_diagnostic_in_order() {
        let err = compile(
            "home h { area 'A' a { } area 'B' a { } }
             automation { when h.a.x.y == 1 { do f(); } }",
        )
        .unwrap_err();

        let LoadError::Validation(diagnostics) = err else {
            panic!("expected validation errors, got {err:?}");
        };
        let kinds: Vec<_> = diagnostics.iter().map(|d| d.node).collect();
        assert_eq!(kinds, vec![NodeKind::Area, NodeKind::Reference]);
    }

    #[test]
    fn test_failed_load_keeps_previous_program() {
        let mut runtime = runtime();
        runtime.load(VALID).unwrap();
        assert_eq!(runtime.engine().clause_count(), 1);

        assert!(runtime.load("automation { when missing.path.here == 1 { do f(); } }").is_err());
        assert_eq!(runtime.engine().automation_names(), vec!["Door"]);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("house.hl");
        fs::write(&path, VALID).unwrap();

        let mut runtime = runtime();
        runtime.load_file(&path).unwrap();
        assert_eq!(runtime.engine().clause_count(), 1);

        assert!(matches!(
            runtime.load_file(dir.path().join("absent.hl")),
            Err(LoadError::Io { .. })
        ));
    }
}
