//! The state oracle seam between the engine and whoever owns entity state

use ha_core::Value;
use ha_validator::EntitySymbol;

use crate::{EvalError, EvalResult};

/// Supplies current entity values to the evaluator
pub trait StateOracle: Send + Sync {
    /// Current value of a declared entity, `None` when it has no state yet
    fn resolve(&self, entity: &EntitySymbol) -> Option<Value>;

    /// Call a function the evaluator does not know itself
    fn call(&self, target: Option<&str>, name: &str, args: &[Value]) -> EvalResult<Value> {
        let _ = args;
        Err(EvalError::UnknownFunction(match target {
            Some(target) => format!("{}.{}", target, name),
            None => name.to_string(),
        }))
    }
}

impl<T: StateOracle + ?Sized> StateOracle for std::sync::Arc<T> {
    fn resolve(&self, entity: &EntitySymbol) -> Option<Value> {
        (**self).resolve(entity)
    }

    fn call(&self, target: Option<&str>, name: &str, args: &[Value]) -> EvalResult<Value> {
        (**self).call(target, name, args)
    }
}
