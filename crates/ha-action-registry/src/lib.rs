//! Action registry with async handlers
//!
//! Fired automations issue [`ActionCall`]s. The registry routes each call to
//! the handler registered for it and runs the handler on the tokio runtime,
//! so the engine never waits for an action to finish.
//!
//! Lookup order for a call `target.name(...)`:
//! 1. a handler registered for the full `target.name`
//! 2. a handler registered for the bare `name` (e.g. `turn_on` for any target)
//! 3. the fallback handler, if one is set

use dashmap::DashMap;
use ha_core::ActionCall;
use ha_script::{ActionError, ActionExecutor, ActionResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

/// Future type for async action handlers
pub type ActionFuture = Pin<Box<dyn Future<Output = ActionResult<()>> + Send>>;

/// Action handler function type
pub type ActionHandler = Arc<dyn Fn(ActionCall) -> ActionFuture + Send + Sync>;

/// The action registry manages all registered action handlers
pub struct ActionRegistry {
    /// Handlers indexed by "target.name" or "name"
    handlers: DashMap<String, ActionHandler>,
    fallback: RwLock<Option<ActionHandler>>,
}

impl ActionRegistry {
    /// Create a new empty action registry
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            fallback: RwLock::new(None),
        }
    }

    /// A registry that logs every call it receives and does nothing else
    pub fn logging() -> Self {
        let registry = Self::new();
        registry.set_fallback(|call: ActionCall| async move {
            info!(
                action = %call.action_id(),
                args = ?call.args.iter().map(ToString::to_string).collect::<Vec<_>>(),
                automation = call.context.automation.as_deref().unwrap_or("-"),
                "Action invoked"
            );
            Ok(())
        });
        registry
    }

    /// Register a handler for `action` ("notify", "notify.telegram", ...)
    #[instrument(skip(self, action, handler), fields(action = %action.as_ref()))]
    pub fn register<F, Fut>(&self, action: impl AsRef<str>, handler: F)
    where
        F: Fn(ActionCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<()>> + Send + 'static,
    {
        debug!("Registering action handler");
        self.handlers
            .insert(action.as_ref().to_string(), box_handler(handler));
    }

    /// Handler for calls nothing else matches
    pub fn set_fallback<F, Fut>(&self, handler: F)
    where
        F: Fn(ActionCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<()>> + Send + 'static,
    {
        *self.fallback.write().unwrap_or_else(|e| e.into_inner()) = Some(box_handler(handler));
    }

    /// Find the handler for a call, following the lookup order
    pub fn handler_for(&self, call: &ActionCall) -> Option<ActionHandler> {
        self.handlers
            .get(&call.action_id())
            .or_else(|| self.handlers.get(&call.name))
            .map(|h| h.clone())
            .or_else(|| {
                self.fallback
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone()
            })
    }

    /// Call an action and wait for its handler to finish
    #[instrument(skip(self, call), fields(action = %call.action_id()))]
    pub async fn call(&self, call: ActionCall) -> ActionResult<()> {
        let handler = self.handler_for(&call).ok_or_else(|| {
            warn!("Action not found");
            ActionError::NotFound(call.action_id())
        })?;

        debug!("Calling action");
        handler(call).await
    }

    /// Check if a handler is registered under exactly this key
    pub fn has_action(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Registered keys, sorted
    pub fn actions(&self) -> Vec<String> {
        let mut actions: Vec<_> = self.handlers.iter().map(|h| h.key().clone()).collect();
        actions.sort();
        actions
    }

    /// Unregister an action
    #[instrument(skip(self))]
    pub fn unregister(&self, action: &str) -> bool {
        let removed = self.handlers.remove(action).is_some();
        if removed {
            debug!("Unregistered action");
        }
        removed
    }

    /// Get total number of registered handlers
    pub fn action_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire-and-forget: the handler runs on its own task and failures are logged
impl ActionExecutor for ActionRegistry {
    fn invoke(&self, call: ActionCall) -> ActionResult<()> {
        let action = call.action_id();
        let handler = self
            .handler_for(&call)
            .ok_or_else(|| ActionError::NotFound(action.clone()))?;

        let runtime = Handle::try_current().map_err(|e| ActionError::Failed {
            action: action.clone(),
            message: e.to_string(),
        })?;

        runtime.spawn(async move {
            if let Err(e) = handler(call).await {
                warn!(%action, error = %e, "Action handler failed");
            }
        });
        Ok(())
    }
}

fn box_handler<F, Fut>(handler: F) -> ActionHandler
where
    F: Fn(ActionCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionResult<()>> + Send + 'static,
{
    Arc::new(move |call| Box::pin(handler(call)) as ActionFuture)
}

/// Thread-safe wrapper for ActionRegistry
pub type SharedActionRegistry = Arc<ActionRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use ha_core::{Context, Value};
    use tokio::sync::mpsc;

    fn call(target: Option<&str>, name: &str) -> ActionCall {
        ActionCall::new(target.map(str::to_string), name, vec![], Context::new())
    }

    #[tokio::test]
    async fn test_register_and_call() {
        let registry = ActionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.register("notify", move |call: ActionCall| {
            let tx = tx.clone();
            async move {
                tx.send(call.args).ok();
                Ok(())
            }
        });

        let mut notify = call(None, "notify");
        notify.args.push(Value::from("hello"));
        registry.call(notify).await.unwrap();

        assert_eq!(rx.recv().await, Some(vec![Value::from("hello")]));
    }

    #[tokio::test]
    async fn test_action_not_found() {
        let registry = ActionRegistry::new();
        let result = registry.call(call(Some("light"), "turn_on")).await;
        assert_eq!(result, Err(ActionError::NotFound("light.turn_on".to_string())));
    }

    #[test]
    fn test_lookup_order() {
        let registry = ActionRegistry::new();
        registry.register("flat.kitchen.light.turn_on", |_| async { Ok(()) });
        registry.register("turn_on", |_| async {
            Err(ActionError::Failed {
                action: "turn_on".to_string(),
                message: "generic".to_string(),
            })
        });

        let exact = registry.handler_for(&call(Some("flat.kitchen.light"), "turn_on")).unwrap();
        assert!(tokio_test::block_on(exact(call(None, "x"))).is_ok());

        let generic = registry.handler_for(&call(Some("hall.light"), "turn_on")).unwrap();
        assert!(tokio_test::block_on(generic(call(None, "x"))).is_err());

        assert!(registry.handler_for(&call(None, "notify")).is_none());
        registry.set_fallback(|_| async { Ok(()) });
        assert!(registry.handler_for(&call(None, "notify")).is_some());
    }

    #[tokio::test]
    async fn test_invoke_spawns_handler() {
        let registry = ActionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.register("climate.set_mode", move |call: ActionCall| {
            let tx = tx.clone();
            async move {
                tx.send(call.action_id()).ok();
                Ok(())
            }
        });

        registry.invoke(call(Some("climate"), "set_mode")).unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("climate.set_mode"));
    }

    #[test]
    fn test_invoke_without_runtime_fails() {
        let registry = ActionRegistry::logging();
        let result = registry.invoke(call(None, "notify"));
        assert!(matches!(result, Err(ActionError::Failed { .. })));
    }

    #[test]
    fn test_unregister() {
        let registry = ActionRegistry::new();
        registry.register("notify", |_| async { Ok(()) });
        registry.register("light.turn_on", |_| async { Ok(()) });

        assert_eq!(registry.actions(), vec!["light.turn_on", "notify"]);
        assert!(registry.unregister("notify"));
        assert!(!registry.unregister("notify"));
        assert!(!registry.has_action("notify"));
        assert_eq!(registry.action_count(), 1);
    }
}
