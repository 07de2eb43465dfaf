//! Async service driving the automation engine from the event bus

use ha_core::{Clock, Event, SharedClock};
use ha_event_bus::EventBus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::AutomationEngine;
use crate::runtime::CompiledProgram;

/// Feeds every bus event to the engine, one at a time, and fires periodic
/// ticks so waits and duration gates are noticed without state changes
pub struct AutomationService {
    engine: Arc<Mutex<AutomationEngine>>,
    event_bus: Arc<EventBus>,
    clock: SharedClock,
    tick_interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl AutomationService {
    pub fn new(
        engine: AutomationEngine,
        event_bus: Arc<EventBus>,
        clock: SharedClock,
        tick_interval: Duration,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            engine: Arc::new(Mutex::new(engine)),
            event_bus,
            clock,
            tick_interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Shared handle to the engine
    pub fn engine(&self) -> Arc<Mutex<AutomationEngine>> {
        self.engine.clone()
    }

    /// Start processing events
    ///
    /// Subscribes before returning, so events fired after `start` are seen.
    /// Returns `None` when the service is already running.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Automation service already running");
            return None;
        }

        info!(tick_interval = ?self.tick_interval, "Starting automation service");

        let mut event_rx = self.event_bus.subscribe_all();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let engine = self.engine.clone();
        let event_bus = self.event_bus.clone();
        let clock = self.clock.clone();
        let running = self.running.clone();
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    event_result = event_rx.recv() => {
                        match event_result {
                            Ok(event) => {
                                let outcome = engine.lock().await.process_event(&event);
                                if !outcome.fired.is_empty() {
                                    debug!(fired = outcome.fired.len(), "Event processed");
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!("Automation service lagged by {} events", n);
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                info!("Event bus closed, stopping automation service");
                                break;
                            }
                        }
                    }
                    _ = ticker.tick() => {
                        event_bus.fire(Event::tick(clock.now()));
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Received shutdown signal");
                        break;
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("Automation service stopped");
        }))
    }

    /// Stop the service
    pub fn stop(&self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        info!("Stopping automation service");
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Swap in a new program; state of the old one is discarded
    pub async fn reload(&self, compiled: CompiledProgram) {
        info!(
            automations = compiled.program.automations.len(),
            "Reloading program"
        );
        self.engine
            .lock()
            .await
            .load(compiled.program, compiled.symbols);
    }
}
