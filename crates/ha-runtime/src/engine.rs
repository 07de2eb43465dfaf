//! Automation engine
//!
//! Holds one [`ClauseGate`] per `(automation, when-clause)` pair of the
//! loaded program and, for each event, decides which clauses fire and runs
//! their action blocks. Suspended blocks are kept as [`PendingWait`]s under
//! the same key and polled on later events.
//!
//! The engine is synchronous and owns all of its mutable state; the async
//! [`AutomationService`](crate::AutomationService) feeds it one event at a
//! time.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use ha_ast::{Automation, EventsMode, Program, Settings};
use ha_automation::{ClauseGate, ClauseOptions, ConditionState, Evaluator, ExecutionMode, StateOracle};
use ha_core::{Event, SharedClock};
use ha_script::{ActionExecutor, PendingWait, RunOutcome, ScriptRunner};
use ha_validator::SymbolTable;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Stable identity of a when-clause within the loaded program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClauseKey {
    pub automation: usize,
    pub clause: usize,
}

impl ClauseKey {
    pub fn new(automation: usize, clause: usize) -> Self {
        Self { automation, clause }
    }
}

/// Mutable per-clause state, discarded on reload
#[derive(Debug)]
struct ClauseRuntime {
    gate: ClauseGate,
    pending: Option<PendingWait>,
}

/// What one event did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// Clauses whose action block started
    pub fired: Vec<ClauseKey>,
    /// Clauses whose pending wait completed and resumed
    pub resumed: Vec<ClauseKey>,
    /// Clauses whose pending wait timed out
    pub expired: Vec<ClauseKey>,
}

/// The trigger engine for one loaded program
pub struct AutomationEngine {
    program: Program,
    symbols: SymbolTable,
    clauses: HashMap<ClauseKey, ClauseRuntime>,
    oracle: Arc<dyn StateOracle>,
    executor: Arc<dyn ActionExecutor>,
    clock: SharedClock,
    /// Local time for `now()`, `time()` and time ranges
    utc_offset: FixedOffset,
}

impl AutomationEngine {
    /// Create an engine with no program loaded
    pub fn new(
        oracle: Arc<dyn StateOracle>,
        executor: Arc<dyn ActionExecutor>,
        clock: SharedClock,
    ) -> Self {
        Self {
            program: Program::default(),
            symbols: SymbolTable::new(),
            clauses: HashMap::new(),
            oracle,
            executor,
            clock,
            utc_offset: Utc.fix(),
        }
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Replace the program, discarding all condition states and pending waits
    pub fn load(&mut self, program: Program, symbols: SymbolTable) {
        let mut clauses = HashMap::new();
        for (a, automation) in program.automations.iter().enumerate() {
            for (c, clause) in automation.when_clauses.iter().enumerate() {
                let options = ClauseOptions::for_clause(automation, clause);
                let guard = options.guard(clause);
                debug!(
                    automation = %label(a, automation),
                    clause = c,
                    mode = ?options.mode,
                    edge = ?options.edge,
                    guard = ?guard,
                    cooldown = ?options.cooldown,
                    "Clause registered"
                );
                clauses.insert(
                    ClauseKey::new(a, c),
                    ClauseRuntime {
                        gate: ClauseGate::new(options, guard),
                        pending: None,
                    },
                );
            }
        }

        log_event_settings(&program);
        info!(
            automations = program.automations.len(),
            clauses = clauses.len(),
            entities = symbols.entity_count(),
            "Program loaded"
        );

        self.program = program;
        self.symbols = symbols;
        self.clauses = clauses;
    }

    /// Process a synthetic tick at the clock's current time
    pub fn tick(&mut self) -> EventOutcome {
        self.process_event(&Event::tick(self.clock.now()))
    }

    /// Process one event to completion
    ///
    /// Pending waits from earlier events are polled first, then every
    /// clause condition is evaluated. A wait suspended by this event is
    /// first checked on the next one.
    pub fn process_event(&mut self, event: &Event) -> EventOutcome {
        let now = event.time_fired;
        trace!(event_type = event.event_type(), entity = ?event.entity_id(), %now, "Processing event");

        let evaluator = Evaluator::new(&self.symbols, self.oracle.as_ref(), self.local_time(now));
        let runner = ScriptRunner::new(evaluator, self.executor.as_ref(), now);
        let mut outcome = EventOutcome::default();

        for (a, automation) in self.program.automations.iter().enumerate() {
            for (c, clause) in automation.when_clauses.iter().enumerate() {
                let key = ClauseKey::new(a, c);
                let Some(runtime) = self.clauses.get_mut(&key) else {
                    continue;
                };
                let Some(wait) = runtime.pending.take() else {
                    continue;
                };
                let waiting_at = wait.wait_index;

                match runner.poll(&clause.actions, wait) {
                    RunOutcome::Suspended(wait) => {
                        if wait.wait_index != waiting_at {
                            debug!(automation = %label(a, automation), clause = c, "Resumed up to the next wait");
                            outcome.resumed.push(key);
                        }
                        runtime.pending = Some(wait);
                    }
                    RunOutcome::Completed => {
                        debug!(automation = %label(a, automation), clause = c, "Action block finished after wait");
                        outcome.resumed.push(key);
                    }
                    RunOutcome::Abandoned => {
                        debug!(automation = %label(a, automation), clause = c, "Wait expired");
                        outcome.expired.push(key);
                    }
                }
            }
        }

        for (a, automation) in self.program.automations.iter().enumerate() {
            for (c, clause) in automation.when_clauses.iter().enumerate() {
                let key = ClauseKey::new(a, c);
                let Some(runtime) = self.clauses.get_mut(&key) else {
                    continue;
                };

                let satisfied = runner.evaluator().condition(&clause.condition);
                if !runtime.gate.check(satisfied, now) {
                    continue;
                }

                let name = label(a, automation);
                if runtime.pending.is_some() {
                    match runtime.gate.options().mode {
                        ExecutionMode::Single => {
                            debug!(automation = %name, clause = c, "Clause fired while waiting, ignored");
                            continue;
                        }
                        ExecutionMode::Restart => {
                            debug!(automation = %name, clause = c, "Clause fired while waiting, restarting");
                            runtime.pending = None;
                        }
                    }
                }

                debug!(automation = %name, clause = c, "Clause fired");
                runtime.gate.commit(now);
                outcome.fired.push(key);

                let context = event.context.child_for_automation(name);
                if let RunOutcome::Suspended(wait) = runner.run(&clause.actions, 0, &context) {
                    runtime.pending = Some(wait);
                }
            }
        }

        outcome
    }

    fn local_time(&self, now: DateTime<Utc>) -> chrono::NaiveDateTime {
        now.with_timezone(&self.utc_offset).naive_local()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Duration-gate state of one clause
    pub fn condition_state(&self, key: ClauseKey) -> Option<&ConditionState> {
        self.clauses.get(&key).map(|c| c.gate.state())
    }

    pub fn pending_wait(&self, key: ClauseKey) -> Option<&PendingWait> {
        self.clauses.get(&key)?.pending.as_ref()
    }

    pub fn pending_wait_count(&self) -> usize {
        self.clauses.values().filter(|c| c.pending.is_some()).count()
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    /// Display names of the loaded automations, numbered when unnamed
    pub fn automation_names(&self) -> Vec<String> {
        self.program
            .automations
            .iter()
            .enumerate()
            .map(|(i, a)| label(i, a))
            .collect()
    }
}

fn label(index: usize, automation: &Automation) -> String {
    if automation.display_name.is_empty() {
        format!("automation #{}", index + 1)
    } else {
        automation.display_name.clone()
    }
}

/// Settings belong to the event source; the engine only reports them
fn log_event_settings(program: &Program) {
    let scoped = program.sites.iter().flat_map(|site| {
        std::iter::once((site.alias.clone(), site.settings.as_ref())).chain(
            site.areas
                .iter()
                .map(move |area| (format!("{}.{}", site.alias, area.alias), area.settings.as_ref())),
        )
    });

    for (scope, settings) in scoped {
        let Some(Settings {
            events: Some(events),
            ..
        }) = settings
        else {
            continue;
        };
        let mode = match events.mode {
            EventsMode::Auto => "auto",
            EventsMode::Websocket => "websocket",
            EventsMode::Rabbitmq => "rabbitmq",
        };
        info!(%scope, mode, broker = events.broker.is_some(), "Event source settings");
    }
}
