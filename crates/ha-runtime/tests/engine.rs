//! Engine behaviour over a real state store and event bus

use chrono::{TimeZone, Utc};
use ha_core::{Context, Event, ManualClock, Value};
use ha_event_bus::EventBus;
use ha_runtime::{AutomationEngine, ClauseKey, EventOutcome, LanguageRuntime};
use ha_script::RecordingExecutor;
use ha_state_store::StateStore;
use std::sync::Arc;
use tokio::sync::broadcast;

const FLAT: &str = "
home 'Flat' flat {
  area 'Kitchen' kitchen {
    device 'Sensors' sensors {
      entities: [
        binary_sensor motion = 'binary_sensor.kitchen_motion',
        sensor temp = 'sensor.kitchen_temperature'
      ];
    }
  }
}
";

struct Harness {
    runtime: LanguageRuntime,
    store: Arc<StateStore>,
    executor: Arc<RecordingExecutor>,
    clock: Arc<ManualClock>,
    events: broadcast::Receiver<Event>,
}

impl Harness {
    fn new(automations: &str) -> Self {
        let bus = Arc::new(EventBus::new());
        let clock = Arc::new(ManualClock::at(
            Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap(),
        ));
        let store = Arc::new(StateStore::with_clock(bus.clone(), clock.clone()));
        let executor = Arc::new(RecordingExecutor::new());
        let events = bus.subscribe_all();

        let engine = AutomationEngine::new(store.clone(), executor.clone(), clock.clone());
        let mut runtime = LanguageRuntime::new(engine);
        runtime.load(&format!("{FLAT}\n{automations}")).unwrap();

        Self {
            runtime,
            store,
            executor,
            clock,
            events,
        }
    }

    /// Write a state and feed the resulting bus event to the engine
    fn set(&mut self, entity_id: &str, value: impl Into<Value>) -> EventOutcome {
        self.store.set(entity_id, value, Context::new());
        let event = self.events.try_recv().unwrap();
        self.runtime.engine_mut().process_event(&event)
    }

    fn tick_after(&mut self, seconds: i64) -> EventOutcome {
        self.clock.advance_seconds(seconds);
        self.runtime.engine_mut().tick()
    }
}

#[test]
fn test_notify_fires_once_per_satisfying_event() {
    let mut h = Harness::new(
        "automation 'Motion' { when flat.kitchen.sensors.motion == 'on' { do notify(); } }",
    );

    assert!(h.set("binary_sensor.kitchen_motion", "off").fired.is_empty());
    assert_eq!(h.executor.action_ids(), Vec::<String>::new());

    h.set("binary_sensor.kitchen_motion", "on");
    assert_eq!(h.executor.action_ids(), vec!["notify"]);

    // Any later event re-evaluates the level-sensitive clause
    h.set("sensor.kitchen_temperature", 21.0);
    assert_eq!(h.executor.action_ids(), vec!["notify", "notify"]);

    h.set("binary_sensor.kitchen_motion", "off");
    h.tick_after(1);
    assert_eq!(h.executor.action_ids().len(), 2);
}

#[test]
fn test_duration_gate_fires_exactly_at_the_guard() {
    let mut h = Harness::new(
        "automation 'Warm' { when flat.kitchen.sensors.temp > 25 for 30s { do cool(); } }",
    );
    let key = ClauseKey::new(0, 0);

    assert!(h.set("sensor.kitchen_temperature", 26.5).fired.is_empty());
    assert!(h.runtime.engine().condition_state(key).unwrap().is_active);

    assert!(h.tick_after(29).fired.is_empty());
    assert_eq!(h.tick_after(1).fired, vec![key]);
    assert!(!h.runtime.engine().condition_state(key).unwrap().is_active);

    // Still true, but the gate has to run a full period again
    assert!(h.tick_after(1).fired.is_empty());
    assert!(h.tick_after(29).fired.is_empty());
    assert_eq!(h.tick_after(1).fired, vec![key]);
    assert_eq!(h.executor.action_ids(), vec!["cool", "cool"]);
}

#[test]
fn test_dropping_below_threshold_resets_the_gate() {
    let mut h = Harness::new(
        "automation 'Warm' { when flat.kitchen.sensors.temp > 25 for 30s { do cool(); } }",
    );

    h.set("sensor.kitchen_temperature", 26.0);
    h.clock.advance_seconds(20);
    h.set("sensor.kitchen_temperature", 24.0);
    h.clock.advance_seconds(5);
    h.set("sensor.kitchen_temperature", 26.0);

    assert!(h.tick_after(25).fired.is_empty());
    assert_eq!(h.tick_after(5).fired.len(), 1);
}

#[test]
fn test_wait_timeout_runs_none_of_the_rest() {
    let mut h = Harness::new(
        "automation 'Light' {
           @edge(rising)
           when flat.kitchen.sensors.motion == 'on' {
             do light_on();
             wait flat.kitchen.sensors.motion == 'off' for 10s timeout 5m;
             do light_off();
             do notify('cleared');
           }
         }",
    );
    let key = ClauseKey::new(0, 0);

    h.set("binary_sensor.kitchen_motion", "on");
    assert_eq!(h.runtime.engine().pending_wait_count(), 1);

    for _ in 0..4 {
        assert!(h.tick_after(60).expired.is_empty());
    }
    assert!(h.tick_after(59).expired.is_empty());
    assert_eq!(h.tick_after(1).expired, vec![key]);

    assert_eq!(h.executor.action_ids(), vec!["light_on"]);
    assert_eq!(h.runtime.engine().pending_wait_count(), 0);
}

#[test]
fn test_wait_resumes_once_the_condition_holds() {
    let mut h = Harness::new(
        "automation 'Light' {
           @edge(rising)
           when flat.kitchen.sensors.motion == 'on' {
             do light_on();
             wait flat.kitchen.sensors.motion == 'off' for 10s timeout 5m;
             do light_off();
           }
         }",
    );

    h.set("binary_sensor.kitchen_motion", "on");
    h.clock.advance_seconds(30);
    h.set("binary_sensor.kitchen_motion", "off");
    assert!(h.tick_after(9).resumed.is_empty());
    assert_eq!(h.tick_after(1).resumed, vec![ClauseKey::new(0, 0)]);

    assert_eq!(h.executor.action_ids(), vec!["light_on", "light_off"]);
}

#[test]
fn test_reload_clears_condition_state() {
    let source = "automation 'Warm' { when flat.kitchen.sensors.temp > 25 for 30s { do cool(); } }";
    let mut h = Harness::new(source);

    h.set("sensor.kitchen_temperature", 26.0);
    h.clock.advance_seconds(20);
    h.runtime.load(&format!("{FLAT}\n{source}")).unwrap();

    // Progress made before the reload is gone
    assert!(h.tick_after(15).fired.is_empty());
    assert!(h.tick_after(29).fired.is_empty());
    assert_eq!(h.tick_after(1).fired.len(), 1);
}

#[test]
fn test_conditions_see_values_and_actions_see_entities() {
    let mut h = Harness::new(
        "automation 'Report' {
           when flat.kitchen.sensors.temp in 18..22 {
             do notify('temperature', flat.kitchen.sensors.temp);
           }
         }",
    );

    h.set("sensor.kitchen_temperature", "22");
    let call = &h.executor.calls()[0];
    assert_eq!(call.args[0], Value::from("temperature"));
    assert_eq!(call.entity_ids(), vec!["sensor.kitchen_temperature"]);
}
