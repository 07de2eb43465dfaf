//! Parsed clauses evaluated against a state oracle and driven through their gates

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use ha_automation::{ClauseGate, ClauseOptions, EvalError, EvalResult, Evaluator, StateOracle};
use ha_core::Value;
use ha_validator::{EntitySymbol, SymbolTable};
use std::collections::HashMap;
use std::sync::Mutex;

const HOUSE: &str = "
home 'House' house {
  area 'Living room' living {
    device 'Climate' climate {
      entities: [
        sensor temp = 'sensor.living_temp',
        sensor humidity = 'sensor.living_humidity',
        climate ac = 'climate.living_ac'
      ];
    }
  }
}
";

/// Entity values plus one oracle-provided function, `attr(entity, name)`
#[derive(Default)]
struct House {
    values: Mutex<HashMap<String, Value>>,
    attributes: HashMap<(String, String), Value>,
}

impl House {
    fn set(&self, id: &str, value: impl Into<Value>) {
        self.values.lock().unwrap().insert(id.to_string(), value.into());
    }
}

impl StateOracle for House {
    fn resolve(&self, entity: &EntitySymbol) -> Option<Value> {
        self.values
            .lock()
            .unwrap()
            .get(entity.external_id.as_deref()?)
            .cloned()
    }

    fn call(&self, target: Option<&str>, name: &str, args: &[Value]) -> EvalResult<Value> {
        match (target, name, args) {
            (None, "attr", [Value::String(id), Value::String(key)]) => Ok(self
                .attributes
                .get(&(id.clone(), key.clone()))
                .cloned()
                .unwrap_or(Value::Null)),
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }
}

struct Clause {
    automation: ha_ast::Automation,
    symbols: SymbolTable,
}

fn clause(automation: &str) -> Clause {
    let mut program = ha_parser::parse(&format!("{HOUSE}\n{automation}")).unwrap();
    let symbols = ha_validator::validate(&program).into_result().unwrap();
    Clause {
        automation: program.automations.remove(0),
        symbols,
    }
}

impl Clause {
    fn gate(&self) -> ClauseGate {
        let when = &self.automation.when_clauses[0];
        let options = ClauseOptions::for_clause(&self.automation, when);
        ClauseGate::new(options, options.guard(when))
    }

    fn holds(&self, house: &House, at: DateTime<Utc>) -> bool {
        Evaluator::new(&self.symbols, house, at.naive_utc())
            .condition(&self.automation.when_clauses[0].condition)
    }
}

fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 15, 0, 0).unwrap() + Duration::seconds(secs)
}

#[test]
fn test_any_group_with_duration_guard() {
    let c = clause(
        "automation 'Muggy' {
           when any for 1m {
             house.living.climate.temp > 28.0;
             house.living.climate.humidity > 70;
           } { do notify('muggy'); }
         }",
    );
    let house = House::default();
    let mut gate = c.gate();

    house.set("sensor.living_temp", "24.0");
    house.set("sensor.living_humidity", 75);
    assert!(!gate.update(c.holds(&house, t(0)), t(0)));

    // Switching which branch holds keeps the group continuously true
    house.set("sensor.living_humidity", 60);
    house.set("sensor.living_temp", "29.5");
    assert!(!gate.update(c.holds(&house, t(30)), t(30)));
    assert!(gate.update(c.holds(&house, t(60)), t(60)));
}

#[test]
fn test_cooldown_and_rising_edge_together() {
    let c = clause(
        "automation 'AC' {
           @edge(rising) @cooldown(10m)
           when house.living.climate.ac == 'off' && house.living.climate.temp >= 26 {
             do house.living.climate.ac.set_mode('cool');
           }
         }",
    );
    let house = House::default();
    let mut gate = c.gate();

    house.set("climate.living_ac", "off");
    house.set("sensor.living_temp", 26);
    assert!(gate.update(c.holds(&house, t(0)), t(0)));
    assert!(!gate.update(c.holds(&house, t(10)), t(10)));

    // Re-armed by a false evaluation, but still inside the cooldown
    house.set("sensor.living_temp", 25);
    assert!(!gate.update(c.holds(&house, t(20)), t(20)));
    house.set("sensor.living_temp", 27);
    assert!(!gate.update(c.holds(&house, t(30)), t(30)));

    house.set("sensor.living_temp", 25);
    gate.update(c.holds(&house, t(590)), t(590));
    house.set("sensor.living_temp", 27);
    assert!(gate.update(c.holds(&house, t(600)), t(600)));
}

#[test]
fn test_oracle_functions_and_regex_builtin() {
    let c = clause(
        "automation {
           when attr('climate.living_ac', 'hvac_mode') == 'cool'
             && matches(house.living.climate.ac, '^(on|cooling)$') {
             do log();
           }
         }",
    );
    let mut house = House::default();
    house
        .attributes
        .insert(("climate.living_ac".into(), "hvac_mode".into()), Value::from("cool"));
    house.set("climate.living_ac", "cooling");

    assert!(c.holds(&house, t(0)));
    house.set("climate.living_ac", "idle");
    assert!(!c.holds(&house, t(0)));
}

#[test]
fn test_unknown_function_makes_the_condition_false() {
    let c = clause("automation { when forecast('tomorrow') > 30 { do x(); } }");
    let house = House::default();

    let evaluator = Evaluator::new(&c.symbols, &house, t(0).naive_utc());
    let condition = &c.automation.when_clauses[0].condition;
    assert_eq!(
        evaluator.try_condition(condition),
        Err(EvalError::UnknownFunction("forecast".to_string()))
    );
    assert!(!evaluator.condition(condition));
}

#[test]
fn test_timestamps_compare_against_now() {
    let c = clause("automation { when now() >= 2024-07-01T15:00:00 { do x(); } }");
    let house = House::default();

    let before = NaiveDate::from_ymd_opt(2024, 7, 1)
        .and_then(|d| d.and_hms_opt(14, 59, 59))
        .unwrap();
    let evaluator = Evaluator::new(&c.symbols, &house, before);
    assert!(!evaluator.condition(&c.automation.when_clauses[0].condition));
    assert!(c.holds(&house, t(0)));
}
