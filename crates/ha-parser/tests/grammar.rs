//! End-to-end parsing of complete programs

use ha_ast::{ActionStatement, BinaryOp, ConditionExpression, DurationUnit, Expression, Literal};
use ha_parser::{parse, parse_condition, parse_expression};

const FLAT: &str = r#"
// Two rooms, three automations
home 'My flat' flat {
  settings {
    events { mode: websocket; }
  }

  area 'Kitchen' kitchen {
    device 'Light' light {
      entities: [
        light ceiling = 'light.kitchen_ceiling',
        light counter = 'light.kitchen_counter'
      ];
    }

    device 'Sensors' sensors {
      entities: [
        binary_sensor motion = 'binary_sensor.kitchen_motion',
        sensor temp = 'sensor.kitchen_temperature'; unit: '°C'
      ];
    }
  }

  room 'Living Room' living {
    device 'Climate' climate {
      entities: [
        climate ac = 'climate.living_ac',
        sensor temp = 'sensor.living_temperature'; unit: '°C',
        sensor humidity = 'sensor.living_humidity'; unit: '%'
      ];
    }
  }
}

@mode(restart)
automation 'Kitchen motion light' {
  when flat.kitchen.sensors.motion == 'on' {
    do flat.kitchen.light.ceiling.turn_on({ brightness: 70 });
    wait flat.kitchen.sensors.motion == 'off' for 40s timeout 10m;
    call flat.kitchen.light.ceiling.turn_off();
  }
}

automation 'AC auto cool' {
  when living.climate.temp > 25.0 for 30m {
    do climate.set_mode(living.climate.ac, 'cool');
  }
}

automation 'Extreme conditions alert' {
  /* either reading is enough */
  when any {
    living.climate.temp > 28.0;
    living.climate.humidity > 70;
  } {
    do notify.telegram('Alert!');
  }

  when (time() in 22:00..06:00) && flat.kitchen.sensors.motion == 'on' {
    do notify.telegram('Midnight snack?');
  }
}
"#;

#[test]
fn test_parse_complete_program() {
    let program = parse(FLAT).unwrap();

    assert_eq!(program.sites.len(), 1);
    let site = &program.sites[0];
    assert_eq!(site.display_name, "My flat");
    assert_eq!(site.areas.len(), 2);
    assert_eq!(site.areas[1].alias, "living");
    assert_eq!(program.entity_count(), 7);

    assert_eq!(program.automations.len(), 3);

    let motion = &program.automations[0];
    assert_eq!(motion.display_name, "Kitchen motion light");
    assert_eq!(motion.decorators[0].name, "mode");
    assert_eq!(motion.when_clauses[0].actions.len(), 3);

    let cool = &program.automations[1];
    let ConditionExpression::Single { for_duration, .. } = &cool.when_clauses[0].condition else {
        panic!("expected single condition");
    };
    let guard = for_duration.unwrap();
    assert_eq!((guard.value, guard.unit), (30, DurationUnit::Minutes));

    let alert = &program.automations[2];
    assert_eq!(alert.when_clauses.len(), 2);
    assert!(matches!(
        &alert.when_clauses[0].condition,
        ConditionExpression::Any { exprs, .. } if exprs.len() == 2
    ));
}

#[test]
fn test_action_arguments_keep_their_shape() {
    let program = parse(FLAT).unwrap();
    let ActionStatement::Invoke { call } = &program.automations[1].when_clauses[0].actions[0]
    else {
        panic!("expected invoke");
    };

    assert_eq!(call.target.as_deref(), Some("climate"));
    assert_eq!(call.name, "set_mode");
    assert_eq!(
        call.args,
        vec![
            Expression::Reference {
                path: vec!["living".into(), "climate".into(), "ac".into()],
                span: match &call.args[0] {
                    Expression::Reference { span, .. } => *span,
                    _ => panic!("expected reference"),
                },
            },
            Expression::literal(Literal::String("cool".into())),
        ]
    );
}

#[test]
fn test_precedence_properties() {
    let expr = parse_expression("a > 1 && a < 2 || b > 3").unwrap();
    assert_eq!(expr.to_string(), "a > 1 && a < 2 || b > 3");
    let Expression::Binary { left, op: BinaryOp::Or, right } = expr else {
        panic!("expected Or at the root");
    };
    assert_eq!(left.binary_op(), Some(BinaryOp::And));
    assert_eq!(right.binary_op(), Some(BinaryOp::Gt));

    let expr = parse_expression("a > 1 || a < 2 && b > 3").unwrap();
    let Expression::Binary { left, op: BinaryOp::Or, right } = expr else {
        panic!("expected Or at the root");
    };
    assert_eq!(left.binary_op(), Some(BinaryOp::Gt));
    assert_eq!(right.binary_op(), Some(BinaryOp::And));
}

#[test]
fn test_duration_guard_seconds() {
    for (src, secs) in [("5s", 5), ("5m", 300), ("2h", 7200), ("0s", 0)] {
        let cond = parse_condition(&format!("x == 1 for {src}")).unwrap();
        assert_eq!(cond.for_duration().unwrap().as_secs(), secs, "{src}");
    }
}

#[test]
fn test_ast_serializes_to_json() {
    let program = parse(FLAT).unwrap();
    let json = serde_json::to_value(&program).unwrap();
    assert_eq!(json["sites"][0]["alias"], "flat");
    assert_eq!(json["automations"][1]["when_clauses"][0]["condition"]["kind"], "single");
}

#[test]
fn test_syntax_error_position() {
    let src = "home flat {\n  area 'Kitchen' kitchen {\n    device 'Light' light {\n      entities: [ light ceiling 'light.x' ];\n    }\n  }\n}";
    let err = parse(src).unwrap_err();

    assert_eq!(err.line, 4);
    assert_eq!(err.found, "`'light.x'`");
    assert!(err.expected.contains(&"`=`".to_string()), "{err}");
    assert!(err.expected.contains(&"`{`".to_string()), "{err}");
}

#[test]
fn test_range_membership_is_the_loosest_binding() {
    // Without parentheses the range would have to end the condition
    let src = "automation { when time() in 22:00..06:00 && a.b.c == 'on' { do x(); } }";
    assert!(parse(src).is_err());

    let program = parse(FLAT).unwrap();
    let ConditionExpression::Single { expr, .. } = &program.automations[2].when_clauses[1].condition
    else {
        panic!("expected single condition");
    };
    let Expression::Binary { left, op: BinaryOp::And, .. } = expr else {
        panic!("expected And at the root");
    };
    assert!(matches!(
        left.as_ref(),
        Expression::Paren { inner } if matches!(inner.as_ref(), Expression::InRange { .. })
    ));
}

#[test]
fn test_empty_source_is_an_empty_program() {
    let program = parse("  // nothing here\n").unwrap();
    assert!(program.sites.is_empty());
    assert!(program.automations.is_empty());
}
