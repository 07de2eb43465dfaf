//! Topology and automation declarations

use serde::{Deserialize, Serialize};

use crate::{ActionBlock, ConditionExpression, DurationLiteral, Expression, Literal, Span};

/// Root of a parsed source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub sites: Vec<Site>,
    pub automations: Vec<Automation>,
}

impl Program {
    /// Number of entity declarations across all sites
    pub fn entity_count(&self) -> usize {
        self.sites
            .iter()
            .flat_map(|s| &s.areas)
            .flat_map(|a| &a.devices)
            .map(|d| d.entities.len())
            .sum()
    }
}

/// `home`/`zone` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Empty when the declaration has no display name
    pub display_name: String,
    pub alias: String,
    pub decorators: Vec<Decorator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    pub areas: Vec<Area>,
    pub span: Span,
}

/// `area`/`room` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub display_name: String,
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_type: Option<String>,
    pub decorators: Vec<Decorator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    pub devices: Vec<Device>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub display_name: String,
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    pub decorators: Vec<Decorator>,
    pub entities: Vec<Entity>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Free type tag such as `light` or `sensor`
    pub entity_type: String,
    pub alias: String,
    /// Declaration order, duplicates kept for the validator to report
    pub properties: Vec<Property>,
    pub span: Span,
}

impl Entity {
    /// First property with the given key
    pub fn property(&self, key: &str) -> Option<&Expression> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| &p.value)
    }

    /// External entity id, written either as a string or as a bare dotted id
    ///
    /// `light ceiling = 'light.kitchen'` and `light ceiling = light.kitchen`
    /// both bind `light.kitchen`.
    pub fn external_id(&self) -> Option<String> {
        match self.property("id") {
            Some(Expression::Literal {
                value: Literal::String(id),
            }) => Some(id.clone()),
            Some(Expression::Reference { path, .. }) => Some(path.join(".")),
            _ => None,
        }
    }
}

/// `key: expr` in an entity block, object literal or settings block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: Expression,
    pub span: Span,
}

impl Property {
    pub fn new(key: impl Into<String>, value: Expression) -> Self {
        Self {
            key: key.into(),
            value,
            span: Span::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    pub display_name: String,
    pub decorators: Vec<Decorator>,
    /// Never empty
    pub when_clauses: Vec<WhenClause>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenClause {
    pub decorators: Vec<Decorator>,
    pub condition: ConditionExpression,
    pub actions: ActionBlock,
    pub span: Span,
}

/// `@name(args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decorator {
    pub name: String,
    pub args: Vec<DecoratorArg>,
    pub span: Span,
}

impl Decorator {
    pub fn new(name: impl Into<String>, args: Vec<DecoratorArg>) -> Self {
        Self {
            name: name.into(),
            args,
            span: Span::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DecoratorArg {
    Identifier(String),
    String(String),
    Duration(DurationLiteral),
    Integer(i64),
}

/// Last decorator with the given name; later decorators override earlier ones
pub fn find_decorator<'a>(decorators: &'a [Decorator], name: &str) -> Option<&'a Decorator> {
    decorators.iter().rev().find(|d| d.name == name)
}

/// `settings { ... }` on a site or area
///
/// Opaque to the engine; consumed by whatever feeds it events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<EventsSettings>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsSettings {
    pub mode: EventsMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker: Option<BrokerSettings>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventsMode {
    #[default]
    Auto,
    Websocket,
    Rabbitmq,
}

impl EventsMode {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "auto" => Some(EventsMode::Auto),
            "websocket" => Some(EventsMode::Websocket),
            "rabbitmq" => Some(EventsMode::Rabbitmq),
            _ => None,
        }
    }
}

/// Message broker connection parameters (`url`, `exchange`, `queue_prefix`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerSettings {
    pub properties: Vec<Property>,
}

impl BrokerSettings {
    pub fn get(&self, key: &str) -> Option<&Expression> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| &p.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_external_id() {
        let entity = Entity {
            entity_type: "light".into(),
            alias: "ceiling".into(),
            properties: vec![Property::new(
                "id",
                Expression::literal(Literal::String("light.kitchen".into())),
            )],
            span: Span::default(),
        };
        assert_eq!(entity.external_id().as_deref(), Some("light.kitchen"));

        let dotted = Entity {
            properties: vec![Property::new(
                "id",
                Expression::reference(["binary_sensor", "kitchen_motion"]),
            )],
            ..entity.clone()
        };
        assert_eq!(dotted.external_id().as_deref(), Some("binary_sensor.kitchen_motion"));

        let unbound = Entity {
            properties: vec![Property::new(
                "id",
                Expression::literal(Literal::Bool(true)),
            )],
            ..entity
        };
        assert_eq!(unbound.external_id(), None);
        assert!(unbound.property("id").is_some());
    }

    #[test]
    fn test_find_decorator_prefers_last() {
        let decorators = vec![
            Decorator::new("mode", vec![DecoratorArg::Identifier("single".into())]),
            Decorator::new("mode", vec![DecoratorArg::Identifier("restart".into())]),
        ];
        let found = find_decorator(&decorators, "mode").unwrap();
        assert_eq!(found.args, vec![DecoratorArg::Identifier("restart".into())]);
        assert!(find_decorator(&decorators, "cooldown").is_none());
    }

    #[test]
    fn test_program_serializes() {
        let program = Program::default();
        let json = serde_json::to_value(&program).unwrap();
        assert_eq!(json, serde_json::json!({"sites": [], "automations": []}));
    }
}
