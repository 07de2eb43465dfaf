//! Semantic validator

use std::collections::HashSet;

use ha_ast::{
    ActionStatement, Area, Automation, ConditionExpression, Device, Entity, Expression, Literal,
    Program, Property, RangeExpression, Settings, Site, Span,
};
use tracing::debug;

use crate::decorators::{self, Placement};
use crate::{Diagnostic, EntitySymbol, NodeKind, SymbolTable, ValidationReport};

/// Validate a program with a fresh validator
pub fn validate(program: &Program) -> ValidationReport {
    SemanticValidator::new().validate(program)
}

/// Walks a program once, collecting diagnostics
///
/// Every call to [`SemanticValidator::validate`] consumes the validator, so
/// symbol tables are never shared between programs.
#[derive(Debug, Default)]
pub struct SemanticValidator {
    diagnostics: Vec<Diagnostic>,
    symbols: SymbolTable,
}

impl SemanticValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(mut self, program: &Program) -> ValidationReport {
        for site in &program.sites {
            self.site(site);
        }

        for automation in &program.automations {
            self.automation(automation);
        }

        debug!(
            entities = self.symbols.entity_count(),
            diagnostics = self.diagnostics.len(),
            "Validated program"
        );

        ValidationReport {
            diagnostics: self.diagnostics,
            symbols: self.symbols,
        }
    }

    fn report(&mut self, message: impl Into<String>, node: NodeKind, span: Span) {
        self.diagnostics.push(Diagnostic::new(message, node, span));
    }

    fn site(&mut self, site: &Site) {
        if !self.symbols.add_site(&site.alias, site.span) {
            self.report(
                format!("Home alias '{}' is already defined", site.alias),
                NodeKind::Site,
                site.span,
            );
            return;
        }

        if let Some(settings) = &site.settings {
            self.settings(settings, &site.alias);
        }
        for area in &site.areas {
            self.area(&site.alias, area);
        }
    }

    fn area(&mut self, site_path: &str, area: &Area) {
        let path = format!("{}.{}", site_path, area.alias);
        if !self.symbols.add_area(&path, area.span) {
            self.report(
                format!(
                    "Area alias '{}' is already defined in home '{}'",
                    area.alias, site_path
                ),
                NodeKind::Area,
                area.span,
            );
            return;
        }

        if let Some(settings) = &area.settings {
            self.settings(settings, &path);
        }
        for device in &area.devices {
            self.device(&path, device);
        }
    }

    fn device(&mut self, area_path: &str, device: &Device) {
        let path = format!("{}.{}", area_path, device.alias);
        if !self.symbols.add_device(&path, device.span) {
            self.report(
                format!(
                    "Device alias '{}' is already defined in area '{}'",
                    device.alias, area_path
                ),
                NodeKind::Device,
                device.span,
            );
            return;
        }

        for entity in &device.entities {
            self.entity(&path, entity);
        }
    }

    fn entity(&mut self, device_path: &str, entity: &Entity) {
        let path = format!("{}.{}", device_path, entity.alias);
        let symbol = EntitySymbol {
            path: path.clone(),
            entity_type: entity.entity_type.clone(),
            external_id: entity.external_id(),
            span: entity.span,
        };

        if !self.symbols.add_entity(symbol) {
            self.report(
                format!(
                    "Entity alias '{}' is already defined in device '{}'",
                    entity.alias, device_path
                ),
                NodeKind::Entity,
                entity.span,
            );
            return;
        }

        if entity.property("id").is_none() {
            self.report(
                format!("Entity '{}' has no id property", path),
                NodeKind::Entity,
                entity.span,
            );
        }

        self.unique_keys(&entity.properties, &format!("entity '{}'", path));
        for property in &entity.properties {
            self.literal_keys(&property.value);
        }
    }

    fn settings(&mut self, settings: &Settings, owner: &str) {
        let broker = settings.events.as_ref().and_then(|e| e.broker.as_ref());
        if let Some(broker) = broker {
            self.unique_keys(&broker.properties, &format!("settings of '{}'", owner));
        }
    }

    /// One diagnostic for every repeated key
    fn unique_keys(&mut self, properties: &[Property], owner: &str) {
        let mut seen = HashSet::new();
        for property in properties {
            if !seen.insert(property.key.as_str()) {
                self.report(
                    format!("Property '{}' is already defined in {}", property.key, owner),
                    NodeKind::Property,
                    property.span,
                );
            }
        }
    }

    /// Duplicate keys inside object literals nested anywhere in `expr`
    fn literal_keys(&mut self, expr: &Expression) {
        match expr {
            Expression::Binary { left, right, .. } => {
                self.literal_keys(left);
                self.literal_keys(right);
            }
            Expression::InRange { left, range } => {
                self.literal_keys(left);
                if let RangeExpression::Value { start, end } = range.as_ref() {
                    self.literal_keys(start);
                    self.literal_keys(end);
                }
            }
            Expression::Paren { inner } => self.literal_keys(inner),
            Expression::FunctionCall(call) => {
                for arg in &call.args {
                    self.literal_keys(arg);
                }
            }
            Expression::Literal {
                value: Literal::Object(properties),
            } => {
                self.unique_keys(properties, "object literal");
                for property in properties {
                    self.literal_keys(&property.value);
                }
            }
            Expression::Literal {
                value: Literal::Array(items),
            } => {
                for item in items {
                    self.literal_keys(item);
                }
            }
            Expression::Literal { .. } | Expression::Reference { .. } => {}
        }
    }

    fn automation(&mut self, automation: &Automation) {
        for decorator in &automation.decorators {
            if let Some(problem) = decorators::check(decorator, Placement::Automation) {
                self.report(problem, NodeKind::Decorator, decorator.span);
            }
        }

        for clause in &automation.when_clauses {
            for decorator in &clause.decorators {
                if let Some(problem) = decorators::check(decorator, Placement::WhenClause) {
                    self.report(problem, NodeKind::Decorator, decorator.span);
                }
            }

            self.condition(&clause.condition);
            for statement in &clause.actions {
                self.statement(statement);
            }
        }
    }

    fn condition(&mut self, condition: &ConditionExpression) {
        for expr in condition.expressions() {
            self.expression(expr);
        }
    }

    fn statement(&mut self, statement: &ActionStatement) {
        match statement {
            ActionStatement::Invoke { call } => {
                for arg in &call.args {
                    self.expression(arg);
                }
            }
            ActionStatement::WaitFor {
                condition,
                for_duration,
                timeout,
                span,
            } => {
                self.condition(condition);
                if let Some(timeout) = timeout {
                    if for_duration.as_secs() > timeout.as_secs() {
                        self.report(
                            format!(
                                "Wait for {} can never complete within its timeout of {}",
                                for_duration, timeout
                            ),
                            NodeKind::Wait,
                            *span,
                        );
                    }
                }
            }
        }
    }

    fn expression(&mut self, expr: &Expression) {
        let mut unresolved = Vec::new();
        expr.for_each_reference(&mut |path, span| {
            if let Err(err) = self.symbols.resolve(path) {
                unresolved.push((err.to_string(), span));
            }
        });

        for (message, span) in unresolved {
            self.report(message, NodeKind::Reference, span);
        }
        self.literal_keys(expr);
    }
}
