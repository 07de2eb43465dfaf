//! Path-keyed symbol table
//!
//! Four tables, one per nesting level, keyed by dotted path:
//! `site`, `site.area`, `site.area.device` and `site.area.device.entity`.

use ha_ast::Span;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

/// A declared entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySymbol {
    /// Canonical `site.area.device.entity` path
    pub path: String,
    pub entity_type: String,
    /// External entity id from the `id` property
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub span: Span,
}

/// Why a reference did not resolve to an entity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Reference '{0}' does not exist")]
    NotFound(String),

    #[error("Reference '{0}' is too short; write site.area.device.entity or area.device.entity")]
    TooShort(String),

    #[error("Reference '{path}' is ambiguous; it matches {}", .candidates.join(", "))]
    Ambiguous {
        path: String,
        candidates: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SymbolTable {
    sites: IndexMap<String, Span>,
    areas: IndexMap<String, Span>,
    devices: IndexMap<String, Span>,
    entities: IndexMap<String, EntitySymbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the alias is already taken
    pub fn add_site(&mut self, alias: &str, span: Span) -> bool {
        insert_new(&mut self.sites, alias, span)
    }

    pub fn add_area(&mut self, path: &str, span: Span) -> bool {
        insert_new(&mut self.areas, path, span)
    }

    pub fn add_device(&mut self, path: &str, span: Span) -> bool {
        insert_new(&mut self.devices, path, span)
    }

    pub fn add_entity(&mut self, symbol: EntitySymbol) -> bool {
        if self.entities.contains_key(&symbol.path) {
            return false;
        }
        self.entities.insert(symbol.path.clone(), symbol);
        true
    }

    pub fn contains_site(&self, alias: &str) -> bool {
        self.sites.contains_key(alias)
    }

    pub fn contains_area(&self, path: &str) -> bool {
        self.areas.contains_key(path)
    }

    pub fn contains_device(&self, path: &str) -> bool {
        self.devices.contains_key(path)
    }

    /// Entity by canonical path
    pub fn entity(&self, path: &str) -> Option<&EntitySymbol> {
        self.entities.get(path)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySymbol> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Resolve a reference path to an entity
    ///
    /// - `site.area.device.entity` matches exactly.
    /// - `area.device.entity` matches when exactly one site declares it.
    /// - Shorter paths are rejected and longer ones never match.
    pub fn resolve(&self, path: &[String]) -> Result<&EntitySymbol, ResolveError> {
        let joined = path.join(".");
        match path.len() {
            0..=2 => Err(ResolveError::TooShort(joined)),
            3 => {
                let mut matches = self
                    .sites
                    .keys()
                    .filter_map(|site| self.entities.get(&format!("{}.{}", site, joined)));

                match (matches.next(), matches.next()) {
                    (Some(only), None) => Ok(only),
                    (None, _) => Err(ResolveError::NotFound(joined)),
                    (Some(first), Some(second)) => {
                        let mut candidates = vec![first.path.clone(), second.path.clone()];
                        candidates.extend(matches.map(|e| e.path.clone()));
                        Err(ResolveError::Ambiguous {
                            path: joined,
                            candidates,
                        })
                    }
                }
            }
            4 => self
                .entities
                .get(&joined)
                .ok_or(ResolveError::NotFound(joined)),
            _ => Err(ResolveError::NotFound(joined)),
        }
    }

    /// Canonical path and external id of every entity that declares one
    pub fn entity_bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entities
            .values()
            .filter_map(|e| Some((e.path.as_str(), e.external_id.as_deref()?)))
    }
}

fn insert_new(table: &mut IndexMap<String, Span>, key: &str, span: Span) -> bool {
    if table.contains_key(key) {
        return false;
    }
    table.insert(key.to_string(), span);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(path: &str, id: Option<&str>) -> EntitySymbol {
        EntitySymbol {
            path: path.to_string(),
            entity_type: "sensor".to_string(),
            external_id: id.map(str::to_string),
            span: Span::default(),
        }
    }

    fn path(p: &str) -> Vec<String> {
        p.split('.').map(str::to_string).collect()
    }

    fn table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.add_site("home", Span::default());
        table.add_site("cabin", Span::default());
        table.add_entity(entity("home.kitchen.sensors.temp", Some("sensor.kitchen_temp")));
        table.add_entity(entity("home.hall.sensors.temp", None));
        table.add_entity(entity("cabin.hall.sensors.temp", Some("sensor.cabin_temp")));
        table
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut table = table();
        assert!(!table.add_site("home", Span::default()));
        assert!(table.add_area("home.kitchen", Span::default()));
        assert!(!table.add_area("home.kitchen", Span::default()));
        assert!(!table.add_entity(entity("home.kitchen.sensors.temp", None)));
    }

    #[test]
    fn test_resolve_full_path() {
        let table = table();
        let found = table.resolve(&path("home.kitchen.sensors.temp")).unwrap();
        assert_eq!(found.external_id.as_deref(), Some("sensor.kitchen_temp"));

        assert_eq!(
            table.resolve(&path("home.garage.sensors.temp")),
            Err(ResolveError::NotFound("home.garage.sensors.temp".into()))
        );
    }

    #[test]
    fn test_resolve_site_relative_path() {
        let table = table();
        let found = table.resolve(&path("kitchen.sensors.temp")).unwrap();
        assert_eq!(found.path, "home.kitchen.sensors.temp");

        let Err(ResolveError::Ambiguous { candidates, .. }) =
            table.resolve(&path("hall.sensors.temp"))
        else {
            panic!("expected ambiguity");
        };
        assert_eq!(candidates, vec!["home.hall.sensors.temp", "cabin.hall.sensors.temp"]);
    }

    #[test]
    fn test_resolve_rejects_short_and_long_paths() {
        let table = table();
        assert!(matches!(
            table.resolve(&path("sensors.temp")),
            Err(ResolveError::TooShort(_))
        ));
        assert!(matches!(
            table.resolve(&path("home.kitchen.sensors.temp.extra")),
            Err(ResolveError::NotFound(_))
        ));
    }

    #[test]
    fn test_entity_bindings_skip_unbound() {
        let table = table();
        let bindings: Vec<_> = table.entity_bindings().collect();
        assert_eq!(
            bindings,
            vec![
                ("home.kitchen.sensors.temp", "sensor.kitchen_temp"),
                ("cabin.hall.sensors.temp", "sensor.cabin_temp"),
            ]
        );
    }
}
