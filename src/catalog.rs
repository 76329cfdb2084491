use crate::service::{default_service_name, Service, ServiceBlueprint};
use std::collections::BTreeMap;

/// Explicit table of available service blueprints, keyed by their canonical
/// name. Populated by explicit `register` calls at startup rather than by
/// import-time side effects, so the set of available services never depends
/// on load order.
#[derive(Default)]
pub struct ServiceCatalog {
    entries: BTreeMap<String, Box<dyn ServiceBlueprint>>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the services shipped with this crate.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(Box::new(crate::services::monitoring::MonitoringService));
        catalog.register(Box::new(crate::services::clock::ClockService));
        catalog
    }

    /// Add a blueprint under its canonical name, replacing any previous
    /// entry for that key.
    pub fn register(&mut self, blueprint: Box<dyn ServiceBlueprint>) {
        let key = default_service_name(blueprint.kind());
        self.entries.insert(key, blueprint);
    }

    pub fn get(&self, key: &str) -> Option<&dyn ServiceBlueprint> {
        self.entries.get(key).map(|b| b.as_ref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate catalog entries as (key, blueprint) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn ServiceBlueprint)> {
        self.entries.iter().map(|(k, b)| (k.as_str(), b.as_ref()))
    }

    /// Build a service instance from a catalog entry, optionally under an
    /// override name.
    pub fn create(&self, key: &str, name: Option<&str>) -> Option<Service> {
        let blueprint = self.get(key)?;
        let name = name.map(str::to_string).unwrap_or_else(|| key.to_string());
        Some(blueprint.build(name))
    }
}
