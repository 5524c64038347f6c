//! Process-wide scheme registry
//!
//! Maps the scheme of a connection string (`csv`, `mem`, `mysql`) to the
//! data source that handles it. Registrations happen at program start and
//! are append-only; replacing a scheme is allowed so embedders can override
//! a stock driver.

use crate::datasource::DataSource;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

static REGISTRY: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

/// The process-wide registry.
pub fn registry() -> Arc<Registry> {
    REGISTRY.clone()
}

/// Register a data source under a scheme in the process-wide registry.
pub fn register<S: Into<String>>(scheme: S, source: Arc<dyn DataSource>) {
    REGISTRY.register(scheme, source);
}

/// Scheme to data-source mapping. Lookups are case-insensitive.
#[derive(Default)]
pub struct Registry {
    sources: RwLock<HashMap<String, Arc<dyn DataSource>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the factory for a scheme.
    pub fn register<S: Into<String>>(&self, scheme: S, source: Arc<dyn DataSource>) {
        let scheme = scheme.into().to_lowercase();
        tracing::debug!("registering data source: {}", scheme);
        self.sources.write().insert(scheme, source);
    }

    /// Case-insensitive scheme lookup.
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn DataSource>> {
        self.sources.read().get(&scheme.to_lowercase()).cloned()
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<_> = self.sources.read().keys().cloned().collect();
        schemes.sort();
        schemes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemTable;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = Registry::new();
        registry.register("CSV", Arc::new(MemTable::new("t", Vec::new())));

        let upper = registry.get("CSV");
        let lower = registry.get("csv");
        assert!(upper.is_some());
        assert!(lower.is_some());
        assert!(Arc::ptr_eq(&upper.unwrap(), &lower.unwrap()));
    }

    #[test]
    fn test_register_replaces() {
        let registry = Registry::new();
        registry.register("mem", Arc::new(MemTable::new("first", Vec::new())));
        registry.register("mem", Arc::new(MemTable::new("second", Vec::new())));
        assert_eq!(registry.schemes(), vec!["mem".to_string()]);
    }

    #[test]
    fn test_unknown_scheme() {
        let registry = Registry::new();
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_process_wide_registry() {
        register("globalmem", Arc::new(MemTable::new("g", Vec::new())));
        assert!(registry().get("GLOBALMEM").is_some());
    }
}
