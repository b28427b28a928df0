//! Name-keyed table of planner configurations.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{ConfigError, PlannerConfiguration};

type ConfigTable = HashMap<String, Arc<PlannerConfiguration>>;

/// Maps configuration names to planner configurations.
///
/// The table is replaced wholesale by [`register`](Self::register); readers
/// hold an `Arc` snapshot, so a concurrent re-registration never hands out
/// a half-updated table.
///
/// # Example
///
/// ```
/// use planforge_config::{PlannerConfigRegistry, PlannerConfiguration};
///
/// let registry = PlannerConfigRegistry::new();
/// registry.register(vec![PlannerConfiguration::new("arm", "arm", "RRTConnect")]);
///
/// assert_eq!(registry.resolve("arm").unwrap().planner_id, "RRTConnect");
/// assert!(registry.resolve("base").is_err());
/// ```
#[derive(Debug, Default)]
pub struct PlannerConfigRegistry {
    table: RwLock<Arc<ConfigTable>>,
}

impl PlannerConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole table. Later entries with a duplicate name win.
    pub fn register(&self, settings: Vec<PlannerConfiguration>) {
        let table: ConfigTable = settings
            .into_iter()
            .map(|c| (c.name.clone(), Arc::new(c)))
            .collect();
        tracing::debug!(count = table.len(), "Registered planner configurations");
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
    }

    /// Looks up a configuration by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if no configuration has that name.
    pub fn resolve(&self, name: &str) -> Result<Arc<PlannerConfiguration>, ConfigError> {
        self.snapshot()
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().contains_key(name)
    }

    /// Sorted configuration names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot().keys().cloned().collect();
        names.sort();
        names
    }

    /// Configurations planning for `group`, sorted by name.
    pub fn for_group(&self, group: &str) -> Vec<Arc<PlannerConfiguration>> {
        let mut configs: Vec<_> = self
            .snapshot()
            .values()
            .filter(|c| c.group == group)
            .cloned()
            .collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> Arc<ConfigTable> {
        Arc::clone(&self.table.read().unwrap_or_else(PoisonError::into_inner))
    }
}
