//! Name-keyed Adapter registry: the Orchestrator's map from config section name to the live
//! Adapter, and the source of weak references Translators are built from (§3.4, §4.6).

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::adapter::{dangling_target, Adapter};

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        AdapterRegistry {
            adapters: HashMap::new(),
        }
    }

    pub fn insert(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).cloned()
    }

    /// A weak handle suitable for a Translator's target — present even before the Adapter is
    /// resolved from config, so Translators can be wired up in config order without caring which
    /// adapter section appears first.
    pub fn weak(&self, name: &str) -> Weak<dyn Adapter> {
        self.adapters
            .get(name)
            .map(Arc::downgrade)
            .unwrap_or_else(dangling_target)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Adapter>> {
        self.adapters.values()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
