use crate::{utils::sync::RwLock, value::ScriptValue};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Name(String),
    Index(u32),
}

impl PropertyKey {
    pub fn name(key: &str) -> Self {
        PropertyKey::Name(key.to_string())
    }
}

/// Ad hoc properties attached to a scripting object at runtime.
#[derive(Debug, Default)]
pub struct PropertyStore {
    entries: RwLock<HashMap<PropertyKey, ScriptValue>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PropertyKey) -> Option<ScriptValue> {
        self.entries.read().get(key).cloned()
    }

    pub fn set(&self, key: PropertyKey, value: ScriptValue) {
        self.entries.write().insert(key, value);
    }

    pub fn remove(&self, key: &PropertyKey) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn contains(&self, key: &PropertyKey) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn keys(&self) -> Vec<PropertyKey> {
        self.entries.read().keys().cloned().collect()
    }
}
