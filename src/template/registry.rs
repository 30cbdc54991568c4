//! Insertion-ordered identifier registry.
//!
//! Every namespace of a synthesis pass (parameters, conditions, resources,
//! outputs) is a `Registry`. Identifiers are unique within a registry and
//! entries keep their declaration order, which makes rendered templates
//! deterministic.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

use crate::error::{Result, SynthError};

#[derive(Debug, Clone, PartialEq)]
pub struct Registry<V> {
    kind: &'static str,
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Registry<V> {
    /// Creates an empty registry; `kind` names the namespace in errors
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Registers `value` under `id`, rejecting duplicates
    pub fn register(&mut self, id: impl Into<String>, value: V) -> Result<()> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(SynthError::duplicate(self.kind, id));
        }
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push((id, value));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&V> {
        self.index.get(id).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterates entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(id, value)| (id.as_str(), value))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl<V: Serialize> Serialize for Registry<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, value) in &self.entries {
            map.serialize_entry(id, value)?;
        }
        map.end()
    }
}
