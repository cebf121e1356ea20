//! Persistent key-value storage seam.
//!
//! Game-state snapshots and settings go through this trait; the platform
//! layer decides whether that means a preferences file, a real database,
//! or (for tests and the demo) a plain in-memory map.

use std::collections::HashMap;

pub trait KeyValueStore: Send {
    fn put(&mut self, key: &str, value: &str) -> Result<(), String>;
    fn get(&self, key: &str) -> Option<String>;
    fn remove(&mut self, key: &str);
}

#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn put(&mut self, key: &str, value: &str) -> Result<(), String> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}
