//! Game-state snapshotting.
//!
//! The serialized form is a newline-delimited text block, one line per
//! saved object: a type tag followed by space-separated `key=value` pairs.
//! Keys exist for human readability; restore is positional, so fields must
//! be written and read in the same order. A field that fails to parse
//! yields the caller's default instead of aborting the whole restore.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::store::KeyValueStore;

const STATE_KEY: &str = "saved_state";

/// An object that participates in save/restore. `state_fields` emits the
/// ordered field list; the factory registered for `type_tag` consumes the
/// same fields in the same order.
pub trait Saveable: Send {
    fn type_tag(&self) -> &'static str;
    fn state_fields(&self) -> Vec<(String, String)>;
}

/// Positional reader over one saved line's `key=value` tokens.
pub struct FieldReader {
    values: Vec<String>,
    cursor: usize,
}

impl FieldReader {
    fn from_line(line: &str) -> (String, Self) {
        let mut tokens = line.split_whitespace();
        let tag = tokens.next().unwrap_or("").to_string();
        let values = tokens
            .map(|token| match token.split_once('=') {
                Some((_key, value)) => value.to_string(),
                None => token.to_string(),
            })
            .collect();
        (tag, Self { values, cursor: 0 })
    }

    fn next_raw(&mut self) -> Option<&str> {
        let value = self.values.get(self.cursor)?;
        self.cursor += 1;
        Some(value)
    }

    pub fn next_f32(&mut self, default: f32) -> f32 {
        match self.next_raw() {
            Some(raw) => raw.parse().unwrap_or(default),
            None => default,
        }
    }

    pub fn next_i32(&mut self, default: i32) -> i32 {
        match self.next_raw() {
            Some(raw) => raw.parse().unwrap_or(default),
            None => default,
        }
    }

    pub fn next_str(&mut self, default: &str) -> String {
        match self.next_raw() {
            Some(raw) => raw.to_string(),
            None => default.to_string(),
        }
    }
}

pub type SaveableHandle = Arc<Mutex<dyn Saveable>>;
type Factory = fn(&mut FieldReader) -> SaveableHandle;

/// Tracks the set of live saveable objects and rebuilds them from storage.
#[derive(Default)]
pub struct StateRegistry {
    factories: HashMap<&'static str, Factory>,
    saveables: Vec<SaveableHandle>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the factory that reconstructs objects carrying `tag`.
    pub fn register_type(&mut self, tag: &'static str, factory: Factory) {
        self.factories.insert(tag, factory);
    }

    pub fn add(&mut self, saveable: SaveableHandle) {
        self.saveables.push(saveable);
    }

    pub fn len(&self) -> usize {
        self.saveables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saveables.is_empty()
    }

    pub fn saveables(&self) -> &[SaveableHandle] {
        &self.saveables
    }

    /// Drops every tracked object without touching storage.
    pub fn clear_all(&mut self) {
        self.saveables.clear();
    }

    /// Serializes every tracked object into the store under one key.
    pub fn save_all(&self, store: &mut dyn KeyValueStore) -> Result<(), String> {
        let mut block = String::new();
        for saveable in &self.saveables {
            let saveable = saveable.lock().unwrap();
            block.push_str(saveable.type_tag());
            for (key, value) in saveable.state_fields() {
                block.push(' ');
                block.push_str(&key);
                block.push('=');
                block.push_str(&value);
            }
            block.push('\n');
        }
        store.put(STATE_KEY, &block)
    }

    /// Rebuilds the tracked set from storage. Returns false (leaving the
    /// set untouched) when no snapshot exists. Lines with an unregistered
    /// tag are skipped with a warning.
    pub fn load_all(&mut self, store: &dyn KeyValueStore) -> bool {
        let block = match store.get(STATE_KEY) {
            Some(block) => block,
            None => return false,
        };
        self.saveables.clear();
        for line in block.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let (tag, mut reader) = FieldReader::from_line(line);
            match self.factories.get(tag.as_str()) {
                Some(factory) => self.saveables.push(factory(&mut reader)),
                None => log::warn!("no factory for saved type '{tag}', skipping"),
            }
        }
        true
    }
}
