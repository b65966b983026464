#![forbid(unsafe_code)]

//! Ephemeral per-client key/value state.
//!
//! A `SessionState` belongs to exactly one client context and is never
//! persisted. Reconnecting a client clears it.

use ahash::AHashMap;

use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    values: AHashMap<String, Value>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `key`, or [`Value::Unset`].
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.values.get(key).cloned().unwrap_or_default()
    }

    /// Store `value` under `key`. Returns whether the stored value changed.
    ///
    /// Storing [`Value::Unset`] removes the key.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if value.is_unset() {
            return self.values.remove(&key).is_some();
        }
        match self.values.get(&key) {
            Some(current) if *current == value => false,
            _ => {
                self.values.insert(key, value);
                true
            }
        }
    }

    /// Keys currently holding a value, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drop every value and return the keys that held one, sorted.
    pub fn clear(&mut self) -> Vec<String> {
        let keys = self.keys();
        self.values.clear();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
