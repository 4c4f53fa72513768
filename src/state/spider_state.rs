use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Free-form key/value state for one crawl session
///
/// Save steps can use it to keep counters, cursors or anything else that must
/// outlive a single item. It is created with the session and dropped with it.
#[derive(Debug, Clone, Default)]
pub struct SpiderState {
    inner: Arc<Mutex<HashMap<String, Value>>>,
}

impl SpiderState {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a value, returning the previous one
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values().insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values().contains_key(key)
    }

    /// Applies `f` to the value under `key` while holding the lock
    ///
    /// The entry starts out as `Value::Null` when absent.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut values = self.values();
        f(values.entry(key.to_string()).or_insert(Value::Null))
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}
