//! Process-wide TTL cache (spec §4.1).
//!
//! Generalizes the teacher's `middleware::rate_limit::RateLimitLayer`
//! (`Arc<Mutex<HashMap<IpAddr, Entry>>>`, reset-on-read-if-expired) from a
//! per-IP counter into a per-key `(value, inserted_at)` store where the
//! caller supplies the max age at read time rather than the writer fixing a
//! single TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::clock::Clock;

struct Entry {
    value: Value,
    inserted_at: Instant,
}

/// Keyed store with a read-time freshness decision. Cheap to clone: clones
/// share the same underlying table (`Arc<RwLock<..>>`).
#[derive(Clone)]
pub struct TtlCache {
    table: Arc<RwLock<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

impl TtlCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            table: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Returns the stored value iff it exists and is within `max_age`.
    /// Never mutates on read; never panics.
    pub fn get(&self, key: &str, max_age: Duration) -> Option<Value> {
        let table = self.table.read();
        let entry = table.get(key)?;
        if self.clock.now().duration_since(entry.inserted_at) < max_age {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Typed convenience wrapper over `get`.
    pub fn get_typed<T: DeserializeOwned>(&self, key: &str, max_age: Duration) -> Option<T> {
        self.get(key, max_age)
            .and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn has(&self, key: &str, max_age: Duration) -> bool {
        let table = self.table.read();
        table
            .get(key)
            .is_some_and(|entry| self.clock.now().duration_since(entry.inserted_at) < max_age)
    }

    /// Unconditionally installs `(value, now)`, replacing any prior entry.
    pub fn set<T: serde::Serialize>(&self, key: impl Into<String>, value: &T) {
        if let Ok(json) = serde_json::to_value(value) {
            let mut table = self.table.write();
            table.insert(
                key.into(),
                Entry {
                    value: json,
                    inserted_at: self.clock.now(),
                },
            );
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.table.write().remove(key).is_some()
    }

    /// Removes every key containing `pattern` as a substring. Used when an
    /// upstream reports a hard inconsistency that invalidates a whole scope.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let mut table = self.table.write();
        let before = table.len();
        table.retain(|k, _| !k.contains(pattern));
        before - table.len()
    }

    pub fn stats(&self) -> CacheStats {
        let table = self.table.read();
        CacheStats {
            size: table.len(),
            keys: table.keys().cloned().collect(),
        }
    }
}
