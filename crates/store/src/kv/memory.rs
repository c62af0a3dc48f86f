//! In-process backend
//!
//! Mirrors the Redis semantics the service depends on, including per-key
//! expiry evaluated lazily against the injected [`Clock`]. Used by tests and
//! for running without a Redis instance.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use glob::Pattern;
use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};
use crate::kv::KvStore;

#[derive(Debug, Clone)]
enum Value {
    String(String),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys", &self.entries.lock().len())
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Remaining TTL of a key, if it has one
    pub fn ttl(&self, key: &str) -> Option<chrono::Duration> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        purge(&mut entries, key, now);
        entries
            .get(key)
            .and_then(|e| e.expires_at)
            .map(|at| at - now)
    }

    fn with_entries<R>(&self, key: &str, f: impl FnOnce(&mut HashMap<String, Entry>) -> R) -> R {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        purge(&mut entries, key, now);
        f(&mut entries)
    }
}

fn purge(entries: &mut HashMap<String, Entry>, key: &str, now: DateTime<Utc>) {
    if entries
        .get(key)
        .and_then(|e| e.expires_at)
        .is_some_and(|at| at <= now)
    {
        entries.remove(key);
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Command(format!(
        "WRONGTYPE operation against key '{}' holding the wrong kind of value",
        key
    ))
}

/// Compile a `KEYS` pattern; `*`, `?` and `[...]` classes behave as in Redis
fn key_pattern(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern)
        .map_err(|e| StoreError::Command(format!("invalid key pattern '{}': {}", pattern, e)))
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(key, |entries| match entries.get(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::String(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_entries(key, |entries| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::String(value.to_string()),
                    expires_at: None,
                },
            );
        });
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool> {
        Ok(self.with_entries(key, |entries| entries.remove(key).is_some()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.with_entries(key, |entries| entries.contains_key(key)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let at = self.clock.now() + chrono::Duration::seconds(ttl.as_secs().max(1) as i64);
        Ok(self.with_entries(key, |entries| match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(at);
                true
            }
            None => false,
        }))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.hset_many(key, &[(field.to_string(), value.to_string())])
            .await
    }

    async fn hset_many(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        self.with_entries(key, |entries| {
            let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
                value: Value::Hash(HashMap::new()),
                expires_at: None,
            });
            match &mut entry.value {
                Value::Hash(hash) => {
                    for (f, v) in fields {
                        hash.insert(f.clone(), v.clone());
                    }
                    Ok(())
                }
                _ => Err(wrong_type(key)),
            }
        })
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        self.with_entries(key, |entries| {
            let Some(entry) = entries.get_mut(key) else {
                return Ok(false);
            };
            let Value::Hash(hash) = &mut entry.value else {
                return Err(wrong_type(key));
            };
            let removed = hash.remove(field).is_some();
            if hash.is_empty() {
                entries.remove(key);
            }
            Ok(removed)
        })
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.with_entries(key, |entries| match entries.get(key) {
            None => Ok(HashMap::new()),
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => Ok(hash.clone()),
            Some(_) => Err(wrong_type(key)),
        })
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<()> {
        self.with_entries(key, |entries| {
            let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
                value: Value::Set(BTreeSet::new()),
                expires_at: None,
            });
            match &mut entry.value {
                Value::Set(set) => {
                    set.extend(members.iter().cloned());
                    Ok(())
                }
                _ => Err(wrong_type(key)),
            }
        })
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        self.with_entries(key, |entries| match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        })
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = key_pattern(pattern)?;
        let now = self.clock.now();
        let entries = self.entries.lock();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.expires_at.is_none_or(|at| at > now))
            .filter(|(k, _)| pattern.matches(k))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn replace_set(&self, key: &str, members: &[String], ttl: Duration) -> Result<()> {
        let at = self.clock.now() + chrono::Duration::seconds(ttl.as_secs().max(1) as i64);
        self.with_entries(key, |entries| {
            entries.remove(key);
            if !members.is_empty() {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Set(members.iter().cloned().collect()),
                        expires_at: Some(at),
                    },
                );
            }
        });
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;
