//! Key-value command surface
//!
//! The subset of Redis semantics the service relies on. Single-key commands
//! are atomic; [`KvStore::replace_set`] is atomic across its DEL/SADD/EXPIRE.

pub mod memory;
pub mod redis;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Returns whether the key existed
    async fn del(&self, key: &str) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Returns whether the key existed to receive the TTL
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    async fn hset_many(&self, key: &str, fields: &[(String, String)]) -> Result<()>;

    /// Returns whether the field existed
    async fn hdel(&self, key: &str, field: &str) -> Result<bool>;

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    async fn sadd(&self, key: &str, members: &[String]) -> Result<()>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    /// Keys matching a glob pattern (`*` wildcard)
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Atomically replace a set's members and give it a TTL
    ///
    /// An empty `members` leaves the key deleted.
    async fn replace_set(&self, key: &str, members: &[String], ttl: Duration) -> Result<()>;

    /// Round-trip check
    async fn ping(&self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
