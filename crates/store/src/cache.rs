//! Result cache
//!
//! Entries are JSON documents `{create_time, payload_type, data}` under the
//! `bcache:` prefix. Nothing expires on its own: callers choose freshness per
//! request with a `refresh` flag, or drop an entry with [`CacheLayer::invalidate`].
//!
//! A failed fetch never touches the stored entry, so the previous value
//! survives upstream errors.

use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::clock::Clock;
use crate::error::{Result, StoreError};
use crate::kv::KvStore;

/// Prefix for every key the cache owns
pub const CACHE_PREFIX: &str = "bcache:";

const REMOVE_DATA_PREFIX: &str = "bcache:remove_data:";

/// A cached payload and when it was fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub create_time: DateTime<Utc>,
    pub payload_type: String,
    pub data: T,
}

/// Outcome of [`CacheLayer::get_or_fetch`]
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub create_time: DateTime<Utc>,
    pub from_cache: bool,
}

pub struct CacheLayer {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    lock: RwLock<()>,
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("store", &self.store.name())
            .finish()
    }
}

fn full_key(key: &str) -> String {
    format!("{}{}", CACHE_PREFIX, key)
}

fn remove_data_key(tenant_id: i64, platform: &str) -> String {
    format!("{}{}:{}", REMOVE_DATA_PREFIX, tenant_id, platform)
}

impl CacheLayer {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            lock: RwLock::new(()),
        }
    }

    /// Store `data` under `key`, stamped with the current time
    pub async fn save<T: Serialize>(
        &self,
        key: &str,
        payload_type: &str,
        data: &T,
    ) -> Result<DateTime<Utc>> {
        let create_time = self.clock.now();
        let entry = CacheEntry {
            create_time,
            payload_type: payload_type.to_string(),
            data,
        };
        let encoded = serde_json::to_string(&entry)?;

        let _guard = self.lock.write().await;
        self.store.set(&full_key(key), &encoded).await?;

        tracing::debug!(key, bytes = encoded.len(), "cache entry saved");
        Ok(create_time)
    }

    /// Load the entry under `key`
    ///
    /// A missing key, a payload of another type, or a payload that no longer
    /// decodes as `T` is a miss.
    pub async fn load<T: DeserializeOwned>(
        &self,
        key: &str,
        payload_type: &str,
    ) -> Result<Option<CacheEntry<T>>> {
        let raw = {
            let _guard = self.lock.read().await;
            self.store.get(&full_key(key)).await?
        };
        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) if entry.payload_type == payload_type => Ok(Some(entry)),
            Ok(entry) => {
                tracing::warn!(
                    key,
                    expected = payload_type,
                    found = %entry.payload_type,
                    "cache entry has unexpected payload type, treating as miss"
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "cache entry undecodable, treating as miss");
                Ok(None)
            }
        }
    }

    /// Drop the entry under `key`; the next read fetches
    pub async fn invalidate(&self, key: &str) -> Result<bool> {
        let _guard = self.lock.write().await;
        self.store.del(&full_key(key)).await
    }

    /// Return the cached value unless `refresh` is set or the key misses;
    /// otherwise run `fetch`, store its result and return it
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        payload_type: &str,
        refresh: bool,
        fetch: F,
    ) -> std::result::Result<Fetched<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StoreError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if !refresh && let Some(entry) = self.load::<T>(key, payload_type).await? {
            tracing::debug!(key, "cache hit");
            return Ok(Fetched {
                data: entry.data,
                create_time: entry.create_time,
                from_cache: true,
            });
        }

        tracing::debug!(key, refresh, "cache fetch");
        let data = fetch().await?;
        let create_time = self.save(key, payload_type, &data).await?;

        Ok(Fetched {
            data,
            create_time,
            from_cache: false,
        })
    }

    // =========================================================================
    // Remove-data side cache
    // =========================================================================

    /// Replace the per-day values recorded for `(tenant, platform)`
    pub async fn save_remove_data(
        &self,
        tenant_id: i64,
        platform: &str,
        values: &BTreeMap<NaiveDate, i64>,
    ) -> Result<()> {
        let key = remove_data_key(tenant_id, platform);
        let fields: Vec<(String, String)> = values
            .iter()
            .map(|(date, v)| (date.format("%Y-%m-%d").to_string(), v.to_string()))
            .collect();

        let _guard = self.lock.write().await;
        self.store.del(&key).await?;
        self.store.hset_many(&key, &fields).await?;
        Ok(())
    }

    /// Per-day values recorded for `(tenant, platform)`; unparsable fields are skipped
    pub async fn load_remove_data(
        &self,
        tenant_id: i64,
        platform: &str,
    ) -> Result<BTreeMap<NaiveDate, i64>> {
        let raw = {
            let _guard = self.lock.read().await;
            self.store.hgetall(&remove_data_key(tenant_id, platform)).await?
        };

        Ok(raw
            .into_iter()
            .filter_map(|(field, value)| {
                let date = NaiveDate::parse_from_str(&field, "%Y-%m-%d").ok()?;
                let value = value.parse::<i64>().ok()?;
                Some((date, value))
            })
            .collect())
    }
}

/// Cache view bound to one namespace and one payload type
///
/// Keys are `<namespace>_<part>_<part>...`, e.g. `apidata_googleAds_1001`.
pub struct TypedCache<T> {
    layer: Arc<CacheLayer>,
    namespace: &'static str,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for TypedCache<T> {
    fn clone(&self) -> Self {
        Self {
            layer: self.layer.clone(),
            namespace: self.namespace,
            _payload: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for TypedCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCache")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl<T: Serialize + DeserializeOwned> TypedCache<T> {
    pub fn new(layer: Arc<CacheLayer>, namespace: &'static str) -> Self {
        Self {
            layer,
            namespace,
            _payload: PhantomData,
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Key for the given parts
    pub fn key(&self, parts: &[&str]) -> String {
        let mut key = self.namespace.to_string();
        for part in parts {
            key.push('_');
            key.push_str(part);
        }
        key
    }

    pub async fn get_or_fetch<E, F, Fut>(
        &self,
        parts: &[&str],
        refresh: bool,
        fetch: F,
    ) -> std::result::Result<Fetched<T>, E>
    where
        E: From<StoreError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.layer
            .get_or_fetch(&self.key(parts), self.namespace, refresh, fetch)
            .await
    }

    pub async fn load(&self, parts: &[&str]) -> Result<Option<CacheEntry<T>>> {
        self.layer.load(&self.key(parts), self.namespace).await
    }

    pub async fn save(&self, parts: &[&str], data: &T) -> Result<DateTime<Utc>> {
        self.layer.save(&self.key(parts), self.namespace, data).await
    }

    pub async fn invalidate(&self, parts: &[&str]) -> Result<bool> {
        self.layer.invalidate(&self.key(parts)).await
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;
