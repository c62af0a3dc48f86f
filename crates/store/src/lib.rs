//! Drift Store - state held in the external key-value store
//!
//! - [`kv`]: the command surface the service needs, backed by Redis or memory
//! - [`cache`]: timestamped result cache with caller-driven freshness
//! - [`tags`]: per-(tenant, platform) tags with TTL and the platform tag universe
//! - [`clock`]: the single time reference for TTLs and calendar days

pub mod cache;
pub mod clock;
pub mod error;
pub mod kv;
pub mod tags;

pub use cache::{CACHE_PREFIX, CacheEntry, CacheLayer, Fetched, TypedCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, StoreError};
pub use kv::memory::MemoryStore;
pub use kv::redis::{RedisStore, RedisStoreConfig};
pub use kv::KvStore;
pub use tags::{DefaultTags, TagStore, is_anomaly_tag, sort_tags};
