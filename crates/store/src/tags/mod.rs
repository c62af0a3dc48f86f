//! Tag store
//!
//! User tags live in one hash per `(tenant, platform)`:
//! `tags:<tenant_id>:<platform>`, field = tag name, value = expiry in epoch
//! seconds. A tag is visible until its expiry; expired fields are deleted in
//! the background the next time the hash is listed.
//!
//! `platform_tags:<platform>` caches the platform's tag universe as a set with
//! a 24-hour TTL. Tag writes drop the cached set and schedule a rebuild; a
//! write that lands during a rebuild causes one more pass. Background passes
//! and cache-miss rebuilds take the same per-platform lock, so at most one
//! pass per platform scans and writes at a time. While a pass is pending the
//! cached set is not trusted.
//!
//! Platform names become part of a `KEYS` pattern, so names carrying pattern
//! syntax or the key separator are rejected.

pub mod defaults;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Mutex as PassLock, Notify};

use crate::clock::Clock;
use crate::error::{Result, StoreError};
use crate::kv::KvStore;

pub use defaults::{DefaultTags, HIDDEN_TAG};

/// Lifetime of a user tag
pub const TAG_TTL_DAYS: i64 = 30;

/// Freshness bound of a cached platform universe
pub const UNIVERSE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Prefix marking an anomaly tag
pub const ANOMALY_PREFIX: &str = "err_";

const TAG_PREFIX: &str = "tags:";
const UNIVERSE_PREFIX: &str = "platform_tags:";

fn tag_key(tenant_id: i64, platform: &str) -> String {
    format!("{}{}:{}", TAG_PREFIX, tenant_id, platform)
}

fn universe_key(platform: &str) -> String {
    format!("{}{}", UNIVERSE_PREFIX, platform)
}

/// Characters with meaning in a `KEYS` pattern, plus the key separator
const RESERVED_CHARS: &[char] = &['*', '?', '[', ']', '\\', '^', ':'];

fn checked_platform(platform: &str) -> Result<&str> {
    if platform.is_empty() || platform.contains(RESERVED_CHARS) {
        return Err(StoreError::InvalidKey(format!(
            "platform '{}' is not a valid tag key segment",
            platform
        )));
    }
    Ok(platform)
}

pub fn is_anomaly_tag(tag: &str) -> bool {
    tag.starts_with(ANOMALY_PREFIX)
}

/// Anomaly tags first, then byte-wise ascending within each class
pub fn sort_tags(tags: &mut [String]) {
    tags.sort_by(|a, b| (!is_anomaly_tag(a), a).cmp(&(!is_anomaly_tag(b), b)));
}

/// Per-platform background rebuilds: present = scheduled, value = rerun requested
type RebuildFlags = Arc<Mutex<HashMap<String, bool>>>;

/// Per-platform lock held for the whole scan-and-write of one pass
type PassLocks = Arc<Mutex<HashMap<String, Arc<PassLock<()>>>>>;

#[derive(Clone)]
pub struct TagStore {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    defaults: Arc<DefaultTags>,
    rebuilds: RebuildFlags,
    passes: PassLocks,
    idle: Arc<Notify>,
}

impl std::fmt::Debug for TagStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagStore")
            .field("store", &self.store.name())
            .field("rebuilds_in_flight", &self.rebuilds.lock().len())
            .finish()
    }
}

impl TagStore {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, defaults: DefaultTags) -> Self {
        Self {
            store,
            clock,
            defaults: Arc::new(defaults),
            rebuilds: Arc::new(Mutex::new(HashMap::new())),
            passes: Arc::new(Mutex::new(HashMap::new())),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Add or renew a tag for 30 days
    pub async fn add(&self, tenant_id: i64, platform: &str, name: &str) -> Result<()> {
        let platform = checked_platform(platform)?;
        let expires_at = self.clock.now() + chrono::Duration::days(TAG_TTL_DAYS);
        self.store
            .hset(
                &tag_key(tenant_id, platform),
                name,
                &expires_at.timestamp().to_string(),
            )
            .await?;

        tracing::info!(tenant_id, platform, tag = name, "tag added");
        self.universe_changed(platform).await
    }

    /// Remove a tag; removing an absent tag succeeds
    pub async fn remove(&self, tenant_id: i64, platform: &str, name: &str) -> Result<()> {
        let platform = checked_platform(platform)?;
        let existed = self.store.hdel(&tag_key(tenant_id, platform), name).await?;

        tracing::info!(tenant_id, platform, tag = name, existed, "tag removed");
        self.universe_changed(platform).await
    }

    /// Live user tags for `(tenant, platform)`, anomaly-first
    pub async fn list(&self, tenant_id: i64, platform: &str) -> Result<Vec<String>> {
        let key = tag_key(tenant_id, checked_platform(platform)?);
        let fields = self.store.hgetall(&key).await?;
        let (mut live, expired) = self.partition_live(fields);

        if !expired.is_empty() {
            let store = self.store.clone();
            tokio::spawn(async move {
                for field in expired {
                    if let Err(e) = store.hdel(&key, &field).await {
                        tracing::warn!(key = %key, tag = %field, error = %e, "failed to purge expired tag");
                    }
                }
            });
        }

        sort_tags(&mut live);
        Ok(live)
    }

    /// Default tags for the tenant followed by its live user tags, without duplicates
    pub async fn tags_for(&self, tenant_id: i64, platform: &str) -> Result<Vec<String>> {
        let mut tags = self.defaults_for(tenant_id).to_vec();
        for tag in self.list(tenant_id, platform).await? {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    pub fn defaults_for(&self, tenant_id: i64) -> &[String] {
        self.defaults.for_tenant(tenant_id)
    }

    /// Tag names in use on `platform`, anomaly-first
    ///
    /// Served from the cached set when present and no rebuild is pending,
    /// rebuilt otherwise.
    pub async fn universe(&self, platform: &str) -> Result<Vec<String>> {
        let platform = checked_platform(platform)?;
        if let Some(cached) = self.cached_universe(platform).await? {
            return Ok(cached);
        }

        let lock = self.pass_lock(platform);
        let _pass = lock.lock().await;
        // A pass that finished while we waited may have cached the set
        if let Some(cached) = self.cached_universe(platform).await? {
            return Ok(cached);
        }
        self.rebuild_pass(platform).await
    }

    /// Recompute the universe from every live tag on `platform` and cache it
    pub async fn rebuild_universe(&self, platform: &str) -> Result<Vec<String>> {
        let platform = checked_platform(platform)?;
        let lock = self.pass_lock(platform);
        let _pass = lock.lock().await;
        self.rebuild_pass(platform).await
    }

    /// Number of platforms with a background rebuild scheduled or running
    pub fn rebuilds_in_flight(&self) -> usize {
        self.rebuilds.lock().len()
    }

    /// Wait until no background rebuild is scheduled or running
    pub async fn settle(&self) {
        loop {
            let mut idle = std::pin::pin!(self.idle.notified());
            idle.as_mut().enable();
            if self.rebuilds_in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }

    async fn cached_universe(&self, platform: &str) -> Result<Option<Vec<String>>> {
        if self.rebuilds.lock().contains_key(platform) {
            return Ok(None);
        }
        let mut cached = self.store.smembers(&universe_key(platform)).await?;
        if cached.is_empty() {
            return Ok(None);
        }
        sort_tags(&mut cached);
        Ok(Some(cached))
    }

    fn pass_lock(&self, platform: &str) -> Arc<PassLock<()>> {
        self.passes
            .lock()
            .entry(platform.to_string())
            .or_default()
            .clone()
    }

    /// Scan and write; callers hold the platform's pass lock
    async fn rebuild_pass(&self, platform: &str) -> Result<Vec<String>> {
        let pattern = format!("{}*:{}", TAG_PREFIX, platform);
        let mut names: BTreeSet<String> = self.defaults.all().map(str::to_string).collect();

        for key in self.store.keys(&pattern).await? {
            let fields = self.store.hgetall(&key).await?;
            let (live, _) = self.partition_live(fields);
            names.extend(live);
        }
        names.remove(HIDDEN_TAG);

        let mut universe: Vec<String> = names.into_iter().collect();
        sort_tags(&mut universe);

        self.store
            .replace_set(&universe_key(platform), &universe, UNIVERSE_TTL)
            .await?;

        tracing::debug!(platform, tags = universe.len(), "tag universe rebuilt");
        Ok(universe)
    }

    async fn universe_changed(&self, platform: &str) -> Result<()> {
        self.store.del(&universe_key(platform)).await?;
        self.schedule_rebuild(platform);
        Ok(())
    }

    fn schedule_rebuild(&self, platform: &str) {
        {
            let mut rebuilds = self.rebuilds.lock();
            if let Some(rerun) = rebuilds.get_mut(platform) {
                *rerun = true;
                return;
            }
            rebuilds.insert(platform.to_string(), false);
        }

        let this = self.clone();
        let platform = platform.to_string();
        tokio::spawn(async move {
            loop {
                if let Err(e) = this.rebuild_universe(&platform).await {
                    tracing::warn!(platform = %platform, error = %e, "tag universe rebuild failed");
                }

                let again = {
                    let mut rebuilds = this.rebuilds.lock();
                    match rebuilds.get_mut(&platform) {
                        Some(rerun) if *rerun => {
                            *rerun = false;
                            true
                        }
                        _ => {
                            rebuilds.remove(&platform);
                            if rebuilds.is_empty() {
                                this.idle.notify_waiters();
                            }
                            false
                        }
                    }
                };
                if !again {
                    break;
                }
            }
        });
    }

    /// Split hash fields into live tag names and expired ones
    fn partition_live(&self, fields: HashMap<String, String>) -> (Vec<String>, Vec<String>) {
        let now = self.clock.now().timestamp();
        let mut live = Vec::new();
        let mut expired = Vec::new();
        for (name, expiry) in fields {
            match expiry.parse::<i64>() {
                Ok(at) if at > now => live.push(name),
                _ => expired.push(name),
            }
        }
        (live, expired)
    }
}
