//! Redis backend
//!
//! Uses a `ConnectionManager`, which multiplexes commands over one connection
//! and reconnects on failure. Clones share the connection.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo,
    aio::ConnectionManager,
};

use crate::error::{Result, StoreError};
use crate::kv::KvStore;

/// Redis connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct RedisStoreConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: i64,
}

impl std::fmt::Debug for RedisStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("db", &self.db)
            .finish()
    }
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6379,
            password: String::new(),
            db: 0,
        }
    }
}

impl RedisStoreConfig {
    /// Connection parameters; the password is passed through as-is
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                password: (!self.password.is_empty()).then(|| self.password.clone()),
                ..Default::default()
            },
        }
    }
}

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    pub async fn connect(config: &RedisStoreConfig) -> Result<Self> {
        let client =
            Client::open(config.connection_info()).map_err(|e| StoreError::Connection(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(host = %config.host, port = config.port, db = config.db, "redis connected");

        Ok(Self { conn })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

fn ttl_secs(ttl: Duration) -> i64 {
    ttl.as_secs().max(1) as i64
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.conn().get::<_, Option<String>>(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn().set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let removed: i64 = self.conn().del(key).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.conn().exists::<_, bool>(key).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        Ok(self.conn().expire::<_, bool>(key, ttl_secs(ttl)).await?)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.conn().hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn hset_many(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        self.conn().hset_multiple::<_, _, _, ()>(key, fields).await?;
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        let removed: i64 = self.conn().hdel(key, field).await?;
        Ok(removed > 0)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.conn().hgetall::<_, HashMap<String, String>>(key).await?)
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        self.conn().sadd::<_, _, ()>(key, members).await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.conn().smembers::<_, Vec<String>>(key).await?)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(self.conn().keys::<_, Vec<String>>(pattern).await?)
    }

    async fn replace_set(&self, key: &str, members: &[String], ttl: Duration) -> Result<()> {
        let mut pipe = redis::pipe();
        pipe.atomic().del(key).ignore();
        if !members.is_empty() {
            pipe.sadd(key, members)
                .ignore()
                .expire(key, ttl_secs(ttl))
                .ignore();
        }
        pipe.query_async::<()>(&mut self.conn()).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        redis::cmd("PING")
            .query_async::<String>(&mut self.conn())
            .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
