use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;

use crate::constants::DEFAULT_REDIS_KEY_PREFIX;
use crate::error::{ConfigError, NonceStoreError};
use crate::nonce_store::NonceStore;

/// Nonce store backed by Redis, for deployments with more than one instance.
///
/// A claim is one `SET key 1 NX PX <ttl>` command: the existence check and the
/// expiry are applied atomically by the server, and Redis drops the key itself
/// once the TTL runs out.
///
/// One multiplexed connection is opened on first use and shared by every claim;
/// it is dropped and re-opened after an I/O failure.
#[derive(Clone)]
pub struct RedisNonceStore {
    client: redis::Client,
    key_prefix: String,
    connection: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl RedisNonceStore {
    /// Create a store from a connection URL such as `redis://127.0.0.1:6379/`.
    ///
    /// Only parses the URL; no connection is made until the first claim. A blank
    /// prefix falls back to `swish:nonce:`.
    pub fn new(url: &str, key_prefix: impl Into<String>) -> Result<Self, ConfigError> {
        if url.trim().is_empty() {
            return Err(ConfigError::MissingRequired("redis connection string"));
        }
        let client = redis::Client::open(url)
            .map_err(|e| ConfigError::Backend(format!("invalid redis url: {e}")))?;
        let key_prefix = key_prefix.into();
        let key_prefix = if key_prefix.trim().is_empty() {
            DEFAULT_REDIS_KEY_PREFIX.to_string()
        } else {
            key_prefix
        };
        Ok(Self {
            client,
            key_prefix,
            connection: Arc::new(Mutex::new(None)),
        })
    }

    pub fn key_for(&self, nonce: &str) -> String {
        format!("{}{}", self.key_prefix, nonce)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, NonceStoreError> {
        let mut cached = self.connection.lock().await;
        if let Some(conn) = cached.as_ref() {
            return Ok(conn.clone());
        }
        // Held across the connect so concurrent first claims share one connection.
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| NonceStoreError::Unavailable(format!("redis connect failed: {e}")))?;
        tracing::debug!("opened redis nonce store connection");
        *cached = Some(conn.clone());
        Ok(conn)
    }

    async fn forget_connection(&self) {
        self.connection.lock().await.take();
    }

    /// Whether a connection has been opened and is being reused.
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }
}

impl std::fmt::Debug for RedisNonceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The connection info may embed a password.
        f.debug_struct("RedisNonceStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NonceStore for RedisNonceStore {
    async fn try_claim(
        &self,
        nonce: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, NonceStoreError> {
        if nonce.trim().is_empty() {
            return Ok(false);
        }
        let ttl_ms = expires_at.signed_duration_since(now).num_milliseconds();
        if ttl_ms <= 0 {
            return Ok(false);
        }

        let mut conn = self.connection().await?;
        let reply = match redis::cmd("SET")
            .arg(self.key_for(nonce))
            .arg("1")
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async::<Option<String>>(&mut conn)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                if e.is_io_error() || e.is_connection_dropped() {
                    self.forget_connection().await;
                }
                return Err(NonceStoreError::Unavailable(format!(
                    "redis SET NX failed: {e}"
                )));
            }
        };

        // "OK" when the key was created, nil when it already existed.
        Ok(reply.is_some())
    }
}
