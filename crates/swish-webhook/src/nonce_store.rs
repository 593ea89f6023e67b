use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::constants::DEFAULT_SWEEP_INTERVAL;
use crate::error::{ConfigError, NonceStoreError};

/// Storage backend for nonce replay protection.
///
/// A nonce is available when it is absent or its recorded expiry is at or before
/// `now`. Once claimed it stays unavailable until that expiry, whatever expiry a
/// later claim asks for. Implementations must be thread-safe (`Send + Sync`) and
/// `try_claim` must be linearizable per nonce: of any number of concurrent claims on
/// the same available nonce, exactly one returns `Ok(true)`.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Atomically claim `nonce` until `expires_at`.
    ///
    /// Returns `Ok(true)` if the nonce was available and is now claimed, `Ok(false)`
    /// if it is currently claimed (a replay) or the request is already expired, and
    /// `Err` if the backend could not answer. A claim either fully commits or does
    /// not happen.
    async fn try_claim(
        &self,
        nonce: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, NonceStoreError>;

    /// Remove records whose expiry is at or before `now`. Returns the number removed.
    ///
    /// Only bounds memory; correctness never depends on it.
    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, NonceStoreError> {
        Ok(0)
    }
}

/// In-memory nonce store backed by DashMap. Single process only.
///
/// Claims are atomic within this process through DashMap's entry API. Two
/// processes sharing a secret must use a shared backend instead.
pub struct InMemoryNonceStore {
    nonces: DashMap<String, DateTime<Utc>>,
}

impl InMemoryNonceStore {
    pub fn new() -> Self {
        Self {
            nonces: DashMap::new(),
        }
    }

    /// Synchronous claim used by the [`NonceStore`] impl.
    pub fn claim(&self, nonce: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if nonce.trim().is_empty() || expires_at <= now {
            return false;
        }
        // The shard lock is held from lookup to insert.
        match self.nonces.entry(nonce.to_owned()) {
            Entry::Occupied(mut record) => {
                if *record.get() > now {
                    false
                } else {
                    // Expired record: it is gone as far as callers can tell.
                    record.insert(expires_at);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
                true
            }
        }
    }

    /// Whether `nonce` is claimed and unexpired at `now`.
    pub fn is_claimed(&self, nonce: &str, now: DateTime<Utc>) -> bool {
        self.nonces
            .get(nonce)
            .map(|expires_at| *expires_at > now)
            .unwrap_or(false)
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.nonces.len();
        self.nonces.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.nonces.len())
    }

    /// Number of records currently held, expired or not.
    pub fn len(&self) -> usize {
        self.nonces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nonces.is_empty()
    }
}

impl Default for InMemoryNonceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn try_claim(
        &self,
        nonce: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, NonceStoreError> {
        Ok(self.claim(nonce, expires_at, now))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, NonceStoreError> {
        Ok(self.purge_expired_at(now))
    }
}

/// Spawn a background task that purges expired records every `interval`.
///
/// The task holds only a weak reference and exits once the store is dropped.
/// Must be called from within a Tokio runtime.
pub fn start_sweeper(store: &Arc<dyn NonceStore>, interval: Duration) -> JoinHandle<()> {
    let store: Weak<dyn NonceStore> = Arc::downgrade(store);
    let period = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(store) = store.upgrade() else {
                tracing::debug!("nonce store dropped, stopping sweeper");
                break;
            };
            match store.purge_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "purged expired nonces"),
                Err(e) => tracing::warn!(error = %e, "nonce sweep failed"),
            }
        }
    })
}

/// Nonce store selection, resolved once at startup by the composition root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonceBackend {
    /// Process-local store with a periodic expiry sweep.
    InMemory { sweep_interval: Duration },
    /// Shared Redis store; expiry is delegated to key TTLs.
    #[cfg(feature = "redis")]
    Redis { url: String, key_prefix: String },
    /// SQLite file shared by processes on one host.
    #[cfg(feature = "sqlite")]
    Sqlite { path: String, sweep_interval: Duration },
}

impl Default for NonceBackend {
    fn default() -> Self {
        Self::InMemory {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl NonceBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InMemory { .. } => "in-memory",
            #[cfg(feature = "redis")]
            Self::Redis { .. } => "redis",
            #[cfg(feature = "sqlite")]
            Self::Sqlite { .. } => "sqlite",
        }
    }

    /// Whether claims made through this backend are visible to other processes.
    pub fn is_shared(&self) -> bool {
        !matches!(self, Self::InMemory { .. })
    }

    /// Construct the store and, where the backend needs one, start its sweeper.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(&self) -> Result<Arc<dyn NonceStore>, ConfigError> {
        match self {
            Self::InMemory { sweep_interval } => {
                let store: Arc<dyn NonceStore> = Arc::new(InMemoryNonceStore::new());
                start_sweeper(&store, non_zero(*sweep_interval, "sweep_interval")?);
                Ok(store)
            }
            #[cfg(feature = "redis")]
            Self::Redis { url, key_prefix } => Ok(Arc::new(
                crate::redis_store::RedisNonceStore::new(url, key_prefix.as_str())?,
            )),
            #[cfg(feature = "sqlite")]
            Self::Sqlite {
                path,
                sweep_interval,
            } => {
                let interval = non_zero(*sweep_interval, "sweep_interval")?;
                let store: Arc<dyn NonceStore> = Arc::new(
                    SqliteNonceStore::open(path)
                        .map_err(|e| ConfigError::Backend(format!("sqlite at {path}: {e}")))?,
                );
                start_sweeper(&store, interval);
                Ok(store)
            }
        }
    }
}

fn non_zero(value: Duration, name: &'static str) -> Result<Duration, ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::InvalidDuration {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteNonceStore;

#[cfg(feature = "sqlite")]
mod sqlite {
    use std::sync::{Arc, Mutex, MutexGuard};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::NonceStore;
    use crate::error::NonceStoreError;

    /// Nonce store backed by a SQLite file.
    ///
    /// Claims are a single upsert statement, so they are atomic across every process
    /// that opens the same file.
    pub struct SqliteNonceStore {
        conn: Arc<Mutex<rusqlite::Connection>>,
    }

    impl SqliteNonceStore {
        /// Open (or create) a nonce database at the given path.
        ///
        /// On Unix the file is restricted to 0600.
        pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
            let conn = rusqlite::Connection::open(path)?;
            conn.busy_timeout(std::time::Duration::from_secs(1))?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS claimed_nonces (
                    nonce TEXT PRIMARY KEY,
                    expires_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_claimed_nonces_expires_at
                    ON claimed_nonces(expires_at);
                PRAGMA journal_mode=WAL;",
            )?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if path != ":memory:" {
                    if let Err(e) =
                        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                    {
                        tracing::warn!(
                            path = %path,
                            error = %e,
                            "failed to set nonce database file permissions to 0600"
                        );
                    }
                }
            }

            Ok(Self {
                conn: Arc::new(Mutex::new(conn)),
            })
        }

        async fn with_conn<T, F>(&self, f: F) -> Result<T, NonceStoreError>
        where
            T: Send + 'static,
            F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
        {
            let conn = Arc::clone(&self.conn);
            // The statement runs to completion even if the caller stops waiting.
            tokio::task::spawn_blocking(move || f(&lock(&conn)))
                .await
                .map_err(|e| NonceStoreError::Unavailable(format!("sqlite task failed: {e}")))?
                .map_err(|e| NonceStoreError::Unavailable(e.to_string()))
        }
    }

    fn lock(conn: &Mutex<rusqlite::Connection>) -> MutexGuard<'_, rusqlite::Connection> {
        match conn.lock() {
            Ok(c) => c,
            Err(poisoned) => {
                tracing::error!("nonce store mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    #[async_trait]
    impl NonceStore for SqliteNonceStore {
        async fn try_claim(
            &self,
            nonce: &str,
            expires_at: DateTime<Utc>,
            now: DateTime<Utc>,
        ) -> Result<bool, NonceStoreError> {
            if nonce.trim().is_empty() || expires_at <= now {
                return Ok(false);
            }
            let nonce = nonce.to_owned();
            let expires_ms = expires_at.timestamp_millis();
            let now_ms = now.timestamp_millis();

            self.with_conn(move |conn| {
                // Inserts a fresh row, or takes over a row that has already expired.
                // A live row is left untouched and reports zero changes.
                let changed = conn.execute(
                    "INSERT INTO claimed_nonces (nonce, expires_at) VALUES (?1, ?2)
                     ON CONFLICT(nonce) DO UPDATE SET expires_at = excluded.expires_at
                     WHERE claimed_nonces.expires_at <= ?3",
                    rusqlite::params![nonce, expires_ms, now_ms],
                )?;
                Ok(changed == 1)
            })
            .await
        }

        async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, NonceStoreError> {
            let now_ms = now.timestamp_millis();
            self.with_conn(move |conn| {
                conn.execute(
                    "DELETE FROM claimed_nonces WHERE expires_at <= ?1",
                    rusqlite::params![now_ms],
                )
            })
            .await
        }
    }
}
