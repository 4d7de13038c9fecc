//! Database abstraction over SQLite via sqlx.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};

use crate::error::StoreError;

/// Per-conversation retention cap.
pub const MAX_MESSAGES_PER_CONVERSATION: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_messages_per_conversation: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_messages_per_conversation: MAX_MESSAGES_PER_CONVERSATION,
        }
    }
}

/// Central store handle.  Cheap to clone (Arc internally).
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    config: StoreConfig,
    /// Last timestamp handed out, in ms. Shared by clones.
    clock: Arc<AtomicI64>,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path`.
    /// Runs all pending migrations automatically.
    ///
    /// WAL journal mode is configured at connection time, not inside a
    /// migration: SQLite forbids changing `journal_mode` inside a
    /// transaction and sqlx wraps every migration in one.
    pub async fn open(db_path: &Path, config: StoreConfig) -> Result<Self, StoreError> {
        if config.max_messages_per_conversation == 0 {
            return Err(StoreError::InvalidConfig(
                "max_messages_per_conversation must be at least 1".into(),
            ));
        }

        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        let last: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(timestamp), 0) FROM messages")
            .fetch_one(&pool)
            .await?;

        tracing::debug!(
            target: "rc_store",
            event = "store_opened",
            path = %db_path.display(),
            cap = config.max_messages_per_conversation
        );

        Ok(Self {
            pool,
            config,
            clock: Arc::new(AtomicI64::new(last)),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Close every connection. Further operations fail with
    /// [`StoreError::NotInitialised`].
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_open(&self) -> bool {
        !self.pool.is_closed()
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    pub(crate) fn pool(&self) -> Result<&SqlitePool, StoreError> {
        if !self.is_open() {
            return Err(StoreError::NotInitialised);
        }
        Ok(&self.pool)
    }

    /// Wall-clock milliseconds, bumped so every call returns a value strictly
    /// greater than the previous one.
    pub(crate) fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self
            .clock
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| Some(now.max(prev + 1)))
            .unwrap_or_else(|prev| prev);
        now.max(prev + 1)
    }
}
