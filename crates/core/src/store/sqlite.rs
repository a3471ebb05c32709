//! SQLite-backed key-value store.
//!
//! Every key lives in a single `kv` table with an optional absolute expiry in
//! epoch milliseconds. Reads filter out expired rows, so an entry is never
//! served once its deadline has passed even if it has not been purged yet.

use std::path::Path;

use async_trait::async_trait;
use tokio_rusqlite::rusqlite::{self, TransactionBehavior};
use tokio_rusqlite::{Connection, params};

use super::{KvStore, migrations, parse_counter};
use crate::Error;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA busy_timeout=5000;";

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// SQLite store handle.
///
/// Wraps a tokio-rusqlite Connection that runs operations on a background
/// thread. Cloning shares the same connection.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pub(crate) conn: Connection,
}

impl SqliteStore {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas, and runs any
    /// pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::configure(conn).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::configure(conn).await
    }

    async fn configure(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn incr(&self, key: &str) -> Result<u64, Error> {
        let key = key.to_string();
        let now = now_millis();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let live = tx.query_row(
                    "SELECT value, expires_at FROM kv
                    WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                    params![key, now],
                    |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Option<i64>>(1)?)),
                );

                let (current, expires_at) = match live {
                    Ok((raw, expires_at)) => (parse_counter(&key, &raw)?, expires_at),
                    Err(rusqlite::Error::QueryReturnedNoRows) => (0, None),
                    Err(e) => return Err(e.into()),
                };

                let next = current
                    .checked_add(1)
                    .ok_or_else(|| Error::StoreUnavailable(format!("counter at {key} overflowed")))?;

                tx.execute(
                    "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        expires_at = excluded.expires_at",
                    params![key, next.to_string().into_bytes(), expires_at],
                )?;
                tx.commit()?;

                Ok(next)
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let key = key.to_string();
        let now = now_millis();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT value FROM kv
                    WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                )?;

                match stmt.query_row(params![key, now], |row| row.get(0)) {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), Error> {
        if ttl_seconds == 0 {
            return Err(Error::InvalidTtl(0));
        }
        let ttl_ms = i64::try_from(ttl_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);

        let key = key.to_string();
        let value = value.to_vec();
        let expires_at = now_millis().saturating_add(ttl_ms);
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        expires_at = excluded.expires_at",
                    params![key, value, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let now = now_millis();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                    params![now],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
