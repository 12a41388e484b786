//! One cached SQLite handle per worker thread.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    thread::{self, ThreadId},
};

use futures::future::{BoxFuture, join_all};
use sqlx::{
    Connection,
    sqlite::{SqliteConnectOptions, SqliteConnection},
};
use tracing::{debug, warn};

use super::StorageError;

/// Liveness probe run on a cached handle before it is handed out again.
pub type HealthCheck = fn(&mut SqliteConnection) -> BoxFuture<'_, Result<(), sqlx::Error>>;

fn ping(conn: &mut SqliteConnection) -> BoxFuture<'_, Result<(), sqlx::Error>> {
    Box::pin(async move { conn.ping().await })
}

pub struct HandleCache {
    options: SqliteConnectOptions,
    health_check: HealthCheck,
    slots: Mutex<HashMap<ThreadId, SqliteConnection>>,
}

/// A handle checked out of the cache. Hand it back with [`HandleCache::restore`];
/// a lease that is simply dropped closes its connection instead of caching it.
pub struct Lease {
    worker: ThreadId,
    pub conn: SqliteConnection,
}

impl HandleCache {
    pub fn new(options: SqliteConnectOptions) -> Self {
        Self::with_health_check(options, ping)
    }

    pub fn with_health_check(options: SqliteConnectOptions, health_check: HealthCheck) -> Self {
        Self {
            options,
            health_check,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Check out the calling worker's handle, opening one on first use.
    ///
    /// A cached handle is health-checked first; if that fails it is discarded
    /// and a fresh connection takes its place.
    pub async fn acquire(&self) -> Result<Lease, StorageError> {
        let worker = thread::current().id();
        let cached = self.slots()?.remove(&worker);

        let conn = match cached {
            Some(mut conn) => match (self.health_check)(&mut conn).await {
                Ok(()) => conn,
                Err(err) => {
                    warn!(?err, ?worker, "discarding broken history handle");
                    drop(conn);
                    self.connect().await?
                }
            },
            None => self.connect().await?,
        };

        Ok(Lease { worker, conn })
    }

    /// Return a lease to its worker's slot. When another handle was cached for
    /// that worker in the meantime, the surplus connection is closed.
    pub async fn restore(&self, lease: Lease) {
        let surplus = match self.slots() {
            Ok(mut slots) => {
                if slots.contains_key(&lease.worker) {
                    Some(lease.conn)
                } else {
                    slots.insert(lease.worker, lease.conn);
                    None
                }
            }
            Err(err) => {
                warn!(?err, "history handle cache unavailable, closing handle");
                Some(lease.conn)
            }
        };

        if let Some(conn) = surplus {
            if let Err(err) = conn.close().await {
                warn!(?err, "failed to close surplus history handle");
            }
        }
    }

    /// Close the calling worker's cached handle. Returns whether one existed.
    pub async fn release_current(&self) -> Result<bool, StorageError> {
        let worker = thread::current().id();
        let cached = self.slots()?.remove(&worker);
        match cached {
            Some(conn) => {
                conn.close().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close every cached handle and return how many were released.
    pub async fn release_all(&self) -> Result<usize, StorageError> {
        let drained: Vec<SqliteConnection> = self.slots()?.drain().map(|(_, conn)| conn).collect();
        let released = drained.len();

        for result in join_all(drained.into_iter().map(|conn| conn.close())).await {
            if let Err(err) = result {
                warn!(?err, "failed to close history handle cleanly");
            }
        }

        Ok(released)
    }

    pub fn cached_handles(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    async fn connect(&self) -> Result<SqliteConnection, StorageError> {
        let conn = SqliteConnection::connect_with(&self.options).await?;
        debug!(worker = ?thread::current().id(), "opened history handle");
        Ok(conn)
    }

    fn slots(&self) -> Result<MutexGuard<'_, HashMap<ThreadId, SqliteConnection>>, StorageError> {
        self.slots.lock().map_err(|_| StorageError::Poisoned)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::{TempDir, tempdir};

    use super::*;

    /// Healthy only once the connection carries a `temp.healthy` table.
    fn requires_marker(conn: &mut SqliteConnection) -> BoxFuture<'_, Result<(), sqlx::Error>> {
        Box::pin(async move {
            sqlx::query("SELECT 1 FROM temp.healthy")
                .execute(conn)
                .await
                .map(|_| ())
        })
    }

    fn cache_in(dir: &TempDir, health_check: HealthCheck) -> HandleCache {
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("handles.db"))
            .create_if_missing(true);
        HandleCache::with_health_check(options, health_check)
    }

    #[tokio::test]
    async fn broken_handle_is_replaced_with_fresh_one() {
        let dir = tempdir().expect("temp dir");
        let cache = cache_in(&dir, requires_marker);

        // First use opens a handle without checking it; mark it so it can be recognised.
        let mut lease = cache.acquire().await.expect("acquire");
        sqlx::query("CREATE TEMP TABLE stale (x INTEGER)")
            .execute(&mut lease.conn)
            .await
            .expect("mark handle");
        cache.restore(lease).await;
        assert_eq!(cache.cached_handles(), 1);

        // The cached handle fails its check, so a new connection is handed out.
        let mut lease = cache.acquire().await.expect("acquire");
        assert_eq!(cache.cached_handles(), 0);
        assert!(
            sqlx::query("SELECT 1 FROM temp.stale")
                .execute(&mut lease.conn)
                .await
                .is_err()
        );
        sqlx::query("CREATE TEMP TABLE healthy (x INTEGER)")
            .execute(&mut lease.conn)
            .await
            .expect("mark handle");
        cache.restore(lease).await;
        assert_eq!(cache.cached_handles(), 1);

        // A passing check reuses the cached handle.
        let mut lease = cache.acquire().await.expect("acquire");
        sqlx::query("SELECT 1 FROM temp.healthy")
            .execute(&mut lease.conn)
            .await
            .expect("same handle reused");
        cache.restore(lease).await;
        assert_eq!(cache.cached_handles(), 1);
    }

    #[tokio::test]
    async fn surplus_lease_is_closed_not_cached() {
        let dir = tempdir().expect("temp dir");
        let cache = cache_in(&dir, ping);

        let first = cache.acquire().await.expect("acquire");
        let mut second = cache.acquire().await.expect("acquire");
        sqlx::query("CREATE TEMP TABLE second (x INTEGER)")
            .execute(&mut second.conn)
            .await
            .expect("mark handle");

        cache.restore(first).await;
        cache.restore(second).await;
        assert_eq!(cache.cached_handles(), 1);

        // The slot kept the first handle.
        let mut lease = cache.acquire().await.expect("acquire");
        assert!(
            sqlx::query("SELECT 1 FROM temp.second")
                .execute(&mut lease.conn)
                .await
                .is_err()
        );
        cache.restore(lease).await;
        assert_eq!(cache.release_all().await.expect("release all"), 1);
    }
}
