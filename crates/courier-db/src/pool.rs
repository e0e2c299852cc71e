use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::error::Result;

pub(crate) type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Shared pool of SQLite connections. Cheap to clone; every clone hands out
/// connections from the same pool.
///
/// Connections are opened on demand, so constructing the pool does not touch
/// the database file until the first session is created.
#[derive(Clone)]
pub struct DbPool {
    inner: r2d2::Pool<SqliteConnectionManager>,
}

impl DbPool {
    pub fn open(config: &DbConfig) -> Result<Self> {
        let busy_timeout = config.busy_timeout;
        let manager = SqliteConnectionManager::file(&config.path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            // WAL mode for concurrent reads
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
        });

        let inner = r2d2::Pool::builder()
            .max_size(config.max_connections)
            .min_idle(Some(0))
            .connection_timeout(config.acquire_timeout)
            .build(manager)?;

        info!(
            "Database pool ready for {} (max {} connections)",
            config.path.display(),
            config.max_connections
        );
        Ok(Self { inner })
    }

    /// Take one connection out of the pool, blocking until one is free or the
    /// acquire timeout elapses.
    pub(crate) fn acquire(&self) -> Result<PooledConn> {
        let conn = self.inner.get()?;
        debug!(idle = self.inner.state().idle_connections, "connection acquired");
        Ok(conn)
    }

    /// Connections currently open, idle or checked out.
    pub fn connections(&self) -> u32 {
        self.inner.state().connections
    }

    /// Open connections sitting in the pool, not owned by any session.
    pub fn idle_connections(&self) -> u32 {
        self.inner.state().idle_connections
    }

    pub fn max_connections(&self) -> u32 {
        self.inner.max_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pool_is_lazy_and_reuses_connections() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DbPool::open(&DbConfig::new(dir.path().join("pool.db"))).unwrap();
        assert_eq!(pool.connections(), 0);

        {
            let conn = pool.acquire().unwrap();
            let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
            assert_eq!(fk, 1);
            assert_eq!(pool.idle_connections(), 0);
        }

        assert_eq!(pool.connections(), 1);
        assert_eq!(pool.idle_connections(), 1);
        let _again = pool.acquire().unwrap();
        assert_eq!(pool.connections(), 1);
    }

    #[test]
    fn clones_share_one_pool() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DbConfig::new(dir.path().join("pool.db"));
        config.max_connections = 1;
        config.acquire_timeout = Duration::from_millis(200);
        let pool = DbPool::open(&config).unwrap();
        let other = pool.clone();

        let held = pool.acquire().unwrap();
        assert!(other.acquire().is_err());
        drop(held);
        assert!(other.acquire().is_ok());
    }
}
