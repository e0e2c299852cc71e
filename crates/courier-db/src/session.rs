//! Per-unit-of-work database sessions.
//!
//! A session owns exactly one pooled connection from creation until it is
//! completed (or dropped). Read-write sessions open an immediate transaction up
//! front and must be resolved with a commit or a rollback; read-only sessions
//! never issue `BEGIN`.

use std::fmt;
use std::marker::PhantomData;

use rusqlite::{OptionalExtension, Params, Row};
use tracing::{debug, warn};

use crate::error::{DbError, Result};
use crate::pool::{DbPool, PooledConn};

/// Runtime view of a session's mode, mostly for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    ReadOnly,
    ReadWrite,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => f.write_str("read-only"),
            Self::ReadWrite => f.write_str("read-write"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Compile-time session mode. Implemented only by [`ReadOnly`] and [`ReadWrite`].
pub trait Mode: sealed::Sealed {
    const MODE: SessionMode;
}

/// Marker for sessions that run in autocommit mode.
#[derive(Debug)]
pub enum ReadOnly {}

/// Marker for sessions wrapped in a single transaction.
#[derive(Debug)]
pub enum ReadWrite {}

impl sealed::Sealed for ReadOnly {}
impl sealed::Sealed for ReadWrite {}

impl Mode for ReadOnly {
    const MODE: SessionMode = SessionMode::ReadOnly;
}

impl Mode for ReadWrite {
    const MODE: SessionMode = SessionMode::ReadWrite;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Completed,
}

/// How a read-write session ends its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Commit,
    Rollback,
}

impl Resolution {
    fn sql(self) -> &'static str {
        match self {
            Self::Commit => "COMMIT",
            Self::Rollback => "ROLLBACK",
        }
    }
}

impl From<bool> for Resolution {
    fn from(commit: bool) -> Self {
        if commit { Self::Commit } else { Self::Rollback }
    }
}

/// One pooled connection, optionally inside a transaction, for one logical
/// operation.
#[must_use = "a session holds a pooled connection until it is completed"]
pub struct DbSession<M: Mode> {
    conn: Option<PooledConn>,
    _mode: PhantomData<M>,
}

impl DbSession<ReadOnly> {
    /// Acquire a connection without opening a transaction.
    pub fn read_only(pool: &DbPool) -> Result<Self> {
        let conn = pool.acquire()?;
        debug!("read-only session opened");
        Ok(Self {
            conn: Some(conn),
            _mode: PhantomData,
        })
    }

    /// Release the connection back to the pool. Calling it again is a no-op.
    pub fn complete(&mut self) {
        if self.conn.take().is_some() {
            debug!("read-only session completed");
        }
    }
}

impl DbSession<ReadWrite> {
    /// Acquire a connection and issue `BEGIN IMMEDIATE` on it.
    ///
    /// The write lock is taken up front, so a session that reads before it
    /// writes waits on the busy handler instead of failing on a stale snapshot.
    pub fn read_write(pool: &DbPool) -> Result<Self> {
        let conn = pool.acquire()?;
        // On failure the connection goes straight back to the pool.
        conn.execute_batch("BEGIN IMMEDIATE")?;
        debug!("transaction started");
        Ok(Self {
            conn: Some(conn),
            _mode: PhantomData,
        })
    }

    /// End the transaction and release the connection.
    ///
    /// Only the first call does anything; later calls return `Ok(())`. The
    /// connection is released whether or not the terminal statement succeeds.
    pub fn complete(&mut self, resolution: Resolution) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        let result = conn.execute_batch(resolution.sql());
        match &result {
            Ok(()) => debug!("transaction {}", resolution.sql().to_lowercase()),
            Err(e) => {
                warn!("{} failed: {}", resolution.sql(), e);
                // Never hand a connection with an open transaction back to the pool.
                if !conn.is_autocommit() {
                    if let Err(e) = conn.execute_batch("ROLLBACK") {
                        warn!("ROLLBACK after failed {} also failed: {}", resolution.sql(), e);
                    }
                }
            }
        }
        drop(conn);
        result.map_err(DbError::from)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.complete(Resolution::Commit)
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.complete(Resolution::Rollback)
    }

    /// Run `f` inside a named savepoint: released when `f` succeeds, rolled
    /// back to (and released) when it fails. The surrounding transaction stays
    /// open either way.
    pub fn with_savepoint<T, E, F>(&self, name: &str, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Self) -> std::result::Result<T, E>,
        E: From<DbError>,
    {
        check_identifier(name)?;
        self.execute_batch(&format!("SAVEPOINT {name}"))?;

        match f(self) {
            Ok(value) => {
                self.execute_batch(&format!("RELEASE {name}"))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(undo) = self.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}")) {
                    warn!("rolling back savepoint {} failed: {}", name, undo);
                }
                Err(e)
            }
        }
    }
}

impl<M: Mode> DbSession<M> {
    pub fn mode(&self) -> SessionMode {
        M::MODE
    }

    pub fn state(&self) -> SessionState {
        if self.conn.is_some() {
            SessionState::Active
        } else {
            SessionState::Completed
        }
    }

    /// Whether the underlying connection has an open transaction.
    pub fn in_transaction(&self) -> bool {
        self.conn.as_ref().is_some_and(|conn| !conn.is_autocommit())
    }

    fn conn(&self) -> Result<&PooledConn> {
        self.conn.as_ref().ok_or(DbError::SessionCompleted)
    }

    /// Execute one parameterized statement, returning the number of affected rows.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        Ok(self.conn()?.execute(sql, params)?)
    }

    /// Execute a sequence of statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        Ok(self.conn()?.execute_batch(sql)?)
    }

    /// Run a statement expected to produce exactly one row.
    pub fn query_row<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        Ok(self.conn()?.query_row(sql, params, f)?)
    }

    /// Like [`query_row`](Self::query_row), but zero rows is `Ok(None)`.
    pub fn query_opt<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        Ok(self.conn()?.query_row(sql, params, f).optional()?)
    }

    /// Run a statement and map every returned row.
    pub fn query_map<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, f)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Current sequence value of `table`, whose integer primary key is `column`.
    ///
    /// Only meaningful right after an insert into `table` on this session.
    pub fn last_insert_id(&self, table: &str, column: &str) -> Result<i64> {
        check_identifier(table)?;
        check_identifier(column)?;

        let is_key: bool = self.query_row(
            "SELECT EXISTS(SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2 AND pk = 1)",
            (table, column),
            |row| row.get(0),
        )?;
        if !is_key {
            return Err(DbError::InvalidIdentifier(format!("{table}.{column}")));
        }

        self.query_opt(
            "SELECT seq FROM sqlite_sequence WHERE name = ?1",
            [table],
            |row| row.get(0),
        )?
        .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }
}

impl<M: Mode> Drop for DbSession<M> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if matches!(M::MODE, SessionMode::ReadWrite) && !conn.is_autocommit() {
            warn!("read-write session dropped without commit or rollback, rolling back");
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                warn!("ROLLBACK on drop failed: {}", e);
            }
        }
    }
}

impl<M: Mode> fmt::Debug for DbSession<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSession")
            .field("mode", &M::MODE)
            .field("state", &self.state())
            .finish()
    }
}

fn check_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}
