//! Persistence-engine capability traits.

use crate::error::EngineResult;
use crate::value::{Key, Row};

/// A pluggable persistence engine.
///
/// Engines are **opaque row stores**. They hand out sessions (units of
/// work) and know nothing about entities, field conventions, or auditing -
/// all of that lives above this boundary.
///
/// # Invariants
///
/// - A session obtained from `open_session` is exclusively owned by its
///   caller until closed
/// - Rows come back in the order the engine produced them; no reordering
///   happens at this boundary
/// - Engines must be `Send + Sync`; sessions are `Send` but single-threaded
///
/// # Implementors
///
/// - [`crate::MemoryEngine`] - the default in-memory adapter
pub trait Engine: Send + Sync {
    /// Returns a short engine name for diagnostics ("memory", ...).
    fn name(&self) -> &str;

    /// Opens a new session (unit-of-work).
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot provide a session (connection
    /// failure, pool exhaustion in a pooled adapter).
    fn open_session(&self) -> EngineResult<Box<dyn Session>>;
}

/// A unit-of-work bound to one broker until released.
///
/// All operations are synchronous on the caller's thread and may block on
/// engine I/O. Every operation after `close` fails with
/// [`crate::EngineError::SessionClosed`] - sessions never silently reopen.
pub trait Session: Send {
    /// Reads the row matching the natural key.
    ///
    /// Returns `Ok(None)` when no row matches; absence at this level is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an error on engine failure or if the session is closed.
    fn fetch(&mut self, table: &str, key: &Key) -> EngineResult<Option<Row>>;

    /// Inserts a row.
    ///
    /// When `generated` names a key column and that column is unset in the
    /// row, the engine assigns the next key value, stores the row with it,
    /// and returns `Some(value)` so the caller can write it back. A row
    /// arriving with its key already set is stored as-is.
    ///
    /// # Errors
    ///
    /// Returns `ConstraintViolation` if a row with the same key already
    /// exists; the store is left untouched.
    fn insert(
        &mut self,
        table: &str,
        row: &Row,
        key: &Key,
        generated: Option<&str>,
    ) -> EngineResult<Option<i64>>;

    /// Updates the row matching the natural key with the given columns.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` if no row matches the key.
    fn update(&mut self, table: &str, key: &Key, row: &Row) -> EngineResult<()>;

    /// Deletes the row matching the natural key.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` if no row matches the key; whether absence
    /// matters is the caller's call.
    fn delete(&mut self, table: &str, key: &Key) -> EngineResult<()>;

    /// Prepares a raw query in the engine dialect.
    ///
    /// This is the escape hatch: the caller owns the returned statement and
    /// is responsible for its release.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if the text cannot be parsed.
    fn prepare(&mut self, sql: &str) -> EngineResult<Box<dyn Statement>>;

    /// Prepares a streaming scan over one table.
    ///
    /// `predicate` optionally filters and orders the scan using the
    /// predicate form of the engine dialect. The scan is lazy: rows are
    /// produced by the statement's cursor, never preloaded here.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if the predicate cannot be parsed.
    fn scan(&mut self, table: &str, predicate: Option<&str>) -> EngineResult<Box<dyn Statement>>;

    /// Closes the session, ending the unit-of-work.
    ///
    /// `success=false` tells the engine the unit-of-work failed, for its
    /// own accounting; it is not a rollback directive at this boundary.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the session was already closed.
    fn close(&mut self, success: bool) -> EngineResult<()>;

    /// Returns whether the session has been closed.
    fn is_closed(&self) -> bool;
}

/// A prepared statement, paired with at most one cursor.
pub trait Statement: Send {
    /// Executes the statement as a query, producing a cursor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if the statement is not a query, or an engine
    /// error if execution fails.
    fn execute_query(&mut self) -> EngineResult<Box<dyn Cursor>>;

    /// Executes the statement as an update, returning the affected-row count.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if the statement is a query.
    fn execute_update(&mut self) -> EngineResult<u64>;

    /// Releases the statement. Safe to call once; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to release the resource.
    fn close(&mut self) -> EngineResult<()>;
}

/// A forward-only cursor over query results.
pub trait Cursor: Send {
    /// Returns the next row, or `Ok(None)` once exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error on engine failure mid-stream or if the cursor is
    /// closed.
    fn next_row(&mut self) -> EngineResult<Option<Row>>;

    /// Releases the cursor. Safe to call once; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to release the resource.
    fn close(&mut self) -> EngineResult<()>;
}
