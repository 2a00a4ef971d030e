//! Spy engine wrappers for release accounting and fault injection.

use parking_lot::Mutex;
use rowgate_engine::{
    Cursor, Engine, EngineError, EngineResult, Key, MemoryEngine, Row, Session, Statement,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Records every session close and the success flag it carried.
#[derive(Debug, Default)]
pub struct ReleaseLog {
    closes: AtomicU64,
    flags: Mutex<Vec<bool>>,
}

impl ReleaseLog {
    /// Records one close event.
    pub fn record(&self, success: bool) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.flags.lock().push(success);
    }

    /// Returns the total number of close events.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.closes.load(Ordering::SeqCst)
    }

    /// Returns the recorded success flags, in close order.
    #[must_use]
    pub fn flags(&self) -> Vec<bool> {
        self.flags.lock().clone()
    }

    /// Returns and clears the recorded flags, for test phases that want a
    /// clean baseline.
    pub fn drain(&self) -> Vec<bool> {
        std::mem::take(&mut *self.flags.lock())
    }
}

/// A [`MemoryEngine`] wrapper whose sessions record every close in a
/// [`ReleaseLog`] and whose cursors can be scripted to fail mid-stream.
pub struct SpyEngine {
    inner: MemoryEngine,
    log: Arc<ReleaseLog>,
    fail_rows_after: Option<usize>,
}

impl SpyEngine {
    /// Creates a spy over a fresh in-memory engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: MemoryEngine::new(),
            log: Arc::new(ReleaseLog::default()),
            fail_rows_after: None,
        }
    }

    /// Creates a spy whose cursors yield `rows` rows and then fail.
    #[must_use]
    pub fn failing_after(rows: usize) -> Self {
        Self {
            fail_rows_after: Some(rows),
            ..Self::new()
        }
    }

    /// Returns the shared release log.
    #[must_use]
    pub fn log(&self) -> Arc<ReleaseLog> {
        Arc::clone(&self.log)
    }

    /// Returns the wrapped engine, for direct seeding and row counts.
    #[must_use]
    pub fn inner(&self) -> &MemoryEngine {
        &self.inner
    }
}

impl Default for SpyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for SpyEngine {
    fn name(&self) -> &str {
        "spy-memory"
    }

    fn open_session(&self) -> EngineResult<Box<dyn Session>> {
        Ok(Box::new(SpySession {
            inner: self.inner.open_session()?,
            log: Arc::clone(&self.log),
            fail_rows_after: self.fail_rows_after,
        }))
    }
}

struct SpySession {
    inner: Box<dyn Session>,
    log: Arc<ReleaseLog>,
    fail_rows_after: Option<usize>,
}

impl Session for SpySession {
    fn fetch(&mut self, table: &str, key: &Key) -> EngineResult<Option<Row>> {
        self.inner.fetch(table, key)
    }

    fn insert(
        &mut self,
        table: &str,
        row: &Row,
        key: &Key,
        generated: Option<&str>,
    ) -> EngineResult<Option<i64>> {
        self.inner.insert(table, row, key, generated)
    }

    fn update(&mut self, table: &str, key: &Key, row: &Row) -> EngineResult<()> {
        self.inner.update(table, key, row)
    }

    fn delete(&mut self, table: &str, key: &Key) -> EngineResult<()> {
        self.inner.delete(table, key)
    }

    fn prepare(&mut self, sql: &str) -> EngineResult<Box<dyn Statement>> {
        Ok(Box::new(SpyStatement {
            inner: self.inner.prepare(sql)?,
            fail_rows_after: self.fail_rows_after,
        }))
    }

    fn scan(&mut self, table: &str, predicate: Option<&str>) -> EngineResult<Box<dyn Statement>> {
        Ok(Box::new(SpyStatement {
            inner: self.inner.scan(table, predicate)?,
            fail_rows_after: self.fail_rows_after,
        }))
    }

    fn close(&mut self, success: bool) -> EngineResult<()> {
        let result = self.inner.close(success);
        if result.is_ok() {
            self.log.record(success);
        }
        result
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

struct SpyStatement {
    inner: Box<dyn Statement>,
    fail_rows_after: Option<usize>,
}

impl Statement for SpyStatement {
    fn execute_query(&mut self) -> EngineResult<Box<dyn Cursor>> {
        Ok(Box::new(SpyCursor {
            inner: self.inner.execute_query()?,
            remaining: self.fail_rows_after,
        }))
    }

    fn execute_update(&mut self) -> EngineResult<u64> {
        self.inner.execute_update()
    }

    fn close(&mut self) -> EngineResult<()> {
        self.inner.close()
    }
}

struct SpyCursor {
    inner: Box<dyn Cursor>,
    remaining: Option<usize>,
}

impl Cursor for SpyCursor {
    fn next_row(&mut self) -> EngineResult<Option<Row>> {
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                return Err(EngineError::internal("injected cursor failure"));
            }
            *remaining -= 1;
        }
        self.inner.next_row()
    }

    fn close(&mut self) -> EngineResult<()> {
        self.inner.close()
    }
}
