//! Scoped statement + cursor lifecycle.

use crate::error::{CoreError, CoreResult};
use crate::tracker::ResourceTracker;
use parking_lot::Mutex;
use rowgate_engine::{Cursor, EngineError, Row, Statement};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// One query execution held as a single releasable unit.
///
/// A `ScopedResultSet` binds the lifetime of a statement and its cursor
/// together so both are always released together, and exactly once. The
/// release path is guarded by an atomic compare-and-set: double close,
/// concurrent close and close-after-exhaustion are all safe no-ops beyond
/// the first call.
///
/// Dropping a result set that was never closed runs the same release path,
/// logging rather than propagating any failure.
pub struct ScopedResultSet {
    inner: Mutex<Option<ScopedInner>>,
    closed: AtomicBool,
    opened_at: Instant,
    tracker: Arc<ResourceTracker>,
    log_interval: u64,
}

struct ScopedInner {
    statement: Box<dyn Statement>,
    cursor: Box<dyn Cursor>,
}

impl ScopedResultSet {
    /// Executes the statement as a query and takes ownership of the pair.
    ///
    /// On success an open event is recorded. On failure no open event is
    /// recorded and the statement is closed here before the error
    /// propagates - the caller handed over ownership and cannot close it
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns the engine's execution error.
    pub fn execute(
        mut statement: Box<dyn Statement>,
        tracker: Arc<ResourceTracker>,
        log_interval: u64,
    ) -> CoreResult<Self> {
        match statement.execute_query() {
            Ok(cursor) => {
                tracker.on_open();
                Ok(Self {
                    inner: Mutex::new(Some(ScopedInner { statement, cursor })),
                    closed: AtomicBool::new(false),
                    opened_at: Instant::now(),
                    tracker,
                    log_interval,
                })
            }
            Err(error) => {
                if let Err(close_error) = statement.close() {
                    warn!(error = %close_error, "statement close failed after execution error");
                }
                Err(error.into())
            }
        }
    }

    /// Returns the next row from the cursor.
    ///
    /// # Errors
    ///
    /// Returns `ResultSetClosed` after close, or the engine's mid-stream
    /// error.
    pub fn next_row(&self) -> CoreResult<Option<Row>> {
        let mut guard = self.inner.lock();
        match guard.as_mut() {
            Some(inner) => Ok(inner.cursor.next_row()?),
            None => Err(CoreError::ResultSetClosed),
        }
    }

    /// Returns whether the release path has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Releases the cursor, then the statement, exactly once.
    ///
    /// Both halves are always attempted: a cursor close failure does not
    /// stop the statement close. The first error encountered is the one
    /// surfaced; a second failure is logged, never allowed to mask that the
    /// first resource's release was attempted. Release failures are not
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns the first engine release error of the single effective
    /// close; later calls always return `Ok`.
    pub fn close(&self) -> CoreResult<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let Some(inner) = self.inner.lock().take() else {
            return Ok(());
        };
        let ScopedInner {
            mut statement,
            mut cursor,
        } = inner;

        let mut first_error: Option<EngineError> = None;
        if let Err(error) = cursor.close() {
            first_error = Some(error);
        }
        if let Err(error) = statement.close() {
            if first_error.is_some() {
                warn!(error = %error, "statement close failed after cursor close error");
            } else {
                first_error = Some(error);
            }
        }

        let closed = self.tracker.on_close();
        if self.log_interval > 0 && closed % self.log_interval == 0 {
            debug!(
                kind = self.tracker.kind(),
                closed,
                held_ms = self.opened_at.elapsed().as_millis() as u64,
                "result-set close accounting"
            );
        }

        match first_error {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }
}

impl Drop for ScopedResultSet {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(error) = self.close() {
                warn!(error = %error, "result-set release failed on drop");
            }
        }
    }
}

impl std::fmt::Debug for ScopedResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedResultSet")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowgate_engine::{EngineResult, Value};
    use std::sync::atomic::AtomicU64;

    /// Statement double yielding scripted rows and counting close calls.
    struct ScriptedStatement {
        rows: Vec<Row>,
        fail_execute: bool,
        fail_close: bool,
        closes: Arc<AtomicU64>,
        cursor_closes: Arc<AtomicU64>,
        cursor_fail_close: bool,
    }

    impl ScriptedStatement {
        fn new(rows: Vec<Row>) -> Self {
            Self {
                rows,
                fail_execute: false,
                fail_close: false,
                closes: Arc::new(AtomicU64::new(0)),
                cursor_closes: Arc::new(AtomicU64::new(0)),
                cursor_fail_close: false,
            }
        }
    }

    struct ScriptedCursor {
        rows: Vec<Row>,
        pos: usize,
        closes: Arc<AtomicU64>,
        fail_close: bool,
    }

    impl Statement for ScriptedStatement {
        fn execute_query(&mut self) -> EngineResult<Box<dyn Cursor>> {
            if self.fail_execute {
                return Err(EngineError::internal("execute failure"));
            }
            Ok(Box::new(ScriptedCursor {
                rows: self.rows.clone(),
                pos: 0,
                closes: Arc::clone(&self.cursor_closes),
                fail_close: self.cursor_fail_close,
            }))
        }

        fn execute_update(&mut self) -> EngineResult<u64> {
            Err(EngineError::invalid_query("not an update"))
        }

        fn close(&mut self) -> EngineResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(EngineError::internal("statement close failure"))
            } else {
                Ok(())
            }
        }
    }

    impl Cursor for ScriptedCursor {
        fn next_row(&mut self) -> EngineResult<Option<Row>> {
            let row = self.rows.get(self.pos).cloned();
            if row.is_some() {
                self.pos += 1;
            }
            Ok(row)
        }

        fn close(&mut self) -> EngineResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(EngineError::internal("cursor close failure"))
            } else {
                Ok(())
            }
        }
    }

    fn tracker() -> Arc<ResourceTracker> {
        Arc::new(ResourceTracker::new("result-set"))
    }

    fn one_row() -> Vec<Row> {
        vec![Row::new().with("ABC_ID", Value::Int(1))]
    }

    #[test]
    fn streams_rows_then_close() {
        let statement = ScriptedStatement::new(one_row());
        let tracker = tracker();
        let results = ScopedResultSet::execute(Box::new(statement), Arc::clone(&tracker), 0).unwrap();
        assert_eq!(tracker.opened(), 1);

        assert!(results.next_row().unwrap().is_some());
        assert!(results.next_row().unwrap().is_none());

        results.close().unwrap();
        assert_eq!(tracker.closed(), 1);
        assert!(results.is_closed());
        assert!(matches!(
            results.next_row(),
            Err(CoreError::ResultSetClosed)
        ));
    }

    #[test]
    fn close_is_at_most_once() {
        let statement = ScriptedStatement::new(one_row());
        let statement_closes = Arc::clone(&statement.closes);
        let cursor_closes = Arc::clone(&statement.cursor_closes);
        let tracker = tracker();
        let results = ScopedResultSet::execute(Box::new(statement), Arc::clone(&tracker), 0).unwrap();

        results.close().unwrap();
        results.close().unwrap();
        results.close().unwrap();

        assert_eq!(statement_closes.load(Ordering::SeqCst), 1);
        assert_eq!(cursor_closes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.closed(), 1);
    }

    #[test]
    fn concurrent_close_releases_once() {
        use std::thread;

        let statement = ScriptedStatement::new(one_row());
        let statement_closes = Arc::clone(&statement.closes);
        let tracker = tracker();
        let results =
            Arc::new(ScopedResultSet::execute(Box::new(statement), Arc::clone(&tracker), 0).unwrap());

        let mut handles = vec![];
        for _ in 0..8 {
            let r = Arc::clone(&results);
            handles.push(thread::spawn(move || {
                r.close().unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(statement_closes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.closed(), 1);
    }

    #[test]
    fn execution_failure_records_no_open_and_closes_statement() {
        let mut statement = ScriptedStatement::new(vec![]);
        statement.fail_execute = true;
        let statement_closes = Arc::clone(&statement.closes);
        let tracker = tracker();

        let result = ScopedResultSet::execute(Box::new(statement), Arc::clone(&tracker), 0);
        assert!(result.is_err());
        assert_eq!(tracker.opened(), 0);
        assert_eq!(statement_closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cursor_close_failure_still_closes_statement() {
        let mut statement = ScriptedStatement::new(one_row());
        statement.cursor_fail_close = true;
        let statement_closes = Arc::clone(&statement.closes);
        let tracker = tracker();
        let results = ScopedResultSet::execute(Box::new(statement), Arc::clone(&tracker), 0).unwrap();

        let error = results.close().unwrap_err();
        assert!(error.to_string().contains("cursor close failure"));
        assert_eq!(statement_closes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.closed(), 1);
    }

    #[test]
    fn statement_close_failure_surfaces_when_cursor_succeeded() {
        let mut statement = ScriptedStatement::new(one_row());
        statement.fail_close = true;
        let cursor_closes = Arc::clone(&statement.cursor_closes);
        let tracker = tracker();
        let results = ScopedResultSet::execute(Box::new(statement), Arc::clone(&tracker), 0).unwrap();

        let error = results.close().unwrap_err();
        assert!(error.to_string().contains("statement close failure"));
        assert_eq!(cursor_closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_runs_release() {
        let statement = ScriptedStatement::new(one_row());
        let statement_closes = Arc::clone(&statement.closes);
        let tracker = tracker();
        {
            let _results =
                ScopedResultSet::execute(Box::new(statement), Arc::clone(&tracker), 0).unwrap();
        }
        assert_eq!(statement_closes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.closed(), 1);
    }
}
