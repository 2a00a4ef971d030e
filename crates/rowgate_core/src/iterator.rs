//! Broker-owning entity iteration.

use crate::broker::Broker;
use crate::entity::Entity;
use crate::error::CoreResult;
use crate::scoped::ScopedResultSet;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A forward-only, single-pass iterator over entities that owns its broker
/// and guarantees the broker is released exactly once.
///
/// State machine: *open* (constructed, zero or more elements consumed) to
/// either *exhausted* (the cursor reports no more rows, triggering
/// automatic release) or *closed* (the caller released early). Both are
/// terminal and equivalent from the release perspective; release happens
/// exactly once, guarded by taking the owned state out of an `Option`.
///
/// Any error while advancing - an engine failure mid-stream or a row that
/// fails entity mapping - is yielded to the caller, marks the iteration
/// unsuccessful (the eventual release passes `success=false`), and fuses
/// the iterator. Dropping an unfinished iterator runs the same release
/// path: it is the iterator's responsibility, not the caller's, to
/// guarantee that release happens.
///
/// Callers that never close explicitly leak nothing: natural `for`-loop
/// exhaustion and drop both release.
///
/// # Example
///
/// ```rust,ignore
/// let mut names = Vec::new();
/// for account in factory.iterator::<Account>(Some("ORDER BY ACC_ID"))? {
///     names.push(account?.name);
/// }
/// // The broker behind the iterator is already released here.
/// ```
pub struct TrackedIterator<E: Entity> {
    live: Option<Live>,
    success: bool,
    finished: bool,
    opened_at: Instant,
    slow_threshold: Duration,
    _marker: PhantomData<E>,
}

struct Live {
    broker: Box<dyn Broker>,
    results: ScopedResultSet,
}

impl<E: Entity> TrackedIterator<E> {
    /// Opens an iterator over entities of type `E`, taking ownership of
    /// the broker.
    ///
    /// `predicate` optionally filters and orders the scan. Iteration is
    /// lazy: rows stream from the broker's cursor.
    ///
    /// # Errors
    ///
    /// If the scan cannot be opened, the broker is released with
    /// `success=false` before the error propagates.
    pub fn open(
        mut broker: Box<dyn Broker>,
        predicate: Option<&str>,
        slow_threshold: Duration,
    ) -> CoreResult<Self> {
        let descriptor = E::descriptor();
        match broker.scan(descriptor.table, predicate) {
            Ok(results) => Ok(Self {
                live: Some(Live { broker, results }),
                success: true,
                finished: false,
                opened_at: Instant::now(),
                slow_threshold,
                _marker: PhantomData,
            }),
            Err(error) => {
                if let Err(release_error) = broker.release(false) {
                    warn!(error = %release_error, "broker release failed after scan error");
                }
                Err(error)
            }
        }
    }

    /// Creates an iterator representing "no results", owning no broker at
    /// all. Closing or dropping it touches nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            live: None,
            success: true,
            finished: true,
            opened_at: Instant::now(),
            slow_threshold: Duration::ZERO,
            _marker: PhantomData,
        }
    }

    /// Returns whether the owned broker has been released (or was never
    /// owned, for the empty mode).
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.live.is_none()
    }

    /// Releases the owned broker early, with the recorded success flag.
    ///
    /// Idempotent: later calls (and the later drop) are no-ops.
    ///
    /// # Errors
    ///
    /// Returns the first release error; the result set and the broker are
    /// both attempted regardless.
    pub fn close(&mut self) -> CoreResult<()> {
        self.finished = true;
        self.release_now()
    }

    fn release_now(&mut self) -> CoreResult<()> {
        let Some(live) = self.live.take() else {
            return Ok(());
        };
        let Live {
            mut broker,
            results,
        } = live;

        let mut first_error = None;
        if let Err(error) = results.close() {
            first_error = Some(error);
        }
        match broker.release(self.success) {
            Ok(()) => {}
            Err(error) => {
                if first_error.is_some() {
                    warn!(error = %error, "broker release failed after result-set close error");
                } else {
                    first_error = Some(error);
                }
            }
        }

        let held = self.opened_at.elapsed();
        if held > self.slow_threshold {
            debug!(
                entity = E::descriptor().name,
                held_ms = held.as_millis() as u64,
                "iterator held open past threshold"
            );
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl<E: Entity> Iterator for TrackedIterator<E> {
    type Item = CoreResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let live = self.live.as_mut()?;

        match live.results.next_row() {
            Ok(Some(row)) => match E::from_row(&row) {
                Ok(entity) => Some(Ok(entity)),
                Err(error) => {
                    self.success = false;
                    self.finished = true;
                    Some(Err(error))
                }
            },
            Ok(None) => {
                self.finished = true;
                if let Err(error) = self.release_now() {
                    warn!(error = %error, "release after exhaustion failed");
                }
                None
            }
            Err(error) => {
                self.success = false;
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

impl<E: Entity> Drop for TrackedIterator<E> {
    fn drop(&mut self) {
        if self.live.is_some() {
            if let Err(error) = self.release_now() {
                warn!(error = %error, "iterator release failed on drop");
            }
        }
    }
}

impl<E: Entity> std::fmt::Debug for TrackedIterator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedIterator")
            .field("entity", &E::descriptor().name)
            .field("released", &self.is_released())
            .field("success", &self.success)
            .finish_non_exhaustive()
    }
}
