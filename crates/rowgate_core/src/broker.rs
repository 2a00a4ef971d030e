//! The persistence-engine-agnostic broker contract.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::scoped::ScopedResultSet;
use rowgate_engine::{Key, Row, Value};

/// Persistence-engine-agnostic entity access, owning one unit-of-work.
///
/// This trait is the entire surface a concrete engine adapter must
/// implement; no other coupling to the engine may leak past it. Keeping it
/// an interface isolates callers from engine churn - the only hard
/// requirement is that every broker obtained is eventually released with an
/// accurate success flag.
///
/// The trait is object-safe and row-level; typed entity operations come
/// from the blanket [`BrokerExt`] extension.
///
/// A broker is intended for single-threaded, single-pass use. After
/// [`Broker::release`] every operation fails fast with
/// [`CoreError::BrokerReleased`] rather than silently reacquiring a
/// session.
pub trait Broker: Send {
    /// Reads the row matching the natural key.
    ///
    /// No side effects beyond the read and a best-effort cache fill.
    ///
    /// # Errors
    ///
    /// Returns an error on engine failure or after release.
    fn fetch(&mut self, table: &str, key: &Key) -> CoreResult<Option<Row>>;

    /// Inserts a row, assigning a generated key when `generated` names an
    /// unset key column. Returns the assigned value, if any.
    ///
    /// All-or-nothing: on failure no partial write is visible.
    ///
    /// # Errors
    ///
    /// Returns `ConstraintViolation` on duplicate key.
    fn insert(
        &mut self,
        table: &str,
        row: &Row,
        key: &Key,
        generated: Option<&str>,
    ) -> CoreResult<Option<i64>>;

    /// Updates the row matching the natural key.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` if no row matches.
    fn update(&mut self, table: &str, key: &Key, row: &Row) -> CoreResult<()>;

    /// Deletes the row matching the natural key.
    ///
    /// Absence is a reportable `RowNotFound`, left to the caller's
    /// discretion.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` if no row matches.
    fn delete(&mut self, table: &str, key: &Key) -> CoreResult<()>;

    /// Executes a raw query. The caller owns the returned result set and
    /// is responsible for its release (close or drop).
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` or an engine execution error.
    fn execute_query(&mut self, sql: &str) -> CoreResult<ScopedResultSet>;

    /// Executes a raw update, returning the affected-row count.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` or an engine execution error.
    fn execute_update(&mut self, sql: &str) -> CoreResult<u64>;

    /// Opens a lazy scan over one table, optionally filtered and ordered
    /// by a predicate in the engine dialect. Rows stream from the
    /// underlying cursor; nothing is preloaded at this level.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for a malformed predicate.
    fn scan(&mut self, table: &str, predicate: Option<&str>) -> CoreResult<ScopedResultSet>;

    /// Invalidates all cached entity state.
    ///
    /// A best-effort staleness hint, never required for correctness.
    fn clear_cache(&mut self);

    /// Invalidates cached state for specific rows of one table.
    fn clear_cache_keys(&mut self, table: &str, keys: &[Key]);

    /// Invalidates cached state for rows of one table whose `column`
    /// currently holds one of `values`.
    fn clear_cache_column(&mut self, table: &str, column: &str, values: &[Value]);

    /// Reports whether this broker's unit-of-work has been released.
    fn is_closed(&self) -> bool;

    /// Terminates this broker's unit-of-work.
    ///
    /// `success=false` tells the engine to treat the unit-of-work as
    /// failed. A persistence error on any earlier operation taints the
    /// broker, forcing the effective flag to `false` regardless of the
    /// argument.
    ///
    /// # Errors
    ///
    /// A second release is a guarded programming error
    /// (`BrokerReleased`); engine release failures also surface here.
    fn release(&mut self, success: bool) -> CoreResult<()>;
}

/// Typed entity operations, available on every [`Broker`].
pub trait BrokerExt: Broker {
    /// Fetches the entity matching the probe's natural key.
    ///
    /// The probe carries only its key populated; the result is the fully
    /// populated entity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] when absent.
    fn get<E: Entity>(&mut self, probe: &E) -> CoreResult<E> {
        let descriptor = E::descriptor();
        let key = probe.key();
        match self.fetch(descriptor.table, &key)? {
            Some(row) => E::from_row(&row),
            None => Err(CoreError::not_found(descriptor.name, key.render())),
        }
    }

    /// Inserts (`is_update=false`) or updates (`is_update=true`) the
    /// entity. When the entity requires a generated key and none is set,
    /// one is assigned and written back into the entity before returning.
    ///
    /// # Errors
    ///
    /// Returns `ConstraintViolation` on insert conflicts, `RowNotFound`
    /// on updates of absent rows.
    fn store<E: Entity>(&mut self, entity: &mut E, is_update: bool) -> CoreResult<()> {
        let descriptor = E::descriptor();
        if is_update {
            self.update(descriptor.table, &entity.key(), &entity.to_row())
        } else {
            let row = entity.to_row();
            let key = entity.key();
            if let Some(generated) = self.insert(descriptor.table, &row, &key, descriptor.generated)? {
                entity.apply_generated_key(generated);
            }
            Ok(())
        }
    }

    /// Deletes the row matching the entity's natural key.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` when already absent.
    fn remove<E: Entity>(&mut self, entity: &E) -> CoreResult<()> {
        self.delete(E::descriptor().table, &entity.key())
    }
}

impl<B: Broker + ?Sized> BrokerExt for B {}
