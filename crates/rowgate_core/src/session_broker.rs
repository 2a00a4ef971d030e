//! Default broker adapter and broker factory.

use crate::broker::Broker;
use crate::config::Config;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::iterator::TrackedIterator;
use crate::scoped::ScopedResultSet;
use crate::tracker::{ResourceTracker, TrackerSnapshot};
use rowgate_engine::{Engine, EngineResult, Key, Row, Session, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// The default [`Broker`] adapter: bridges any [`Engine`] session to the
/// broker contract.
///
/// Carries a read-through row cache, the taint flag that downgrades the
/// release flag after a persistence error, and a correlation id for log
/// events. A broker dropped without release is released with
/// `success=false` by a leak guard that logs a warning.
pub struct SessionBroker {
    id: Uuid,
    session: Option<Box<dyn Session>>,
    tainted: bool,
    cache: HashMap<(String, String), Row>,
    config: Arc<Config>,
    sessions: Arc<ResourceTracker>,
    result_sets: Arc<ResourceTracker>,
    opened_at: Instant,
}

impl SessionBroker {
    fn new(
        session: Box<dyn Session>,
        config: Arc<Config>,
        sessions: Arc<ResourceTracker>,
        result_sets: Arc<ResourceTracker>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session: Some(session),
            tainted: false,
            cache: HashMap::new(),
            config,
            sessions,
            result_sets,
            opened_at: Instant::now(),
        }
    }

    /// Returns the correlation id carried in this broker's log events.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns whether a persistence error has tainted this unit-of-work.
    #[must_use]
    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    fn session_mut(&mut self) -> CoreResult<&mut Box<dyn Session>> {
        self.session.as_mut().ok_or(CoreError::BrokerReleased)
    }

    /// Propagates an engine result, tainting the unit-of-work on any
    /// failure other than plain row absence.
    fn record<T>(&mut self, result: EngineResult<T>) -> CoreResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(error) => {
                if !error.is_not_found() {
                    self.tainted = true;
                }
                Err(error.into())
            }
        }
    }

    fn cache_key(table: &str, key: &Key) -> (String, String) {
        (table.to_string(), key.render())
    }
}

impl Broker for SessionBroker {
    fn fetch(&mut self, table: &str, key: &Key) -> CoreResult<Option<Row>> {
        self.session_mut()?;
        let cache_key = Self::cache_key(table, key);
        if let Some(row) = self.cache.get(&cache_key) {
            return Ok(Some(row.clone()));
        }
        let session = self.session_mut()?;
        let result = session.fetch(table, key);
        let fetched = self.record(result)?;
        if let Some(row) = &fetched {
            self.cache.insert(cache_key, row.clone());
        }
        Ok(fetched)
    }

    fn insert(
        &mut self,
        table: &str,
        row: &Row,
        key: &Key,
        generated: Option<&str>,
    ) -> CoreResult<Option<i64>> {
        let session = self.session_mut()?;
        let result = session.insert(table, row, key, generated);
        let assigned = self.record(result)?;
        // The effective key is only knowable here when no generation
        // happened; generated rows enter the cache on their next fetch.
        if assigned.is_none() && !key.is_unset() {
            self.cache.insert(Self::cache_key(table, key), row.clone());
        }
        Ok(assigned)
    }

    fn update(&mut self, table: &str, key: &Key, row: &Row) -> CoreResult<()> {
        let session = self.session_mut()?;
        let result = session.update(table, key, row);
        self.record(result)?;
        let cache_key = Self::cache_key(table, key);
        match self.cache.get_mut(&cache_key) {
            Some(cached) => cached.merge(row),
            None => {
                self.cache.insert(cache_key, row.clone());
            }
        }
        Ok(())
    }

    fn delete(&mut self, table: &str, key: &Key) -> CoreResult<()> {
        let session = self.session_mut()?;
        let result = session.delete(table, key);
        let outcome = self.record(result);
        self.cache.remove(&Self::cache_key(table, key));
        outcome
    }

    fn execute_query(&mut self, sql: &str) -> CoreResult<ScopedResultSet> {
        let session = self.session_mut()?;
        let prepared = session.prepare(sql);
        let statement = self.record(prepared)?;
        let interval = self.config.close_log_interval;
        let result =
            ScopedResultSet::execute(statement, Arc::clone(&self.result_sets), interval);
        if result.is_err() {
            self.tainted = true;
        }
        result
    }

    fn execute_update(&mut self, sql: &str) -> CoreResult<u64> {
        let session = self.session_mut()?;
        let prepared = session.prepare(sql);
        let mut statement = self.record(prepared)?;
        let executed = statement.execute_update();
        if let Err(error) = statement.close() {
            warn!(broker = %self.id, error = %error, "statement close failed after update");
        }
        self.record(executed)
    }

    fn scan(&mut self, table: &str, predicate: Option<&str>) -> CoreResult<ScopedResultSet> {
        let session = self.session_mut()?;
        let prepared = session.scan(table, predicate);
        let statement = self.record(prepared)?;
        let interval = self.config.close_log_interval;
        let result =
            ScopedResultSet::execute(statement, Arc::clone(&self.result_sets), interval);
        if result.is_err() {
            self.tainted = true;
        }
        result
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn clear_cache_keys(&mut self, table: &str, keys: &[Key]) {
        for key in keys {
            self.cache.remove(&Self::cache_key(table, key));
        }
    }

    fn clear_cache_column(&mut self, table: &str, column: &str, values: &[Value]) {
        self.cache.retain(|(cached_table, _), row| {
            if cached_table.as_str() != table {
                return true;
            }
            match row.get(column) {
                Some(value) => !values.contains(value),
                None => true,
            }
        });
    }

    fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    fn release(&mut self, success: bool) -> CoreResult<()> {
        let Some(mut session) = self.session.take() else {
            return Err(CoreError::BrokerReleased);
        };
        self.cache.clear();
        let effective = success && !self.tainted;
        let result = session.close(effective);
        let closed = self.sessions.on_close();
        debug!(
            broker = %self.id,
            success = effective,
            closed,
            held_ms = self.opened_at.elapsed().as_millis() as u64,
            "broker released"
        );
        result.map_err(Into::into)
    }
}

impl Drop for SessionBroker {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            warn!(broker = %self.id, "broker dropped without release");
            if let Err(error) = session.close(false) {
                warn!(broker = %self.id, error = %error, "session close failed on drop");
            }
            self.sessions.on_close();
        }
    }
}

impl std::fmt::Debug for SessionBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBroker")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("tainted", &self.tainted)
            .finish_non_exhaustive()
    }
}

/// Hands out brokers over one engine, carrying shared configuration and
/// the process-wide resource trackers.
pub struct BrokerFactory {
    engine: Arc<dyn Engine>,
    config: Arc<Config>,
    sessions: Arc<ResourceTracker>,
    result_sets: Arc<ResourceTracker>,
}

impl BrokerFactory {
    /// Creates a factory over the given engine.
    pub fn new(engine: Arc<dyn Engine>, config: Config) -> Self {
        Self {
            engine,
            config: Arc::new(config),
            sessions: Arc::new(ResourceTracker::new("session")),
            result_sets: Arc::new(ResourceTracker::new("result-set")),
        }
    }

    /// Returns the factory configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Opens a new broker with its own unit-of-work.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot provide a session.
    pub fn broker(&self) -> CoreResult<SessionBroker> {
        let session = self.engine.open_session()?;
        let opened = self.sessions.on_open();
        let broker = SessionBroker::new(
            session,
            Arc::clone(&self.config),
            Arc::clone(&self.sessions),
            Arc::clone(&self.result_sets),
        );
        debug!(broker = %broker.id, engine = self.engine.name(), opened, "broker session opened");
        Ok(broker)
    }

    /// Opens a broker and a tracked iterator over entities of type `E` in
    /// one call. The iterator owns the broker and releases it on
    /// exhaustion, explicit close, or drop.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened or the predicate
    /// is malformed (in which case the just-opened broker is released with
    /// `success=false` before the error propagates).
    pub fn iterator<E: Entity>(
        &self,
        predicate: Option<&str>,
    ) -> CoreResult<TrackedIterator<E>> {
        let broker = self.broker()?;
        TrackedIterator::open(
            Box::new(broker),
            predicate,
            self.config.slow_iterator_threshold,
        )
    }

    /// Returns a snapshot of the session open/close counters.
    #[must_use]
    pub fn session_stats(&self) -> TrackerSnapshot {
        self.sessions.snapshot()
    }

    /// Returns a snapshot of the result-set open/close counters.
    #[must_use]
    pub fn result_set_stats(&self) -> TrackerSnapshot {
        self.result_sets.snapshot()
    }
}

impl std::fmt::Debug for BrokerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerFactory")
            .field("engine", &self.engine.name())
            .field("sessions", &self.sessions.snapshot())
            .field("result_sets", &self.result_sets.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::BrokerExt;
    use crate::entity::{require_int, require_text, EntityDescriptor, FieldDescriptor};
    use rowgate_engine::{EngineError, MemoryEngine};

    #[derive(Debug, Clone)]
    struct Account {
        id: i64,
        name: String,
    }

    static ACCOUNT_FIELDS: [FieldDescriptor; 2] = [
        FieldDescriptor::new("ACC_ID"),
        FieldDescriptor::new("ACC_NAME"),
    ];
    static ACCOUNT: EntityDescriptor = EntityDescriptor {
        name: "Account",
        table: "ACC",
        fields: &ACCOUNT_FIELDS,
        key: &["ACC_ID"],
        generated: Some("ACC_ID"),
    };

    impl Entity for Account {
        fn descriptor() -> &'static EntityDescriptor {
            &ACCOUNT
        }

        fn to_row(&self) -> Row {
            Row::new()
                .with("ACC_ID", Value::Int(self.id))
                .with("ACC_NAME", Value::text(self.name.clone()))
        }

        fn from_row(row: &Row) -> CoreResult<Self> {
            Ok(Self {
                id: require_int("Account", row, "ACC_ID")?,
                name: require_text("Account", row, "ACC_NAME")?,
            })
        }

        fn key(&self) -> Key {
            Key::single("ACC_ID", Value::Int(self.id))
        }

        fn apply_generated_key(&mut self, value: i64) {
            self.id = value;
        }
    }

    impl PartialEq for Account {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    fn factory() -> BrokerFactory {
        BrokerFactory::new(Arc::new(MemoryEngine::new()), Config::default())
    }

    #[test]
    fn get_returns_populated_entity_or_not_found() {
        let factory = factory();
        let mut broker = factory.broker().unwrap();

        let mut seeded = Account {
            id: 42,
            name: "x".into(),
        };
        broker.store(&mut seeded, false).unwrap();

        let found = broker
            .get(&Account {
                id: 42,
                name: String::new(),
            })
            .unwrap();
        assert_eq!(found.id, 42);
        assert_eq!(found.name, "x");

        let missing = broker.get(&Account {
            id: 99,
            name: String::new(),
        });
        assert!(matches!(missing, Err(CoreError::NotFound { .. })));

        broker.release(true).unwrap();
    }

    #[test]
    fn store_assigns_generated_key_and_writes_it_back() {
        let factory = factory();
        let mut broker = factory.broker().unwrap();

        let mut account = Account {
            id: 0,
            name: "a".into(),
        };
        broker.store(&mut account, false).unwrap();
        assert_eq!(account.id, 1);

        let found = broker
            .get(&Account {
                id: 1,
                name: String::new(),
            })
            .unwrap();
        assert_eq!(found.name, "a");

        broker.release(true).unwrap();
    }

    #[test]
    fn update_and_remove() {
        let factory = factory();
        let mut broker = factory.broker().unwrap();

        let mut account = Account {
            id: 7,
            name: "a".into(),
        };
        broker.store(&mut account, false).unwrap();

        account.name = "b".into();
        broker.store(&mut account, true).unwrap();
        let found = broker.get(&account).unwrap();
        assert_eq!(found.name, "b");

        broker.remove(&account).unwrap();
        assert!(broker.get(&account).is_err());
        // Absence of an already-removed row is reportable.
        assert!(matches!(
            broker.remove(&account),
            Err(CoreError::Engine(EngineError::RowNotFound { .. }))
        ));

        broker.release(true).unwrap();
    }

    #[test]
    fn released_broker_fails_fast() {
        let factory = factory();
        let mut broker = factory.broker().unwrap();
        broker.release(true).unwrap();
        assert!(broker.is_closed());

        let key = Key::single("ACC_ID", Value::Int(1));
        assert!(matches!(
            broker.fetch("ACC", &key),
            Err(CoreError::BrokerReleased)
        ));
        assert!(matches!(
            broker.execute_update("DELETE FROM ACC"),
            Err(CoreError::BrokerReleased)
        ));
        assert!(matches!(
            broker.release(true),
            Err(CoreError::BrokerReleased)
        ));
    }

    #[test]
    fn persistence_error_taints_the_unit_of_work() {
        let factory = factory();
        let mut broker = factory.broker().unwrap();

        let mut account = Account {
            id: 5,
            name: "a".into(),
        };
        broker.store(&mut account, false).unwrap();
        let duplicate = broker.store(&mut account.clone(), false);
        assert!(duplicate.is_err());
        assert!(broker.is_tainted());

        // Not-found does not taint.
        let mut clean = factory.broker().unwrap();
        let _ = clean.get(&Account {
            id: 99,
            name: String::new(),
        });
        assert!(!clean.is_tainted());

        broker.release(true).unwrap();
        clean.release(true).unwrap();
    }

    #[test]
    fn fetch_serves_from_cache_until_invalidated() {
        let factory = factory();
        let mut broker = factory.broker().unwrap();
        let mut writer = factory.broker().unwrap();

        let mut account = Account {
            id: 3,
            name: "old".into(),
        };
        writer.store(&mut account, false).unwrap();

        // Prime the cache.
        let first = broker.get(&account).unwrap();
        assert_eq!(first.name, "old");

        // Update behind the cache's back.
        let mut updated = Account {
            id: 3,
            name: "new".into(),
        };
        writer.store(&mut updated, true).unwrap();

        // Stale until invalidated - the cache is a staleness hint.
        let stale = broker.get(&account).unwrap();
        assert_eq!(stale.name, "old");

        broker.clear_cache_keys("ACC", &[account.key()]);
        let fresh = broker.get(&account).unwrap();
        assert_eq!(fresh.name, "new");

        broker.release(true).unwrap();
        writer.release(true).unwrap();
    }

    #[test]
    fn clear_cache_column_invalidates_matching_rows() {
        let factory = factory();
        let mut broker = factory.broker().unwrap();
        let mut writer = factory.broker().unwrap();

        for (id, name) in [(1, "a"), (2, "b")] {
            let mut account = Account {
                id,
                name: name.into(),
            };
            writer.store(&mut account, false).unwrap();
            broker
                .get(&Account {
                    id,
                    name: String::new(),
                })
                .unwrap();
        }

        for (id, name) in [(1, "a2"), (2, "b2")] {
            let mut account = Account {
                id,
                name: name.into(),
            };
            writer.store(&mut account, true).unwrap();
        }

        broker.clear_cache_column("ACC", "ACC_NAME", &[Value::text("a")]);

        let one = broker
            .get(&Account {
                id: 1,
                name: String::new(),
            })
            .unwrap();
        let two = broker
            .get(&Account {
                id: 2,
                name: String::new(),
            })
            .unwrap();
        assert_eq!(one.name, "a2"); // invalidated, re-fetched
        assert_eq!(two.name, "b"); // still cached

        broker.release(true).unwrap();
        writer.release(true).unwrap();
    }

    #[test]
    fn raw_query_and_update() {
        let factory = factory();
        let mut broker = factory.broker().unwrap();
        for id in 1..=3 {
            let mut account = Account {
                id,
                name: format!("n{id}"),
            };
            broker.store(&mut account, false).unwrap();
        }

        let results = broker
            .execute_query("SELECT * FROM ACC WHERE ACC_NAME = 'n2'")
            .unwrap();
        let row = results.next_row().unwrap().unwrap();
        assert_eq!(row.int("ACC_ID"), Some(2));
        assert_eq!(results.next_row().unwrap(), None);
        results.close().unwrap();

        let affected = broker
            .execute_update("DELETE FROM ACC WHERE ACC_ID = 1")
            .unwrap();
        assert_eq!(affected, 1);

        broker.release(true).unwrap();
        assert_eq!(factory.result_set_stats().leaked(), 0);
    }

    #[test]
    fn factory_accounts_for_sessions() {
        let factory = factory();
        let mut a = factory.broker().unwrap();
        let b = factory.broker().unwrap();
        assert_eq!(factory.session_stats().leaked(), 2);

        a.release(true).unwrap();
        drop(b); // leak guard releases with success=false
        assert_eq!(factory.session_stats().leaked(), 0);
    }
}
