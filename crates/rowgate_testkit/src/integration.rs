//! Cross-crate integration test helpers.

use rowgate_core::{BrokerFactory, CoreResult, Entity, TrackedIterator};

/// Consumes an iterator to exhaustion, collecting the entities.
///
/// On a mid-stream error the iterator is dropped (releasing its broker
/// with `success=false`) and the error propagates.
///
/// # Errors
///
/// Returns the first pull error.
pub fn exhaust<E: Entity>(iterator: TrackedIterator<E>) -> CoreResult<Vec<E>> {
    let mut entities = Vec::new();
    for entity in iterator {
        entities.push(entity?);
    }
    Ok(entities)
}

/// Asserts that the factory's trackers account every opened resource as
/// closed.
///
/// # Panics
///
/// Panics when a session or result set leaked.
pub fn assert_release_balance(factory: &BrokerFactory) {
    let sessions = factory.session_stats();
    assert_eq!(
        sessions.leaked(),
        0,
        "leaked sessions: opened {} closed {}",
        sessions.opened,
        sessions.closed
    );
    let result_sets = factory.result_set_stats();
    assert_eq!(
        result_sets.leaked(),
        0,
        "leaked result sets: opened {} closed {}",
        result_sets.opened,
        result_sets.closed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Account;
    use crate::spies::SpyEngine;
    use rowgate_core::{Broker, BrokerExt, Config, CoreError};
    use std::sync::Arc;

    fn spy_factory(engine: SpyEngine) -> (BrokerFactory, Arc<crate::spies::ReleaseLog>) {
        let log = engine.log();
        let factory = BrokerFactory::new(Arc::new(engine), Config::default());
        (factory, log)
    }

    fn seed(factory: &BrokerFactory, names: &[&str]) {
        let mut broker = factory.broker().unwrap();
        for name in names {
            broker.store(&mut Account::new(*name), false).unwrap();
        }
        broker.release(true).unwrap();
    }

    #[test]
    fn exhaustion_releases_with_success_and_no_leaks() {
        let (factory, log) = spy_factory(SpyEngine::new());
        seed(&factory, &["a", "b", "c"]);
        log.drain();

        let mut names = Vec::new();
        for account in factory.iterator::<Account>(None).unwrap() {
            names.push(account.unwrap().name);
        }
        // No explicit close anywhere: exhaustion alone released the broker.
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(log.flags(), vec![true]);
        assert_release_balance(&factory);
    }

    #[test]
    fn midstream_failure_releases_with_failure_flag() {
        let (factory, log) = spy_factory(SpyEngine::failing_after(1));
        seed(&factory, &["a", "b", "c"]);
        log.drain();

        let result = exhaust(factory.iterator::<Account>(None).unwrap());
        assert!(result.is_err());
        assert_eq!(log.flags(), vec![false]);
        assert_release_balance(&factory);
    }

    #[test]
    fn dropped_iterator_releases_exactly_once() {
        let (factory, log) = spy_factory(SpyEngine::new());
        seed(&factory, &["a", "b", "c"]);
        log.drain();

        {
            let mut iterator = factory.iterator::<Account>(None).unwrap();
            assert!(iterator.next().unwrap().is_ok());
        }
        assert_eq!(log.flags(), vec![true]);
        assert_release_balance(&factory);
    }

    #[test]
    fn explicit_close_then_drop_releases_once() {
        let (factory, log) = spy_factory(SpyEngine::new());
        seed(&factory, &["a"]);
        log.drain();

        let mut iterator = factory.iterator::<Account>(None).unwrap();
        iterator.close().unwrap();
        iterator.close().unwrap();
        drop(iterator);
        assert_eq!(log.flags(), vec![true]);
        assert_release_balance(&factory);
    }

    #[test]
    fn double_release_is_a_guarded_error() {
        let (factory, log) = spy_factory(SpyEngine::new());
        let mut broker = factory.broker().unwrap();
        broker.release(true).unwrap();
        assert!(matches!(
            broker.release(true),
            Err(CoreError::BrokerReleased)
        ));
        assert_eq!(log.count(), 1);
        assert_release_balance(&factory);
    }

    #[test]
    fn tainted_broker_downgrades_the_release_flag() {
        let (factory, log) = spy_factory(SpyEngine::new());
        seed(&factory, &["a"]);
        log.drain();

        let mut broker = factory.broker().unwrap();
        let mut duplicate = Account::new("a");
        duplicate.id = 1;
        assert!(broker.store(&mut duplicate, false).is_err());

        // The caller believes the unit-of-work succeeded; the taint wins.
        broker.release(true).unwrap();
        assert_eq!(log.flags(), vec![false]);
    }
}
