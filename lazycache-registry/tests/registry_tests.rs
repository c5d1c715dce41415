//! Registry behaviour across threads and failure modes.

use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use lazycache_registry::{CacheRegistry, EntryState, RegistryConfig};
use lazycache_test_utils::assertions::*;
use lazycache_test_utils::fixtures;
use lazycache_test_utils::{
    args, Args, BoundProducer, CacheError, CollectionKind, CountingProducer, FailingProducer,
    ProducerError, Widget,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Letter(char);

fn letters(text: &str) -> Vec<Letter> {
    text.chars().map(Letter).collect()
}

#[test]
fn test_concurrent_first_access_runs_producer_once() {
    const THREADS: usize = 16;

    let registry = CacheRegistry::new();
    let producer = CountingProducer::new(fixtures::widgets(5)).with_delay(Duration::from_millis(50));
    let calls = producer.calls();
    registry
        .register(CollectionKind::Ordered, producer, Args::new())
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get::<Widget>().unwrap()
            })
        })
        .collect();

    let views: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(calls.get(), 1);
    assert!(views.iter().all(|view| view.ptr_eq(&views[0])));
    assert_eq!(views[0].to_vec(), fixtures::widgets(5));

    let stats = registry.stats();
    assert_eq!(stats.producer_invocations, 1);
    assert_eq!(stats.lookups, THREADS as u64);
}

#[test]
fn test_ordered_keeps_duplicates_in_order() {
    let registry = CacheRegistry::new();
    registry
        .register(
            CollectionKind::Ordered,
            CountingProducer::new(letters("abac")),
            Args::new(),
        )
        .unwrap();

    let view = registry.get::<Letter>().unwrap();
    assert_eq!(view.kind(), CollectionKind::Ordered);
    assert_eq!(view.to_vec(), letters("abac"));
}

#[test]
fn test_unique_drops_duplicates() {
    let registry = CacheRegistry::new();
    registry
        .register(
            CollectionKind::Unique,
            CountingProducer::new(letters("abac")),
            Args::new(),
        )
        .unwrap();

    let view = registry.get::<Letter>().unwrap();
    assert_eq!(view.len(), 3);
    for letter in letters("abc") {
        assert!(view.contains(&letter));
    }
    assert!(matches!(
        registry.state::<Letter>(),
        Some(EntryState::Materialized { items: 3, .. })
    ));
}

#[test]
fn test_duplicate_registration_keeps_first_producer() {
    let registry = CacheRegistry::new();
    let first = CountingProducer::new(letters("xy"));
    let second = CountingProducer::new(letters("z"));
    let second_calls = second.calls();

    registry
        .register(CollectionKind::Ordered, first, Args::new())
        .unwrap();
    assert_duplicate(&registry.register(CollectionKind::Unique, second, Args::new()));
    assert_duplicate(&registry.register_bound(
        CollectionKind::Ordered,
        BoundProducer::from_fn("late", || Ok(letters("q"))),
    ));

    assert_eq!(registry.get::<Letter>().unwrap().to_vec(), letters("xy"));
    assert_eq!(second_calls.get(), 0);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_arity_window_for_optional_parameters() {
    let too_few = CacheRegistry::new();
    assert_arity_mismatch(
        &too_few.register_ordered(fixtures::three_param_producer(), args![1]),
        1,
    );
    assert!(!too_few.is_registered::<i64>());

    let too_many = CacheRegistry::new();
    assert_arity_mismatch(
        &too_many.register_ordered(fixtures::three_param_producer(), args![1, 2, 3, 4]),
        4,
    );

    let required_only = CacheRegistry::new();
    required_only
        .register_ordered(fixtures::three_param_producer(), args![1, 3])
        .unwrap();
    assert_eq!(required_only.get::<i64>().unwrap().to_vec(), vec![1, 2, 3]);

    let all = CacheRegistry::new();
    all.register_ordered(fixtures::three_param_producer(), args![1, 3, 2])
        .unwrap();
    assert_eq!(all.get::<i64>().unwrap().to_vec(), vec![1, 3, 5]);
}

#[test]
fn test_get_unregistered_type() {
    let registry = CacheRegistry::new();
    assert_not_registered(&registry.get::<Widget>());
    assert!(registry.try_get::<Widget>().is_none());
    assert_eq!(registry.stats().lookups, 0);
}

#[test]
fn test_failure_is_permanent() {
    let registry = CacheRegistry::new();
    let producer = FailingProducer::new("backend offline");
    let calls = producer.calls();
    registry
        .register::<Widget, _>(CollectionKind::Unique, producer, Args::new())
        .unwrap();

    let first = registry.get::<Widget>();
    let cause = assert_materialization_failure(&first);
    assert!(matches!(cause, ProducerError::Failed { ref reason } if reason == "backend offline"));

    let second = registry.get::<Widget>();
    assert_eq!(first.unwrap_err(), second.unwrap_err());
    assert_eq!(calls.get(), 1);
    assert!(matches!(
        registry.state::<Widget>(),
        Some(EntryState::Failed { .. })
    ));

    let stats = registry.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.materialized, 0);
}

#[test]
fn test_panicking_producer_fails_permanently() {
    let registry = CacheRegistry::new();
    registry
        .register_bound::<Letter>(
            CollectionKind::Ordered,
            BoundProducer::from_fn("explode", || panic!("producer exploded")),
        )
        .unwrap();

    let cause = assert_materialization_failure(&registry.get::<Letter>());
    assert!(matches!(cause, ProducerError::Panicked { ref message } if message == "producer exploded"));
    assert_materialization_failure(&registry.get::<Letter>());
}

#[test]
fn test_widgets_end_to_end() {
    let registry = CacheRegistry::with_config(RegistryConfig::default().with_label("widgets")).unwrap();
    registry
        .register(CollectionKind::Ordered, fixtures::make_widgets(), args![3])
        .unwrap();
    assert_eq!(registry.registered_types().len(), 1);

    let first = registry.get::<Widget>().unwrap();
    let names: Vec<_> = first.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, ["W0", "W1", "W2"]);

    let second = registry.get::<Widget>().unwrap();
    assert!(first.ptr_eq(&second));

    let stats = registry.stats();
    assert_eq!(stats.producer_invocations, 1);
    assert_eq!(stats.hits, 1);
    assert!((stats.hit_rate() - 0.5).abs() < 0.001);
}

#[test]
fn test_slow_producer_does_not_block_other_types() {
    let registry = CacheRegistry::new();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    registry
        .register_bound(
            CollectionKind::Ordered,
            BoundProducer::from_fn("blocked", move || {
                release_rx
                    .recv_timeout(Duration::from_secs(10))
                    .map_err(ProducerError::failed)?;
                Ok(letters("slow"))
            }),
        )
        .unwrap();
    registry
        .register(
            CollectionKind::Ordered,
            CountingProducer::new(fixtures::widgets(2)),
            Args::new(),
        )
        .unwrap();

    let slow = {
        let registry = registry.clone();
        thread::spawn(move || registry.get::<Letter>().map(|view| view.len()))
    };

    // Wait until the blocked producer is running.
    let started = Instant::now();
    while registry.stats().producer_invocations == 0 {
        assert!(started.elapsed() < Duration::from_secs(5), "producer never started");
        thread::yield_now();
    }

    assert_eq!(registry.get::<Widget>().unwrap().len(), 2);
    assert_eq!(registry.state::<Letter>(), Some(EntryState::Pending));

    release_tx.send(()).unwrap();
    assert_eq!(slow.join().unwrap().unwrap(), 4);
}

#[test]
fn test_concurrent_registration_has_one_winner() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 50;

    for _ in 0..ROUNDS {
        let registry = CacheRegistry::new();
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let registry = registry.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.register(
                        CollectionKind::Ordered,
                        CountingProducer::new(vec![i as u8]),
                        Args::new(),
                    )
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for result in results.iter().filter(|r| r.is_err()) {
            assert_duplicate(result);
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get::<u8>().unwrap().len(), 1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Recursive(u8);

#[test]
fn test_recursive_get_from_producer_is_rejected() {
    let registry = CacheRegistry::new();
    let inner = registry.clone();
    let (nested_tx, nested_rx) = mpsc::channel();
    registry
        .register_bound(
            CollectionKind::Ordered,
            BoundProducer::from_fn("recursive", move || {
                let nested = inner.get::<Recursive>().map(|view| view.len());
                nested_tx.send(nested).map_err(ProducerError::failed)?;
                Ok(vec![Recursive(1)])
            }),
        )
        .unwrap();

    let outer = {
        let registry = registry.clone();
        thread::spawn(move || registry.get::<Recursive>().map(|view| view.to_vec()))
    };

    let nested = nested_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("nested get never returned");
    assert!(matches!(
        nested,
        Err(CacheError::InvalidState { ref reason }) if reason.starts_with("recursive materialization")
    ));

    assert_eq!(outer.join().unwrap().unwrap(), vec![Recursive(1)]);
    assert!(matches!(
        registry.state::<Recursive>(),
        Some(EntryState::Materialized { items: 1, .. })
    ));
    assert_eq!(registry.stats().producer_invocations, 1);
}
