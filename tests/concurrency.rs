use crucible_di::{Lifetime, Resolver, ServiceCollection};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_singleton_constructed_exactly_once_under_contention() {
    struct Expensive {
        serial: usize,
    }

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    let mut sc = ServiceCollection::new();
    sc.register_factory(Lifetime::Singleton, |_| {
        // Widen the race window.
        std::thread::sleep(Duration::from_millis(20));
        Expensive {
            serial: BUILT.fetch_add(1, Ordering::SeqCst),
        }
    });

    let sp = sc.build().unwrap();

    let instances: Vec<Arc<Expensive>> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sp = sp.clone();
                s.spawn(move |_| sp.get::<Expensive>().unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(BUILT.load(Ordering::SeqCst), 1);
    for pair in instances.windows(2) {
        assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        assert_eq!(pair[0].serial, 0);
    }
}

#[test]
fn test_scoped_constructed_exactly_once_per_scope_under_contention() {
    struct PerScope;

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    let mut sc = ServiceCollection::new();
    sc.register_factory(Lifetime::Scoped, |_| {
        std::thread::sleep(Duration::from_millis(10));
        BUILT.fetch_add(1, Ordering::SeqCst);
        PerScope
    });

    let sp = sc.build().unwrap();
    let scope = sp.create_scope();

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..6 {
            let scope = scope.clone();
            s.spawn(move |_| {
                let a = scope.get::<PerScope>().unwrap();
                let b = scope.get::<PerScope>().unwrap();
                assert!(Arc::ptr_eq(&a, &b));
            });
        }
    })
    .unwrap();

    assert_eq!(BUILT.load(Ordering::SeqCst), 1);

    // A second scope constructs its own instance.
    let other = sp.create_scope();
    let _ = other.get::<PerScope>().unwrap();
    assert_eq!(BUILT.load(Ordering::SeqCst), 2);
}

#[test]
fn test_concurrent_resolution_of_unrelated_services() {
    let mut sc = ServiceCollection::new();
    sc.register_factory(Lifetime::Singleton, |_| 1u8);
    sc.register_factory(Lifetime::Singleton, |_| 2u16);
    sc.register_factory(Lifetime::Singleton, |_| 3u32);
    sc.register_factory(Lifetime::Transient, |_| 4u64);

    let sp = sc.build().unwrap();

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..4 {
            let sp = sp.clone();
            s.spawn(move |_| {
                for _ in 0..100 {
                    assert_eq!(*sp.get::<u8>().unwrap(), 1);
                    assert_eq!(*sp.get::<u16>().unwrap(), 2);
                    assert_eq!(*sp.get::<u32>().unwrap(), 3);
                    assert_eq!(*sp.get::<u64>().unwrap(), 4);
                }
            });
        }
    })
    .unwrap();
}

#[test]
fn test_concurrent_scope_creation_and_disposal() {
    let mut sc = ServiceCollection::new();
    sc.register_factory(Lifetime::Scoped, |_| String::from("scoped"));

    let sp = sc.build().unwrap();

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..8 {
            let sp = sp.clone();
            s.spawn(move |_| {
                for _ in 0..50 {
                    let scope = sp.create_scope();
                    let value = scope.get::<String>().unwrap();
                    assert_eq!(value.as_str(), "scoped");
                    scope.dispose();
                    assert!(scope.get::<String>().is_err());
                }
            });
        }
    })
    .unwrap();
}
