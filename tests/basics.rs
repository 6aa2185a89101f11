use crucible_di::{DiError, Lifetime, Resolver, ServiceCollection, ServiceModule};
use std::sync::{Arc, Mutex};

#[test]
fn test_singleton_instance() {
    struct Config {
        url: String,
    }

    let mut sc = ServiceCollection::new();
    sc.register_instance(Config {
        url: "postgres://localhost".to_string(),
    });

    let sp = sc.build().unwrap();
    let a = sp.get::<Config>().unwrap();
    let b = sp.get::<Config>().unwrap();

    assert_eq!(a.url, "postgres://localhost");
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_singleton_factory_runs_once() {
    let counter = Arc::new(Mutex::new(0));
    let seq = counter.clone();

    let mut sc = ServiceCollection::new();
    sc.register_factory(Lifetime::Singleton, move |_| {
        let mut n = seq.lock().unwrap();
        *n += 1;
        format!("built-{}", *n)
    });

    let sp = sc.build().unwrap();
    let a = sp.get::<String>().unwrap();
    let b = sp.get::<String>().unwrap();

    assert_eq!(a.as_str(), "built-1");
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(*counter.lock().unwrap(), 1);
}

#[test]
fn test_transient_freshness() {
    let counter = Arc::new(Mutex::new(0));
    let seq = counter.clone();

    let mut sc = ServiceCollection::new();
    sc.register_factory(Lifetime::Transient, move |_| {
        let mut n = seq.lock().unwrap();
        *n += 1;
        *n
    });

    let sp = sc.build().unwrap();
    let a = sp.get::<i32>().unwrap();
    let b = sp.get::<i32>().unwrap();
    let c = sp.get::<i32>().unwrap();

    assert_eq!((*a, *b, *c), (1, 2, 3));
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_factory_resolves_dependencies() {
    struct Database {
        url: String,
    }
    struct Repo {
        db: Arc<Database>,
    }

    let mut sc = ServiceCollection::new();
    sc.register_instance(Database {
        url: "sqlite://mem".to_string(),
    });
    sc.register_factory(Lifetime::Transient, |ctx| Repo {
        db: ctx.get_required::<Database>(),
    });

    let sp = sc.build().unwrap();
    let repo = sp.get::<Repo>().unwrap();
    assert_eq!(repo.db.url, "sqlite://mem");
}

#[test]
fn test_trait_registration_and_resolution() {
    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register_trait_instance::<dyn Greeter>(Arc::new(English));

    let sp = sc.build().unwrap();
    let greeter = sp.get_trait::<dyn Greeter>().unwrap();
    assert_eq!(greeter.greet(), "hello");
}

#[test]
fn test_trait_factory() {
    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    struct FixedClock(u64);
    impl Clock for FixedClock {
        fn now(&self) -> u64 {
            self.0
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register_trait_factory::<dyn Clock, _>(Lifetime::Singleton, |_| Arc::new(FixedClock(7)));

    let sp = sc.build().unwrap();
    let clock = sp.get_trait::<dyn Clock>().unwrap();
    assert_eq!(clock.now(), 7);
}

#[test]
fn test_trait_forward_shares_instance() {
    trait Port: Send + Sync {
        fn id(&self) -> u32;
    }

    struct Adapter {
        id: u32,
    }
    impl Port for Adapter {
        fn id(&self) -> u32 {
            self.id
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register_factory(Lifetime::Singleton, |_| Adapter { id: 9 });
    sc.register_trait_forward::<dyn Port, Adapter, _>(|a| a);

    let sp = sc.build().unwrap();
    let concrete = sp.get::<Adapter>().unwrap();
    let port = sp.get_trait::<dyn Port>().unwrap();

    assert_eq!(port.id(), 9);
    // The trait view is backed by the same singleton instance.
    assert!(std::ptr::eq(
        Arc::as_ptr(&concrete),
        Arc::as_ptr(&port) as *const Adapter
    ));
}

#[test]
fn test_missing_registration() {
    struct NotRegistered;

    let sp = ServiceCollection::new().build().unwrap();

    assert!(sp.try_get::<NotRegistered>().unwrap().is_none());
    match sp.get::<NotRegistered>() {
        Err(DiError::NotRegistered(key)) => {
            assert!(key.display_name().contains("NotRegistered"));
        }
        other => panic!("expected NotRegistered, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_try_register_skips_existing() {
    let mut sc = ServiceCollection::new();
    assert!(sc.try_register_instance(1u32));
    assert!(!sc.try_register_instance(2u32));

    let sp = sc.build().unwrap();
    assert_eq!(*sp.get::<u32>().unwrap(), 1);
}

#[test]
fn test_service_module() {
    struct Settings {
        name: &'static str,
    }

    struct CoreModule;
    impl ServiceModule for CoreModule {
        fn register(&self, services: &mut ServiceCollection) {
            services.register_instance(Settings { name: "core" });
        }
    }

    let mut sc = ServiceCollection::new();
    sc.add_module(CoreModule);

    let sp = sc.build().unwrap();
    assert_eq!(sp.get::<Settings>().unwrap().name, "core");
}

#[test]
fn test_descriptors_snapshot() {
    let mut sc = ServiceCollection::new();
    sc.register_instance(5u64);
    sc.register_named_instance("limit", 10u64);
    sc.register_factory(Lifetime::Scoped, |_| String::from("scoped"));

    let descriptors = sc.descriptors();
    assert_eq!(descriptors.len(), 3);

    let named = descriptors.iter().find(|d| d.is_named()).unwrap();
    assert_eq!(named.service_name(), Some("limit"));
    assert_eq!(named.lifetime, Lifetime::Singleton);

    let scoped = descriptors
        .iter()
        .find(|d| d.lifetime == Lifetime::Scoped)
        .unwrap();
    assert!(scoped.type_name().contains("String"));
}

#[test]
fn test_provider_clone_shares_state() {
    let counter = Arc::new(Mutex::new(0));
    let seq = counter.clone();

    let mut sc = ServiceCollection::new();
    sc.register_factory(Lifetime::Singleton, move |_| {
        *seq.lock().unwrap() += 1;
        0u8
    });

    let sp = sc.build().unwrap();
    let clone = sp.clone();

    let a = sp.get::<u8>().unwrap();
    let b = clone.get::<u8>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(*counter.lock().unwrap(), 1);
}
