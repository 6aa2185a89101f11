use crucible_di::{
    DiError, Injectable, Lifetime, ParamSpec, Resolver, ServiceCollection, TypeMetadata,
};
use std::sync::Arc;

#[test]
fn test_named_instances_are_distinct_registrations() {
    struct Endpoint {
        url: &'static str,
    }

    let mut sc = ServiceCollection::new();
    sc.register_named_instance("primary", Endpoint { url: "http://a" });
    sc.register_named_instance("replica", Endpoint { url: "http://b" });

    let sp = sc.build().unwrap();

    assert_eq!(sp.get_named::<Endpoint>("primary").unwrap().url, "http://a");
    assert_eq!(sp.get_named::<Endpoint>("replica").unwrap().url, "http://b");

    // The unnamed key has no registration.
    assert!(matches!(
        sp.get::<Endpoint>(),
        Err(DiError::NotRegistered(_))
    ));
    assert!(sp.try_get_named::<Endpoint>("missing").unwrap().is_none());
}

#[test]
fn test_named_factory_lifetime() {
    let mut sc = ServiceCollection::new();
    sc.register_named_factory("seq", Lifetime::Singleton, |_| 41u64);

    let sp = sc.build().unwrap();
    let a = sp.get_named::<u64>("seq").unwrap();
    let b = sp.get_named::<u64>("seq").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_named_trait_registrations() {
    trait Store: Send + Sync {
        fn kind(&self) -> &'static str;
    }

    struct Memory;
    impl Store for Memory {
        fn kind(&self) -> &'static str {
            "memory"
        }
    }

    struct Disk;
    impl Store for Disk {
        fn kind(&self) -> &'static str {
            "disk"
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register_named_trait_factory::<dyn Store, _>("fast", Lifetime::Singleton, |_| {
        Arc::new(Memory)
    });
    sc.register_named_trait_factory::<dyn Store, _>("durable", Lifetime::Singleton, |_| {
        Arc::new(Disk)
    });

    let sp = sc.build().unwrap();
    assert_eq!(sp.get_named_trait::<dyn Store>("fast").unwrap().kind(), "memory");
    assert_eq!(
        sp.get_named_trait::<dyn Store>("durable").unwrap().kind(),
        "disk"
    );
    assert!(sp.get_trait::<dyn Store>().is_err());
}

#[test]
fn test_named_constructor_dependency() {
    struct Endpoint {
        url: &'static str,
    }
    struct Client {
        primary: Arc<Endpoint>,
    }

    impl Injectable for Client {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Client>()
                .constructor(
                    vec![ParamSpec::service_named::<Endpoint>("primary", "primary")],
                    |args| {
                        Ok(Client {
                            primary: args.take::<Endpoint>()?,
                        })
                    },
                )
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register_named_instance("primary", Endpoint { url: "http://a" });
    sc.register_named_instance("replica", Endpoint { url: "http://b" });
    sc.register::<Client>(Lifetime::Transient);

    let sp = sc.build().unwrap();
    assert_eq!(sp.get::<Client>().unwrap().primary.url, "http://a");
}

#[test]
fn test_named_registration_appends_like_unnamed() {
    let mut sc = ServiceCollection::new();
    sc.register_named_instance("n", 1i32);
    sc.register_named_instance("n", 2i32);

    let sp = sc.build().unwrap();
    // Last registration wins for the same (type, name) key.
    assert_eq!(*sp.get_named::<i32>("n").unwrap(), 2);
}
