use crucible_di::{
    ArgBundle, Deferred, DiError, DiResult, Injectable, Lifetime, ParamSpec, Resolver,
    ServiceCollection, TypeMetadata,
};
use std::sync::Arc;

struct CycleA {
    _b: Arc<CycleB>,
}
struct CycleB {
    _a: Arc<CycleA>,
}

impl Injectable for CycleA {
    fn metadata() -> TypeMetadata {
        TypeMetadata::builder::<CycleA>()
            .constructor(vec![ParamSpec::service::<CycleB>("b")], |args| {
                Ok(CycleA {
                    _b: args.take::<CycleB>()?,
                })
            })
            .build()
    }
}

impl Injectable for CycleB {
    fn metadata() -> TypeMetadata {
        TypeMetadata::builder::<CycleB>()
            .constructor(vec![ParamSpec::service::<CycleA>("a")], |args| {
                Ok(CycleB {
                    _a: args.take::<CycleA>()?,
                })
            })
            .build()
    }
}

#[test]
fn test_build_rejects_constructor_cycle() {
    let mut sc = ServiceCollection::new();
    sc.register::<CycleA>(Lifetime::Transient);
    sc.register::<CycleB>(Lifetime::Transient);

    match sc.build() {
        Err(DiError::CircularDependency { path }) => {
            assert_eq!(path.len(), 3);
            // Either [A, B, A] or [B, A, B] depending on traversal start;
            // both describe the same cycle.
            assert_eq!(path[0], path[2]);
            assert_ne!(path[0], path[1]);
        }
        other => panic!("expected CircularDependency, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_member_cycle_rejected_at_build() {
    struct Left {
        right: Option<Arc<Right>>,
    }
    struct Right {
        _left: Arc<Left>,
    }

    impl Injectable for Left {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Left>()
                .constructor(vec![], |_| Ok(Left { right: None }))
                .field("right", ParamSpec::service::<Right>("right"), |t, args| {
                    t.right = Some(args.take::<Right>()?);
                    Ok(())
                })
                .build()
        }
    }

    impl Injectable for Right {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Right>()
                .constructor(vec![ParamSpec::service::<Left>("left")], |args| {
                    Ok(Right {
                        _left: args.take::<Left>()?,
                    })
                })
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register::<Left>(Lifetime::Transient);
    sc.register::<Right>(Lifetime::Transient);

    assert!(matches!(
        sc.build(),
        Err(DiError::CircularDependency { .. })
    ));
}

#[test]
fn test_deferred_dependency_breaks_cycle() {
    struct Engine {
        starter: Deferred<Starter>,
        name: &'static str,
    }
    struct Starter {
        engine: Arc<Engine>,
    }

    impl Injectable for Engine {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Engine>()
                .constructor(vec![ParamSpec::deferred::<Starter>("starter")], |args| {
                    Ok(Engine {
                        starter: args.take_deferred::<Starter>()?,
                        name: "v8",
                    })
                })
                .build()
        }
    }

    impl Injectable for Starter {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Starter>()
                .constructor(vec![ParamSpec::service::<Engine>("engine")], |args| {
                    Ok(Starter {
                        engine: args.take::<Engine>()?,
                    })
                })
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register::<Engine>(Lifetime::Singleton);
    sc.register::<Starter>(Lifetime::Singleton);

    // The deferred edge is excluded from the static graph, so this builds.
    let sp = sc.build().unwrap();

    let engine = sp.get::<Engine>().unwrap();
    // Resolving the deferred side after construction closes the loop onto
    // the already-cached singleton.
    let starter = engine.starter.get().unwrap();
    assert!(Arc::ptr_eq(&starter.engine, &engine));
    assert_eq!(starter.engine.name, "v8");
}

#[test]
fn test_factory_cycle_caught_at_runtime() {
    struct SelfReferencing;

    let mut sc = ServiceCollection::new();
    sc.register_factory(Lifetime::Transient, |ctx| {
        // Opaque to the build-time analyzer; the resolution-stack guard
        // has to catch this.
        let _: DiResult<Arc<SelfReferencing>> = ctx.get::<SelfReferencing>();
        SelfReferencing
    });

    let sp = sc.build().unwrap();
    match sp.get::<SelfReferencing>() {
        Err(DiError::CircularDependency { path }) => {
            assert_eq!(path.len(), 2);
            assert_eq!(path[0], path[1]);
        }
        other => panic!("expected CircularDependency, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_container_usable_after_runtime_cycle_error() {
    struct Looper;

    let mut sc = ServiceCollection::new();
    sc.register_factory(Lifetime::Transient, |ctx| {
        let _ = ctx.get::<Looper>();
        Looper
    });
    sc.register_instance(99u32);

    let sp = sc.build().unwrap();
    assert!(sp.get::<Looper>().is_err());
    // The failed resolution does not poison unrelated services.
    assert_eq!(*sp.get::<u32>().unwrap(), 99);
}

#[test]
fn test_no_instances_constructed_on_failed_build() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static BUILDS: AtomicUsize = AtomicUsize::new(0);

    struct Probe;
    impl Injectable for Probe {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Probe>()
                .constructor(vec![], |_: &mut ArgBundle| {
                    BUILDS.fetch_add(1, Ordering::SeqCst);
                    Ok(Probe)
                })
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register::<Probe>(Lifetime::Singleton);
    sc.register::<CycleA>(Lifetime::Transient);
    sc.register::<CycleB>(Lifetime::Transient);

    assert!(sc.build().is_err());
    assert_eq!(BUILDS.load(Ordering::SeqCst), 0);
}
