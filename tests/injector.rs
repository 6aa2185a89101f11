use crucible_di::{
    Argument, Arguments, DiError, Injectable, Lifetime, ParamSpec, Resolver, ServiceCollection,
    TypeMetadata,
};
use std::sync::Arc;

struct Database {
    url: String,
}

#[test]
fn test_metadata_constructor_injection() {
    struct Repo {
        db: Arc<Database>,
    }

    impl Injectable for Repo {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Repo>()
                .constructor(vec![ParamSpec::service::<Database>("db")], |args| {
                    Ok(Repo {
                        db: args.take::<Database>()?,
                    })
                })
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register_instance(Database {
        url: "postgres://db".to_string(),
    });
    sc.register::<Repo>(Lifetime::Transient);

    let sp = sc.build().unwrap();
    let repo = sp.get::<Repo>().unwrap();
    assert_eq!(repo.db.url, "postgres://db");
}

#[test]
fn test_member_injection_order() {
    #[derive(Default)]
    struct Widget {
        steps: Vec<&'static str>,
    }

    impl Injectable for Widget {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Widget>()
                .constructor(vec![], |_| Ok(Widget::default()))
                .field("alpha", ParamSpec::service::<u8>("alpha"), |t, args| {
                    let _ = args.take::<u8>()?;
                    t.steps.push("field:alpha");
                    Ok(())
                })
                .property("beta", ParamSpec::service::<u8>("beta"), |t, args| {
                    let _ = args.take::<u8>()?;
                    t.steps.push("property:beta");
                    Ok(())
                })
                // Declared out of priority order on purpose: priority 5,
                // then -1, then a second 5. Lower runs first; declaration
                // order breaks the tie between the two fives.
                .method("late_a", 5, vec![], |t, _| {
                    t.steps.push("method:late_a");
                    Ok(())
                })
                .method("early", -1, vec![], |t, _| {
                    t.steps.push("method:early");
                    Ok(())
                })
                .method("late_b", 5, vec![], |t, _| {
                    t.steps.push("method:late_b");
                    Ok(())
                })
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register_instance(7u8);
    sc.register::<Widget>(Lifetime::Transient);

    let sp = sc.build().unwrap();
    let widget = sp.get::<Widget>().unwrap();

    assert_eq!(
        widget.steps,
        vec![
            "field:alpha",
            "property:beta",
            "method:early",
            "method:late_a",
            "method:late_b",
        ]
    );
}

#[test]
fn test_inject_into_existing_instance() {
    struct HostComponent {
        db: Option<Arc<Database>>,
        configured: bool,
    }

    impl Injectable for HostComponent {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<HostComponent>()
                // No constructor: the host creates these itself.
                .field("db", ParamSpec::service::<Database>("db"), |t, args| {
                    t.db = Some(args.take::<Database>()?);
                    Ok(())
                })
                .method("configure", 0, vec![], |t, _| {
                    t.configured = true;
                    Ok(())
                })
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register_instance(Database {
        url: "file:///tmp".to_string(),
    });

    let sp = sc.build().unwrap();
    let mut component = HostComponent {
        db: None,
        configured: false,
    };
    sp.inject(&mut component, &Arguments::new()).unwrap();

    assert!(component.configured);
    assert_eq!(component.db.unwrap().url, "file:///tmp");

    // And the same metadata cannot be constructed by the container.
    assert!(matches!(
        sp.create_instance::<HostComponent>(&Arguments::new()),
        Err(DiError::CannotInstantiateAbstract(_))
    ));
}

#[test]
fn test_override_precedence_name_over_registry() {
    struct Greeter {
        name: String,
    }

    impl Injectable for Greeter {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Greeter>()
                .constructor(vec![ParamSpec::service::<String>("name")], |args| {
                    Ok(Greeter {
                        name: args.take_value::<String>()?,
                    })
                })
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register_instance("from-registry".to_string());

    let sp = sc.build().unwrap();

    // Without overrides the registry value wins.
    let plain = sp.create_instance::<Greeter>(&Arguments::new()).unwrap();
    assert_eq!(plain.name, "from-registry");

    // A named override takes precedence over the registered value.
    let args = Arguments::new().with(Argument::named("name", "from-override".to_string()));
    let overridden = sp.create_instance::<Greeter>(&args).unwrap();
    assert_eq!(overridden.name, "from-override");
}

#[test]
fn test_override_by_type_when_unnamed() {
    struct Port(u16);
    struct Server {
        port: u16,
    }

    impl Injectable for Server {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Server>()
                .constructor(vec![ParamSpec::service::<Port>("port")], |args| {
                    Ok(Server {
                        port: args.take::<Port>()?.0,
                    })
                })
                .build()
        }
    }

    let sp = ServiceCollection::new().build().unwrap();

    // Port is not registered at all; the typed override satisfies it.
    let args = Arguments::new().with(Argument::value(Port(9000)));
    let server = sp.create_instance::<Server>(&args).unwrap();
    assert_eq!(server.port, 9000);
}

#[test]
fn test_default_parameter_value() {
    struct Retries(u32);
    struct Client {
        retries: u32,
    }

    impl Injectable for Client {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Client>()
                .constructor(
                    vec![ParamSpec::service_or::<Retries, _>("retries", || Retries(3))],
                    |args| {
                        Ok(Client {
                            retries: args.take::<Retries>()?.0,
                        })
                    },
                )
                .build()
        }
    }

    // Unregistered dependency with a declared default still builds.
    let mut sc = ServiceCollection::new();
    sc.register::<Client>(Lifetime::Transient);
    let sp = sc.build().unwrap();
    assert_eq!(sp.get::<Client>().unwrap().retries, 3);

    // A registration beats the default.
    let mut sc = ServiceCollection::new();
    sc.register_instance(Retries(8));
    sc.register::<Client>(Lifetime::Transient);
    let sp = sc.build().unwrap();
    assert_eq!(sp.get::<Client>().unwrap().retries, 8);
}

#[test]
fn test_constructor_selection_prefers_widest_satisfiable() {
    struct Cache;
    struct Service {
        via: &'static str,
    }

    impl Injectable for Service {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Service>()
                .constructor(vec![], |_| Ok(Service { via: "default" }))
                .constructor(
                    vec![
                        ParamSpec::service::<Database>("db"),
                        ParamSpec::service::<Cache>("cache"),
                    ],
                    |args| {
                        let _ = args.take::<Database>()?;
                        let _ = args.take::<Cache>()?;
                        Ok(Service { via: "db+cache" })
                    },
                )
                .constructor(vec![ParamSpec::service::<Database>("db")], |args| {
                    let _ = args.take::<Database>()?;
                    Ok(Service { via: "db" })
                })
                .build()
        }
    }

    // Only Database registered: the single-parameter constructor wins
    // over the parameterless one; the two-parameter candidate is not
    // satisfiable.
    let mut sc = ServiceCollection::new();
    sc.register_instance(Database {
        url: "x".to_string(),
    });
    sc.register::<Service>(Lifetime::Transient);
    let sp = sc.build().unwrap();
    assert_eq!(sp.get::<Service>().unwrap().via, "db");

    // With both registered the widest constructor wins.
    let mut sc = ServiceCollection::new();
    sc.register_instance(Database {
        url: "x".to_string(),
    });
    sc.register_factory(Lifetime::Singleton, |_| Cache);
    sc.register::<Service>(Lifetime::Transient);
    let sp = sc.build().unwrap();
    assert_eq!(sp.get::<Service>().unwrap().via, "db+cache");
}

#[test]
fn test_unsatisfiable_constructor_fails_build() {
    struct Missing;
    struct Needy {
        _missing: Arc<Missing>,
    }

    impl Injectable for Needy {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Needy>()
                .constructor(vec![ParamSpec::service::<Missing>("missing")], |args| {
                    Ok(Needy {
                        _missing: args.take::<Missing>()?,
                    })
                })
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register::<Needy>(Lifetime::Transient);

    assert!(matches!(
        sc.build(),
        Err(DiError::NoSuitableConstructor { .. })
    ));
}

#[test]
fn test_unsatisfiable_member_dependency_fails_build() {
    struct Missing;
    struct Holder {
        slot: Option<Arc<Missing>>,
    }

    impl Injectable for Holder {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Holder>()
                .constructor(vec![], |_| Ok(Holder { slot: None }))
                .field("slot", ParamSpec::service::<Missing>("slot"), |t, args| {
                    t.slot = Some(args.take::<Missing>()?);
                    Ok(())
                })
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register::<Holder>(Lifetime::Transient);

    assert!(matches!(sc.build(), Err(DiError::NotRegistered(_))));
}

#[test]
fn test_resolution_error_preserves_key_chain() {
    #[derive(Debug)]
    struct Flaky;
    #[derive(Debug)]
    struct Outer {
        _flaky: Arc<Flaky>,
    }

    impl Injectable for Flaky {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Flaky>()
                .constructor(vec![], |_| {
                    Err(DiError::Configuration("flaky init failed".into()))
                })
                .build()
        }
    }

    impl Injectable for Outer {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Outer>()
                .constructor(vec![ParamSpec::service::<Flaky>("flaky")], |args| {
                    Ok(Outer {
                        _flaky: args.take::<Flaky>()?,
                    })
                })
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register::<Flaky>(Lifetime::Transient);
    sc.register::<Outer>(Lifetime::Transient);

    let sp = sc.build().unwrap();
    let err = sp.get::<Outer>().unwrap_err();

    let chain = err.key_chain();
    assert_eq!(chain.len(), 2);
    assert!(chain[0].display_name().contains("Outer"));
    assert!(chain[1].display_name().contains("Flaky"));
    assert!(matches!(err.root_cause(), DiError::Configuration(_)));

    // try_get converts only missing registrations; construction failures
    // still surface.
    assert!(sp.try_get::<Outer>().is_err());
}

#[test]
fn test_failed_singleton_construction_is_retried() {
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Gate(AtomicBool);
    struct Lazy {
        ok: bool,
    }

    impl Injectable for Lazy {
        fn metadata() -> TypeMetadata {
            TypeMetadata::builder::<Lazy>()
                .constructor(vec![ParamSpec::service::<Gate>("gate")], |args| {
                    let gate = args.take::<Gate>()?;
                    if gate.0.swap(false, Ordering::SeqCst) {
                        Err(DiError::Configuration("first attempt fails".into()))
                    } else {
                        Ok(Lazy { ok: true })
                    }
                })
                .build()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.register_instance(Gate(AtomicBool::new(true)));
    sc.register::<Lazy>(Lifetime::Singleton);

    let sp = sc.build().unwrap();

    // A failed construction is not cached; the next caller retries.
    assert!(sp.get::<Lazy>().is_err());
    assert!(sp.get::<Lazy>().unwrap().ok);
}
