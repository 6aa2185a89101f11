//! Service lifetime definitions.

/// Reuse policy governing how many instances of a service exist and for
/// how long the container keeps them.
///
/// The set of lifetimes is closed: every registration carries exactly one
/// of these values and the resolver dispatches on it when deciding whether
/// to reuse a cached instance or construct a fresh one.
///
/// # Examples
///
/// ```rust
/// use crucible_di::{ServiceCollection, Resolver, Lifetime};
/// use std::sync::Arc;
///
/// struct Config { url: String }
///
/// let mut services = ServiceCollection::new();
/// services.register_instance(Config { url: "postgres://localhost".into() });
/// services.register_factory(Lifetime::Transient, |_| String::from("fresh"));
///
/// let provider = services.build().unwrap();
///
/// // Singleton: same instance every time
/// let a = provider.get::<Config>().unwrap();
/// let b = provider.get::<Config>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// // Transient: a new instance per resolution
/// let x = provider.get::<String>().unwrap();
/// let y = provider.get::<String>().unwrap();
/// assert!(!Arc::ptr_eq(&x, &y));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance for the lifetime of the owning provider.
    ///
    /// Created lazily on first resolution, under per-registration mutual
    /// exclusion: concurrent first resolutions block and all observe the
    /// same completed instance. Registrations added to the root collection
    /// are process-wide; registrations added to a scope live as long as
    /// that scope.
    Singleton,
    /// One instance per scope.
    ///
    /// Repeated resolutions within one scope return the same instance;
    /// sibling scopes never share. The instance is released when the
    /// caching scope is disposed.
    Scoped,
    /// A new instance on every resolution.
    ///
    /// Never cached and never tracked for disposal; the caller owns the
    /// returned instance.
    Transient,
}

impl Lifetime {
    /// Short lowercase label used in log records.
    pub fn label(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}
