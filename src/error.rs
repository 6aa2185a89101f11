//! Error types for the dependency injection container.

use crate::key::Key;
use thiserror::Error;

/// Errors raised by registration, build and resolution operations.
///
/// Build-time errors ([`Configuration`](DiError::Configuration),
/// [`CircularDependency`](DiError::CircularDependency),
/// [`NoSuitableConstructor`](DiError::NoSuitableConstructor)) abort the
/// whole build; no partially-usable provider is returned. Run-time errors
/// abort only the single resolution that triggered them — the provider and
/// its caches stay valid, and a failed construction is never cached.
///
/// # Examples
///
/// ```rust
/// use crucible_di::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build().unwrap();
/// match provider.get::<String>() {
///     Err(DiError::NotRegistered(key)) => {
///         assert_eq!(key.display_name(), "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// Invalid registration detected while building the container.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No registration for the requested key in this resolver or any
    /// ancestor. Recoverable through [`Resolver::try_get`].
    ///
    /// [`Resolver::try_get`]: crate::Resolver::try_get
    #[error("service not registered: {0}")]
    NotRegistered(Key),

    /// A cycle in the dependency graph, with the full path that closes it.
    ///
    /// Detected at build time by the analyzer, or at run time by the
    /// resolution-stack guard when a factory closure the analyzer cannot
    /// see through resolves back into itself.
    #[error("circular dependency: {}", render_path(.path))]
    CircularDependency {
        /// Ordered path of keys; the first key appears again at the end.
        path: Vec<Key>,
    },

    /// No constructor of the type has all parameters satisfiable.
    #[error("no suitable constructor for {type_name}: {reason}")]
    NoSuitableConstructor {
        type_name: &'static str,
        reason: String,
    },

    /// The type's metadata declares no constructor at all: it can receive
    /// member injection but the container cannot instantiate it.
    #[error("cannot instantiate abstract service {0}")]
    CannotInstantiateAbstract(Key),

    /// A constructor, member setter or user factory failed while building
    /// the keyed service. Nested failures chain through `source`, so the
    /// full key path from the original request to the innermost cause is
    /// preserved.
    #[error("resolving {key}: {source}")]
    Resolution {
        key: Key,
        #[source]
        source: Box<DiError>,
    },

    /// A stored value did not downcast to the requested type.
    #[error("type mismatch for {0}")]
    TypeMismatch(&'static str),

    /// Operation attempted on a disposed resolver, or through a parent
    /// scope that has already been dropped.
    #[error("resolver has been disposed")]
    Disposed,

    /// Resolution recursed past the depth guard.
    #[error("maximum resolution depth {0} exceeded")]
    DepthExceeded(usize),
}

impl DiError {
    /// Walks the `Resolution` chain down to the innermost cause.
    pub fn root_cause(&self) -> &DiError {
        match self {
            DiError::Resolution { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The keys along a nested `Resolution` chain, outermost first.
    pub fn key_chain(&self) -> Vec<&Key> {
        let mut chain = Vec::new();
        let mut cur = self;
        while let DiError::Resolution { key, source } = cur {
            chain.push(key);
            cur = source;
        }
        chain
    }
}

fn render_path(path: &[Key]) -> String {
    path.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for DI operations.
pub type DiResult<T> = Result<T, DiError>;
