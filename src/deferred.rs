//! Deferred and factory-style dependency wrappers.
//!
//! Both wrappers postpone the nested `resolve` call until after the
//! depending object has been constructed, which is the sanctioned way to
//! introduce a dependency edge the build-time analyzer would otherwise
//! reject as a cycle. The analyzer excludes them from the dependency graph
//! for exactly that reason.

use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::error::{DiError, DiResult};
use crate::key::key_of_type;
use crate::traits::ResolverCore;

/// Weak, non-owning handle to the resolver a wrapper was created against.
pub(crate) type WeakResolver = Weak<dyn ResolverCore>;

/// Lazily resolved dependency, memoized on first access.
///
/// A `Deferred<T>` holds a non-owning handle to the resolver that built
/// its owner, so it does not extend that resolver's lifetime; accessing it
/// after the resolver was dropped or disposed fails with
/// [`DiError::Disposed`].
///
/// Clones share the memoized instance.
///
/// # Examples
///
/// ```rust
/// use crucible_di::{
///     Deferred, Injectable, Lifetime, ParamSpec, Resolver, ServiceCollection, TypeMetadata,
/// };
///
/// struct Engine { starter: Deferred<Starter> }
/// struct Starter;
///
/// impl Injectable for Engine {
///     fn metadata() -> TypeMetadata {
///         TypeMetadata::builder::<Engine>()
///             .constructor(vec![ParamSpec::deferred::<Starter>("starter")], |args| {
///                 Ok(Engine { starter: args.take_deferred::<Starter>()? })
///             })
///             .build()
///     }
/// }
///
/// impl Injectable for Starter {
///     fn metadata() -> TypeMetadata {
///         TypeMetadata::builder::<Starter>()
///             .constructor(vec![], |_| Ok(Starter))
///             .build()
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.register::<Engine>(Lifetime::Singleton);
/// services.register::<Starter>(Lifetime::Singleton);
/// let provider = services.build().unwrap();
///
/// let engine = provider.get::<Engine>().unwrap();
/// // The Starter is only resolved here, after Engine construction finished.
/// let _starter = engine.starter.get().unwrap();
/// ```
pub struct Deferred<T: Send + Sync + 'static> {
    target: WeakResolver,
    cell: Arc<OnceCell<Arc<T>>>,
}

impl<T: Send + Sync + 'static> Deferred<T> {
    pub(crate) fn new(target: WeakResolver) -> Self {
        Self {
            target,
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// Resolves the dependency, at most once; later calls return the
    /// memoized instance.
    pub fn get(&self) -> DiResult<Arc<T>> {
        self.cell
            .get_or_try_init(|| {
                let resolver = self.target.upgrade().ok_or(DiError::Disposed)?;
                let any = resolver.resolve_any(&key_of_type::<T>())?;
                any.downcast::<T>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
            })
            .cloned()
    }

    /// The memoized instance, if `get` has already succeeded.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }
}

impl<T: Send + Sync + 'static> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            cell: self.cell.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("type", &std::any::type_name::<T>())
            .field("resolved", &self.cell.get().is_some())
            .finish()
    }
}

/// Factory-style dependency: every [`create`](FactoryOf::create) call runs
/// a fresh resolution against the originating resolver.
///
/// Unlike [`Deferred`], nothing is memoized here — for a transient target
/// each call constructs a new instance, while singleton and scoped targets
/// still honor their caches.
pub struct FactoryOf<T: Send + Sync + 'static> {
    target: WeakResolver,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> FactoryOf<T> {
    pub(crate) fn new(target: WeakResolver) -> Self {
        Self {
            target,
            _marker: std::marker::PhantomData,
        }
    }

    /// Resolves the target through the originating resolver.
    pub fn create(&self) -> DiResult<Arc<T>> {
        let resolver = self.target.upgrade().ok_or(DiError::Disposed)?;
        let any = resolver.resolve_any(&key_of_type::<T>())?;
        any.downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }
}

impl<T: Send + Sync + 'static> Clone for FactoryOf<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for FactoryOf<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryOf")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
