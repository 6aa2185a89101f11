//! Resolver traits: the object-safe core and the typed surface built on
//! top of it.

use std::any::{Any, TypeId};
use std::sync::{Arc, Weak};

use crate::arguments::Arguments;
use crate::error::{DiError, DiResult};
use crate::injector;
use crate::key::{key_of_named_trait, key_of_named_type, key_of_trait, key_of_type, Key};
use crate::metadata::{Injectable, MetadataCache, TypeMetadata};
use crate::provider::ResolverContext;

/// Object-safe resolution core implemented by the root provider, scopes
/// and the factory-facing [`ResolverContext`].
///
/// All values travel type-erased as `Arc<dyn Any>`; the typed methods on
/// [`Resolver`] handle downcasting. Every entry point runs under the
/// thread-local cycle guard, so a factory that resolves back into its own
/// key fails with [`DiError::CircularDependency`] instead of recursing.
pub trait ResolverCore: Send + Sync {
    /// Resolves a single service. For keys with multiple registrations the
    /// last registration wins.
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>>;

    /// Resolves every registration of `key` across the scope chain, in
    /// registration order. Zero registrations yield an empty vector.
    fn resolve_all(&self, key: &Key) -> DiResult<Vec<Arc<dyn Any + Send + Sync>>>;

    /// Resolves a closed generic through an open-generic template, given
    /// the closed type's metadata. The synthesized registration is cached
    /// so later resolutions reuse it.
    fn resolve_generic(
        &self,
        key: &Key,
        meta: &Arc<TypeMetadata>,
    ) -> DiResult<Arc<dyn Any + Send + Sync>>;

    /// Whether any registration for `key` exists in this resolver or an
    /// ancestor.
    fn contains(&self, key: &Key) -> bool;

    /// Whether an open-generic template for the definition exists in this
    /// resolver or an ancestor.
    fn contains_template(&self, definition: TypeId) -> bool;

    /// Non-owning handle to this resolver, used by deferred and
    /// factory-style wrappers.
    fn weak_self(&self) -> Weak<dyn ResolverCore>;

    /// Registers a disposal hook with this resolver's dispose bag.
    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>);
}

/// Typed resolution surface, implemented for everything that implements
/// [`ResolverCore`].
///
/// # Examples
///
/// ```rust
/// use crucible_di::{Lifetime, Resolver, ServiceCollection};
///
/// let mut services = ServiceCollection::new();
/// services.register_instance(42u32);
///
/// let provider = services.build().unwrap();
/// assert_eq!(*provider.get::<u32>().unwrap(), 42);
/// assert!(provider.try_get::<String>().unwrap().is_none());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a concrete service type.
    fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let any = self.resolve_any(&key_of_type::<T>())?;
        any.downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Like [`get`](Resolver::get), but converts a missing registration
    /// into `Ok(None)`. Every other failure (construction errors, disposed
    /// resolver) still propagates.
    fn try_get<T: Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        match self.get::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(DiError::NotRegistered(_)) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Resolves a concrete service type, panicking on failure. Intended
    /// for factory closures where a missing dependency is a programming
    /// error already excluded by the build-time analyzer.
    fn get_required<T: Send + Sync + 'static>(&self) -> Arc<T> {
        match self.get::<T>() {
            Ok(value) => value,
            Err(e) => panic!("required service {}: {}", std::any::type_name::<T>(), e),
        }
    }

    /// Resolves a keyed concrete service.
    fn get_named<T: Send + Sync + 'static>(&self, name: &'static str) -> DiResult<Arc<T>> {
        let any = self.resolve_any(&key_of_named_type::<T>(name))?;
        any.downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Like [`get_named`](Resolver::get_named), with missing registrations
    /// converted to `Ok(None)`.
    fn try_get_named<T: Send + Sync + 'static>(
        &self,
        name: &'static str,
    ) -> DiResult<Option<Arc<T>>> {
        match self.get_named::<T>(name) {
            Ok(value) => Ok(Some(value)),
            Err(DiError::NotRegistered(_)) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Resolves a single trait implementation. With multiple registrations
    /// the most recent one wins.
    fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let any = self.resolve_any(&key_of_trait::<T>())?;
        any.downcast::<Arc<T>>()
            .map(|outer| (*outer).clone())
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Like [`get_trait`](Resolver::get_trait), with missing registrations
    /// converted to `Ok(None)`.
    fn try_get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        match self.get_trait::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(DiError::NotRegistered(_)) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Resolves a trait implementation, panicking on failure.
    fn get_required_trait<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        match self.get_trait::<T>() {
            Ok(value) => value,
            Err(e) => panic!("required service {}: {}", std::any::type_name::<T>(), e),
        }
    }

    /// Resolves a keyed trait implementation.
    fn get_named_trait<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &'static str,
    ) -> DiResult<Arc<T>> {
        let any = self.resolve_any(&key_of_named_trait::<T>(name))?;
        any.downcast::<Arc<T>>()
            .map(|outer| (*outer).clone())
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Resolves every registration of the concrete element type, in
    /// registration order. Zero registrations yield an empty vector.
    fn get_all<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        let items = self.resolve_all(&key_of_type::<T>())?;
        let mut out = Vec::with_capacity(items.len());
        for any in items {
            out.push(
                any.downcast::<T>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))?,
            );
        }
        Ok(out)
    }

    /// Resolves every registration of the trait element type, in
    /// registration order.
    fn get_all_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        let items = self.resolve_all(&key_of_trait::<T>())?;
        let mut out = Vec::with_capacity(items.len());
        for any in items {
            let inner = any
                .downcast::<Arc<T>>()
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))?;
            out.push((*inner).clone());
        }
        Ok(out)
    }

    /// Resolves a closed generic type, consulting open-generic templates
    /// when no direct registration exists. The closed form's registration
    /// is synthesized once and cached.
    fn get_generic<T: Injectable>(&self) -> DiResult<Arc<T>> {
        let key = key_of_type::<T>();
        let any = match self.resolve_any(&key) {
            Err(DiError::NotRegistered(_)) => {
                let meta = MetadataCache::get_or_build::<T>();
                self.resolve_generic(&key, &meta)?
            }
            other => other?,
        };
        any.downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Constructs an instance of `T` through its injection metadata,
    /// applying the supplied overrides before container resolution. The
    /// caller owns the result; the container does not track it.
    fn create_instance<T: Injectable>(&self, args: &Arguments) -> DiResult<T>
    where
        Self: Sized,
    {
        let meta = MetadataCache::get_or_build::<T>();
        let ctx = ResolverContext::new(self);
        let boxed = injector::construct(&meta, &ctx, args, None)?;
        boxed
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Performs member injection only (fields, properties, methods) on an
    /// externally-created instance. No construction happens.
    fn inject<T: Injectable>(&self, target: &mut T, args: &Arguments) -> DiResult<()>
    where
        Self: Sized,
    {
        let meta = MetadataCache::get_or_build::<T>();
        let ctx = ResolverContext::new(self);
        injector::inject_members(&meta, target, &ctx, args)
    }
}

impl<R: ResolverCore> Resolver for R {}
