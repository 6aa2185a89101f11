//! Service collection: the build-time registration surface.
//!
//! Registrations accumulate here in order; [`ServiceCollection::build`]
//! freezes them into a read-only registry, runs the dependency analyzer,
//! and returns the root [`ServiceProvider`]. A detected cycle or
//! unsatisfiable mandatory dependency fails the whole build — no
//! partially-usable provider is ever returned.
//!
//! Re-registering a key appends rather than replaces: single resolution
//! takes the most recent registration, while collection resolution
//! observes all of them in registration order.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::analysis::{self, RootView};
use crate::arguments::Arguments;
use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::injector;
use crate::key::{key_of_named_type, key_of_trait, key_of_type};
use crate::lifetime::Lifetime;
use crate::metadata::{select_constructor, Injectable, MetadataCache};
use crate::observer::{Observers, ResolutionObserver};
use crate::provider::{ResolverContext, ServiceProvider};
use crate::registration::{
    dispose_hook_for, metadata_registration, AnyArc, CtorFn, OpenGenericTemplate, Registration,
    Registry,
};
use crate::traits::{Dispose, ResolverCore};

pub mod module_system;
pub use module_system::ServiceModule;

/// Accumulates service registrations and builds the root provider.
///
/// # Examples
///
/// ```rust
/// use crucible_di::{Lifetime, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.register_instance(Database { url: "postgres://localhost".into() });
/// services.register_factory(Lifetime::Transient, |ctx| UserService {
///     db: ctx.get_required::<Database>(),
/// });
///
/// let provider = services.build().unwrap();
/// let users = provider.get::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    registry: Registry,
    observers: Observers,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    // ----- Metadata-driven registrations -----

    /// Registers `T` to be constructed through its injection metadata.
    pub fn register<T: Injectable>(&mut self, lifetime: Lifetime) -> &mut Self {
        let metadata = MetadataCache::get_or_build::<T>();
        self.registry
            .insert(key_of_type::<T>(), metadata_registration(metadata, lifetime));
        self
    }

    /// Registers `T` under a service name, resolvable only through the
    /// keyed lookups.
    pub fn register_named<T: Injectable>(
        &mut self,
        name: &'static str,
        lifetime: Lifetime,
    ) -> &mut Self {
        let metadata = MetadataCache::get_or_build::<T>();
        self.registry.insert(
            key_of_named_type::<T>(name),
            metadata_registration(metadata, lifetime),
        );
        self
    }

    /// Registers `T` like [`register`](Self::register) and additionally
    /// tracks constructed instances for disposal when the owning resolver
    /// is disposed.
    pub fn register_disposable<T: Injectable + Dispose>(&mut self, lifetime: Lifetime) -> &mut Self {
        let metadata = MetadataCache::get_or_build::<T>();
        let registration =
            metadata_registration(metadata, lifetime).with_dispose(dispose_hook_for::<T>());
        self.registry.insert(key_of_type::<T>(), registration);
        self
    }

    // ----- Instance registrations -----

    /// Registers a pre-built instance as a singleton.
    pub fn register_instance<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        let stored: AnyArc = Arc::new(value);
        let ctor: CtorFn = Arc::new(move |_| Ok(stored.clone()));
        self.registry.insert(
            key_of_type::<T>(),
            Registration::new(Lifetime::Singleton, ctor).with_impl::<T>(),
        );
        self
    }

    /// Registers a pre-built instance under a service name.
    pub fn register_named_instance<T: Send + Sync + 'static>(
        &mut self,
        name: &'static str,
        value: T,
    ) -> &mut Self {
        let stored: AnyArc = Arc::new(value);
        let ctor: CtorFn = Arc::new(move |_| Ok(stored.clone()));
        self.registry.insert(
            key_of_named_type::<T>(name),
            Registration::new(Lifetime::Singleton, ctor).with_impl::<T>(),
        );
        self
    }

    /// Registers a pre-built disposable instance as a singleton; it is
    /// tracked for disposal once first resolved.
    pub fn register_disposable_instance<T: Dispose + Send + Sync + 'static>(
        &mut self,
        value: T,
    ) -> &mut Self {
        let stored: AnyArc = Arc::new(value);
        let ctor: CtorFn = Arc::new(move |_| Ok(stored.clone()));
        self.registry.insert(
            key_of_type::<T>(),
            Registration::new(Lifetime::Singleton, ctor)
                .with_impl::<T>()
                .with_dispose(dispose_hook_for::<T>()),
        );
        self
    }

    /// Registers a pre-built trait object as a singleton.
    pub fn register_trait_instance<I: ?Sized + Send + Sync + 'static>(
        &mut self,
        value: Arc<I>,
    ) -> &mut Self {
        // Stored as Arc<Arc<I>> so the erased payload stays sized.
        let stored: AnyArc = Arc::new(value);
        let ctor: CtorFn = Arc::new(move |_| Ok(stored.clone()));
        self.registry
            .insert(key_of_trait::<I>(), Registration::new(Lifetime::Singleton, ctor));
        self
    }

    // ----- Factory registrations -----

    /// Registers a factory closure for `T`. The closure receives the
    /// calling resolver, so it can pull further dependencies.
    pub fn register_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: for<'a> Fn(&ResolverContext<'a>) -> T + Send + Sync + 'static,
    {
        let ctor: CtorFn = Arc::new(move |ctx| Ok(Arc::new(factory(ctx)) as AnyArc));
        self.registry.insert(
            key_of_type::<T>(),
            Registration::new(lifetime, ctor).with_impl::<T>(),
        );
        self
    }

    /// Registers a factory for `T` under a service name.
    pub fn register_named_factory<T, F>(
        &mut self,
        name: &'static str,
        lifetime: Lifetime,
        factory: F,
    ) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: for<'a> Fn(&ResolverContext<'a>) -> T + Send + Sync + 'static,
    {
        let ctor: CtorFn = Arc::new(move |ctx| Ok(Arc::new(factory(ctx)) as AnyArc));
        self.registry.insert(
            key_of_named_type::<T>(name),
            Registration::new(lifetime, ctor).with_impl::<T>(),
        );
        self
    }

    /// Registers a factory producing a trait object.
    pub fn register_trait_factory<I, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&ResolverContext<'a>) -> Arc<I> + Send + Sync + 'static,
    {
        let ctor: CtorFn = Arc::new(move |ctx| Ok(Arc::new(factory(ctx)) as AnyArc));
        self.registry
            .insert(key_of_trait::<I>(), Registration::new(lifetime, ctor));
        self
    }

    /// Registers a trait-object factory under a service name.
    pub fn register_named_trait_factory<I, F>(
        &mut self,
        name: &'static str,
        lifetime: Lifetime,
        factory: F,
    ) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: for<'a> Fn(&ResolverContext<'a>) -> Arc<I> + Send + Sync + 'static,
    {
        let ctor: CtorFn = Arc::new(move |ctx| Ok(Arc::new(factory(ctx)) as AnyArc));
        self.registry.insert(
            crate::key::key_of_named_trait::<I>(name),
            Registration::new(lifetime, ctor),
        );
        self
    }

    // ----- Interface bindings -----

    /// Registers the implementation `T` under the trait `I`. `T` is
    /// constructed through its injection metadata and coerced with the
    /// supplied closure (usually just `|c| c`).
    ///
    /// Registering the same trait again appends: the newest registration
    /// wins single resolution and `get_all_trait` sees every one.
    pub fn register_trait<I, T, F>(&mut self, lifetime: Lifetime, coerce: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        T: Injectable,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let registration = self.trait_registration::<I, T, F>(lifetime, coerce);
        self.registry.insert(key_of_trait::<I>(), registration);
        self
    }

    /// Registers the implementation `T` under the trait `I` with a
    /// service name.
    pub fn register_named_trait<I, T, F>(
        &mut self,
        name: &'static str,
        lifetime: Lifetime,
        coerce: F,
    ) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        T: Injectable,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let registration = self.trait_registration::<I, T, F>(lifetime, coerce);
        self.registry
            .insert(crate::key::key_of_named_trait::<I>(name), registration);
        self
    }

    fn trait_registration<I, T, F>(&mut self, lifetime: Lifetime, coerce: F) -> Registration
    where
        I: ?Sized + Send + Sync + 'static,
        T: Injectable,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let metadata = MetadataCache::get_or_build::<T>();
        let plan = Arc::new(OnceCell::new());
        let meta = metadata.clone();
        let shared_plan = plan.clone();
        let ctor: CtorFn = Arc::new(move |ctx| {
            let index =
                *shared_plan.get_or_try_init(|| select_constructor(&meta, ctx, &Arguments::new()))?;
            let boxed = injector::construct_with(&meta, ctx, &Arguments::new(), index)?;
            let concrete = boxed
                .downcast::<T>()
                .map(|b| Arc::new(*b))
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))?;
            Ok(Arc::new(coerce(concrete)) as AnyArc)
        });
        let mut registration = Registration::new(lifetime, ctor);
        registration.plan = plan;
        registration.with_metadata(metadata)
    }

    /// Forwards the trait `I` to the existing registration of `T`: the
    /// same instance (and lifetime) backs both keys. Use together with
    /// [`register`](Self::register) to expose one service as itself plus
    /// any number of its traits.
    pub fn register_trait_forward<I, T, F>(&mut self, coerce: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let target = key_of_type::<T>();
        let ctor: CtorFn = Arc::new(move |ctx| {
            let concrete = ctx
                .resolve_any(&target)?
                .downcast::<T>()
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))?;
            Ok(Arc::new(coerce(concrete)) as AnyArc)
        });
        // Transient forwarder: the target registration's lifetime governs
        // instance reuse.
        self.registry.insert(
            key_of_trait::<I>(),
            Registration::new(Lifetime::Transient, ctor).with_impl::<T>(),
        );
        self
    }

    // ----- Open generics -----

    /// Registers an open-generic template under the definition marker
    /// `Def`. Closed forms declare the definition in their metadata via
    /// [`TypeMetadataBuilder::closes`] and are synthesized on first
    /// request with this template's lifetime.
    ///
    /// [`TypeMetadataBuilder::closes`]: crate::TypeMetadataBuilder::closes
    pub fn register_open_generic<Def: ?Sized + 'static>(&mut self, lifetime: Lifetime) -> &mut Self {
        self.registry.insert_template(OpenGenericTemplate {
            definition: std::any::TypeId::of::<Def>(),
            definition_name: std::any::type_name::<Def>(),
            lifetime,
        });
        self
    }

    // ----- Conditional registrations -----

    /// Registers `T` only if no registration for it exists yet. Returns
    /// whether the registration was added.
    pub fn try_register<T: Injectable>(&mut self, lifetime: Lifetime) -> bool {
        if self.registry.contains(&key_of_type::<T>()) {
            return false;
        }
        self.register::<T>(lifetime);
        true
    }

    /// Registers a pre-built instance only if `T` is not yet registered.
    pub fn try_register_instance<T: Send + Sync + 'static>(&mut self, value: T) -> bool {
        if self.registry.contains(&key_of_type::<T>()) {
            return false;
        }
        self.register_instance(value);
        true
    }

    /// Registers a factory only if `T` is not yet registered.
    pub fn try_register_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> bool
    where
        T: Send + Sync + 'static,
        F: for<'a> Fn(&ResolverContext<'a>) -> T + Send + Sync + 'static,
    {
        if self.registry.contains(&key_of_type::<T>()) {
            return false;
        }
        self.register_factory(lifetime, factory);
        true
    }

    // ----- Observers and modules -----

    /// Adds a diagnostics sink that receives one record per resolution.
    pub fn add_observer(&mut self, observer: Arc<dyn ResolutionObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Applies a grouped registration module.
    pub fn add_module<M: ServiceModule>(&mut self, module: M) -> &mut Self {
        module.register(self);
        self
    }

    // ----- Introspection -----

    /// Snapshot of every registration for diagnostics.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.registry
            .iter()
            .map(|(key, registration)| ServiceDescriptor {
                key: key.clone(),
                lifetime: registration.lifetime,
                impl_id: registration.impl_id,
                impl_name: registration.impl_name,
                has_metadata: registration.metadata.is_some(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    // ----- Build -----

    /// Freezes the registry, validates the dependency graph and returns
    /// the root provider.
    ///
    /// Fails with [`DiError::CircularDependency`] when the static graph
    /// contains a cycle, [`DiError::NoSuitableConstructor`] /
    /// [`DiError::CannotInstantiateAbstract`] when a registered type has
    /// no usable constructor, and [`DiError::NotRegistered`] when a
    /// mandatory member dependency is missing. On any failure no provider
    /// is produced.
    pub fn build(self) -> DiResult<ServiceProvider> {
        let (registry, observers) = self.into_parts();
        let registrations = registry.len();
        let frozen = registry.freeze();
        analysis::validate(frozen.entries(), &RootView { registry: &frozen })?;
        tracing::debug!(
            registrations,
            scoped_slots = frozen.scoped_count(),
            "service provider built"
        );
        Ok(ServiceProvider::from_parts(frozen, observers))
    }

    pub(crate) fn into_parts(self) -> (Registry, Observers) {
        (self.registry, self.observers)
    }
}
