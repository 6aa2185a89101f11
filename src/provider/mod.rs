//! Service provider: the root resolver and the shared resolution engine.
//!
//! Resolution walks the scope chain from the calling resolver toward the
//! root until a registry owns the requested key, then applies that
//! registration's lifetime. Nested dependencies always resolve through
//! the *calling* resolver, so a transient registered at the root still
//! receives scope-local dependencies when resolved from a scope.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::internal::{with_cycle_guard, DisposeBag};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::metadata::TypeMetadata;
use crate::observer::Observers;
use crate::registration::{metadata_registration, AnyArc, FrozenRegistry, Registration};
use crate::traits::ResolverCore;

pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::Scope;

use scope::ScopeShared;

/// Per-container cache for scoped instances.
///
/// Registrations known at freeze time get a dedicated slot cell;
/// registrations synthesized later (closed generics) fall back to a
/// keyed cell table. Both paths guarantee at-most-once construction: the
/// cell provides the per-key lock, and a failed construction leaves it
/// empty so the next caller retries.
pub(crate) struct ScopedCells {
    slots: Box<[OnceCell<AnyArc>]>,
    extra: Mutex<HashMap<Key, Arc<OnceCell<AnyArc>>, ahash::RandomState>>,
}

impl ScopedCells {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            slots: (0..count)
                .map(|_| OnceCell::new())
                .collect::<Vec<_>>()
                .into_boxed_slice(),
            extra: Mutex::new(HashMap::with_hasher(ahash::RandomState::new())),
        }
    }

    pub(crate) fn get_or_try_init(
        &self,
        slot: Option<usize>,
        key: &Key,
        init: impl FnOnce() -> DiResult<AnyArc>,
    ) -> DiResult<AnyArc> {
        match slot {
            Some(index) if index < self.slots.len() => {
                self.slots[index].get_or_try_init(init).cloned()
            }
            _ => {
                let cell = self
                    .extra
                    .lock()
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(OnceCell::new()))
                    .clone();
                cell.get_or_try_init(init).cloned()
            }
        }
    }
}

/// A link in the scope chain: either the root provider or a scope.
#[derive(Clone)]
pub(crate) enum AnyShared {
    Root(Arc<ProviderShared>),
    Scope(Arc<ScopeShared>),
}

impl AnyShared {
    pub(crate) fn registry(&self) -> &FrozenRegistry {
        match self {
            AnyShared::Root(root) => &root.registry,
            AnyShared::Scope(scope) => &scope.registry,
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        match self {
            AnyShared::Root(root) => root.disposed.load(Ordering::Acquire),
            AnyShared::Scope(scope) => scope.disposed.load(Ordering::Acquire),
        }
    }

    pub(crate) fn is_root(&self) -> bool {
        matches!(self, AnyShared::Root(_))
    }

    /// The parent link, upgraded. A dropped parent surfaces as
    /// [`DiError::Disposed`]: parent references are non-owning, and
    /// dropping a parent while children are live is a caller error.
    pub(crate) fn parent(&self) -> DiResult<Option<AnyShared>> {
        match self {
            AnyShared::Root(_) => Ok(None),
            AnyShared::Scope(scope) => scope.parent.upgrade().map(Some),
        }
    }

    pub(crate) fn observers(&self) -> &Observers {
        match self {
            AnyShared::Root(root) => &root.observers,
            AnyShared::Scope(scope) => &scope.observers,
        }
    }

    pub(crate) fn core(&self) -> &dyn ResolverCore {
        match self {
            AnyShared::Root(root) => root.as_ref(),
            AnyShared::Scope(scope) => scope.as_ref(),
        }
    }

    pub(crate) fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        match self {
            AnyShared::Root(root) => root.disposers.lock().push(hook),
            AnyShared::Scope(scope) => scope.disposers.lock().push(hook),
        }
    }

    /// Cache for root-registered scoped services, evaluated at the calling
    /// resolver: each scope keeps its own instances, and the root acts as
    /// its own implicit scope.
    fn calling_cells(&self) -> &ScopedCells {
        match self {
            AnyShared::Root(root) => &root.cells,
            AnyShared::Scope(scope) => &scope.cells,
        }
    }

    /// Cache for scoped services registered directly on this container.
    fn own_cells(&self) -> &ScopedCells {
        match self {
            AnyShared::Root(root) => &root.cells,
            AnyShared::Scope(scope) => &scope.own_cells,
        }
    }
}

/// Resolves a single service: chain walk, then lifetime application at
/// the owning level.
pub(crate) fn resolve_single(origin: &AnyShared, key: &Key) -> DiResult<AnyArc> {
    let mut current = origin.clone();
    loop {
        if current.is_disposed() {
            return Err(DiError::Disposed);
        }
        if let Some(registration) = current.registry().last(key) {
            return apply_lifetime(origin, &current, &registration, key);
        }
        match current.parent()? {
            Some(parent) => current = parent,
            None => return Err(DiError::NotRegistered(key.clone())),
        }
    }
}

/// Resolves every registration of `key` across the chain, ancestors
/// first, preserving overall registration order. Zero registrations are
/// an empty vector, not an error.
pub(crate) fn resolve_all_impl(origin: &AnyShared, key: &Key) -> DiResult<Vec<AnyArc>> {
    let mut chain = Vec::new();
    let mut current = origin.clone();
    loop {
        if current.is_disposed() {
            return Err(DiError::Disposed);
        }
        chain.push(current.clone());
        match current.parent()? {
            Some(parent) => current = parent,
            None => break,
        }
    }

    let mut out = Vec::new();
    for container in chain.iter().rev() {
        for registration in container.registry().all(key) {
            out.push(apply_lifetime(origin, container, &registration, key)?);
        }
    }
    Ok(out)
}

/// Resolves a closed generic through an open-generic template. The
/// synthesized registration is cached in the owning registry so repeated
/// requests for the same closed type reuse it.
pub(crate) fn resolve_generic_impl(
    origin: &AnyShared,
    key: &Key,
    meta: &Arc<TypeMetadata>,
) -> DiResult<AnyArc> {
    let Some((definition, definition_name)) = meta.open_definition() else {
        return Err(DiError::NotRegistered(key.clone()));
    };
    let Some(closed_type) = key.type_id() else {
        return Err(DiError::NotRegistered(key.clone()));
    };

    let mut current = origin.clone();
    loop {
        if current.is_disposed() {
            return Err(DiError::Disposed);
        }
        if let Some(template) = current.registry().template(definition).cloned() {
            let registration = current.registry().closed_or_insert(closed_type, || {
                tracing::debug!(
                    definition = definition_name,
                    closed = meta.type_name(),
                    lifetime = template.lifetime.label(),
                    "closing open generic registration"
                );
                metadata_registration(meta.clone(), template.lifetime)
            });
            return apply_lifetime(origin, &current, &registration, key);
        }
        match current.parent()? {
            Some(parent) => current = parent,
            None => return Err(DiError::NotRegistered(key.clone())),
        }
    }
}

fn apply_lifetime(
    origin: &AnyShared,
    owner: &AnyShared,
    registration: &Arc<Registration>,
    key: &Key,
) -> DiResult<AnyArc> {
    let observers = origin.observers();
    if observers.is_empty() {
        return apply_lifetime_inner(origin, owner, registration, key);
    }
    observers.resolving(key);
    let started = Instant::now();
    let result = apply_lifetime_inner(origin, owner, registration, key);
    observers.resolved(key, registration.lifetime, started.elapsed(), result.is_ok());
    result
}

fn apply_lifetime_inner(
    origin: &AnyShared,
    owner: &AnyShared,
    registration: &Arc<Registration>,
    key: &Key,
) -> DiResult<AnyArc> {
    match registration.lifetime {
        Lifetime::Transient => run_ctor(origin, registration, key),
        Lifetime::Singleton => match &registration.single_cell {
            Some(cell) => cell
                .get_or_try_init(|| {
                    let value = run_ctor(origin, registration, key)?;
                    track_disposer(owner, registration, &value);
                    Ok(value)
                })
                .cloned(),
            // Registrations are created with a cell for every singleton;
            // this arm only guards against a hand-rolled registration.
            None => run_ctor(origin, registration, key),
        },
        Lifetime::Scoped => {
            // Scope-registered services cache at the owning scope, so
            // delegating children share the owner's instance. Services
            // registered at the root cache at the calling scope instead:
            // sibling scopes must never observe each other's instances.
            let holder = if owner.is_root() {
                origin.clone()
            } else {
                owner.clone()
            };
            let cells = if owner.is_root() {
                holder.calling_cells()
            } else {
                holder.own_cells()
            };
            cells.get_or_try_init(registration.scoped_slot.get().copied(), key, || {
                let value = run_ctor(origin, registration, key)?;
                track_disposer(&holder, registration, &value);
                Ok(value)
            })
        }
    }
}

fn track_disposer(holder: &AnyShared, registration: &Registration, value: &AnyArc) {
    if let Some(hook) = &registration.dispose {
        if let Some(hook) = hook(value) {
            holder.push_disposer(hook);
        }
    }
}

fn run_ctor(origin: &AnyShared, registration: &Registration, key: &Key) -> DiResult<AnyArc> {
    let ctx = ResolverContext::new(origin.core());
    (registration.ctor)(&ctx).map_err(|e| DiError::Resolution {
        key: key.clone(),
        source: Box::new(e),
    })
}

pub(crate) struct ProviderShared {
    pub(crate) registry: FrozenRegistry,
    /// The root's own scoped cache: the root provider acts as its own
    /// implicit scope when scoped services are resolved from it directly.
    pub(crate) cells: ScopedCells,
    pub(crate) disposers: Mutex<DisposeBag>,
    pub(crate) observers: Observers,
    pub(crate) disposed: AtomicBool,
    pub(crate) self_weak: Weak<ProviderShared>,
}

impl ProviderShared {
    fn ensure_live(&self) -> DiResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            Err(DiError::Disposed)
        } else {
            Ok(())
        }
    }

    fn as_shared(&self) -> DiResult<AnyShared> {
        self.self_weak
            .upgrade()
            .map(AnyShared::Root)
            .ok_or(DiError::Disposed)
    }
}

impl ResolverCore for ProviderShared {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.ensure_live()?;
        let origin = self.as_shared()?;
        with_cycle_guard(key, || resolve_single(&origin, key))
    }

    fn resolve_all(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.ensure_live()?;
        let origin = self.as_shared()?;
        with_cycle_guard(key, || resolve_all_impl(&origin, key))
    }

    fn resolve_generic(&self, key: &Key, meta: &Arc<TypeMetadata>) -> DiResult<AnyArc> {
        self.ensure_live()?;
        let origin = self.as_shared()?;
        with_cycle_guard(key, || resolve_generic_impl(&origin, key, meta))
    }

    fn contains(&self, key: &Key) -> bool {
        self.registry.contains(key)
    }

    fn contains_template(&self, definition: TypeId) -> bool {
        self.registry.has_template(definition)
    }

    fn weak_self(&self) -> Weak<dyn ResolverCore> {
        let weak: Weak<dyn ResolverCore> = self.self_weak.clone();
        weak
    }

    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        self.disposers.lock().push(hook);
    }
}

impl Drop for ProviderShared {
    fn drop(&mut self) {
        if !self.disposed.load(Ordering::Acquire) && !self.disposers.lock().is_empty() {
            tracing::warn!(
                "root provider dropped with undisposed services; call dispose() before dropping"
            );
        }
    }
}

/// The root resolver produced by [`ServiceCollection::build`].
///
/// Cheap to clone (all state lives behind an `Arc`) and fully
/// thread-safe: singleton construction is serialized per registration and
/// every concurrent caller observes the same completed instance.
///
/// [`ServiceCollection::build`]: crate::ServiceCollection::build
///
/// # Examples
///
/// ```rust
/// use crucible_di::{Lifetime, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
///
/// let mut services = ServiceCollection::new();
/// services.register_instance(Database { url: "postgres://localhost".into() });
///
/// let provider = services.build().unwrap();
/// let db = provider.get::<Database>().unwrap();
/// assert_eq!(db.url, "postgres://localhost");
/// ```
pub struct ServiceProvider {
    shared: Arc<ProviderShared>,
}

impl ServiceProvider {
    pub(crate) fn from_parts(registry: FrozenRegistry, observers: Observers) -> Self {
        let scoped = registry.scoped_count();
        Self {
            shared: Arc::new_cyclic(|weak| ProviderShared {
                cells: ScopedCells::new(scoped),
                registry,
                disposers: Mutex::new(DisposeBag::default()),
                observers,
                disposed: AtomicBool::new(false),
                self_weak: weak.clone(),
            }),
        }
    }

    /// Creates a child scope with its own scoped-instance cache.
    ///
    /// The scope holds only a non-owning reference back to this provider;
    /// dropping the provider while scopes are live makes their
    /// resolutions fail with [`DiError::Disposed`].
    pub fn create_scope(&self) -> Scope {
        scope::new_scope_plain(AnyShared::Root(self.shared.clone()))
    }

    /// Creates a child scope with additional registrations visible only
    /// to that scope and its descendants. The incremental registry is
    /// frozen and cycle-checked immediately.
    pub fn create_scope_with(
        &self,
        configure: impl FnOnce(&mut crate::ServiceCollection),
    ) -> DiResult<Scope> {
        scope::new_scope_configured(AnyShared::Root(self.shared.clone()), configure)
    }

    /// Disposes every tracked instance this provider constructed
    /// (singletons, and scoped instances it cached as the implicit root
    /// scope) in reverse construction order, then marks the provider
    /// disposed. Calling it again is a no-op.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let count = {
            let mut bag = self.shared.disposers.lock();
            let count = bag.len();
            bag.run_all_reverse();
            count
        };
        tracing::debug!(disposed = count, "root provider disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }
}

impl Clone for ServiceProvider {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.shared.resolve_any(key)
    }

    fn resolve_all(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.shared.resolve_all(key)
    }

    fn resolve_generic(&self, key: &Key, meta: &Arc<TypeMetadata>) -> DiResult<AnyArc> {
        self.shared.resolve_generic(key, meta)
    }

    fn contains(&self, key: &Key) -> bool {
        self.shared.contains(key)
    }

    fn contains_template(&self, definition: TypeId) -> bool {
        self.shared.contains_template(definition)
    }

    fn weak_self(&self) -> Weak<dyn ResolverCore> {
        self.shared.weak_self()
    }

    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        self.shared.push_disposer(hook);
    }
}
