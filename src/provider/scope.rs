//! Scopes: child resolvers with isolated scoped-instance caches.

use std::any::TypeId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::analysis::{self, GraphView};
use crate::error::{DiError, DiResult};
use crate::internal::{with_cycle_guard, DisposeBag};
use crate::key::Key;
use crate::metadata::{KeyQuery, TypeMetadata};
use crate::observer::Observers;
use crate::registration::{AnyArc, FrozenRegistry, Registration, Registry};
use crate::traits::ResolverCore;
use crate::ServiceCollection;

use super::{
    resolve_all_impl, resolve_generic_impl, resolve_single, AnyShared, ProviderShared, ScopedCells,
};

/// Non-owning link to the parent resolver. Upgrading fails with
/// [`DiError::Disposed`] once the parent has been dropped.
pub(crate) enum ParentLink {
    Root(Weak<ProviderShared>),
    Scope(Weak<ScopeShared>),
}

impl ParentLink {
    fn of(parent: &AnyShared) -> Self {
        match parent {
            AnyShared::Root(root) => ParentLink::Root(Arc::downgrade(root)),
            AnyShared::Scope(scope) => ParentLink::Scope(Arc::downgrade(scope)),
        }
    }

    pub(crate) fn upgrade(&self) -> DiResult<AnyShared> {
        match self {
            ParentLink::Root(weak) => weak
                .upgrade()
                .map(AnyShared::Root)
                .ok_or(DiError::Disposed),
            ParentLink::Scope(weak) => weak
                .upgrade()
                .map(AnyShared::Scope)
                .ok_or(DiError::Disposed),
        }
    }
}

pub(crate) struct ScopeShared {
    /// Incremental registrations visible only to this scope and its
    /// descendants. Frozen at scope creation.
    pub(crate) registry: FrozenRegistry,
    pub(crate) parent: ParentLink,
    pub(crate) root: Weak<ProviderShared>,
    /// Cache for root-registered scoped services resolved through this
    /// scope, indexed by the root registry's slot numbering.
    pub(crate) cells: ScopedCells,
    /// Cache for this scope's own scoped registrations.
    pub(crate) own_cells: ScopedCells,
    pub(crate) disposers: Mutex<DisposeBag>,
    pub(crate) observers: Observers,
    pub(crate) disposed: AtomicBool,
    pub(crate) self_weak: Weak<ScopeShared>,
}

impl ScopeShared {
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
            .map(AnyShared::Scope)
            .ok_or(DiError::Disposed)
    }
}

impl ResolverCore for ScopeShared {
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
        if self.registry.contains(key) {
            return true;
        }
        match self.parent.upgrade() {
            Ok(parent) => parent.core().contains(key),
            Err(_) => false,
        }
    }

    fn contains_template(&self, definition: TypeId) -> bool {
        if self.registry.has_template(definition) {
            return true;
        }
        match self.parent.upgrade() {
            Ok(parent) => parent.core().contains_template(definition),
            Err(_) => false,
        }
    }

    fn weak_self(&self) -> Weak<dyn ResolverCore> {
        let weak: Weak<dyn ResolverCore> = self.self_weak.clone();
        weak
    }

    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        self.disposers.lock().push(hook);
    }
}

impl Drop for ScopeShared {
    fn drop(&mut self) {
        if !self.disposed.load(Ordering::Acquire) && !self.disposers.lock().is_empty() {
            tracing::warn!("scope dropped with undisposed services; call dispose() before dropping");
        }
    }
}

/// Child resolver with its own scoped-instance cache.
///
/// Unresolved lookups delegate up the parent chain; scoped services
/// registered at the root are cached per scope, so sibling scopes never
/// share an instance. Disposing the scope releases the disposable
/// instances it constructed, in reverse construction order.
///
/// The parent link is non-owning: a scope does not keep its parent (or
/// the root provider) alive, and resolving through a dropped parent
/// fails with [`DiError::Disposed`].
///
/// # Examples
///
/// ```rust
/// use crucible_di::{Lifetime, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// let mut services = ServiceCollection::new();
/// services.register_factory(Lifetime::Scoped, |_| String::from("per-scope"));
///
/// let provider = services.build().unwrap();
/// let scope_a = provider.create_scope();
/// let scope_b = provider.create_scope();
///
/// let a1 = scope_a.get::<String>().unwrap();
/// let a2 = scope_a.get::<String>().unwrap();
/// let b = scope_b.get::<String>().unwrap();
///
/// assert!(Arc::ptr_eq(&a1, &a2)); // same scope, same instance
/// assert!(!Arc::ptr_eq(&a1, &b)); // different scopes are isolated
/// ```
pub struct Scope {
    shared: Arc<ScopeShared>,
}

impl Scope {
    /// Creates a nested child scope.
    pub fn create_scope(&self) -> Scope {
        new_scope_plain(AnyShared::Scope(self.shared.clone()))
    }

    /// Creates a nested child scope with additional registrations visible
    /// only to it and its descendants.
    pub fn create_scope_with(
        &self,
        configure: impl FnOnce(&mut ServiceCollection),
    ) -> DiResult<Scope> {
        new_scope_configured(AnyShared::Scope(self.shared.clone()), configure)
    }

    /// Disposes the disposable instances this scope constructed, in
    /// reverse construction order, then marks the scope disposed. Further
    /// resolutions fail with [`DiError::Disposed`]; calling `dispose`
    /// again is a no-op.
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
        tracing::debug!(disposed = count, "scope disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }
}

impl Clone for Scope {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl ResolverCore for Scope {
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

/// Graph view over a scope's incremental registry plus its parent chain,
/// used to cycle-check scope-added registrations at creation time.
struct ChainView<'a> {
    local: &'a FrozenRegistry,
    parent: &'a AnyShared,
}

impl KeyQuery for ChainView<'_> {
    fn contains_key(&self, key: &Key) -> bool {
        self.local.contains(key) || self.parent.core().contains(key)
    }

    fn contains_template(&self, definition: TypeId) -> bool {
        self.local.has_template(definition) || self.parent.core().contains_template(definition)
    }
}

impl GraphView for ChainView<'_> {
    fn lookup(&self, key: &Key) -> SmallVec<[Arc<Registration>; 1]> {
        let mut list = self.local.all(key);
        let mut current = Some(self.parent.clone());
        while let Some(container) = current {
            list.extend(container.registry().all(key));
            current = container.parent().ok().flatten();
        }
        list
    }

    fn as_query(&self) -> &dyn KeyQuery {
        self
    }
}

pub(crate) fn new_scope_plain(parent: AnyShared) -> Scope {
    build_scope(parent, Registry::new().freeze(), Observers::default())
}

pub(crate) fn new_scope_configured(
    parent: AnyShared,
    configure: impl FnOnce(&mut ServiceCollection),
) -> DiResult<Scope> {
    let mut collection = ServiceCollection::new();
    configure(&mut collection);
    let (registry, extra_observers) = collection.into_parts();
    let frozen = registry.freeze();
    analysis::validate(
        frozen.entries(),
        &ChainView {
            local: &frozen,
            parent: &parent,
        },
    )?;
    Ok(build_scope(parent, frozen, extra_observers))
}

fn build_scope(parent: AnyShared, registry: FrozenRegistry, extra_observers: Observers) -> Scope {
    let root = match &parent {
        AnyShared::Root(provider) => Arc::downgrade(provider),
        AnyShared::Scope(scope) => scope.root.clone(),
    };
    let root_scoped = root
        .upgrade()
        .map(|provider| provider.registry.scoped_count())
        .unwrap_or(0);
    let mut observers = parent.observers().clone();
    observers.merge(extra_observers);

    let shared = Arc::new_cyclic(|weak| ScopeShared {
        cells: ScopedCells::new(root_scoped),
        own_cells: ScopedCells::new(registry.scoped_count()),
        registry,
        parent: ParentLink::of(&parent),
        root,
        disposers: Mutex::new(DisposeBag::default()),
        observers,
        disposed: AtomicBool::new(false),
        self_weak: weak.clone(),
    });
    Scope { shared }
}
