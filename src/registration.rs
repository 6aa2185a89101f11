//! Internal registration records and the registry that stores them.
//!
//! During configuration the [`Registry`] accumulates an append-only,
//! ordered list of registrations: re-registering a key never replaces, so
//! collection resolution sees every entry while single resolution takes
//! the last one. [`Registry::freeze`] converts the list into a
//! hash-keyed, read-only [`FrozenRegistry`] and assigns scoped cache
//! slots; after that point the registry is immutable and reads are
//! lock-free.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use smallvec::SmallVec;

use crate::error::DiResult;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::metadata::TypeMetadata;
use crate::provider::ResolverContext;
use crate::traits::Dispose;

/// Type-erased shared instance as stored in caches and handed across the
/// resolution core.
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased constructor: builds one instance against the calling
/// resolver.
pub(crate) type CtorFn =
    Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// Produces a disposal hook for a freshly constructed instance, or `None`
/// when the instance does not participate in disposal.
pub(crate) type DisposeHookFn =
    Arc<dyn Fn(&AnyArc) -> Option<Box<dyn FnOnce() + Send>> + Send + Sync>;

/// Builds a [`DisposeHookFn`] for a concrete disposable type.
pub(crate) fn dispose_hook_for<T: Dispose + Send + Sync + 'static>() -> DisposeHookFn {
    Arc::new(|any| {
        let typed = any.clone().downcast::<T>().ok()?;
        Some(Box::new(move || typed.dispose()))
    })
}

/// One registration: lifetime, constructor, and the caching state the
/// lifetime needs.
///
/// The singleton cell is embedded here, so a singleton lives exactly as
/// long as the registry that owns its registration — process-wide for the
/// root, scope-long for registrations added to a scope. The cell also
/// provides the per-key mutual exclusion: concurrent first resolutions
/// block on it and a failed construction leaves it empty for the next
/// caller to retry.
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: CtorFn,
    /// Injection metadata, present for metadata-driven registrations;
    /// factory and instance registrations are opaque leaves.
    pub(crate) metadata: Option<Arc<TypeMetadata>>,
    pub(crate) impl_id: Option<TypeId>,
    pub(crate) impl_name: Option<&'static str>,
    pub(crate) dispose: Option<DisposeHookFn>,
    /// Selected constructor index, decided once against the frozen
    /// registry (or on first resolution for synthesized registrations).
    pub(crate) plan: Arc<OnceCell<usize>>,
    pub(crate) single_cell: Option<OnceCell<AnyArc>>,
    pub(crate) scoped_slot: OnceCell<usize>,
}

impl Registration {
    pub(crate) fn new(lifetime: Lifetime, ctor: CtorFn) -> Self {
        let single_cell = match lifetime {
            Lifetime::Singleton => Some(OnceCell::new()),
            _ => None,
        };
        Self {
            lifetime,
            ctor,
            metadata: None,
            impl_id: None,
            impl_name: None,
            dispose: None,
            plan: Arc::new(OnceCell::new()),
            single_cell,
            scoped_slot: OnceCell::new(),
        }
    }

    pub(crate) fn with_metadata(mut self, metadata: Arc<TypeMetadata>) -> Self {
        self.impl_id = Some(metadata.type_id());
        self.impl_name = Some(metadata.type_name());
        self.metadata = Some(metadata);
        self
    }

    pub(crate) fn with_impl<T: 'static>(mut self) -> Self {
        self.impl_id = Some(TypeId::of::<T>());
        self.impl_name = Some(std::any::type_name::<T>());
        self
    }

    pub(crate) fn with_dispose(mut self, hook: DisposeHookFn) -> Self {
        self.dispose = Some(hook);
        self
    }
}

/// Builds a registration that constructs through injection metadata. The
/// constructor-selection plan cell is shared between the registration (so
/// the analyzer can decide it at build time) and the constructor closure
/// (which decides it lazily for registrations synthesized after build).
pub(crate) fn metadata_registration(
    metadata: Arc<TypeMetadata>,
    lifetime: Lifetime,
) -> Registration {
    let plan = Arc::new(OnceCell::new());
    let mut registration = Registration::new(
        lifetime,
        crate::injector::metadata_ctor(metadata.clone(), plan.clone()),
    );
    registration.plan = plan;
    registration.with_metadata(metadata)
}

/// Open-generic template: a lifetime recorded under the generic
/// definition's marker type, closed on demand per concrete argument.
#[derive(Debug, Clone)]
pub(crate) struct OpenGenericTemplate {
    pub(crate) definition: TypeId,
    pub(crate) definition_name: &'static str,
    pub(crate) lifetime: Lifetime,
}

type RegList = SmallVec<[Arc<Registration>; 1]>;

/// Mutable, append-only registry used while the collection is being
/// configured.
#[derive(Default)]
pub(crate) struct Registry {
    entries: Vec<(Key, Registration)>,
    templates: Vec<OpenGenericTemplate>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a registration. Never replaces: the last entry for a key
    /// wins single resolution, and collection resolution sees all of them
    /// in this order.
    pub(crate) fn insert(&mut self, key: Key, registration: Registration) {
        self.entries.push((key, registration));
    }

    pub(crate) fn insert_template(&mut self, template: OpenGenericTemplate) {
        self.templates.push(template);
    }

    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &(Key, Registration)> {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Transitions to the read-only lookup form, assigning scoped cache
    /// slots in registration order.
    pub(crate) fn freeze(self) -> FrozenRegistry {
        let mut map: HashMap<Key, RegList, ahash::RandomState> =
            HashMap::with_capacity_and_hasher(self.entries.len(), ahash::RandomState::new());
        let mut order = Vec::with_capacity(self.entries.len());
        let mut scoped_count = 0usize;

        for (key, registration) in self.entries {
            if registration.lifetime == Lifetime::Scoped {
                // Freeze happens exactly once per registration; the cell
                // is necessarily empty here.
                let _ = registration.scoped_slot.set(scoped_count);
                scoped_count += 1;
            }
            let shared = Arc::new(registration);
            order.push((key.clone(), shared.clone()));
            map.entry(key).or_default().push(shared);
        }

        let mut templates: HashMap<TypeId, OpenGenericTemplate, ahash::RandomState> =
            HashMap::with_hasher(ahash::RandomState::new());
        for template in self.templates {
            // Last template registered for a definition wins, mirroring
            // single-resolution semantics.
            templates.insert(template.definition, template);
        }

        FrozenRegistry {
            map,
            order,
            templates,
            closed: DashMap::with_hasher(ahash::RandomState::new()),
            scoped_count,
        }
    }
}

/// Read-optimized registry served after build. Immutable apart from the
/// lazily-populated closed-generic cache.
pub(crate) struct FrozenRegistry {
    map: HashMap<Key, RegList, ahash::RandomState>,
    order: Vec<(Key, Arc<Registration>)>,
    templates: HashMap<TypeId, OpenGenericTemplate, ahash::RandomState>,
    /// Closed-generic registrations synthesized on first request, cached
    /// for reuse by later resolutions of the same closed type.
    closed: DashMap<TypeId, Arc<Registration>, ahash::RandomState>,
    scoped_count: usize,
}

impl FrozenRegistry {
    /// The winning registration for single resolution of `key`
    /// (last-registration-wins), including synthesized closed generics.
    #[inline(always)]
    pub(crate) fn last(&self, key: &Key) -> Option<Arc<Registration>> {
        if let Some(list) = self.map.get(key) {
            return list.last().cloned();
        }
        if let Key::Type(type_id, _) = key {
            if let Some(entry) = self.closed.get(type_id) {
                return Some(entry.value().clone());
            }
        }
        None
    }

    /// Every registration of `key` in this registry, in registration
    /// order.
    pub(crate) fn all(&self, key: &Key) -> RegList {
        let mut list: RegList = self.map.get(key).cloned().unwrap_or_default();
        if list.is_empty() {
            if let Key::Type(type_id, _) = key {
                if let Some(entry) = self.closed.get(type_id) {
                    list.push(entry.value().clone());
                }
            }
        }
        list
    }

    #[inline(always)]
    pub(crate) fn contains(&self, key: &Key) -> bool {
        if self.map.contains_key(key) {
            return true;
        }
        match key {
            Key::Type(type_id, _) => self.closed.contains_key(type_id),
            _ => false,
        }
    }

    pub(crate) fn template(&self, definition: TypeId) -> Option<&OpenGenericTemplate> {
        self.templates.get(&definition)
    }

    pub(crate) fn has_template(&self, definition: TypeId) -> bool {
        self.templates.contains_key(&definition)
    }

    /// Gets or synthesizes the cached closed-generic registration for a
    /// concrete closed type.
    pub(crate) fn closed_or_insert(
        &self,
        closed_type: TypeId,
        make: impl FnOnce() -> Registration,
    ) -> Arc<Registration> {
        self.closed
            .entry(closed_type)
            .or_insert_with(|| Arc::new(make()))
            .value()
            .clone()
    }

    /// Registration-order view for the analyzer and introspection.
    pub(crate) fn entries(&self) -> &[(Key, Arc<Registration>)] {
        &self.order
    }

    pub(crate) fn scoped_count(&self) -> usize {
        self.scoped_count
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
