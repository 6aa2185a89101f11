//! Resolver context handed to factory closures and metadata constructors.

use std::any::{Any, TypeId};
use std::sync::{Arc, Weak};

use crate::error::DiResult;
use crate::key::Key;
use crate::metadata::{KeyQuery, TypeMetadata};
use crate::traits::ResolverCore;

/// The resolver a factory or constructor runs against.
///
/// Wraps whichever resolver initiated the resolution (root provider or a
/// scope), so nested dependencies resolve through the caller's scope and
/// scoped lifetimes land in the right cache. Implements [`ResolverCore`],
/// which makes the whole typed [`Resolver`] surface available inside
/// factories.
///
/// [`Resolver`]: crate::Resolver
///
/// # Examples
///
/// ```rust
/// use crucible_di::{Lifetime, Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct Repo { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.register_instance(Database { url: "postgres://localhost".into() });
/// services.register_factory(Lifetime::Transient, |ctx| Repo {
///     db: ctx.get_required::<Database>(),
/// });
///
/// let provider = services.build().unwrap();
/// let repo = provider.get::<Repo>().unwrap();
/// assert_eq!(repo.db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    core: &'a dyn ResolverCore,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(core: &'a dyn ResolverCore) -> Self {
        Self { core }
    }
}

impl ResolverCore for ResolverContext<'_> {
    fn resolve_any(&self, key: &Key) -> DiResult<Arc<dyn Any + Send + Sync>> {
        self.core.resolve_any(key)
    }

    fn resolve_all(&self, key: &Key) -> DiResult<Vec<Arc<dyn Any + Send + Sync>>> {
        self.core.resolve_all(key)
    }

    fn resolve_generic(
        &self,
        key: &Key,
        meta: &Arc<TypeMetadata>,
    ) -> DiResult<Arc<dyn Any + Send + Sync>> {
        self.core.resolve_generic(key, meta)
    }

    fn contains(&self, key: &Key) -> bool {
        self.core.contains(key)
    }

    fn contains_template(&self, definition: TypeId) -> bool {
        self.core.contains_template(definition)
    }

    fn weak_self(&self) -> Weak<dyn ResolverCore> {
        self.core.weak_self()
    }

    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        self.core.push_disposer(hook);
    }
}

impl KeyQuery for ResolverContext<'_> {
    fn contains_key(&self, key: &Key) -> bool {
        self.core.contains(key)
    }

    fn contains_template(&self, definition: TypeId) -> bool {
        self.core.contains_template(definition)
    }
}
