//! Build-time dependency analysis.
//!
//! Before a provider (or a configured scope) starts serving resolutions,
//! the analyzer walks the static graph implied by every metadata-backed
//! registration: nodes are service keys, edges are constructor and member
//! dependencies. Depth-first traversal with gray/black coloring and a path
//! stack proves the graph acyclic and every mandatory dependency
//! registered; any violation fails the build and no partial container is
//! produced. Deferred- and factory-style dependencies are excluded from
//! the graph — resolving them happens after construction, so they break
//! cycles by design. The graph is implicit in the registrations and
//! discarded once validation finishes.

use std::any::TypeId;
use std::collections::HashMap;

use smallvec::SmallVec;

use crate::arguments::Arguments;
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::metadata::{select_constructor, DependencyKind, KeyQuery};
use crate::registration::{FrozenRegistry, Registration};
use std::sync::Arc;

/// Registry view the analyzer traverses: the registrations being
/// validated plus everything visible through the parent chain.
pub(crate) trait GraphView: KeyQuery {
    fn lookup(&self, key: &Key) -> SmallVec<[Arc<Registration>; 1]>;

    /// The same view as a plain satisfiability query.
    fn as_query(&self) -> &dyn KeyQuery;
}

/// View over a single frozen registry (root build).
pub(crate) struct RootView<'a> {
    pub(crate) registry: &'a FrozenRegistry,
}

impl KeyQuery for RootView<'_> {
    fn contains_key(&self, key: &Key) -> bool {
        self.registry.contains(key)
    }

    fn contains_template(&self, definition: TypeId) -> bool {
        self.registry.has_template(definition)
    }
}

impl GraphView for RootView<'_> {
    fn lookup(&self, key: &Key) -> SmallVec<[Arc<Registration>; 1]> {
        self.registry.all(key)
    }

    fn as_query(&self) -> &dyn KeyQuery {
        self
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    Gray,
    Black,
}

/// Validates the given registrations against the view. Side effects on
/// success: each metadata-backed registration has its constructor plan
/// decided and memoized.
pub(crate) fn validate(
    entries: &[(Key, Arc<Registration>)],
    view: &dyn GraphView,
) -> DiResult<()> {
    let mut colors: HashMap<Key, Color, ahash::RandomState> =
        HashMap::with_hasher(ahash::RandomState::new());
    let mut path: Vec<Key> = Vec::new();

    for (key, _) in entries {
        if !colors.contains_key(key) {
            visit(key, view, &mut colors, &mut path)?;
        }
    }
    Ok(())
}

fn visit(
    key: &Key,
    view: &dyn GraphView,
    colors: &mut HashMap<Key, Color, ahash::RandomState>,
    path: &mut Vec<Key>,
) -> DiResult<()> {
    match colors.get(key) {
        Some(Color::Black) => return Ok(()),
        Some(Color::Gray) => {
            let start = path.iter().position(|k| k == key).unwrap_or(0);
            let mut cycle: Vec<Key> = path[start..].to_vec();
            cycle.push(key.clone());
            return Err(DiError::CircularDependency { path: cycle });
        }
        None => {}
    }

    colors.insert(key.clone(), Color::Gray);
    path.push(key.clone());

    let no_args = Arguments::new();
    for registration in view.lookup(key) {
        let Some(meta) = &registration.metadata else {
            // Factory and instance registrations are opaque leaves; the
            // runtime resolution-stack guard still covers them.
            continue;
        };

        let plan = *registration
            .plan
            .get_or_try_init(|| select_constructor(meta, view.as_query(), &no_args))?;

        for param in meta.hard_edges(plan) {
            if param.kind() == DependencyKind::Service
                && !param.satisfiable(view.as_query(), &no_args)
            {
                // Mandatory member dependency with no registration, no
                // default and no template: fail the build with the
                // offending key.
                return Err(DiError::NotRegistered(param.key().clone()));
            }
            if view.contains_key(param.key()) {
                if registration.lifetime == Lifetime::Singleton
                    && view
                        .lookup(param.key())
                        .iter()
                        .any(|dep| dep.lifetime == Lifetime::Scoped)
                {
                    tracing::warn!(
                        singleton = %key,
                        scoped = %param.key(),
                        "singleton captures a scoped dependency; the first scope to trigger construction pins it"
                    );
                }
                visit(param.key(), view, colors, path)?;
            }
        }
    }

    path.pop();
    colors.insert(key.clone(), Color::Black);
    Ok(())
}
