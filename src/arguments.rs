//! Caller-supplied parameter overrides.
//!
//! An [`Arguments`] bundle carries explicit values (or factories) that take
//! precedence over container resolution when the injector fills in
//! constructor parameters and injection members. Matching is by parameter
//! name first, then by type.

use std::any::TypeId;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::registration::AnyArc;

/// One override: a value or factory, optionally bound to a parameter name.
///
/// # Examples
///
/// ```rust
/// use crucible_di::{Argument, Arguments};
///
/// let args = Arguments::new()
///     .with(Argument::named("connection", String::from("postgres://db")))
///     .with(Argument::value(42u32));
/// assert!(!args.is_empty());
/// ```
pub struct Argument {
    name: Option<&'static str>,
    type_id: TypeId,
    type_name: &'static str,
    supply: Arc<dyn Fn() -> AnyArc + Send + Sync>,
}

impl Argument {
    /// An unnamed override matched by parameter type.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        let stored: AnyArc = Arc::new(value);
        Self {
            name: None,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            supply: Arc::new(move || stored.clone()),
        }
    }

    /// An override matched by parameter name (and, when known, type).
    pub fn named<T: Send + Sync + 'static>(name: &'static str, value: T) -> Self {
        let mut arg = Self::value(value);
        arg.name = Some(name);
        arg
    }

    /// An unnamed override whose value is produced fresh on every match.
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            name: None,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            supply: Arc::new(move || Arc::new(factory())),
        }
    }

    /// A named override whose value is produced fresh on every match.
    pub fn named_factory<T, F>(name: &'static str, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let mut arg = Self::factory(factory);
        arg.name = Some(name);
        arg
    }

    /// The override's value type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argument")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .finish()
    }
}

/// Ordered bundle of [`Argument`] overrides.
///
/// Precedence when the injector fills a parameter: the first argument whose
/// name matches the parameter name (with a compatible type, when the
/// parameter's type is known), then the first unnamed argument whose type
/// matches, then container resolution, then the parameter's declared
/// default.
#[derive(Default, Debug)]
pub struct Arguments {
    items: SmallVec<[Argument; 4]>,
}

impl Arguments {
    /// An empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an override, preserving order.
    pub fn with(mut self, argument: Argument) -> Self {
        self.items.push(argument);
        self
    }

    /// Appends an override in place.
    pub fn push(&mut self, argument: Argument) {
        self.items.push(argument);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Finds the override for a parameter. `value_type` is `None` when the
    /// parameter's stored representation is not a plain `Arc<T>` (deferred
    /// and collection parameters), in which case only name matches apply.
    pub(crate) fn find(&self, name: &str, value_type: Option<TypeId>) -> Option<AnyArc> {
        let by_name = self.items.iter().find(|a| {
            a.name == Some(name) && value_type.map_or(true, |t| a.type_id == t)
        });
        if let Some(arg) = by_name {
            return Some((arg.supply)());
        }
        let wanted = value_type?;
        self.items
            .iter()
            .find(|a| a.name.is_none() && a.type_id == wanted)
            .map(|a| (a.supply)())
    }

    /// True if any override could satisfy a parameter of this name/type.
    pub(crate) fn satisfies(&self, name: &str, value_type: Option<TypeId>) -> bool {
        self.items.iter().any(|a| {
            (a.name == Some(name) && value_type.map_or(true, |t| a.type_id == t))
                || (a.name.is_none() && value_type == Some(a.type_id))
        })
    }
}
