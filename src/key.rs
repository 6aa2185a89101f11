//! Service keys: the identity under which registrations are stored and
//! looked up.

use std::any::TypeId;
use std::fmt;

/// Identity of a registration: the requested type plus an optional
/// disambiguating name.
///
/// Concrete types are identified by [`TypeId`] (the accompanying
/// `type_name` string is carried for diagnostics only and never takes part
/// in equality or hashing). Trait objects are identified by their
/// `type_name`, since an `Arc<dyn Trait>` is stored type-erased and the
/// trait itself is the lookup identity.
///
/// Within one registry a key maps to an *ordered list* of registrations:
/// the last one wins for single resolution, while collection resolution
/// observes all of them in registration order.
///
/// # Examples
///
/// ```rust
/// use crucible_di::{Key, key_of_type};
/// use std::any::TypeId;
///
/// let key = key_of_type::<u32>();
/// assert_eq!(key, Key::Type(TypeId::of::<u32>(), "u32"));
/// assert_eq!(key.display_name(), "u32");
/// assert_eq!(key.service_name(), None);
///
/// let named = Key::TypeNamed(TypeId::of::<u32>(), "u32", "port");
/// assert_eq!(named.service_name(), Some("port"));
/// assert_ne!(key, named);
/// ```
#[derive(Debug, Clone)]
pub enum Key {
    /// Concrete type, identified by `TypeId`; the name is diagnostic only.
    Type(TypeId, &'static str),
    /// Concrete type with a disambiguating service name.
    TypeNamed(TypeId, &'static str, &'static str),
    /// Trait object, identified by the trait's type name.
    Trait(&'static str),
    /// Trait object with a disambiguating service name.
    TraitNamed(&'static str, &'static str),
}

impl Key {
    /// The type or trait name, for diagnostics and error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) | Key::TypeNamed(_, name, _) => name,
            Key::Trait(name) | Key::TraitNamed(name, _) => name,
        }
    }

    /// The service name for keyed registrations, `None` otherwise.
    pub fn service_name(&self) -> Option<&'static str> {
        match self {
            Key::Type(..) | Key::Trait(_) => None,
            Key::TypeNamed(_, _, name) | Key::TraitNamed(_, name) => Some(name),
        }
    }

    /// The `TypeId` for concrete-type keys, `None` for trait keys.
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Key::Type(id, _) | Key::TypeNamed(id, _, _) => Some(*id),
            Key::Trait(_) | Key::TraitNamed(..) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.service_name() {
            Some(name) => write!(f, "{} (name = {:?})", self.display_name(), name),
            None => f.write_str(self.display_name()),
        }
    }
}

// TypeId-only comparison on the hot path; the diagnostic string is ignored.
impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::TypeNamed(a, _, na), Key::TypeNamed(b, _, nb)) => a == b && na == nb,
            (Key::Trait(a), Key::Trait(b)) => a == b,
            (Key::TraitNamed(a, na), Key::TraitNamed(b, nb)) => a == b && na == nb,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::TypeNamed(id, _, name) => {
                1u8.hash(state);
                id.hash(state);
                name.hash(state);
            }
            Key::Trait(name) => {
                2u8.hash(state);
                name.hash(state);
            }
            Key::TraitNamed(name, service) => {
                3u8.hash(state);
                name.hash(state);
                service.hash(state);
            }
        }
    }
}

/// Key for the concrete type `T`.
#[inline(always)]
pub fn key_of_type<T: 'static>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}

/// Key for the concrete type `T` under a service name.
#[inline(always)]
pub fn key_of_named_type<T: 'static>(name: &'static str) -> Key {
    Key::TypeNamed(TypeId::of::<T>(), std::any::type_name::<T>(), name)
}

/// Key for the trait object `T` (e.g. `dyn Logger`).
#[inline(always)]
pub fn key_of_trait<T: ?Sized + 'static>() -> Key {
    Key::Trait(std::any::type_name::<T>())
}

/// Key for the trait object `T` under a service name.
#[inline(always)]
pub fn key_of_named_trait<T: ?Sized + 'static>(name: &'static str) -> Key {
    Key::TraitNamed(std::any::type_name::<T>(), name)
}
