//! Registration descriptors for introspection and diagnostics.

use std::any::TypeId;

use crate::key::Key;
use crate::lifetime::Lifetime;

/// Snapshot of one registration, as returned by
/// [`ServiceCollection::descriptors`].
///
/// Useful for startup health checks and for verifying container wiring in
/// tests without resolving anything.
///
/// [`ServiceCollection::descriptors`]: crate::ServiceCollection::descriptors
///
/// # Examples
///
/// ```rust
/// use crucible_di::{Lifetime, ServiceCollection};
///
/// let mut services = ServiceCollection::new();
/// services.register_instance(42u32);
/// services.register_named_instance("port", 8080u16);
///
/// let descriptors = services.descriptors();
/// assert_eq!(descriptors.len(), 2);
///
/// let named = descriptors.iter().find(|d| d.is_named()).unwrap();
/// assert_eq!(named.service_name(), Some("port"));
/// assert_eq!(named.lifetime, Lifetime::Singleton);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// The key the registration is stored under.
    pub key: Key,
    /// Reuse policy of the registration.
    pub lifetime: Lifetime,
    /// Concrete implementation type, when known (trait instances and
    /// trait factories erase it).
    pub impl_id: Option<TypeId>,
    /// Implementation type name, when known.
    pub impl_name: Option<&'static str>,
    /// Whether the registration constructs through injection metadata.
    pub has_metadata: bool,
}

impl ServiceDescriptor {
    /// The service name for keyed registrations, `None` otherwise.
    pub fn service_name(&self) -> Option<&'static str> {
        self.key.service_name()
    }

    /// The registered type or trait name.
    pub fn type_name(&self) -> &'static str {
        self.key.display_name()
    }

    /// Whether this is a keyed registration.
    pub fn is_named(&self) -> bool {
        self.service_name().is_some()
    }
}
