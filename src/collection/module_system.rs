//! Grouped registration modules.

use crate::ServiceCollection;

/// A reusable bundle of registrations.
///
/// Modules let a subsystem own its wiring: implement `register` once and
/// apply it with [`ServiceCollection::add_module`] wherever the subsystem
/// is composed in.
///
/// # Examples
///
/// ```rust
/// use crucible_di::{Lifetime, Resolver, ServiceCollection, ServiceModule};
///
/// struct Metrics { prefix: String }
///
/// struct TelemetryModule {
///     prefix: &'static str,
/// }
///
/// impl ServiceModule for TelemetryModule {
///     fn register(&self, services: &mut ServiceCollection) {
///         let prefix = self.prefix;
///         services.register_factory(Lifetime::Singleton, move |_| Metrics {
///             prefix: prefix.to_string(),
///         });
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_module(TelemetryModule { prefix: "app" });
///
/// let provider = services.build().unwrap();
/// assert_eq!(provider.get::<Metrics>().unwrap().prefix, "app");
/// ```
pub trait ServiceModule {
    /// Adds this module's registrations to the collection.
    fn register(&self, services: &mut ServiceCollection);
}
