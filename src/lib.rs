//! # crucible-di
//!
//! Lifetime-scoped dependency injection for Rust: register services, build
//! an immutable provider, and resolve whole object graphs with
//! deterministic construction order and build-time cycle detection.
//!
//! ## Features
//!
//! - **Three lifetimes**: Singleton, Scoped and Transient, with
//!   exactly-once construction for cached lifetimes under concurrency
//! - **Metadata-driven construction**: types describe their constructors
//!   and injection points once via [`Injectable`]; the description is
//!   memoized process-wide and drives constructor selection, member
//!   injection and graph analysis
//! - **Build-time validation**: cycles and missing mandatory dependencies
//!   fail [`ServiceCollection::build`] before anything is constructed,
//!   with the full dependency path in the error
//! - **Keyed services**: register and resolve the same type under
//!   different names
//! - **Collection resolution**: every registration of a key, in
//!   registration order; single resolution takes the newest
//! - **Open generics**: register a template once, close it per concrete
//!   type argument on demand
//! - **Deferred and factory wrappers**: [`Deferred`] and [`FactoryOf`]
//!   postpone resolution past construction and break static cycles
//! - **Scopes**: isolated scoped-instance caches with parent delegation,
//!   scope-local registrations, and disposal in reverse construction order
//!
//! ## Quick start
//!
//! ```rust
//! use crucible_di::{Lifetime, Resolver, ServiceCollection};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.register_instance(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! services.register_factory(Lifetime::Transient, |ctx| UserService {
//!     db: ctx.get_required::<Database>(),
//! });
//!
//! let provider = services.build().unwrap();
//! let user_service = provider.get::<UserService>().unwrap();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Metadata-driven construction
//!
//! ```rust
//! use crucible_di::{
//!     Injectable, Lifetime, ParamSpec, Resolver, ServiceCollection, TypeMetadata,
//! };
//! use std::sync::Arc;
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Repository {
//!     config: Arc<Config>,
//! }
//!
//! impl Injectable for Repository {
//!     fn metadata() -> TypeMetadata {
//!         TypeMetadata::builder::<Repository>()
//!             .constructor(vec![ParamSpec::service::<Config>("config")], |args| {
//!                 Ok(Repository {
//!                     config: args.take::<Config>()?,
//!                 })
//!             })
//!             .build()
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.register_instance(Config { url: "file:///tmp".into() });
//! services.register::<Repository>(Lifetime::Singleton);
//!
//! let provider = services.build().unwrap();
//! let repo = provider.get::<Repository>().unwrap();
//! assert_eq!(repo.config.url, "file:///tmp");
//! ```
//!
//! ## Scoped services
//!
//! ```rust
//! use crucible_di::{Lifetime, Resolver, ServiceCollection};
//! use std::sync::{Arc, Mutex};
//!
//! struct RequestId(String);
//!
//! let counter = Arc::new(Mutex::new(0u32));
//! let seq = counter.clone();
//!
//! let mut services = ServiceCollection::new();
//! services.register_factory(Lifetime::Scoped, move |_| {
//!     let mut n = seq.lock().unwrap();
//!     *n += 1;
//!     RequestId(format!("req-{}", *n))
//! });
//!
//! let provider = services.build().unwrap();
//! let scope1 = provider.create_scope();
//! let scope2 = provider.create_scope();
//!
//! let a = scope1.get::<RequestId>().unwrap();
//! let b = scope1.get::<RequestId>().unwrap();
//! let c = scope2.get::<RequestId>().unwrap();
//! assert!(Arc::ptr_eq(&a, &b)); // cached within the scope
//! assert_ne!(a.0, c.0); // isolated between scopes
//! ```

pub mod arguments;
pub mod collection;
pub mod deferred;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod metadata;
pub mod observer;
pub mod provider;
pub mod traits;

mod analysis;
mod injector;
mod internal;
mod registration;

pub use arguments::{Argument, Arguments};
pub use collection::{ServiceCollection, ServiceModule};
pub use deferred::{Deferred, FactoryOf};
pub use descriptors::ServiceDescriptor;
pub use error::{DiError, DiResult};
pub use internal::CircularPanic;
pub use key::{key_of_named_trait, key_of_named_type, key_of_trait, key_of_type, Key};
pub use lifetime::Lifetime;
pub use metadata::{
    ArgBundle, ConstructorSpec, DependencyKind, Injectable, MemberSpec, MetadataCache, MethodSpec,
    ParamSpec, TypeMetadata, TypeMetadataBuilder,
};
pub use observer::{ResolutionObserver, TracingObserver};
pub use provider::{ResolverContext, Scope, ServiceProvider};
pub use traits::{Dispose, Resolver, ResolverCore};
