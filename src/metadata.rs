//! Injection metadata: the reflection-equivalent description of how a type
//! is constructed and which members receive injected values.
//!
//! A [`TypeMetadata`] is produced once per type by its [`Injectable`]
//! implementation and memoized process-wide in the [`MetadataCache`]. It
//! lists candidate constructors (each an ordered parameter list plus an
//! invoke closure), field/property injection points, and method injection
//! points ordered by an explicit priority. The injector consumes this data
//! to materialize instances; the dependency analyzer consumes it to prove
//! the registered graph acyclic before anything is constructed.

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};

use crate::arguments::Arguments;
use crate::deferred::{Deferred, FactoryOf};
use crate::error::{DiError, DiResult};
use crate::key::{key_of_named_trait, key_of_named_type, key_of_trait, key_of_type, Key};
use crate::provider::ResolverContext;
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

/// How a declared dependency participates in resolution and analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// Hard dependency, resolved during construction; a graph edge.
    Service,
    /// Aggregation of every registration of the element key; a graph edge
    /// to the element key, but always satisfiable (empty is fine).
    Collection,
    /// [`Deferred`] wrapper, resolved after construction; not a graph edge.
    Deferred,
    /// [`FactoryOf`] wrapper, resolved per call; not a graph edge.
    Factory,
}

type ProduceFn = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;
type DefaultFn = Arc<dyn Fn() -> AnyArc + Send + Sync>;

/// One constructor parameter or method parameter: the dependency's key,
/// how it is obtained, and whether a declared default can stand in for it.
pub struct ParamSpec {
    name: &'static str,
    key: Key,
    kind: DependencyKind,
    value_type: Option<TypeId>,
    closes: Option<TypeId>,
    has_default: bool,
    produce: ProduceFn,
    default: Option<DefaultFn>,
}

impl ParamSpec {
    /// Dependency on the concrete service `D`.
    pub fn service<D: Send + Sync + 'static>(name: &'static str) -> Self {
        let key = key_of_type::<D>();
        Self::plain_service(name, key, TypeId::of::<D>())
    }

    /// Dependency on the concrete service `D` registered under a name.
    pub fn service_named<D: Send + Sync + 'static>(
        name: &'static str,
        service_name: &'static str,
    ) -> Self {
        let key = key_of_named_type::<D>(service_name);
        Self::plain_service(name, key, TypeId::of::<D>())
    }

    /// Dependency on `D` that falls back to `default` when `D` is not
    /// registered and no override matches.
    pub fn service_or<D, F>(name: &'static str, default: F) -> Self
    where
        D: Send + Sync + 'static,
        F: Fn() -> D + Send + Sync + 'static,
    {
        let mut spec = Self::service::<D>(name);
        spec.has_default = true;
        spec.default = Some(Arc::new(move || Arc::new(default()) as AnyArc));
        spec
    }

    /// Dependency on the trait object `D` (e.g. `dyn Logger`).
    pub fn trait_service<D: ?Sized + Send + Sync + 'static>(name: &'static str) -> Self {
        let key = key_of_trait::<D>();
        Self::plain_service(name, key, TypeId::of::<Arc<D>>())
    }

    /// Dependency on the trait object `D` registered under a name.
    pub fn trait_service_named<D: ?Sized + Send + Sync + 'static>(
        name: &'static str,
        service_name: &'static str,
    ) -> Self {
        let key = key_of_named_trait::<D>(service_name);
        Self::plain_service(name, key, TypeId::of::<Arc<D>>())
    }

    fn plain_service(name: &'static str, key: Key, value_type: TypeId) -> Self {
        let lookup = key.clone();
        Self {
            name,
            key,
            kind: DependencyKind::Service,
            value_type: Some(value_type),
            closes: None,
            has_default: false,
            produce: Arc::new(move |ctx| ctx.resolve_any(&lookup)),
            default: None,
        }
    }

    /// Dependency on every registration of the concrete element `D`, in
    /// registration order. Zero registrations yield an empty `Vec`.
    pub fn collection<D: Send + Sync + 'static>(name: &'static str) -> Self {
        let key = key_of_type::<D>();
        let lookup = key.clone();
        Self {
            name,
            key,
            kind: DependencyKind::Collection,
            value_type: Some(TypeId::of::<Vec<Arc<D>>>()),
            closes: None,
            has_default: false,
            produce: Arc::new(move |ctx| {
                let items = ctx.resolve_all(&lookup)?;
                let mut out: Vec<Arc<D>> = Vec::with_capacity(items.len());
                for any in items {
                    out.push(
                        any.downcast::<D>()
                            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<D>()))?,
                    );
                }
                Ok(Arc::new(out) as AnyArc)
            }),
            default: None,
        }
    }

    /// Dependency on every registration of the trait element `D`, in
    /// registration order.
    pub fn trait_collection<D: ?Sized + Send + Sync + 'static>(name: &'static str) -> Self {
        let key = key_of_trait::<D>();
        let lookup = key.clone();
        Self {
            name,
            key,
            kind: DependencyKind::Collection,
            value_type: Some(TypeId::of::<Vec<Arc<D>>>()),
            closes: None,
            has_default: false,
            produce: Arc::new(move |ctx| {
                let items = ctx.resolve_all(&lookup)?;
                let mut out: Vec<Arc<D>> = Vec::with_capacity(items.len());
                for any in items {
                    let inner = any
                        .downcast::<Arc<D>>()
                        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<D>()))?;
                    out.push((*inner).clone());
                }
                Ok(Arc::new(out) as AnyArc)
            }),
            default: None,
        }
    }

    /// Deferred dependency on `D`: construction receives a [`Deferred`]
    /// handle and the actual resolution happens after construction. Breaks
    /// static cycles by design.
    pub fn deferred<D: Send + Sync + 'static>(name: &'static str) -> Self {
        Self {
            name,
            key: key_of_type::<D>(),
            kind: DependencyKind::Deferred,
            value_type: Some(TypeId::of::<Deferred<D>>()),
            closes: None,
            has_default: false,
            produce: Arc::new(move |ctx| {
                Ok(Arc::new(Deferred::<D>::new(ctx.weak_self())) as AnyArc)
            }),
            default: None,
        }
    }

    /// Factory-style dependency on `D`: construction receives a
    /// [`FactoryOf`] handle that resolves `D` fresh on each call.
    pub fn factory_of<D: Send + Sync + 'static>(name: &'static str) -> Self {
        Self {
            name,
            key: key_of_type::<D>(),
            kind: DependencyKind::Factory,
            value_type: Some(TypeId::of::<FactoryOf<D>>()),
            closes: None,
            has_default: false,
            produce: Arc::new(move |ctx| {
                Ok(Arc::new(FactoryOf::<D>::new(ctx.weak_self())) as AnyArc)
            }),
            default: None,
        }
    }

    /// Dependency on a closed generic `D` that may be satisfied by an open
    /// generic template when `D` itself is not registered.
    pub fn generic<D: Injectable + Send + Sync + 'static>(name: &'static str) -> Self {
        let key = key_of_type::<D>();
        let lookup = key.clone();
        let meta = MetadataCache::get_or_build::<D>();
        let closes = meta.open_definition().map(|(id, _)| id);
        Self {
            name,
            key,
            kind: DependencyKind::Service,
            value_type: Some(TypeId::of::<D>()),
            closes,
            has_default: false,
            produce: Arc::new(move |ctx| match ctx.resolve_any(&lookup) {
                Err(DiError::NotRegistered(_)) => ctx.resolve_generic(&lookup, &meta),
                other => other,
            }),
            default: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    pub(crate) fn value_type(&self) -> Option<TypeId> {
        self.value_type
    }

    pub(crate) fn produce(&self, ctx: &ResolverContext<'_>) -> DiResult<AnyArc> {
        (self.produce)(ctx)
    }

    pub(crate) fn default_value(&self) -> Option<AnyArc> {
        self.default.as_ref().map(|f| f())
    }

    /// Whether this parameter can be filled from the given registry view,
    /// the supplied overrides, or its own default.
    pub(crate) fn satisfiable(&self, query: &dyn KeyQuery, args: &Arguments) -> bool {
        match self.kind {
            DependencyKind::Deferred | DependencyKind::Factory | DependencyKind::Collection => true,
            DependencyKind::Service => {
                args.satisfies(self.name, self.value_type)
                    || query.contains_key(&self.key)
                    || self
                        .closes
                        .map_or(false, |def| query.contains_template(def))
                    || self.has_default
            }
        }
    }
}

impl std::fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Resolved argument values handed to constructor and method closures, in
/// declared parameter order.
pub struct ArgBundle {
    values: VecDeque<AnyArc>,
}

impl ArgBundle {
    pub(crate) fn new(values: Vec<AnyArc>) -> Self {
        Self {
            values: values.into(),
        }
    }

    fn next_any(&mut self) -> DiResult<AnyArc> {
        self.values.pop_front().ok_or_else(|| {
            DiError::Configuration(
                "constructor consumed more arguments than its parameter list declares".into(),
            )
        })
    }

    /// Takes the next argument as `Arc<D>` (concrete services).
    pub fn take<D: Send + Sync + 'static>(&mut self) -> DiResult<Arc<D>> {
        self.next_any()?
            .downcast::<D>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<D>()))
    }

    /// Takes the next argument and clones the value out of its `Arc`.
    pub fn take_value<D: Clone + Send + Sync + 'static>(&mut self) -> DiResult<D> {
        Ok((*self.take::<D>()?).clone())
    }

    /// Takes the next argument as a trait object `Arc<D>`.
    pub fn take_trait<D: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Arc<D>> {
        let inner = self
            .next_any()?
            .downcast::<Arc<D>>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<D>()))?;
        Ok((*inner).clone())
    }

    /// Takes the next argument as a [`Deferred`] handle.
    pub fn take_deferred<D: Send + Sync + 'static>(&mut self) -> DiResult<Deferred<D>> {
        let inner = self
            .next_any()?
            .downcast::<Deferred<D>>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<D>()))?;
        Ok((*inner).clone())
    }

    /// Takes the next argument as a [`FactoryOf`] handle.
    pub fn take_factory<D: Send + Sync + 'static>(&mut self) -> DiResult<FactoryOf<D>> {
        let inner = self
            .next_any()?
            .downcast::<FactoryOf<D>>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<D>()))?;
        Ok((*inner).clone())
    }

    /// Takes the next argument as an aggregated collection. Works for both
    /// concrete elements (`Vec<Arc<Service>>`) and trait elements
    /// (`Vec<Arc<dyn Service>>`).
    pub fn take_all<D: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Vec<Arc<D>>> {
        let inner = self
            .next_any()?
            .downcast::<Vec<Arc<D>>>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<D>()))?;
        Ok((*inner).clone())
    }
}

type CtorInvoke = Arc<dyn Fn(&mut ArgBundle) -> DiResult<Box<dyn Any + Send + Sync>> + Send + Sync>;
type MemberApply = Arc<dyn Fn(&mut dyn Any, AnyArc) -> DiResult<()> + Send + Sync>;
type MethodInvoke = Arc<dyn Fn(&mut dyn Any, &mut ArgBundle) -> DiResult<()> + Send + Sync>;

/// One candidate constructor: its ordered parameters and the closure that
/// builds the instance from the resolved arguments.
pub struct ConstructorSpec {
    params: Vec<ParamSpec>,
    invoke: CtorInvoke,
}

impl ConstructorSpec {
    pub fn new<T, F>(params: Vec<ParamSpec>, make: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut ArgBundle) -> DiResult<T> + Send + Sync + 'static,
    {
        Self {
            params,
            invoke: Arc::new(move |args| Ok(Box::new(make(args)?) as Box<dyn Any + Send + Sync>)),
        }
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub(crate) fn invoke(&self, args: &mut ArgBundle) -> DiResult<Box<dyn Any + Send + Sync>> {
        (self.invoke)(args)
    }
}

/// A field or property injection point.
pub struct MemberSpec {
    name: &'static str,
    param: ParamSpec,
    apply: MemberApply,
}

impl MemberSpec {
    pub fn new<T, F>(name: &'static str, param: ParamSpec, set: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut T, &mut ArgBundle) -> DiResult<()> + Send + Sync + 'static,
    {
        Self {
            name,
            param,
            apply: Arc::new(move |target, value| {
                let target = target
                    .downcast_mut::<T>()
                    .ok_or_else(|| DiError::TypeMismatch(std::any::type_name::<T>()))?;
                let mut bundle = ArgBundle::new(vec![value]);
                set(target, &mut bundle)
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn param(&self) -> &ParamSpec {
        &self.param
    }

    pub(crate) fn apply(&self, target: &mut dyn Any, value: AnyArc) -> DiResult<()> {
        (self.apply)(target, value)
    }
}

/// A method injection point with an explicit ordering priority.
pub struct MethodSpec {
    name: &'static str,
    order: i32,
    params: Vec<ParamSpec>,
    invoke: MethodInvoke,
}

impl MethodSpec {
    pub fn new<T, F>(name: &'static str, order: i32, params: Vec<ParamSpec>, call: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut T, &mut ArgBundle) -> DiResult<()> + Send + Sync + 'static,
    {
        Self {
            name,
            order,
            params,
            invoke: Arc::new(move |target, args| {
                let target = target
                    .downcast_mut::<T>()
                    .ok_or_else(|| DiError::TypeMismatch(std::any::type_name::<T>()))?;
                call(target, args)
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub(crate) fn invoke(&self, target: &mut dyn Any, args: &mut ArgBundle) -> DiResult<()> {
        (self.invoke)(target, args)
    }
}

/// The memoized injection description of one concrete type.
///
/// Constructors are kept in declaration order; the injector selects among
/// them per the satisfiability rules. Methods are sorted ascending by
/// their order value (stable, so declaration order breaks ties) when the
/// builder finishes.
pub struct TypeMetadata {
    type_id: TypeId,
    type_name: &'static str,
    constructors: Vec<ConstructorSpec>,
    fields: Vec<MemberSpec>,
    properties: Vec<MemberSpec>,
    methods: Vec<MethodSpec>,
    open_definition: Option<(TypeId, &'static str)>,
}

impl TypeMetadata {
    /// Starts building metadata for `T`.
    pub fn builder<T: Send + Sync + 'static>() -> TypeMetadataBuilder<T> {
        TypeMetadataBuilder {
            constructors: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            open_definition: None,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn constructors(&self) -> &[ConstructorSpec] {
        &self.constructors
    }

    pub fn fields(&self) -> &[MemberSpec] {
        &self.fields
    }

    pub fn properties(&self) -> &[MemberSpec] {
        &self.properties
    }

    pub fn methods(&self) -> &[MethodSpec] {
        &self.methods
    }

    /// The open generic definition this type closes, if any.
    pub fn open_definition(&self) -> Option<(TypeId, &'static str)> {
        self.open_definition
    }

    /// Every dependency that is a hard edge in the static graph: selected
    /// constructor parameters plus all member and method parameters, with
    /// deferred and factory wrappers excluded.
    pub(crate) fn hard_edges<'m>(&'m self, ctor: usize) -> impl Iterator<Item = &'m ParamSpec> {
        let ctor_params = self
            .constructors
            .get(ctor)
            .map(|c| c.params.as_slice())
            .unwrap_or(&[]);
        ctor_params
            .iter()
            .chain(self.fields.iter().map(|m| &m.param))
            .chain(self.properties.iter().map(|m| &m.param))
            .chain(self.methods.iter().flat_map(|m| m.params.iter()))
            .filter(|p| {
                matches!(
                    p.kind,
                    DependencyKind::Service | DependencyKind::Collection
                )
            })
    }
}

impl std::fmt::Debug for TypeMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMetadata")
            .field("type", &self.type_name)
            .field("constructors", &self.constructors.len())
            .field("fields", &self.fields.len())
            .field("properties", &self.properties.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Fluent builder for [`TypeMetadata`], typed by the target `T` so that
/// constructor and member closures stay statically checked.
pub struct TypeMetadataBuilder<T> {
    constructors: Vec<ConstructorSpec>,
    fields: Vec<MemberSpec>,
    properties: Vec<MemberSpec>,
    methods: Vec<MethodSpec>,
    open_definition: Option<(TypeId, &'static str)>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> TypeMetadataBuilder<T> {
    /// Declares a constructor candidate. Declaration order matters: it
    /// breaks ties between equally-satisfiable candidates.
    pub fn constructor<F>(mut self, params: Vec<ParamSpec>, make: F) -> Self
    where
        F: Fn(&mut ArgBundle) -> DiResult<T> + Send + Sync + 'static,
    {
        self.constructors.push(ConstructorSpec::new(params, make));
        self
    }

    /// Declares a field injection point, applied in declaration order.
    pub fn field<F>(mut self, name: &'static str, param: ParamSpec, set: F) -> Self
    where
        F: Fn(&mut T, &mut ArgBundle) -> DiResult<()> + Send + Sync + 'static,
    {
        self.fields.push(MemberSpec::new(name, param, set));
        self
    }

    /// Declares a property (setter-backed) injection point, applied after
    /// all fields.
    pub fn property<F>(mut self, name: &'static str, param: ParamSpec, set: F) -> Self
    where
        F: Fn(&mut T, &mut ArgBundle) -> DiResult<()> + Send + Sync + 'static,
    {
        self.properties.push(MemberSpec::new(name, param, set));
        self
    }

    /// Declares a method injection point. Lower `order` runs first;
    /// declaration order breaks ties.
    pub fn method<F>(
        mut self,
        name: &'static str,
        order: i32,
        params: Vec<ParamSpec>,
        call: F,
    ) -> Self
    where
        F: Fn(&mut T, &mut ArgBundle) -> DiResult<()> + Send + Sync + 'static,
    {
        self.methods.push(MethodSpec::new(name, order, params, call));
        self
    }

    /// Marks `T` as the closed form of the open generic definition `Def`,
    /// making it resolvable through an open-generic template registration.
    pub fn closes<Def: ?Sized + 'static>(mut self) -> Self {
        self.open_definition = Some((TypeId::of::<Def>(), std::any::type_name::<Def>()));
        self
    }

    pub fn build(mut self) -> TypeMetadata {
        // Stable sort: declaration order is the tie-break.
        self.methods.sort_by_key(|m| m.order);
        TypeMetadata {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructors: self.constructors,
            fields: self.fields,
            properties: self.properties,
            methods: self.methods,
            open_definition: self.open_definition,
        }
    }
}

/// Types that describe their own injection metadata.
///
/// This is the explicit, manually-registered flavor of a reflection
/// surface: the implementation enumerates constructors and injection
/// points once, and the result is memoized for the process lifetime.
///
/// # Examples
///
/// ```rust
/// use crucible_di::{ArgBundle, DiResult, Injectable, ParamSpec, TypeMetadata};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// impl Injectable for UserService {
///     fn metadata() -> TypeMetadata {
///         TypeMetadata::builder::<UserService>()
///             .constructor(vec![ParamSpec::service::<Database>("db")], |args| {
///                 Ok(UserService { db: args.take::<Database>()? })
///             })
///             .build()
///     }
/// }
/// ```
pub trait Injectable: Send + Sync + 'static {
    /// Describes how this type is constructed and injected. Called at most
    /// once per process; the result is cached.
    fn metadata() -> TypeMetadata;
}

type MetadataCell = Arc<OnceCell<Arc<TypeMetadata>>>;

static METADATA: Lazy<DashMap<TypeId, MetadataCell, ahash::RandomState>> =
    Lazy::new(|| DashMap::with_hasher(ahash::RandomState::new()));

/// Process-wide memoization of [`TypeMetadata`], shared by every provider.
///
/// First access builds the metadata exactly once, even under a concurrent
/// resolution race: the cell is created under a short shard lock and the
/// expensive build runs in the cell outside it, so unrelated type lookups
/// never serialize against each other.
pub struct MetadataCache;

impl MetadataCache {
    /// Returns the memoized metadata for `T`, building it on first access.
    pub fn get_or_build<T: Injectable>() -> Arc<TypeMetadata> {
        let cell = METADATA
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();
        cell.get_or_init(|| Arc::new(T::metadata())).clone()
    }

    /// Drops every memoized entry. Intended for test isolation; safe to
    /// call repeatedly.
    pub fn clear() {
        METADATA.clear();
    }

    /// Number of memoized types.
    pub fn len() -> usize {
        METADATA.iter().filter(|e| e.value().get().is_some()).count()
    }
}

/// Registry view used for satisfiability answers during constructor
/// selection, implemented by both the live resolver chain and the
/// build-time analyzer.
pub(crate) trait KeyQuery {
    fn contains_key(&self, key: &Key) -> bool;
    fn contains_template(&self, definition: TypeId) -> bool;
}

/// Selects the constructor to invoke: among the candidates whose
/// parameters are all satisfiable, the one with the most parameters wins
/// and declaration order breaks ties. An empty candidate list means the
/// type cannot be instantiated at all.
pub(crate) fn select_constructor(
    meta: &TypeMetadata,
    query: &dyn KeyQuery,
    args: &Arguments,
) -> DiResult<usize> {
    if meta.constructors.is_empty() {
        return Err(DiError::CannotInstantiateAbstract(Key::Type(
            meta.type_id,
            meta.type_name,
        )));
    }

    let mut best: Option<(usize, usize)> = None; // (param count, index)
    for (index, ctor) in meta.constructors.iter().enumerate() {
        if ctor.params.iter().all(|p| p.satisfiable(query, args)) {
            let count = ctor.params.len();
            match best {
                Some((best_count, _)) if best_count >= count => {}
                _ => best = Some((count, index)),
            }
        }
    }

    match best {
        Some((_, index)) => Ok(index),
        None => {
            let missing: Vec<&str> = meta
                .constructors
                .iter()
                .max_by_key(|c| c.params.len())
                .map(|widest| {
                    widest
                        .params
                        .iter()
                        .filter(|p| !p.satisfiable(query, args))
                        .map(|p| p.key.display_name())
                        .collect()
                })
                .unwrap_or_default();
            Err(DiError::NoSuitableConstructor {
                type_name: meta.type_name,
                reason: format!(
                    "no candidate has all parameters satisfiable (missing: {})",
                    missing.join(", ")
                ),
            })
        }
    }
}
