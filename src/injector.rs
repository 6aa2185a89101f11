//! The injector: materializes instances from injection metadata.
//!
//! Construction follows a fixed, deterministic order: constructor
//! parameters in declaration order, then field injection points, then
//! properties, then methods by ascending priority. Every dependency is
//! filled by the same rule — caller override first (name, then type),
//! container resolution second, declared default last.

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::arguments::Arguments;
use crate::error::{DiError, DiResult};
use crate::metadata::{select_constructor, ArgBundle, ParamSpec, TypeMetadata};
use crate::provider::ResolverContext;
use crate::registration::{AnyArc, CtorFn};

/// Builds the type-erased constructor closure for a metadata-driven
/// registration. The constructor selection is decided once (first against
/// the frozen registry at build, otherwise lazily on first resolution) and
/// memoized in `plan`.
pub(crate) fn metadata_ctor(meta: Arc<TypeMetadata>, plan: Arc<OnceCell<usize>>) -> CtorFn {
    Arc::new(move |ctx| {
        let index = *plan.get_or_try_init(|| select_constructor(&meta, ctx, &Arguments::new()))?;
        let boxed = construct_with(&meta, ctx, &Arguments::new(), index)?;
        Ok(Arc::from(boxed))
    })
}

/// Constructs an instance: selects a constructor (unless `plan` pins one),
/// resolves its parameters in order, invokes it, then applies member
/// injection.
pub(crate) fn construct(
    meta: &TypeMetadata,
    ctx: &ResolverContext<'_>,
    args: &Arguments,
    plan: Option<usize>,
) -> DiResult<Box<dyn Any + Send + Sync>> {
    let index = match plan {
        Some(index) => index,
        None => select_constructor(meta, ctx, args)?,
    };
    construct_with(meta, ctx, args, index)
}

pub(crate) fn construct_with(
    meta: &TypeMetadata,
    ctx: &ResolverContext<'_>,
    args: &Arguments,
    index: usize,
) -> DiResult<Box<dyn Any + Send + Sync>> {
    let ctor = meta.constructors().get(index).ok_or_else(|| {
        DiError::Configuration(format!(
            "constructor index {} out of range for {}",
            index,
            meta.type_name()
        ))
    })?;

    let mut values = Vec::with_capacity(ctor.params().len());
    for param in ctor.params() {
        values.push(resolve_param(param, ctx, args)?);
    }
    let mut bundle = ArgBundle::new(values);
    let mut instance = ctor.invoke(&mut bundle)?;

    inject_members_erased(meta, &mut *instance, ctx, args)?;
    Ok(instance)
}

/// Member injection on a typed, externally-created instance. No
/// construction happens.
pub(crate) fn inject_members<T: Send + Sync + 'static>(
    meta: &TypeMetadata,
    target: &mut T,
    ctx: &ResolverContext<'_>,
    args: &Arguments,
) -> DiResult<()> {
    inject_members_erased(meta, target, ctx, args)
}

/// Applies fields, then properties, then methods by ascending order value
/// (stable on ties). The order is guaranteed regardless of caller thread.
pub(crate) fn inject_members_erased(
    meta: &TypeMetadata,
    target: &mut dyn Any,
    ctx: &ResolverContext<'_>,
    args: &Arguments,
) -> DiResult<()> {
    for member in meta.fields() {
        let value = resolve_param(member.param(), ctx, args)?;
        member.apply(target, value)?;
    }
    for member in meta.properties() {
        let value = resolve_param(member.param(), ctx, args)?;
        member.apply(target, value)?;
    }
    // Methods are pre-sorted by the metadata builder.
    for method in meta.methods() {
        let mut values = Vec::with_capacity(method.params().len());
        for param in method.params() {
            values.push(resolve_param(param, ctx, args)?);
        }
        let mut bundle = ArgBundle::new(values);
        method.invoke(target, &mut bundle)?;
    }
    Ok(())
}

/// Override first (name, then type), container second, default last.
fn resolve_param(
    param: &ParamSpec,
    ctx: &ResolverContext<'_>,
    args: &Arguments,
) -> DiResult<AnyArc> {
    if let Some(value) = args.find(param.name(), param.value_type()) {
        return Ok(value);
    }
    let produced = param.produce(ctx);
    if matches!(produced, Err(DiError::NotRegistered(_))) {
        if let Some(default) = param.default_value() {
            return Ok(default);
        }
    }
    produced
}
