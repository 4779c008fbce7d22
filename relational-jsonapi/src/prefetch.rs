//! Planning of eager relation loading.
//!
//! Rendering a compound document touches every included relation of every primary record. Loading
//! those relations one record at a time would cost a query per record, so before the primary
//! records are fetched the planner decides how each included relation is to be loaded:
//!
//! * A _cheap_ relation is a single-valued forward reference which the [`DataSource`] can join into
//!   the owner's query. Cheap relations are added to [`Query::select_related`] as `__` paths, and
//!   the planner recurses into the related resource to extend the join chain.
//! * Anything else is _expensive_ and is loaded by a separate [`Prefetch`] query, carrying a nested
//!   plan for deeper includes.
//!
//! If any part of the plan below a cheap relation needs a separate query, the whole branch is
//! prefetched instead of joined, since a join chain cannot contain a separate query.

use crate::{
    context::Context,
    query::{include::related_resources, IncludeTree, SparseFieldsets},
    relation::{Relation, RelationshipField},
    resource::{FieldDescriptor, ResourceDescriptor},
    storage::{DataSource, Prefetch, Query},
    Error, Result,
};

/// Eager loading instructions for one level of an include tree.
#[derive(Debug, Default)]
struct Plan {
    select: Vec<String>,
    prefetch: Vec<Prefetch>,
}

/// Extend `base`, a query for records of `resource`, with instructions to load the relations in
/// `include` and the attributes in the sparse fieldset of the resource.
///
/// Fails with a configuration error if `include` names a field which is not declared as a
/// relation. Computed relations are skipped, as they are not loaded from storage.
pub fn plan<D: DataSource + ?Sized>(
    resource: &ResourceDescriptor,
    mut base: Query,
    fields: &SparseFieldsets,
    include: &IncludeTree,
    source: &D,
    ctx: &Context,
) -> Result<Query> {
    let concrete = ctx.registry.concrete(resource);
    let plan = plan_level(&concrete, fields, include, source, ctx)?;
    base.select_related.extend(plan.select);
    base.prefetch_related.extend(plan.prefetch);
    if base.only.is_none() {
        base.only = only(resource, fields, ctx);
    }
    tracing::debug!(
        resource = resource.name(),
        select_related = ?base.select_related,
        prefetches = base.prefetch_related.len(),
        "planned query"
    );
    Ok(base)
}

/// The attributes of `resource` to load, if a sparse fieldset restricts them.
fn only(
    resource: &ResourceDescriptor,
    fields: &SparseFieldsets,
    ctx: &Context,
) -> Option<Vec<String>> {
    let requested = fields.get(&ctx.type_name(resource))?;
    Some(
        resource
            .attributes()
            .chain(resource.meta_fields())
            .filter(|f| requested.contains(&f.name) || f.meta)
            .map(|f| f.name.clone())
            .collect(),
    )
}

/// Find the relation `field` on any of `resources`.
fn find_relation<'a>(
    resources: &[&'a ResourceDescriptor],
    field: &str,
) -> Result<(&'a ResourceDescriptor, &'a FieldDescriptor, &'a Relation)> {
    let owner = resources.first().map(|r| r.name()).unwrap_or_default();
    let (resource, descriptor) = resources
        .iter()
        .find_map(|r| Some((*r, r.field(field)?)))
        .ok_or_else(|| {
            Error::configuration(format!(
                "{owner}.{field} is requested as an include but is not a field of {owner}"
            ))
        })?;
    let relation = descriptor.relation().ok_or_else(|| {
        Error::configuration(format!(
            "{}.{field} is requested as an include but is not a relation",
            resource.name()
        ))
    })?;
    Ok((resource, descriptor, relation))
}

fn plan_level<D: DataSource + ?Sized>(
    resources: &[&ResourceDescriptor],
    fields: &SparseFieldsets,
    include: &IncludeTree,
    source: &D,
    ctx: &Context,
) -> Result<Plan> {
    let mut plan = Plan::default();
    for (name, sub) in include.iter() {
        let (owner, field, relation) = find_relation(resources, name)?;
        if relation.is_computed() {
            tracing::debug!(resource = owner.name(), field = name, "skipping computed relation");
            continue;
        }

        let storage = source.relation(owner.name(), &field.name);
        let cheap = !relation.is_polymorphic() && storage.is_joinable();
        let targets = related_resources(&[relation], ctx)?;
        let child = plan_level(&targets, fields, sub, source, ctx)?;

        if cheap && child.prefetch.is_empty() {
            tracing::debug!(resource = owner.name(), field = name, ?storage, "joining");
            plan.select.push(field.name.clone());
            plan.select.extend(
                child
                    .select
                    .into_iter()
                    .map(|path| format!("{}__{path}", field.name)),
            );
        } else if relation.is_polymorphic() {
            // One query per target, each planned against the fields of that target alone.
            tracing::debug!(resource = owner.name(), field = name, ?storage, "prefetching targets");
            for target in relation.targets() {
                let concrete = ctx.registry.concrete(ctx.resource(target)?);
                let child = plan_level(&concrete, fields, &sub.restrict(&concrete), source, ctx)?;
                plan.prefetch
                    .push(prefetch_of(&field.name, target, &concrete, child, fields, ctx));
            }
        } else {
            tracing::debug!(resource = owner.name(), field = name, ?storage, "prefetching");
            let target = relation.target().unwrap_or_default();
            plan.prefetch
                .push(prefetch_of(&field.name, target, &targets, child, fields, ctx));
        }
    }
    Ok(plan)
}

/// A separate query for the relation `lookup`, loading records of `target`.
fn prefetch_of(
    lookup: &str,
    target: &str,
    targets: &[&ResourceDescriptor],
    child: Plan,
    fields: &SparseFieldsets,
    ctx: &Context,
) -> Prefetch {
    let only = match targets {
        [single] => only(single, fields, ctx),
        _ => None,
    };
    Prefetch {
        lookup: lookup.to_string(),
        query: Query {
            select_related: child.select,
            prefetch_related: child.prefetch,
            only,
            ..Query::new(target)
        },
    }
}
