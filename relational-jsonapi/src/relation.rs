//! Relationship fields.
//!
//! A relationship field renders resource linkage (`{type, id}` objects) and, optionally, `links`
//! for a relation of its owning record, and parses linkage back from request bodies. There are
//! four variants, sharing the [`RelationshipField`] interface:
//!
//! * [`ResourceRelation`]: a plain relation to a single resource. Linkage takes its type from the
//!   target resource.
//! * [`PolymorphicRelation`]: a relation to any of a set of resources. Linkage takes its type from
//!   the concrete resource of each related record, and parsing accepts any of the declared types.
//! * [`HyperlinkedRelation`]: a relation rendered only as `links`, with no `data`.
//! * [`ComputedRelation`]: a relation whose value is produced by a function of the owning record
//!   at render time, instead of being read from the record.

use crate::{
    context::Context,
    document::{Linkage, RelationshipData, RelationshipLinks},
    error::{FieldError, ValidationErrors},
    resource::{Record, Related},
    Error, Result,
};
use derivative::Derivative;
use derive_more::From;
use itertools::Itertools;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;

/// A reference from a relation to the resource it targets.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// The resource which owns the relation.
    SelfRef,
    /// A resource by model name.
    Named(String),
}

impl Target {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// The model name of the target, once resolved.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::SelfRef => None,
            Self::Named(name) => Some(name),
        }
    }

    fn resolve(&mut self, owner: &str) {
        if *self == Self::SelfRef {
            *self = Self::Named(owner.into());
        }
    }

    fn type_name(&self, ctx: &Context) -> Result<String> {
        let name = self
            .name()
            .ok_or_else(|| Error::configuration("unresolved relation target"))?;
        ctx.type_of(name)
    }
}

/// How to build `links.self` and `links.related` for a relationship.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkSpec {
    /// Route of the relationship endpoint, e.g. `/entries/{pk}/relationships/{related_field}`.
    pub self_route: Option<String>,
    /// Route of the related resource endpoint, e.g. `/entries/{pk}/{related_field}`.
    pub related_route: Option<String>,
    /// The field of the owning record substituted into the routes. Defaults to the primary key.
    pub lookup_field: Option<String>,
    pub url_kwarg: String,
    pub related_url_kwarg: String,
}

impl Default for LinkSpec {
    fn default() -> Self {
        Self {
            self_route: None,
            related_route: None,
            lookup_field: None,
            url_kwarg: "pk".into(),
            related_url_kwarg: "pk".into(),
        }
    }
}

impl LinkSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn self_route(mut self, route: impl Into<String>) -> Self {
        self.self_route = Some(route.into());
        self
    }

    pub fn related_route(mut self, route: impl Into<String>) -> Self {
        self.related_route = Some(route.into());
        self
    }

    pub fn lookup_field(mut self, field: impl Into<String>) -> Self {
        self.lookup_field = Some(field.into());
        self
    }

    pub fn url_kwarg(mut self, kwarg: impl Into<String>) -> Self {
        self.url_kwarg = kwarg.into();
        self
    }

    pub fn related_url_kwarg(mut self, kwarg: impl Into<String>) -> Self {
        self.related_url_kwarg = kwarg.into();
        self
    }

    /// Reverse the configured routes for the relation `field` of `owner`.
    ///
    /// Returns [`None`] if the owner has no lookup value or no route could be reversed.
    pub fn links(&self, owner: &Record, field: &str, ctx: &Context) -> Option<RelationshipLinks> {
        let lookup = match &self.lookup_field {
            None => owner.id.clone(),
            Some(lookup_field) => {
                let id_field = ctx
                    .registry
                    .get(&owner.resource)
                    .map(|d| d.id_field_name())
                    .unwrap_or("id");
                owner.lookup_value(lookup_field, id_field)
            }
        }?;
        let segment = ctx.format_link_segment(field);
        let reverse = |route: &Option<String>, kwarg: &str| {
            route.as_ref().and_then(|route| {
                ctx.routes.reverse(
                    route,
                    &[(kwarg, lookup.as_str()), ("related_field", segment.as_str())],
                )
            })
        };
        let links = RelationshipLinks {
            this: reverse(&self.self_route, &self.url_kwarg),
            related: reverse(&self.related_route, &self.related_url_kwarg),
        };
        (!links.is_empty()).then_some(links)
    }
}

/// The interface shared by all relationship fields.
pub trait RelationshipField {
    fn is_to_many(&self) -> bool;

    /// Whether `data` is omitted from the rendered relationship object.
    fn skip_data(&self) -> bool {
        false
    }

    fn link_spec(&self) -> Option<&LinkSpec>;

    /// The value of this relation on `owner`, where `field` is the name of the relation.
    fn related<'r>(&self, owner: &'r Record, field: &str) -> Option<Cow<'r, Related>> {
        owner.related(field).map(Cow::Borrowed)
    }

    /// The wire type name of a related record.
    fn linkage_type(&self, record: &Record, ctx: &Context) -> Result<String>;

    /// The wire type names accepted when parsing linkage.
    fn expected_types(&self, ctx: &Context) -> Result<Vec<String>>;

    /// Resource linkage for a relation value.
    ///
    /// Related records which have not been saved have no identity, and are left out.
    fn linkage(&self, related: &Related, ctx: &Context) -> Result<RelationshipData> {
        let linkage = |record: &Record| -> Result<Option<Linkage>> {
            match &record.id {
                Some(id) => Ok(Some(Linkage::new(self.linkage_type(record, ctx)?, id))),
                None => Ok(None),
            }
        };
        Ok(match related {
            Related::One(None) => RelationshipData::One(None),
            Related::One(Some(record)) => RelationshipData::One(linkage(record)?),
            Related::Many(records) => RelationshipData::Many(
                records
                    .iter()
                    .map(linkage)
                    .flatten_ok()
                    .collect::<Result<_>>()?,
            ),
        })
    }

    /// `links` for the relation `field` of `owner`.
    fn links(&self, owner: &Record, field: &str, ctx: &Context) -> Option<RelationshipLinks> {
        self.link_spec()?.links(owner, field, ctx)
    }

    /// Parse a single resource identifier object.
    ///
    /// The identifier may be given as a JSON object or as a string containing a JSON object.
    /// Malformed identifiers are validation errors; a well-formed identifier of the wrong type is a
    /// conflict.
    fn to_internal_value(&self, value: &Value, ctx: &Context) -> Result<Linkage> {
        let decoded;
        let value = match value {
            Value::String(s) => {
                decoded = serde_json::from_str::<Value>(s).map_err(|_| incorrect_type(value))?;
                &decoded
            }
            value => value,
        };
        let Value::Object(obj) = value else {
            return Err(incorrect_type(value));
        };
        let Some(ty) = obj.get("type").and_then(Value::as_str) else {
            return Err(field_error(
                "missing_type",
                "Invalid resource identifier object: missing 'type' attribute",
            ));
        };
        let id = match obj.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(field_error(
                    "missing_id",
                    "Invalid resource identifier object: missing 'id' attribute",
                ))
            }
        };

        let expected = self.expected_types(ctx)?;
        if !expected.iter().any(|e| e == ty) {
            let expected = match expected.as_slice() {
                [single] => single.clone(),
                many => format!("one of [{}]", many.iter().join(", ")),
            };
            return Err(Error::conflict(format!(
                "Incorrect relation type. Expected {expected}, received {ty}."
            )));
        }
        Ok(Linkage::new(ty, id))
    }

    /// Parse the `data` member of a relationship object in a request body.
    fn parse_data(&self, value: &Value, ctx: &Context) -> Result<RelationshipData> {
        if !self.is_to_many() {
            return Ok(RelationshipData::One(match value {
                Value::Null => None,
                value => Some(self.to_internal_value(value, ctx)?),
            }));
        }

        let Value::Array(items) = value else {
            return Err(field_error(
                "not_a_list",
                format!(
                    "Expected a list of items but got type \"{}\".",
                    json_type(value)
                ),
            ));
        };
        let mut linkages = vec![];
        let mut errors = vec![];
        for item in items {
            match self.to_internal_value(item, ctx) {
                Ok(linkage) => {
                    linkages.push(linkage);
                    errors.push(ValidationErrors::Messages(vec![]));
                }
                Err(Error::Validation { errors: err }) => errors.push(err),
                Err(err) => return Err(err),
            }
        }
        if errors.iter().any(|e| !e.is_empty()) {
            return Err(ValidationErrors::List(errors).into());
        }
        Ok(RelationshipData::Many(linkages))
    }
}

fn field_error(code: &str, message: impl Into<String>) -> Error {
    ValidationErrors::Messages(vec![FieldError::new(code, message)]).into()
}

fn incorrect_type(value: &Value) -> Error {
    field_error(
        "incorrect_type",
        format!(
            "Incorrect type. Expected resource identifier object, received {}.",
            json_type(value)
        ),
    )
}

/// The name of the JSON type of `value`.
pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A plain relation to a single resource.
#[derive(Clone, Debug)]
pub struct ResourceRelation {
    pub target: Target,
    pub many: bool,
    pub links: Option<LinkSpec>,
}

impl ResourceRelation {
    pub fn new(target: Target, many: bool) -> Self {
        Self {
            target,
            many,
            links: None,
        }
    }

    pub fn with_links(mut self, links: LinkSpec) -> Self {
        self.links = Some(links);
        self
    }
}

impl RelationshipField for ResourceRelation {
    fn is_to_many(&self) -> bool {
        self.many
    }

    fn link_spec(&self) -> Option<&LinkSpec> {
        self.links.as_ref()
    }

    fn linkage_type(&self, _record: &Record, ctx: &Context) -> Result<String> {
        self.target.type_name(ctx)
    }

    fn expected_types(&self, ctx: &Context) -> Result<Vec<String>> {
        Ok(vec![self.target.type_name(ctx)?])
    }
}

/// A relation to records of any of several resources.
#[derive(Clone, Debug)]
pub struct PolymorphicRelation {
    /// The accepted resources. Polymorphic resources stand for all of their subtypes.
    pub targets: Vec<Target>,
    pub many: bool,
    pub links: Option<LinkSpec>,
}

impl PolymorphicRelation {
    pub fn new(targets: impl IntoIterator<Item = Target>, many: bool) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            many,
            links: None,
        }
    }

    pub fn with_links(mut self, links: LinkSpec) -> Self {
        self.links = Some(links);
        self
    }
}

impl RelationshipField for PolymorphicRelation {
    fn is_to_many(&self) -> bool {
        self.many
    }

    fn link_spec(&self) -> Option<&LinkSpec> {
        self.links.as_ref()
    }

    fn linkage_type(&self, record: &Record, ctx: &Context) -> Result<String> {
        ctx.type_of(&record.resource)
    }

    fn expected_types(&self, ctx: &Context) -> Result<Vec<String>> {
        let mut types = vec![];
        for target in &self.targets {
            let name = target
                .name()
                .ok_or_else(|| Error::configuration("unresolved relation target"))?;
            for ty in ctx.type_names(ctx.resource(name)?) {
                if !types.contains(&ty) {
                    types.push(ty);
                }
            }
        }
        Ok(types)
    }
}

/// A relation rendered only as links.
#[derive(Clone, Debug)]
pub struct HyperlinkedRelation {
    pub target: Target,
    pub many: bool,
    pub links: LinkSpec,
}

impl HyperlinkedRelation {
    pub fn new(target: Target, many: bool, links: LinkSpec) -> Self {
        Self {
            target,
            many,
            links,
        }
    }
}

impl RelationshipField for HyperlinkedRelation {
    fn is_to_many(&self) -> bool {
        self.many
    }

    fn skip_data(&self) -> bool {
        true
    }

    fn link_spec(&self) -> Option<&LinkSpec> {
        Some(&self.links)
    }

    fn linkage_type(&self, _record: &Record, ctx: &Context) -> Result<String> {
        self.target.type_name(ctx)
    }

    fn expected_types(&self, ctx: &Context) -> Result<Vec<String>> {
        Ok(vec![self.target.type_name(ctx)?])
    }
}

/// The function producing the value of a [`ComputedRelation`].
pub type ComputeFn = Arc<dyn Fn(&Record) -> Related + Send + Sync>;

/// A relation computed from the owning record at render time.
///
/// Computed relations are read-only.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ComputedRelation {
    pub target: Target,
    pub many: bool,
    pub links: Option<LinkSpec>,
    #[derivative(Debug = "ignore")]
    pub compute: ComputeFn,
}

impl ComputedRelation {
    pub fn new(
        target: Target,
        many: bool,
        compute: impl Fn(&Record) -> Related + Send + Sync + 'static,
    ) -> Self {
        Self {
            target,
            many,
            links: None,
            compute: Arc::new(compute),
        }
    }

    pub fn with_links(mut self, links: LinkSpec) -> Self {
        self.links = Some(links);
        self
    }
}

impl RelationshipField for ComputedRelation {
    fn is_to_many(&self) -> bool {
        self.many
    }

    fn link_spec(&self) -> Option<&LinkSpec> {
        self.links.as_ref()
    }

    fn related<'r>(&self, owner: &'r Record, _field: &str) -> Option<Cow<'r, Related>> {
        Some(Cow::Owned((self.compute)(owner)))
    }

    fn linkage_type(&self, record: &Record, ctx: &Context) -> Result<String> {
        ctx.type_of(&record.resource)
    }

    fn expected_types(&self, ctx: &Context) -> Result<Vec<String>> {
        Ok(vec![self.target.type_name(ctx)?])
    }
}

/// Any relationship field.
#[derive(Clone, Debug, From)]
pub enum Relation {
    Resource(ResourceRelation),
    Polymorphic(PolymorphicRelation),
    Hyperlinked(HyperlinkedRelation),
    Computed(ComputedRelation),
}

impl Relation {
    fn field(&self) -> &dyn RelationshipField {
        match self {
            Self::Resource(r) => r,
            Self::Polymorphic(r) => r,
            Self::Hyperlinked(r) => r,
            Self::Computed(r) => r,
        }
    }

    /// Replace self-references with the name of the owning resource.
    pub(crate) fn resolve(&mut self, owner: &str) {
        match self {
            Self::Resource(r) => r.target.resolve(owner),
            Self::Hyperlinked(r) => r.target.resolve(owner),
            Self::Computed(r) => r.target.resolve(owner),
            Self::Polymorphic(r) => r.targets.iter_mut().for_each(|t| t.resolve(owner)),
        }
    }

    /// The model names of all resources this relation may target.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Self::Resource(r) => r.target.name().into_iter().collect(),
            Self::Hyperlinked(r) => r.target.name().into_iter().collect(),
            Self::Computed(r) => r.target.name().into_iter().collect(),
            Self::Polymorphic(r) => r.targets.iter().filter_map(Target::name).collect(),
        }
    }

    /// The model name of the single resource this relation targets.
    ///
    /// Returns [`None`] for polymorphic relations.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Polymorphic(_) => None,
            _ => self.targets().first().copied(),
        }
    }

    pub fn is_polymorphic(&self) -> bool {
        matches!(self, Self::Polymorphic(_))
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }
}

impl RelationshipField for Relation {
    fn is_to_many(&self) -> bool {
        self.field().is_to_many()
    }

    fn skip_data(&self) -> bool {
        self.field().skip_data()
    }

    fn link_spec(&self) -> Option<&LinkSpec> {
        self.field().link_spec()
    }

    fn related<'r>(&self, owner: &'r Record, field: &str) -> Option<Cow<'r, Related>> {
        self.field().related(owner, field)
    }

    fn linkage_type(&self, record: &Record, ctx: &Context) -> Result<String> {
        self.field().linkage_type(record, ctx)
    }

    fn expected_types(&self, ctx: &Context) -> Result<Vec<String>> {
        self.field().expected_types(ctx)
    }
}
