//! Declarations of the resources exposed by an API.
//!
//! A resource is described by a [`ResourceDescriptor`]: its model name, the ordered list of its
//! [fields](FieldDescriptor), and a few optional hooks. Descriptors are usually generated with
//! `#[derive(Resource)]` and then collected into a [`Registry`], which resolves the targets of all
//! relations once, at startup:
//!
//! ```
//! use relational_jsonapi::prelude::*;
//!
//! #[derive(Clone, Debug, Resource)]
//! struct Blog {
//!     id: i32,
//!     name: String,
//! }
//!
//! #[derive(Clone, Debug, Resource)]
//! struct Entry {
//!     id: i32,
//!     headline: String,
//!     #[resource(include)]
//!     blog: ToOne<Blog>,
//! }
//!
//! let registry = Registry::builder()
//!     .register::<Blog>()
//!     .register::<Entry>()
//!     .build()
//!     .unwrap();
//! assert!(registry.get("Entry").unwrap().field("blog").unwrap().is_relation());
//! ```
//!
//! At request time, application data enters the pipeline as [`Record`]s, which carry the name of
//! their concrete resource along with attribute values and related records.

use crate::relation::{Relation, ResourceRelation, Target};
use derivative::Derivative;
use serde_json::{Map, Value};
use std::{fmt::Display, sync::Arc};

pub mod field;
pub mod record;
pub mod registry;

pub use field::{AttrType, FieldDescriptor, FieldKind};
pub use record::{Record, Related};
pub use registry::{Registry, RegistryBuilder};

/// A hook computing the `meta` member of a resource object.
pub type MetaHook = Arc<dyn Fn(&Record) -> Map<String, Value> + Send + Sync>;

/// A hook computing root-level `meta` from the primary data of a document.
///
/// The second argument tells whether the primary data is a collection.
pub type RootMetaHook = Arc<dyn Fn(&[Record], bool) -> Map<String, Value> + Send + Sync>;

/// The static description of a resource.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ResourceDescriptor {
    name: String,
    type_name: Option<String>,
    id_field: String,
    fields: Vec<FieldDescriptor>,
    default_includes: Vec<String>,
    subtypes: Vec<String>,
    self_route: Option<String>,
    #[derivative(Debug = "ignore")]
    meta: Option<MetaHook>,
    #[derivative(Debug = "ignore")]
    root_meta: Option<RootMetaHook>,
}

impl ResourceDescriptor {
    /// Start describing the resource backed by the model `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            id_field: "id".into(),
            fields: vec![],
            default_includes: vec![],
            subtypes: vec![],
            self_route: None,
            meta: None,
            root_meta: None,
        }
    }

    /// Use a fixed wire type name instead of one derived from the model name.
    pub fn type_name(mut self, ty: impl Into<String>) -> Self {
        self.type_name = Some(ty.into());
        self
    }

    /// Set the name of the primary key field.
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Append a field.
    pub fn add_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Append an attribute field.
    pub fn attribute(self, name: impl Into<String>, ty: AttrType) -> Self {
        self.add_field(FieldDescriptor::attribute(name, ty))
    }

    /// Append a to-one relation to the resource `target`.
    pub fn to_one(self, name: impl Into<String>, target: Target) -> Self {
        self.add_field(FieldDescriptor::relationship(
            name,
            ResourceRelation::new(target, false).into(),
        ))
    }

    /// Append a to-many relation to the resource `target`.
    pub fn to_many(self, name: impl Into<String>, target: Target) -> Self {
        self.add_field(FieldDescriptor::relationship(
            name,
            ResourceRelation::new(target, true).into(),
        ))
    }

    /// Include the given relation paths when the request does not ask for any.
    pub fn default_include(mut self, path: impl Into<String>) -> Self {
        self.default_includes.push(path.into());
        self
    }

    /// Declare the concrete resources of a polymorphic resource.
    pub fn subtype(mut self, resource: impl Into<String>) -> Self {
        self.subtypes.push(resource.into());
        self
    }

    /// Render `links.self` on resource objects by reversing the named route.
    pub fn self_route(mut self, route: impl Into<String>) -> Self {
        self.self_route = Some(route.into());
        self
    }

    /// Compute resource-level `meta` for every rendered object.
    pub fn meta(
        mut self,
        hook: impl Fn(&Record) -> Map<String, Value> + Send + Sync + 'static,
    ) -> Self {
        self.meta = Some(Arc::new(hook));
        self
    }

    /// Compute root-level `meta` for documents whose primary data is of this resource.
    pub fn root_meta(
        mut self,
        hook: impl Fn(&[Record], bool) -> Map<String, Value> + Send + Sync + 'static,
    ) -> Self {
        self.root_meta = Some(Arc::new(hook));
        self
    }

    /// The name of the underlying model.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wire type name, if it is fixed rather than derived.
    pub fn explicit_type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn id_field_name(&self) -> &str {
        &self.id_field
    }

    /// The fields rendered under `attributes` and `relationships`, in declaration order.
    ///
    /// Meta fields are excluded.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.meta)
    }

    /// Fields rendered under the `meta` member of resource objects.
    pub fn meta_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.meta)
    }

    /// Look up a non-meta field by declared name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|f| f.name == name)
    }

    /// Relationship fields, in declaration order.
    pub fn relationships(&self) -> impl Iterator<Item = (&FieldDescriptor, &Relation)> {
        self.fields()
            .filter_map(|f| f.relation().map(|relation| (f, relation)))
    }

    /// Attribute fields, excluding the primary key, in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields()
            .filter(|f| !f.is_relation() && f.name != self.id_field)
    }

    pub fn default_includes(&self) -> &[String] {
        &self.default_includes
    }

    /// The names of the concrete resources, if this resource is polymorphic.
    pub fn subtypes(&self) -> &[String] {
        &self.subtypes
    }

    pub fn is_polymorphic(&self) -> bool {
        !self.subtypes.is_empty()
    }

    pub fn self_route_name(&self) -> Option<&str> {
        self.self_route.as_deref()
    }

    /// Resource-level meta computed by the hook, if there is one.
    pub fn resource_meta(&self, record: &Record) -> Map<String, Value> {
        self.meta.as_ref().map(|hook| hook(record)).unwrap_or_default()
    }

    /// Root-level meta computed by the hook, if there is one.
    pub fn document_meta(&self, records: &[Record], many: bool) -> Map<String, Value> {
        self.root_meta
            .as_ref()
            .map(|hook| hook(records, many))
            .unwrap_or_default()
    }

    pub(crate) fn fields_mut(&mut self) -> impl Iterator<Item = &mut FieldDescriptor> {
        self.fields.iter_mut()
    }
}

/// A type which can be exposed as a resource.
///
/// This trait is normally implemented with `#[derive(Resource)]`.
pub trait Resource {
    /// The name of the resource's model.
    const NAME: &'static str;

    fn descriptor() -> ResourceDescriptor;

    /// Convert an instance into a record for rendering.
    fn to_record(&self) -> Record;
}

/// Format the identifier of a derived resource.
#[doc(hidden)]
pub fn id_string<T: Display + ?Sized>(id: &T) -> String {
    id.to_string()
}

/// A to-one relation field on a [`Resource`] struct.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ToOne<T> {
    #[default]
    Empty,
    /// The related resource is known only by its id.
    Id(String),
    Loaded(Box<T>),
}

/// A to-many relation field on a [`Resource`] struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToMany<T> {
    /// The related resources are known only by their ids.
    Ids(Vec<String>),
    Loaded(Vec<T>),
}

impl<T> Default for ToMany<T> {
    fn default() -> Self {
        Self::Ids(vec![])
    }
}

/// Relation field types usable in `#[derive(Resource)]` structs.
pub trait IntoRelated {
    /// The relation descriptor for a field of this type.
    fn relation() -> Relation;

    /// The current value of the field.
    fn to_related(&self) -> Related;
}

impl<T: Resource> IntoRelated for ToOne<T> {
    fn relation() -> Relation {
        ResourceRelation::new(Target::Named(T::NAME.into()), false).into()
    }

    fn to_related(&self) -> Related {
        match self {
            Self::Empty => Related::One(None),
            Self::Id(id) => Related::One(Some(Box::new(Record::stub(T::NAME, id.clone())))),
            Self::Loaded(t) => Related::One(Some(Box::new(t.to_record()))),
        }
    }
}

impl<T: Resource> IntoRelated for ToMany<T> {
    fn relation() -> Relation {
        ResourceRelation::new(Target::Named(T::NAME.into()), true).into()
    }

    fn to_related(&self) -> Related {
        match self {
            Self::Ids(ids) => Related::Many(
                ids.iter()
                    .map(|id| Record::stub(T::NAME, id.clone()))
                    .collect(),
            ),
            Self::Loaded(ts) => Related::Many(ts.iter().map(Resource::to_record).collect()),
        }
    }
}
