//! Common items that you will always want in scope when using JSON:API.

pub use crate::{
    config::{Config, PaginationStyle},
    context::Context,
    document::Document,
    error::{Error, FieldError, Result, ValidationErrors},
    inflection::Format,
    links::Routes,
    query::{FilterOp, FilterSet, QueryOptions},
    relation::{
        ComputedRelation, HyperlinkedRelation, LinkSpec, PolymorphicRelation, Relation,
        ResourceRelation, Target,
    },
    request::{Method, Request, Response},
    resource::{
        AttrType, FieldDescriptor, Record, Registry, Related, Resource, ResourceDescriptor, ToMany,
        ToOne,
    },
    schema::{Endpoint, SchemaGenerator},
    storage::{DataSource, Query, RelationStorage},
    view::{api_root, RelationshipView, ResourceView},
};
pub use relational_jsonapi_derive::Resource;
