//! The shapes of JSON:API documents on the wire.
//!
//! These types serialize to exactly the member layout required by the format: optional members are
//! omitted rather than rendered as `null`, except where the format gives `null` a meaning (an empty
//! to-one relationship, an empty primary resource, or the `id` of an unsaved resource).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A resource identifier object: the minimal `{type, id}` reference to a resource.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Linkage {
    #[serde(rename = "type")]
    pub ty: String,
    pub id: String,
}

impl Linkage {
    pub fn new(ty: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            id: id.into(),
        }
    }
}

/// The `links` member of a relationship object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipLinks {
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub this: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
}

impl RelationshipLinks {
    pub fn is_empty(&self) -> bool {
        self.this.is_none() && self.related.is_none()
    }
}

/// Resource linkage: `null`, a single identifier, or a list of identifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    Many(Vec<Linkage>),
    One(Option<Linkage>),
}

impl RelationshipData {
    /// The identifiers in this linkage, in order.
    pub fn linkages(&self) -> &[Linkage] {
        match self {
            Self::Many(items) => items,
            Self::One(Some(item)) => std::slice::from_ref(item),
            Self::One(None) => &[],
        }
    }
}

/// A relationship object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<RelationshipData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<RelationshipLinks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

/// The `links` member of a resource object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLinks {
    #[serde(rename = "self")]
    pub this: String,
}

/// A resource object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub ty: String,
    /// The string-encoded primary key, or `null` for a resource which has not been saved.
    pub id: Option<String>,
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<IndexMap<String, RelationshipObject>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<ResourceLinks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl ResourceObject {
    /// The identifier of this object, if it has been saved.
    pub fn linkage(&self) -> Option<Linkage> {
        self.id.as_ref().map(|id| Linkage::new(&self.ty, id))
    }
}

/// The primary data of a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Null,
    Resource(Box<ResourceObject>),
    Collection(Vec<ResourceObject>),
    Identifier(Linkage),
    Identifiers(Vec<Linkage>),
}

impl PrimaryData {
    /// The `(type, id)` pairs of all saved resources in the primary data.
    pub fn linkages(&self) -> Vec<Linkage> {
        match self {
            Self::Null => vec![],
            Self::Resource(obj) => obj.linkage().into_iter().collect(),
            Self::Collection(objs) => objs.iter().filter_map(ResourceObject::linkage).collect(),
            Self::Identifier(linkage) => vec![linkage.clone()],
            Self::Identifiers(linkages) => linkages.clone(),
        }
    }
}

impl From<Option<RelationshipData>> for PrimaryData {
    fn from(data: Option<RelationshipData>) -> Self {
        match data {
            None | Some(RelationshipData::One(None)) => Self::Null,
            Some(RelationshipData::One(Some(linkage))) => Self::Identifier(linkage),
            Some(RelationshipData::Many(linkages)) => Self::Identifiers(linkages),
        }
    }
}

/// A top-level document carrying primary data.
///
/// Members serialize in the order `links`, `data`, `included`, `meta`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Map<String, Value>>,
    pub data: PrimaryData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl Document {
    /// A document whose primary data is `null`.
    pub fn null() -> Self {
        Self {
            links: None,
            data: PrimaryData::Null,
            included: vec![],
            meta: Map::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// The `source` member of an error object.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl ErrorSource {
    pub fn pointer(pointer: impl Into<String>) -> Self {
        Self {
            pointer: Some(pointer.into()),
            parameter: None,
        }
    }

    pub fn parameter(parameter: impl Into<String>) -> Self {
        Self {
            pointer: None,
            parameter: Some(parameter.into()),
        }
    }
}

/// An error object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// The HTTP status code, as a string.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

/// A top-level document carrying errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

impl ErrorDocument {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
