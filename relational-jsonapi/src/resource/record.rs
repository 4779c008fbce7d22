//! Serialized resource instances.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A serialized instance of a resource, as produced by the data layer.
///
/// `resource` names the concrete resource of this instance. For polymorphic resources it is the
/// subtype, resolved when the record is read from storage, so the renderer never has to inspect
/// the record to find out what it is.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub resource: String,
    /// The string-encoded primary key, or [`None`] for an instance which has not been saved.
    pub id: Option<String>,
    pub attributes: Map<String, Value>,
    pub relations: IndexMap<String, Related>,
    /// Whether attributes and relations were actually loaded. Stubs carry only an id.
    pub loaded: bool,
}

/// The value of a relation on a [`Record`].
#[derive(Clone, Debug, PartialEq)]
pub enum Related {
    One(Option<Box<Record>>),
    Many(Vec<Record>),
}

impl Related {
    /// The related records.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        let (one, many) = match self {
            Self::One(record) => (record.as_deref(), &[][..]),
            Self::Many(records) => (None, records.as_slice()),
        };
        one.into_iter().chain(many)
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// The number of related records.
    pub fn count(&self) -> usize {
        match self {
            Self::One(record) => usize::from(record.is_some()),
            Self::Many(records) => records.len(),
        }
    }
}

impl Record {
    /// A loaded record with no fields yet.
    pub fn new(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id: Some(id.into()),
            attributes: Map::new(),
            relations: IndexMap::new(),
            loaded: true,
        }
    }

    /// A record known only by its id.
    pub fn stub(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            loaded: false,
            ..Self::new(resource, id)
        }
    }

    /// A record of an instance which does not exist yet, such as an empty form.
    pub fn template(resource: impl Into<String>) -> Self {
        Self {
            id: None,
            ..Self::new(resource, "")
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_related(mut self, name: impl Into<String>, related: Related) -> Self {
        self.relations.insert(name.into(), related);
        self
    }

    pub fn with_one(self, name: impl Into<String>, record: Option<Record>) -> Self {
        self.with_related(name, Related::One(record.map(Box::new)))
    }

    pub fn with_many(self, name: impl Into<String>, records: Vec<Record>) -> Self {
        self.with_related(name, Related::Many(records))
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn related(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    /// Whether this record corresponds to an existing instance.
    pub fn exists(&self) -> bool {
        self.id.is_some()
    }

    /// The value of `field` as a string, for use in URLs.
    ///
    /// `id_field` names the primary key, which is stored separately from the attributes.
    pub fn lookup_value(&self, field: &str, id_field: &str) -> Option<String> {
        if field == id_field {
            return self.id.clone();
        }
        match self.attributes.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
