//! Field descriptors.

use crate::relation::Relation;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The JSON type of an attribute, as advertised in generated API descriptions.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    #[display(fmt = "string")]
    String,
    #[display(fmt = "integer")]
    Integer,
    #[display(fmt = "number")]
    Number,
    #[display(fmt = "boolean")]
    Boolean,
    #[display(fmt = "object")]
    Object,
    #[display(fmt = "array")]
    Array,
    /// Any JSON value.
    #[default]
    #[display(fmt = "any")]
    Any,
}

/// What a field holds.
#[derive(Clone, Debug)]
pub enum FieldKind {
    Attribute(AttrType),
    Relation(Relation),
}

/// The static description of one field of a resource.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// The field is rendered but never accepted on writes.
    pub read_only: bool,
    /// The field is accepted on writes but never rendered.
    pub write_only: bool,
    pub nullable: bool,
    /// The field is rendered under `meta` rather than `attributes` or `relationships`.
    pub meta: bool,
    /// The relation may be named in the `include` query parameter.
    pub includable: bool,
    /// Human-readable documentation, used in generated API descriptions.
    pub description: Option<String>,
}

impl FieldDescriptor {
    pub fn attribute(name: impl Into<String>, ty: AttrType) -> Self {
        Self::new(name, FieldKind::Attribute(ty))
    }

    pub fn relationship(name: impl Into<String>, relation: Relation) -> Self {
        // Computed relations have no storage to write to.
        let read_only = matches!(relation, Relation::Computed(_));
        Self {
            read_only,
            ..Self::new(name, FieldKind::Relation(relation))
        }
    }

    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            read_only: false,
            write_only: false,
            nullable: false,
            meta: false,
            includable: false,
            description: None,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Allow this relation to be included in compound documents.
    pub fn include(mut self) -> Self {
        self.includable = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.kind, FieldKind::Relation(_))
    }

    pub fn relation(&self) -> Option<&Relation> {
        match &self.kind {
            FieldKind::Relation(relation) => Some(relation),
            FieldKind::Attribute(_) => None,
        }
    }

    pub(crate) fn relation_mut(&mut self) -> Option<&mut Relation> {
        match &mut self.kind {
            FieldKind::Relation(relation) => Some(relation),
            FieldKind::Attribute(_) => None,
        }
    }

    /// The attribute type, or [`None`] for a relation.
    pub fn attr_type(&self) -> Option<AttrType> {
        match &self.kind {
            FieldKind::Attribute(ty) => Some(*ty),
            FieldKind::Relation(_) => None,
        }
    }
}
