//! Rendering of records into JSON:API documents.
//!
//! The [`Renderer`] turns the records produced by the data layer into a document. For each primary
//! record it builds a resource object from the record's concrete resource, and walks the relations
//! named in the include tree, collecting the related resources into an [`IncludedCache`] shared by
//! the whole document. Finally, resources which are also primary data are dropped from `included`,
//! and the rest are sorted by type and id.
//!
//! Related records which were not loaded by the data layer are left out of `included`. The
//! [prefetch planner](crate::prefetch) makes sure that requested includes are loaded.

use crate::{
    context::Context,
    document::{
        Document, Linkage, PrimaryData, RelationshipData, RelationshipObject, ResourceLinks,
        ResourceObject,
    },
    error::format::format_error,
    query::{IncludeTree, SparseFieldsets},
    relation::{Relation, RelationshipField},
    request::Response,
    resource::{Record, ResourceDescriptor},
    Error, Result,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::slice;

pub mod included;

pub use included::IncludedCache;

/// The primary data of a document, before rendering.
#[derive(Clone, Copy, Debug)]
pub enum Primary<'r> {
    One(Option<&'r Record>),
    Many(&'r [Record]),
}

/// Builds documents for one request.
#[derive(Clone, Debug)]
pub struct Renderer<'a> {
    ctx: Context<'a>,
    include: IncludeTree,
    fields: SparseFieldsets,
    links: Option<Map<String, Value>>,
    meta: Map<String, Value>,
}

impl<'a> Renderer<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self {
            ctx,
            include: IncludeTree::default(),
            fields: SparseFieldsets::default(),
            links: None,
            meta: Map::new(),
        }
    }

    /// Include the related resources named by `include` in rendered documents.
    pub fn include(mut self, include: IncludeTree) -> Self {
        self.include = include;
        self
    }

    /// Restrict rendered resource objects to sparse fieldsets.
    pub fn fields(mut self, fields: SparseFieldsets) -> Self {
        self.fields = fields;
        self
    }

    /// Top-level `links`, such as pagination links.
    pub fn links(mut self, links: Map<String, Value>) -> Self {
        self.links.get_or_insert_with(Map::new).extend(links);
        self
    }

    /// Top-level `meta`, such as pagination meta. Root meta of the resource is merged into this.
    pub fn meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta.extend(meta);
        self
    }

    /// Render a compound document whose primary data are records of `resource`.
    pub fn render(&self, resource: &ResourceDescriptor, data: Primary) -> Result<Document> {
        let mut cache = IncludedCache::default();
        let (data, records, many) = match data {
            Primary::One(None) => (PrimaryData::Null, &[][..], false),
            Primary::One(Some(record)) => {
                let object = self.resource_object(record)?;
                self.extract_included(record, &self.include, &mut cache)?;
                (
                    PrimaryData::Resource(Box::new(object)),
                    slice::from_ref(record),
                    false,
                )
            }
            Primary::Many(records) => {
                let mut objects = Vec::with_capacity(records.len());
                for record in records {
                    objects.push(self.resource_object(record)?);
                    self.extract_included(record, &self.include, &mut cache)?;
                }
                (PrimaryData::Collection(objects), records, true)
            }
        };
        cache.remove_primary(&data);

        let mut meta = self.meta.clone();
        meta.extend(resource.document_meta(records, many));
        Ok(Document {
            links: self.links.clone(),
            data,
            included: cache.into_sorted(),
            meta,
        })
    }

    /// Render the linkage of the relation `field` of `owner`, for a relationship endpoint.
    ///
    /// The document carries the relationship's `self` and `related` links at the top level.
    pub fn render_relationship(&self, owner: &Record, field: &str) -> Result<Document> {
        let resource = self.ctx.concrete(&owner.resource)?;
        let relation = resource
            .field(field)
            .and_then(|f| f.relation())
            .ok_or_else(Error::not_found)?;
        let data = match relation.related(owner, field) {
            Some(related) => relation.linkage(&related, &self.ctx)?,
            None if relation.is_to_many() => RelationshipData::Many(vec![]),
            None => RelationshipData::One(None),
        };

        let mut links = self.links.clone().unwrap_or_default();
        if let Some(relationship_links) = relation.links(owner, field, &self.ctx) {
            if let Some(this) = relationship_links.this {
                links.insert("self".into(), this.into());
            }
            if let Some(related) = relationship_links.related {
                links.insert("related".into(), related.into());
            }
        }
        Ok(Document {
            links: (!links.is_empty()).then_some(links),
            data: PrimaryData::from(Some(data)),
            included: vec![],
            meta: self.meta.clone(),
        })
    }

    /// Build the resource object for a single record.
    pub fn resource_object(&self, record: &Record) -> Result<ResourceObject> {
        let resource = self.ctx.concrete(&record.resource)?;
        let ty = self.ctx.type_name(resource);
        Ok(ResourceObject {
            attributes: self.attributes(resource, &ty, record),
            relationships: self.relationships(resource, &ty, record)?,
            links: self.resource_links(resource, record),
            meta: self.resource_meta(resource, record),
            id: record.id.clone(),
            ty,
        })
    }

    fn attributes(
        &self,
        resource: &ResourceDescriptor,
        ty: &str,
        record: &Record,
    ) -> Map<String, Value> {
        let mut attributes = Map::new();
        for field in resource.attributes() {
            if field.write_only || !self.fields.allows(ty, &field.name) {
                continue;
            }
            let value = match record.attribute(&field.name) {
                Some(value) => value.clone(),
                // Read-only values are absent from records of instances that do not exist yet.
                None if field.read_only => continue,
                None => Value::Null,
            };
            attributes.insert(self.ctx.format_field(&field.name), value);
        }
        attributes
    }

    fn relationships(
        &self,
        resource: &ResourceDescriptor,
        ty: &str,
        record: &Record,
    ) -> Result<Option<IndexMap<String, RelationshipObject>>> {
        if !record.exists() {
            return Ok(None);
        }
        let mut relationships = IndexMap::new();
        for (field, relation) in resource.relationships() {
            if field.write_only || !self.fields.allows(ty, &field.name) {
                continue;
            }
            relationships.insert(
                self.ctx.format_field(&field.name),
                self.relationship_object(record, &field.name, relation)?,
            );
        }
        Ok((!relationships.is_empty()).then_some(relationships))
    }

    fn relationship_object(
        &self,
        owner: &Record,
        field: &str,
        relation: &Relation,
    ) -> Result<RelationshipObject> {
        let mut object = RelationshipObject {
            links: relation.links(owner, field, &self.ctx),
            ..Default::default()
        };
        if relation.skip_data() {
            return Ok(object);
        }

        let data = match relation.related(owner, field) {
            Some(related) => relation.linkage(&related, &self.ctx)?,
            None if relation.is_to_many() => RelationshipData::Many(vec![]),
            None => RelationshipData::One(None),
        };
        if let RelationshipData::Many(linkage) = &data {
            object.meta = Some(Map::from_iter([("count".into(), linkage.len().into())]));
        }
        object.data = Some(data);
        Ok(object)
    }

    fn resource_links(
        &self,
        resource: &ResourceDescriptor,
        record: &Record,
    ) -> Option<ResourceLinks> {
        let route = resource.self_route_name()?;
        let id = record.id.as_deref()?;
        let this = self.ctx.routes.reverse(route, &[("pk", id)])?;
        Some(ResourceLinks { this })
    }

    fn resource_meta(
        &self,
        resource: &ResourceDescriptor,
        record: &Record,
    ) -> Option<Map<String, Value>> {
        let mut meta = Map::new();
        for field in resource.meta_fields() {
            if let Some(value) = record.attribute(&field.name) {
                meta.insert(self.ctx.format_field(&field.name), value.clone());
            }
        }
        meta.extend(resource.resource_meta(record));
        (!meta.is_empty()).then_some(meta)
    }

    /// Collect the related resources of `record` named by `include` into `cache`, recursively.
    fn extract_included(
        &self,
        record: &Record,
        include: &IncludeTree,
        cache: &mut IncludedCache,
    ) -> Result<()> {
        if include.is_empty() {
            return Ok(());
        }
        let resource = self.ctx.concrete(&record.resource)?;
        for (name, sub) in include.iter() {
            // Paths through polymorphic relations may only exist on some of the subtypes.
            let Some(relation) = resource.field(name).and_then(|f| f.relation()) else {
                tracing::debug!(
                    resource = resource.name(),
                    field = name,
                    "no such relation, skipping include"
                );
                continue;
            };
            if relation.skip_data() {
                continue;
            }
            let Some(related) = relation.related(record, name) else {
                tracing::debug!(
                    resource = resource.name(),
                    field = name,
                    "relation not resolved, skipping include"
                );
                continue;
            };

            for child in related.records() {
                let Some(id) = &child.id else {
                    continue;
                };
                if !child.loaded {
                    tracing::debug!(
                        resource = %child.resource,
                        %id,
                        "related record not loaded, skipping include"
                    );
                    continue;
                }
                let linkage = Linkage::new(self.ctx.type_of(&child.resource)?, id);
                if !cache.contains(&linkage) {
                    cache.insert(self.resource_object(child)?);
                }
                if !sub.is_empty() && cache.visit(linkage, sub.paths()) {
                    self.extract_included(child, sub, cache)?;
                }
            }
        }
        Ok(())
    }
}

/// Build the response for the outcome of a request.
///
/// A failure becomes an `errors` document with the status of the error. A successful `204 No
/// Content` response always has `null` primary data, whatever was rendered.
pub fn render_response(
    status: u16,
    result: Result<Document>,
    resource: Option<&ResourceDescriptor>,
    ctx: &Context,
) -> Response {
    match result {
        Ok(_) if status == 204 => Response {
            status,
            body: Document::null().to_value(),
        },
        Ok(document) => Response {
            status,
            body: document.to_value(),
        },
        Err(err) => {
            let status = err.status();
            if status >= 500 {
                tracing::error!("request failed: {err}");
            } else {
                tracing::debug!("request rejected: {err}");
            }
            Response {
                status,
                body: format_error(&err, resource, ctx).to_value(),
            }
        }
    }
}
