//! Handlers for relationship endpoints, `/<type>/<id>/relationships/<field>`.

use super::{not_null, relationship_by_segment, resolve_linkage};
use crate::{
    context::Context,
    document::{Document, RelationshipData},
    error::ValidationErrors,
    parse::Parser,
    relation::{Relation, RelationshipField},
    render::{render_response, Renderer},
    request::{Method, Request, Response},
    resource::{FieldDescriptor, Record, Related, ResourceDescriptor},
    storage::{DataSource, Query},
    Error, Result,
};

/// Handlers for the relationship endpoints of a resource.
///
/// `GET` renders the resource linkage of the relationship. `PATCH` replaces it entirely. For
/// to-many relationships, `POST` adds members and `DELETE` removes them.
pub struct RelationshipView<'a, D: ?Sized> {
    ctx: Context<'a>,
    resource: &'a ResourceDescriptor,
    source: &'a D,
}

impl<'a, D: DataSource + ?Sized> RelationshipView<'a, D> {
    pub fn new(ctx: Context<'a>, resource: &str, source: &'a D) -> Result<Self> {
        Ok(Self {
            ctx,
            resource: ctx.resource(resource)?,
            source,
        })
    }

    /// Dispatch a request for the relationship named `segment` of the record `id`.
    pub fn handle(&self, request: &Request, id: &str, segment: &str) -> Response {
        let result = relationship_by_segment(self.resource, segment, &self.ctx).and_then(
            |(field, relation)| match request.method {
                Method::Get => self.retrieve(id, field).map(|doc| (200, doc)),
                Method::Patch => self
                    .replace(request, id, field, relation)
                    .map(|doc| (200, doc)),
                Method::Post if relation.is_to_many() => self
                    .add(request, id, field, relation)
                    .map(|doc| (200, doc)),
                Method::Delete if relation.is_to_many() => self
                    .remove(request, id, field, relation)
                    .map(|()| (204, Document::null())),
                method => Err(Error::MethodNotAllowed {
                    method: method.to_string(),
                }),
            },
        );
        let (status, result) = match result {
            Ok((status, doc)) => (status, Ok(doc)),
            Err(err) => (err.status(), Err(err)),
        };
        render_response(status, result, None, &self.ctx)
    }

    fn retrieve(&self, id: &str, field: &FieldDescriptor) -> Result<Document> {
        let owner = self.owner(id)?;
        Renderer::new(self.ctx).render_relationship(&owner, &field.name)
    }

    /// Replace the whole relationship. A to-one relationship may be cleared with `null`.
    fn replace(
        &self,
        request: &Request,
        id: &str,
        field: &FieldDescriptor,
        relation: &Relation,
    ) -> Result<Document> {
        let data = self.parse(request, field, relation)?;
        if matches!(data, RelationshipData::One(None)) && !field.nullable {
            return Err(ValidationErrors::Messages(vec![not_null()]).into());
        }
        // Make sure the owner exists before touching the relation.
        self.owner(id)?;
        let related = resolve_linkage(&data, relation, self.source, &self.ctx)?;
        self.store(id, field, related)?;
        self.retrieve(id, field)
    }

    /// Add members to a to-many relationship. Members which are already present are kept once.
    fn add(
        &self,
        request: &Request,
        id: &str,
        field: &FieldDescriptor,
        relation: &Relation,
    ) -> Result<Document> {
        let data = self.parse(request, field, relation)?;
        let owner = self.owner(id)?;
        let added = resolve_linkage(&data, relation, self.source, &self.ctx)?;
        let mut members = self.members(&owner, field, relation);
        for record in added.records() {
            if !members.iter().any(|m| same(m, record)) {
                members.push(record.clone());
            }
        }
        self.store(id, field, Related::Many(members))?;
        self.retrieve(id, field)
    }

    /// Remove members from a to-many relationship. Members which are not present are ignored.
    fn remove(
        &self,
        request: &Request,
        id: &str,
        field: &FieldDescriptor,
        relation: &Relation,
    ) -> Result<()> {
        let data = self.parse(request, field, relation)?;
        let owner = self.owner(id)?;
        let removed = resolve_linkage(&data, relation, self.source, &self.ctx)?;
        let mut members = self.members(&owner, field, relation);
        members.retain(|m| !removed.records().any(|r| same(m, r)));
        self.store(id, field, Related::Many(members))
    }

    /// Parse the linkage in the request body, refusing writes to read-only relationships.
    fn parse(
        &self,
        request: &Request,
        field: &FieldDescriptor,
        relation: &Relation,
    ) -> Result<RelationshipData> {
        if field.read_only {
            return Err(Error::MethodNotAllowed {
                method: request.method.to_string(),
            });
        }
        let data = Parser::new(self.ctx)
            .parse_relationship(request.body.as_deref().unwrap_or_default())?;
        relation.parse_data(&data, &self.ctx)
    }

    fn owner(&self, id: &str) -> Result<Record> {
        self.source
            .fetch(&Query::new(self.resource.name()).id(id))
            .map_err(Error::server)?
            .into_iter()
            .next()
            .ok_or_else(Error::not_found)
    }

    fn members(&self, owner: &Record, field: &FieldDescriptor, relation: &Relation) -> Vec<Record> {
        relation
            .related(owner, &field.name)
            .map(|related| related.records().cloned().collect())
            .unwrap_or_default()
    }

    fn store(&self, id: &str, field: &FieldDescriptor, related: Related) -> Result<()> {
        tracing::debug!(
            resource = self.resource.name(),
            id,
            field = %field.name,
            count = related.count(),
            "updating relationship"
        );
        self.source
            .set_relation(self.resource.name(), id, &field.name, related)
            .map_err(Error::server)
    }
}

fn same(a: &Record, b: &Record) -> bool {
    a.resource == b.resource && a.id == b.id
}
