//! Request handlers.
//!
//! A [`ResourceView`] serves the collection and detail endpoints of one resource, and a
//! [`RelationshipView`] serves its relationship endpoints. Each request passes through the same
//! pipeline: the query parameters are validated and interpreted, the include paths are checked,
//! a [`Query`] is built and extended by the [prefetch planner](crate::prefetch), the records are
//! loaded from the [`DataSource`], paginated, and finally rendered. A failure at any stage aborts
//! the pipeline and is rendered as an `errors` document instead.

use crate::{
    context::Context,
    document::{Document, RelationshipData},
    error::{FieldError, ValidationErrors},
    pagination::Paginator,
    parse::Parser,
    prefetch,
    query::{FilterOp, FilterValue, IncludeTree, QueryOptions, RequestQuery},
    relation::{Relation, RelationshipField},
    render::{render_response, Primary, Renderer},
    request::{Method, Request, Response},
    resource::{AttrType, FieldDescriptor, Record, Related, ResourceDescriptor},
    storage::{DataSource, Query, Search},
    Error, Result,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};

pub mod relationship;

pub use relationship::RelationshipView;

/// Handlers for the collection (`/<type>`) and detail (`/<type>/<id>`) endpoints of a resource.
pub struct ResourceView<'a, D: ?Sized> {
    ctx: Context<'a>,
    resource: &'a ResourceDescriptor,
    source: &'a D,
    options: QueryOptions,
}

impl<'a, D: DataSource + ?Sized> ResourceView<'a, D> {
    /// A view of the resource named `resource`.
    pub fn new(ctx: Context<'a>, resource: &str, source: &'a D) -> Result<Self> {
        Ok(Self {
            ctx,
            resource: ctx.resource(resource)?,
            source,
            options: QueryOptions::default(),
        })
    }

    /// Accept the filters and sort fields described by `options`.
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Dispatch a request to the collection endpoint (`id` is [`None`]) or the detail endpoint.
    pub fn handle(&self, request: &Request, id: Option<&str>) -> Response {
        let result = match (request.method, id) {
            (Method::Get, None) => self.list(request).map(|doc| (200, doc)),
            (Method::Get, Some(id)) => self.retrieve(request, id).map(|doc| (200, doc)),
            (Method::Post, None) => self.create(request).map(|doc| (201, doc)),
            (Method::Patch | Method::Put, Some(id)) => {
                self.update(request, id).map(|doc| (200, doc))
            }
            (Method::Delete, Some(id)) => self.destroy(id).map(|()| (204, Document::null())),
            (method, _) => Err(Error::MethodNotAllowed {
                method: method.to_string(),
            }),
        };
        self.respond(result)
    }

    /// Dispatch a request to the related resource endpoint (`/<type>/<id>/<field>`).
    pub fn handle_related(&self, request: &Request, id: &str, field: &str) -> Response {
        let result = match request.method {
            Method::Get => self.retrieve_related(request, id, field),
            method => Err(Error::MethodNotAllowed {
                method: method.to_string(),
            }),
        };
        self.respond(result.map(|doc| (200, doc)))
    }

    fn respond(&self, result: Result<(u16, Document)>) -> Response {
        let (status, result) = match result {
            Ok((status, doc)) => (status, Ok(doc)),
            Err(err) => (err.status(), Err(err)),
        };
        render_response(status, result, Some(self.resource), &self.ctx)
    }

    /// Render a page of the collection.
    pub fn list(&self, request: &Request) -> Result<Document> {
        let query = RequestQuery::parse(&request.query, self.resource, &self.options, &self.ctx)?;
        let mut base = Query::new(self.resource.name());
        for filter in query.filters {
            match (filter.op, filter.value) {
                (FilterOp::Search, FilterValue::Single(term)) => {
                    base.search = Some(Search {
                        fields: self.options.filters.search_fields(),
                        term,
                    })
                }
                (op, value) => base.filters.push(crate::query::Filter {
                    path: filter.path,
                    op,
                    value,
                }),
            }
        }
        base.ordering = query.sort;

        let count = self.source.count(&base).map_err(Error::server)?;
        let page =
            Paginator::new(self.ctx.config).paginate(&request.query, count, &request.url)?;
        if let Some(page) = &page {
            base.window = Some(page.window);
        }
        let planned = prefetch::plan(
            self.resource,
            base,
            &query.fields,
            &query.include,
            self.source,
            &self.ctx,
        )?;
        let records = self.source.fetch(&planned).map_err(Error::server)?;

        let mut renderer = Renderer::new(self.ctx)
            .include(query.include)
            .fields(query.fields);
        if let Some(page) = page {
            renderer = renderer.links(page.links).meta(page.meta);
        }
        renderer.render(self.resource, Primary::Many(&records))
    }

    /// Render a single resource.
    pub fn retrieve(&self, request: &Request, id: &str) -> Result<Document> {
        let query = RequestQuery::parse(&request.query, self.resource, &self.options, &self.ctx)?;
        let record = self.fetch(id, &query)?;
        Renderer::new(self.ctx)
            .include(query.include)
            .fields(query.fields)
            .render(self.resource, Primary::One(Some(&record)))
    }

    /// Create a resource from the request document and render it.
    pub fn create(&self, request: &Request) -> Result<Document> {
        let parsed = Parser::new(self.ctx).parse(
            request.body.as_deref().unwrap_or_default(),
            Method::Post,
            self.resource,
            None,
        )?;
        let record = self.to_record(parsed, None, false)?;
        let saved = self.source.save(record).map_err(Error::server)?;
        let id = saved
            .id
            .ok_or_else(|| Error::server("data source did not assign an id"))?;
        tracing::debug!(resource = self.resource.name(), %id, "created");
        self.retrieve(request, &id)
    }

    /// Update a resource from the request document and render it.
    ///
    /// `PATCH` updates only the fields present in the document; `PUT` requires every field.
    pub fn update(&self, request: &Request, id: &str) -> Result<Document> {
        let existing = self.fetch(id, &RequestQuery::default())?;
        let parsed = Parser::new(self.ctx).parse(
            request.body.as_deref().unwrap_or_default(),
            request.method,
            self.resource,
            Some(id),
        )?;
        let record = self.to_record(parsed, Some(id.into()), request.method == Method::Patch)?;
        if record.resource != existing.resource {
            return Err(Error::conflict(format!(
                "The resource object's type ({}) does not match the type of resource {id} ({}).",
                self.ctx.type_of(&record.resource)?,
                self.ctx.type_of(&existing.resource)?,
            )));
        }
        self.source.save(record).map_err(Error::server)?;
        self.retrieve(request, id)
    }

    pub fn destroy(&self, id: &str) -> Result<()> {
        if self
            .source
            .delete(self.resource.name(), id)
            .map_err(Error::server)?
        {
            Ok(())
        } else {
            Err(Error::not_found())
        }
    }

    /// Render the resource(s) related to `id` through the relationship named `segment` in the URL.
    ///
    /// The query parameters apply to the related resource.
    pub fn retrieve_related(&self, request: &Request, id: &str, segment: &str) -> Result<Document> {
        let (field, relation) = relationship_by_segment(self.resource, segment, &self.ctx)?;
        let targets = relation
            .targets()
            .into_iter()
            .map(|target| self.ctx.resource(target))
            .collect::<Result<Vec<_>>>()?;
        let Some(target) = targets.first().copied() else {
            return Err(Error::not_found());
        };
        let query =
            RequestQuery::parse_any(&request.query, &targets, &QueryOptions::default(), &self.ctx)?;

        // Load the related records, and whatever they include, along with the owner.
        let mut include = IncludeTree::default();
        include.insert([field.name.clone()]);
        graft(&mut include, &field.name, &query.include);
        let owner_query = RequestQuery {
            include,
            fields: query.fields.clone(),
            ..Default::default()
        };
        let owner = self.fetch(id, &owner_query)?;

        let renderer = Renderer::new(self.ctx)
            .include(query.include)
            .fields(query.fields);
        let related = relation.related(&owner, &field.name);
        match related.as_deref() {
            Some(Related::Many(records)) => renderer.render(target, Primary::Many(records)),
            Some(Related::One(record)) => renderer.render(target, Primary::One(record.as_deref())),
            None if relation.is_to_many() => renderer.render(target, Primary::Many(&[])),
            None => renderer.render(target, Primary::One(None)),
        }
    }

    /// Load the record `id`, with the relations and fields requested by `query`.
    fn fetch(&self, id: &str, query: &RequestQuery) -> Result<Record> {
        let planned = prefetch::plan(
            self.resource,
            Query::new(self.resource.name()).id(id),
            &query.fields,
            &query.include,
            self.source,
            &self.ctx,
        )?;
        self.source
            .fetch(&planned)
            .map_err(Error::server)?
            .into_iter()
            .next()
            .ok_or_else(Error::not_found)
    }

    /// Validate a parsed resource and convert it to a record for storage.
    ///
    /// With `partial`, fields missing from the document are left alone rather than required.
    /// Read-only fields are ignored.
    fn to_record(
        &self,
        parsed: Map<String, Value>,
        id: Option<String>,
        partial: bool,
    ) -> Result<Record> {
        let ty = parsed.get("type").and_then(Value::as_str).unwrap_or_default();
        let resource = self
            .ctx
            .registry
            .concrete(self.resource)
            .into_iter()
            .find(|r| self.ctx.type_name(r) == ty)
            .unwrap_or(self.resource);

        let mut record = Record {
            resource: resource.name().into(),
            id,
            attributes: Map::new(),
            relations: IndexMap::new(),
            loaded: true,
        };
        let mut errors = ValidationErrors::default();
        for field in resource.attributes() {
            if field.read_only {
                continue;
            }
            match parsed.get(&field.name) {
                None if partial || field.nullable => {}
                None => errors.add(&field.name, required()),
                Some(Value::Null) if !field.nullable => errors.add(&field.name, not_null()),
                Some(value) => match type_error(field, value) {
                    Some(error) => errors.add(&field.name, error),
                    None => {
                        record.attributes.insert(field.name.clone(), value.clone());
                    }
                },
            }
        }
        for (field, relation) in resource.relationships() {
            if field.read_only {
                continue;
            }
            match parsed.get(&field.name) {
                None if partial || field.nullable || relation.is_to_many() => {}
                None => errors.add(&field.name, required()),
                Some(Value::Null) if !field.nullable && !relation.is_to_many() => {
                    errors.add(&field.name, not_null())
                }
                Some(value) => {
                    let related = relation
                        .parse_data(value, &self.ctx)
                        .and_then(|data| resolve_linkage(&data, relation, self.source, &self.ctx));
                    match related {
                        Ok(related) => {
                            record.relations.insert(field.name.clone(), related);
                        }
                        Err(Error::Validation { errors: nested }) => {
                            errors.nest(field.name.clone(), nested)
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        errors.into_result()?;
        Ok(record)
    }
}

/// Render the API root: `null` data and a link to every collection endpoint.
///
/// Collection endpoints are the routes named `<name>-list`; each is linked under `<name>`.
pub fn api_root(ctx: &Context) -> Document {
    let links = ctx
        .routes
        .iter()
        .filter_map(|(name, _)| {
            let key = name.strip_suffix("-list")?;
            Some((key.to_string(), Value::from(ctx.routes.reverse(name, &[])?)))
        })
        .collect::<Map<_, _>>();
    Document {
        links: Some(links),
        ..Document::null()
    }
}

/// Add `sub` below the top-level path `field` of `tree`.
fn graft(tree: &mut IncludeTree, field: &str, sub: &IncludeTree) {
    for path in sub.paths() {
        tree.insert(
            std::iter::once(field.to_string()).chain(path.split('.').map(String::from)),
        );
    }
}

/// Find a relationship by its name as it appears in URLs.
pub(crate) fn relationship_by_segment<'r>(
    resource: &'r ResourceDescriptor,
    segment: &str,
    ctx: &Context,
) -> Result<(&'r FieldDescriptor, &'r Relation)> {
    resource
        .relationships()
        .find(|(field, _)| field.name == segment || ctx.format_link_segment(&field.name) == segment)
        .ok_or_else(Error::not_found)
}

/// Turn parsed resource linkage into related stubs, checking that every record exists.
pub(crate) fn resolve_linkage<D: DataSource + ?Sized>(
    data: &RelationshipData,
    relation: &Relation,
    source: &D,
    ctx: &Context,
) -> Result<Related> {
    let mut stubs = vec![];
    let mut errors = vec![];
    for linkage in data.linkages() {
        let resource = ctx
            .resource_by_type(&linkage.ty)
            .ok_or_else(|| Error::configuration(format!("no resource has type {}", linkage.ty)))?;
        let found = source
            .fetch(&Query {
                only: Some(vec![]),
                ..Query::new(resource.name()).id(&linkage.id)
            })
            .map_err(Error::server)?;
        if found.is_empty() {
            errors.push(ValidationErrors::Messages(vec![FieldError::new(
                "does_not_exist",
                format!("Invalid pk \"{}\" - object does not exist.", linkage.id),
            )]));
        } else {
            errors.push(ValidationErrors::Messages(vec![]));
        }
        stubs.push(Record::stub(resource.name(), &linkage.id));
    }

    if errors.iter().any(|e| !e.is_empty()) {
        return Err(if relation.is_to_many() {
            ValidationErrors::List(errors).into()
        } else {
            errors.remove(0).into()
        });
    }
    Ok(match data {
        RelationshipData::Many(_) => Related::Many(stubs),
        RelationshipData::One(_) => Related::One(stubs.into_iter().next().map(Box::new)),
    })
}

fn required() -> FieldError {
    FieldError::new("required", "This field is required.")
}

fn not_null() -> FieldError {
    FieldError::new("null", "This field may not be null.")
}

fn type_error(field: &FieldDescriptor, value: &Value) -> Option<FieldError> {
    let ty = field.attr_type()?;
    let ok = match ty {
        AttrType::Any => true,
        _ if value.is_null() => true,
        AttrType::String => value.is_string(),
        AttrType::Integer => value.is_i64() || value.is_u64(),
        AttrType::Number => value.is_number(),
        AttrType::Boolean => value.is_boolean(),
        AttrType::Object => value.is_object(),
        AttrType::Array => value.is_array(),
    };
    (!ok).then(|| {
        FieldError::new(
            "invalid",
            format!(
                "Incorrect type. Expected {ty}, received {}.",
                crate::relation::json_type(value)
            ),
        )
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        config::{Config, PaginationStyle},
        fixtures::{self, author, blog, comment, entry, Fixture},
        inflection::Format,
        query::FilterSet,
        storage::mock::MockDataSource,
    };
    use serde_json::json;
    use url::Url;

    fn fixture() -> Fixture {
        Fixture::with_config(
            Config::default()
                .with_field_names(Format::Camelize)
                .with_type_names(Format::Camelize, true)
                .with_pagination(PaginationStyle::PageNumber, 2, 10),
        )
    }

    fn source() -> MockDataSource {
        let source = MockDataSource::new(&fixtures::registry());
        source
            .insert([
                blog(1),
                blog(2),
                author(1),
                author(2),
                entry(1, Some(blog(1)), vec![author(1)]),
                entry(2, Some(blog(1)), vec![author(1), author(2)]),
                entry(3, Some(blog(2)), vec![]),
                comment(1, Some(author(2))).with_one("entry", Some(Record::stub("Entry", "1"))),
            ])
            .unwrap();
        source
            .set_relation(
                "Entry",
                "1",
                "comments",
                Related::Many(vec![Record::stub("Comment", "1")]),
            )
            .unwrap();
        for (author, entries) in [("1", vec!["1", "2"]), ("2", vec!["2"])] {
            source
                .set_relation(
                    "Author",
                    author,
                    "entries",
                    Related::Many(
                        entries
                            .into_iter()
                            .map(|id| Record::stub("Entry", id))
                            .collect(),
                    ),
                )
                .unwrap();
        }
        source.reset_queries();
        source
    }

    fn request(method: Method, path: &str) -> Request {
        Request::new(
            method,
            Url::parse(&format!("http://testserver{path}")).unwrap(),
        )
    }

    fn entries<'a>(
        fixture: &'a Fixture,
        source: &'a MockDataSource,
    ) -> ResourceView<'a, MockDataSource> {
        ResourceView::new(fixture.context(), "Entry", source)
            .unwrap()
            .with_options(QueryOptions {
                filters: FilterSet::new()
                    .field("headline", [FilterOp::Exact, FilterOp::IContains])
                    .field("blog__name", [FilterOp::Exact])
                    .search(["headline", "blog.name"]),
                ..Default::default()
            })
    }

    #[test]
    fn test_list_paginated_with_includes() {
        let fixture = fixture();
        let source = source();
        let view = entries(&fixture, &source);
        let response = view.handle(
            &request(Method::Get, "/entries?include=authors,blog&sort=-id"),
            None,
        );
        assert_eq!(response.status, 200, "{}", response.body);
        let body = response.body;
        assert_eq!(
            body["data"]
                .as_array()
                .unwrap()
                .iter()
                .map(|e| e["id"].as_str().unwrap())
                .collect::<Vec<_>>(),
            ["3", "2"]
        );
        assert_eq!(
            body["meta"]["pagination"],
            json!({"page": 1, "pages": 2, "count": 3})
        );
        assert_eq!(
            body["links"]["next"],
            "http://testserver/entries?include=authors%2Cblog&sort=-id&page%5Bnumber%5D=2"
        );
        assert_eq!(
            body["included"]
                .as_array()
                .unwrap()
                .iter()
                .map(|o| format!("{}:{}", o["type"].as_str().unwrap(), o["id"].as_str().unwrap()))
                .collect::<Vec<_>>(),
            ["authors:1", "authors:2", "blogs:1", "blogs:2"]
        );
        // One count, one page of entries joined with blogs, one prefetch of authors.
        assert_eq!(source.queries(), 3);
    }

    #[test]
    fn test_list_filters_and_search() {
        let fixture = fixture();
        let source = source();
        let view = entries(&fixture, &source);

        let response = view.handle(
            &request(Method::Get, "/entries?filter[blog.name]=Blog%202"),
            None,
        );
        assert_eq!(response.body["data"][0]["id"], "3");
        assert_eq!(response.body["data"].as_array().unwrap().len(), 1);

        let response = view.handle(
            &request(Method::Get, "/entries?filter[search]=headline%201"),
            None,
        );
        assert_eq!(response.body["data"].as_array().unwrap().len(), 1);

        let response = view.handle(&request(Method::Get, "/entries?filter[bodyText]=x"), None);
        assert_eq!(response.status, 400);
        assert_eq!(
            response.body,
            json!({"errors": [{
                "status": "400",
                "code": "invalid",
                "detail": "invalid filter[bodyText]",
                "source": {"parameter": "filter[bodyText]"},
            }]})
        );
        assert_eq!(source.queries(), 2 * 2);
    }

    #[test]
    fn test_invalid_query_never_touches_storage() {
        let fixture = fixture();
        let source = source();
        let view = entries(&fixture, &source);
        for (path, status) in [
            ("/entries?include=suggested", 400),
            ("/entries?sort=nonesuch", 400),
            ("/entries?include=blog&include=authors", 400),
            ("/entries?page[number]=9", 404),
        ] {
            let response = view.handle(&request(Method::Get, path), None);
            assert_eq!(response.status, status, "{path}: {}", response.body);
            assert!(response.body.get("data").is_none());
        }
        // Only the out-of-range page counted the collection.
        assert_eq!(source.queries(), 1);
    }

    #[test]
    fn test_retrieve() {
        let fixture = fixture();
        let source = source();
        let view = entries(&fixture, &source);
        let response = view.handle(
            &request(
                Method::Get,
                "/entries/1?include=comments.author&fields[entries]=headline,comments",
            ),
            Some("1"),
        );
        assert_eq!(response.status, 200, "{}", response.body);
        assert_eq!(
            response.body["data"]["attributes"],
            json!({"headline": "Headline 1"})
        );
        assert_eq!(
            response.body["data"]["relationships"],
            json!({"comments": {"data": [{"type": "comments", "id": "1"}], "meta": {"count": 1}}})
        );
        assert_eq!(response.body["included"].as_array().unwrap().len(), 2);

        let response = view.handle(&request(Method::Get, "/entries/9"), Some("9"));
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_create() {
        let fixture = fixture();
        let source = source();
        let view = entries(&fixture, &source);
        let body = json!({"data": {
            "type": "entries",
            "attributes": {"headline": "New", "bodyText": "Text", "secret": "s"},
            "relationships": {
                "blog": {"data": {"type": "blogs", "id": "2"}},
                "authors": {"data": [{"type": "authors", "id": "1"}]},
            },
        }});
        let response = view.handle(
            &request(Method::Post, "/entries?include=blog").with_json(&body),
            None,
        );
        assert_eq!(response.status, 201, "{}", response.body);
        assert_eq!(response.body["data"]["id"], "4");
        assert_eq!(response.body["data"]["attributes"]["headline"], "New");
        assert!(response.body["data"]["attributes"].get("secret").is_none());
        assert_eq!(response.body["included"][0]["id"], "2");
    }

    #[test]
    fn test_create_validation_errors() {
        let fixture = fixture();
        let source = source();
        let view = entries(&fixture, &source);
        let body = json!({"data": {
            "type": "entries",
            "attributes": {"headline": 7, "bodyText": null},
            "relationships": {
                "authors": {"data": [
                    {"type": "authors", "id": "1"},
                    {"type": "authors", "id": "99"},
                ]},
            },
        }});
        let response = view.handle(&request(Method::Post, "/entries").with_json(&body), None);
        assert_eq!(response.status, 400);
        assert_eq!(
            response.body,
            json!({"errors": [
                {
                    "status": "400",
                    "code": "null",
                    "detail": "This field may not be null.",
                    "source": {"pointer": "/data/attributes/bodyText"},
                },
                {
                    "status": "400",
                    "code": "invalid",
                    "detail": "Incorrect type. Expected string, received number.",
                    "source": {"pointer": "/data/attributes/headline"},
                },
                {
                    "status": "400",
                    "code": "required",
                    "detail": "This field is required.",
                    "source": {"pointer": "/data/attributes/secret"},
                },
                {
                    "status": "400",
                    "code": "does_not_exist",
                    "detail": "Invalid pk \"99\" - object does not exist.",
                    "source": {"pointer": "/data/relationships/authors/1"},
                },
                {
                    "status": "400",
                    "code": "required",
                    "detail": "This field is required.",
                    "source": {"pointer": "/data/relationships/blog"},
                },
            ]})
        );
    }

    #[test]
    fn test_create_conflicting_relationship_type() {
        let fixture = fixture();
        let source = source();
        let view = entries(&fixture, &source);
        let body = json!({"data": {
            "type": "entries",
            "attributes": {"headline": "New", "bodyText": "Text", "secret": "s"},
            "relationships": {"blog": {"data": {"type": "authors", "id": "1"}}},
        }});
        let response = view.handle(&request(Method::Post, "/entries").with_json(&body), None);
        assert_eq!(response.status, 409);
        assert_eq!(
            response.body["errors"][0]["detail"],
            "Incorrect relation type. Expected blogs, received authors."
        );
    }

    #[test]
    fn test_update() {
        let fixture = fixture();
        let source = source();
        let view = entries(&fixture, &source);
        let body = json!({"data": {
            "type": "entries",
            "id": "2",
            "attributes": {"headline": "Changed", "created": "ignored"},
        }});
        let response = view.handle(
            &request(Method::Patch, "/entries/2").with_json(&body),
            Some("2"),
        );
        assert_eq!(response.status, 200, "{}", response.body);
        let attributes = &response.body["data"]["attributes"];
        assert_eq!(attributes["headline"], "Changed");
        assert_eq!(attributes["bodyText"], "Body 2");
        assert_eq!(attributes["created"], "2020-01-01");
        assert_eq!(
            response.body["data"]["relationships"]["authors"]["meta"]["count"],
            2
        );

        // A full update needs every field.
        let response = view.handle(&request(Method::Put, "/entries/2").with_json(&body), Some("2"));
        assert_eq!(response.status, 400);

        let response = view.handle(
            &request(Method::Patch, "/entries/1").with_json(&body),
            Some("1"),
        );
        assert_eq!(response.status, 409);
    }

    #[test]
    fn test_destroy() {
        let fixture = fixture();
        let source = source();
        let view = entries(&fixture, &source);
        let response = view.handle(&request(Method::Delete, "/entries/1"), Some("1"));
        assert_eq!(response.status, 204);
        assert_eq!(response.body, json!({"data": null}));
        let response = view.handle(&request(Method::Delete, "/entries/1"), Some("1"));
        assert_eq!(response.status, 404);

        let response = view.handle(&request(Method::Delete, "/entries"), None);
        assert_eq!(response.status, 405);
        assert_eq!(
            response.body["errors"][0]["detail"],
            "Method \"DELETE\" not allowed."
        );
    }

    #[test]
    fn test_retrieve_related() {
        let fixture = fixture();
        let source = source();
        let view = entries(&fixture, &source);
        let response = view.handle_related(
            &request(Method::Get, "/entries/2/authors?include=entries"),
            "2",
            "authors",
        );
        assert_eq!(response.status, 200, "{}", response.body);
        assert_eq!(
            response.body["data"]
                .as_array()
                .unwrap()
                .iter()
                .map(|a| a["type"].as_str().unwrap())
                .collect::<Vec<_>>(),
            ["authors", "authors"]
        );
        // Entry 2 is related to both authors; entry 1 only to the first.
        assert_eq!(response.body["included"].as_array().unwrap().len(), 2);

        let response = view.handle_related(&request(Method::Get, "/entries/1/blog"), "1", "blog");
        assert_eq!(response.body["data"]["type"], "blogs");
        assert_eq!(response.body["data"]["id"], "1");

        let response =
            view.handle_related(&request(Method::Get, "/entries/1/headline"), "1", "headline");
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_retrieve_related_across_targets() {
        let fixture = fixture();
        let source = source();
        source
            .insert([
                Record::new("ArtProject", "1").with_attribute("artist", "Monet"),
                Record::new("ResearchProject", "2").with_attribute("supervisor", "Ferris"),
                Record::new("Company", "1").with_many(
                    "portfolio",
                    vec![
                        Record::stub("ArtProject", "1"),
                        Record::stub("ResearchProject", "2"),
                    ],
                ),
            ])
            .unwrap();
        let view = ResourceView::new(fixture.context(), "Company", &source).unwrap();

        // Sort fields of any target are accepted.
        let response = view.handle_related(
            &request(Method::Get, "/companies/1/portfolio?sort=supervisor"),
            "1",
            "portfolio",
        );
        assert_eq!(response.status, 200, "{}", response.body);
        assert_eq!(
            response.body["data"],
            json!([
                {
                    "type": "artProjects",
                    "id": "1",
                    "attributes": {"topic": null, "artist": "Monet"},
                },
                {
                    "type": "researchProjects",
                    "id": "2",
                    "attributes": {"topic": null, "supervisor": "Ferris"},
                },
            ])
        );

        let response = view.handle_related(
            &request(Method::Get, "/companies/1/portfolio?sort=nonesuch"),
            "1",
            "portfolio",
        );
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_api_root() {
        let fixture = fixture();
        assert_eq!(
            api_root(&fixture.context()).to_value(),
            json!({
                "links": {"entry": "/entries", "blog": "/blogs"},
                "data": null,
            })
        );
    }
}
