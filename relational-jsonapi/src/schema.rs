//! OpenAPI descriptions of a JSON:API.
//!
//! [`SchemaGenerator`] produces an OpenAPI 3.0 document as a [`serde_json::Value`]. The document
//! has three parts:
//!
//! * shared component schemas describing the JSON:API document structure (`jsonapi`, `resource`,
//!   `link`, `links`, `linkage`, `relationshipToOne`, `relationshipToMany`, `failure`, `error` and
//!   a few helpers);
//! * one component schema per registered resource, named after the resource;
//! * a path item per endpoint, with the query parameters the endpoint accepts.
//!
//! Endpoints are either added explicitly or discovered from the named routes of the API, where
//! routes named `<resource>-list`, `<resource>-detail`, `<resource>-related` and
//! `<resource>-relationships` describe the collection, detail, related resource and relationship
//! endpoints of a resource.

use crate::{
    config::PaginationStyle,
    context::Context,
    inflection::underscore,
    pagination::{PAGE_LIMIT, PAGE_NUMBER, PAGE_OFFSET, PAGE_SIZE},
    query::{default_sortable, FilterOp, QueryOptions},
    relation::{Relation, RelationshipField},
    resource::{AttrType, FieldDescriptor, ResourceDescriptor},
    Error, Result, MEDIA_TYPE,
};
use convert_case::{Case, Casing};
use itertools::Itertools;
use serde_json::{json, Map, Value};

pub const OPENAPI_VERSION: &str = "3.0.2";

/// What an endpoint serves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndpointKind {
    /// `/<type>`: list and create.
    Collection,
    /// `/<type>/<id>`: retrieve, update and destroy.
    Detail,
    /// `/<type>/<id>/<field>`: the related resource(s) of a relationship.
    Related(String),
    /// `/<type>/<id>/relationships/<field>`: the linkage of a relationship.
    Relationship(String),
}

/// An endpoint to describe.
#[derive(Clone, Debug)]
pub struct Endpoint {
    /// The path template, with `{name}` placeholders for path parameters.
    pub path: String,
    pub resource: String,
    pub kind: EndpointKind,
    /// Filters and sort fields accepted by a collection endpoint.
    pub options: QueryOptions,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, resource: impl Into<String>, kind: EndpointKind) -> Self {
        Self {
            path: path.into(),
            resource: resource.into(),
            kind,
            options: QueryOptions::default(),
        }
    }

    pub fn collection(path: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::new(path, resource, EndpointKind::Collection)
    }

    pub fn detail(path: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::new(path, resource, EndpointKind::Detail)
    }

    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }
}

/// Builds an OpenAPI document for the resources and endpoints of an API.
pub struct SchemaGenerator<'a> {
    ctx: Context<'a>,
    title: String,
    version: String,
    description: Option<String>,
    endpoints: Vec<Endpoint>,
}

impl<'a> SchemaGenerator<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self {
            ctx,
            title: "JSON:API".into(),
            version: "1.0.0".into(),
            description: None,
            endpoints: vec![],
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Add an endpoint for every route which follows the naming convention.
    ///
    /// A route prefix names a resource in dashed lower case, e.g. `blog-entry` for `BlogEntry`.
    /// Related and relationship routes must have a `{related_field}` placeholder; one endpoint is
    /// added for each relationship of the resource.
    pub fn routes(mut self) -> Self {
        let ctx = self.ctx;
        for (name, template) in ctx.routes.iter() {
            let Some((prefix, suffix)) = name.rsplit_once('-') else {
                continue;
            };
            let Some(resource) = ctx
                .registry
                .iter()
                .find(|r| underscore(r.name()).replace('_', "-") == prefix)
            else {
                tracing::debug!(name, "route does not name a resource");
                continue;
            };
            match suffix {
                "list" => self
                    .endpoints
                    .push(Endpoint::collection(template, resource.name())),
                "detail" => self
                    .endpoints
                    .push(Endpoint::detail(template, resource.name())),
                "related" | "relationships" if template.contains("{related_field}") => {
                    for (field, _) in resource.relationships() {
                        let path = template
                            .replace("{related_field}", &ctx.format_link_segment(&field.name));
                        let kind = if suffix == "related" {
                            EndpointKind::Related(field.name.clone())
                        } else {
                            EndpointKind::Relationship(field.name.clone())
                        };
                        self.endpoints
                            .push(Endpoint::new(path, resource.name(), kind));
                    }
                }
                _ => tracing::debug!(name, "route is not a JSON:API endpoint"),
            }
        }
        self
    }

    /// Generate the document.
    ///
    /// Fails if an endpoint names an unknown resource or relationship.
    pub fn generate(&self) -> Result<Value> {
        let mut paths = Map::new();
        for endpoint in &self.endpoints {
            let operations = self.operations(endpoint)?;
            let item = paths
                .entry(endpoint.path.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(item) = item {
                item.extend(operations);
            }
        }

        let mut schemas = components();
        for resource in self.ctx.registry.iter() {
            schemas.insert(resource.name().into(), self.resource_schema(resource));
        }

        let mut info = json!({"title": self.title, "version": self.version});
        if let Some(description) = &self.description {
            info["description"] = description.as_str().into();
        }
        Ok(json!({
            "openapi": OPENAPI_VERSION,
            "info": info,
            "paths": paths,
            "components": {"schemas": schemas},
        }))
    }

    fn resource_schema(&self, resource: &ResourceDescriptor) -> Value {
        if resource.is_polymorphic() {
            return json!({
                "oneOf": resource.subtypes().iter().map(|s| reference(s)).collect::<Vec<_>>(),
            });
        }

        let mut attributes = Map::new();
        let mut required = vec![];
        for field in resource.attributes() {
            let name = self.ctx.format_field(&field.name);
            if !field.nullable && !field.read_only {
                required.push(name.clone());
            }
            let schema = attr_schema(field.attr_type().unwrap_or_default());
            attributes.insert(name, flagged(schema, field));
        }
        let mut attributes = json!({"type": "object", "properties": attributes});
        if !required.is_empty() {
            attributes["required"] = required.into();
        }

        let relationships = resource
            .relationships()
            .map(|(field, relation)| {
                (
                    self.ctx.format_field(&field.name),
                    flagged(relationship_schema(relation), field),
                )
            })
            .collect::<Map<_, _>>();

        let mut properties = Map::from_iter([
            (
                "type".into(),
                json!({"type": "string", "enum": [self.ctx.type_name(resource)]}),
            ),
            ("id".into(), reference("id")),
            (
                "links".into(),
                json!({"type": "object", "properties": {"self": reference("link")}}),
            ),
            ("attributes".into(), attributes),
        ]);
        if !relationships.is_empty() {
            properties.insert(
                "relationships".into(),
                json!({"type": "object", "properties": relationships}),
            );
        }
        let meta = resource
            .meta_fields()
            .map(|field| {
                (
                    self.ctx.format_field(&field.name),
                    flagged(attr_schema(field.attr_type().unwrap_or_default()), field),
                )
            })
            .collect::<Map<_, _>>();
        if !meta.is_empty() {
            properties.insert(
                "meta".into(),
                json!({"type": "object", "properties": meta}),
            );
        }

        json!({
            "type": "object",
            "required": ["type", "id"],
            "additionalProperties": false,
            "properties": properties,
        })
    }

    fn operations(&self, endpoint: &Endpoint) -> Result<Map<String, Value>> {
        let resource = self.ctx.resource(&endpoint.resource)?;
        let name = resource.name();
        let path_params = path_parameters(&endpoint.path);

        let operations = match &endpoint.kind {
            EndpointKind::Collection => {
                let mut params = path_params;
                params.extend(self.fetch_parameters(resource));
                params.extend(self.sort_parameters(resource, &endpoint.options));
                params.extend(filter_parameters(&endpoint.options, &self.ctx));
                params.extend(self.page_parameters());
                vec![
                    (
                        "get",
                        operation(
                            format!("list{name}"),
                            format!("List {name} resources"),
                            params,
                            None,
                            responses([
                                ("200", data_response(collection_of(reference(name)))),
                                ("400", failure("invalid query parameters")),
                                ("404", failure("page not found")),
                            ]),
                        ),
                    ),
                    (
                        "post",
                        operation(
                            format!("create{name}"),
                            format!("Create a {name} resource"),
                            path_parameters(&endpoint.path),
                            Some(request_body(reference(name))),
                            responses([
                                ("201", data_response(reference(name))),
                                ("400", failure("invalid document")),
                                ("409", failure("conflicting type or id")),
                            ]),
                        ),
                    ),
                ]
            }
            EndpointKind::Detail => {
                let mut params = path_params.clone();
                params.extend(self.fetch_parameters(resource));
                vec![
                    (
                        "get",
                        operation(
                            format!("retrieve{name}"),
                            format!("Retrieve a {name} resource"),
                            params,
                            None,
                            responses([
                                ("200", data_response(reference(name))),
                                ("400", failure("invalid query parameters")),
                                ("404", failure("not found")),
                            ]),
                        ),
                    ),
                    (
                        "patch",
                        operation(
                            format!("update{name}"),
                            format!("Update a {name} resource"),
                            path_params.clone(),
                            Some(request_body(reference(name))),
                            responses([
                                ("200", data_response(reference(name))),
                                ("400", failure("invalid document")),
                                ("404", failure("not found")),
                                ("409", failure("conflicting type or id")),
                            ]),
                        ),
                    ),
                    (
                        "delete",
                        operation(
                            format!("destroy{name}"),
                            format!("Delete a {name} resource"),
                            path_params,
                            None,
                            responses([
                                ("204", json!({"description": "no content"})),
                                ("404", failure("not found")),
                            ]),
                        ),
                    ),
                ]
            }
            EndpointKind::Related(field) => {
                let (field, relation) = relationship(resource, field)?;
                let target = match relation.targets().first() {
                    Some(target) => self.ctx.resource(target)?,
                    None => return Err(Error::configuration("unresolved relation target")),
                };
                let data = if relation.is_to_many() {
                    collection_of(reference(target.name()))
                } else {
                    json!({"oneOf": [reference(target.name()), reference("nulltype")]})
                };
                let mut params = path_params;
                params.extend(self.fetch_parameters(target));
                vec![(
                    "get",
                    operation(
                        format!("retrieve{name}{}", field.name.to_case(Case::Pascal)),
                        format!("Retrieve the related {} of a {name}", field.name),
                        params,
                        None,
                        responses([
                            ("200", data_response(data)),
                            ("400", failure("invalid query parameters")),
                            ("404", failure("not found")),
                        ]),
                    ),
                )]
            }
            EndpointKind::Relationship(field) => {
                let (field, relation) = relationship(resource, field)?;
                let linkage = reference(if relation.is_to_many() {
                    "relationshipToMany"
                } else {
                    "relationshipToOne"
                });
                let id = format!("{name}{}Relationship", field.name.to_case(Case::Pascal));
                let write = |verb: &str, summary: &str| {
                    operation(
                        format!("{verb}{id}"),
                        format!("{summary} the {} relationship of a {name}", field.name),
                        path_params.clone(),
                        Some(request_body(linkage.clone())),
                        responses([
                            ("200", relationship_response(linkage.clone())),
                            ("400", failure("invalid linkage")),
                            ("404", failure("not found")),
                            ("405", failure("read-only relationship")),
                            ("409", failure("conflicting type")),
                        ]),
                    )
                };
                let mut operations = vec![
                    (
                        "get",
                        operation(
                            format!("retrieve{id}"),
                            format!("Retrieve the {} relationship of a {name}", field.name),
                            path_params.clone(),
                            None,
                            responses([
                                ("200", relationship_response(linkage.clone())),
                                ("404", failure("not found")),
                            ]),
                        ),
                    ),
                    ("patch", write("update", "Replace")),
                ];
                if relation.is_to_many() {
                    operations.push(("post", write("add", "Add to")));
                    operations.push(("delete", write("remove", "Remove from")));
                }
                operations
            }
        };
        Ok(operations
            .into_iter()
            .map(|(method, op)| (method.to_string(), op))
            .collect())
    }

    /// `include` and `fields[...]`.
    fn fetch_parameters(&self, resource: &ResourceDescriptor) -> Vec<Value> {
        let concrete = self.ctx.registry.concrete(resource);
        let includable = concrete
            .iter()
            .flat_map(|r| r.relationships())
            .filter(|(field, relation)| field.includable && !relation.skip_data())
            .map(|(field, _)| self.ctx.format_field(&field.name))
            .unique()
            .collect::<Vec<_>>();

        let mut params = vec![];
        if !includable.is_empty() {
            params.push(json!({
                "name": "include",
                "in": "query",
                "required": false,
                "style": "form",
                "explode": false,
                "description": "related resources to include in the response",
                "schema": {"type": "array", "items": {"type": "string", "enum": includable}},
            }));
        }
        for resource in concrete {
            let fields = resource
                .attributes()
                .chain(resource.relationships().map(|(field, _)| field))
                .filter(|field| !field.write_only)
                .map(|field| self.ctx.format_field(&field.name))
                .collect::<Vec<_>>();
            params.push(json!({
                "name": format!("fields[{}]", self.ctx.type_name(resource)),
                "in": "query",
                "required": false,
                "style": "form",
                "explode": false,
                "description": "fields to return for resources of this type",
                "schema": {"type": "array", "items": {"type": "string", "enum": fields}},
            }));
        }
        params
    }

    fn sort_parameters(&self, resource: &ResourceDescriptor, options: &QueryOptions) -> Vec<Value> {
        let sortable = options
            .ordering_fields
            .clone()
            .unwrap_or_else(|| default_sortable(resource));
        if sortable.is_empty() {
            return vec![];
        }
        let terms = sortable
            .iter()
            .map(|path| dotted(path, &self.ctx))
            .flat_map(|path| [path.clone(), format!("-{path}")])
            .collect::<Vec<_>>();
        vec![json!({
            "name": "sort",
            "in": "query",
            "required": false,
            "style": "form",
            "explode": false,
            "description": "fields to sort by, descending if prefixed with -",
            "schema": {"type": "array", "items": {"type": "string", "enum": terms}},
        })]
    }

    fn page_parameters(&self) -> Vec<Value> {
        let names: &[&str] = match self.ctx.config.pagination {
            PaginationStyle::PageNumber => &[PAGE_NUMBER, PAGE_SIZE],
            PaginationStyle::LimitOffset => &[PAGE_LIMIT, PAGE_OFFSET],
            PaginationStyle::Disabled => &[],
        };
        names
            .iter()
            .map(|name| {
                let minimum = if *name == PAGE_OFFSET { 0 } else { 1 };
                json!({
                    "name": name,
                    "in": "query",
                    "required": false,
                    "schema": {"type": "integer", "minimum": minimum},
                })
            })
            .collect()
    }
}

fn filter_parameters(options: &QueryOptions, ctx: &Context) -> Vec<Value> {
    let mut params = options
        .filters
        .iter()
        .flat_map(|(path, ops)| {
            let path = dotted(path, ctx);
            ops.iter().map(move |op| {
                let name = match op {
                    FilterOp::Exact => format!("filter[{path}]"),
                    op => format!("filter[{path}.{op}]"),
                };
                let schema = match op {
                    FilterOp::In | FilterOp::Range => {
                        json!({"type": "array", "items": {"type": "string"}})
                    }
                    FilterOp::IsNull => json!({"type": "boolean"}),
                    _ => json!({"type": "string"}),
                };
                json!({
                    "name": name,
                    "in": "query",
                    "required": false,
                    "style": "form",
                    "explode": false,
                    "schema": schema,
                })
            })
        })
        .collect::<Vec<_>>();
    if !options.filters.search_fields().is_empty() {
        params.push(json!({
            "name": "filter[search]",
            "in": "query",
            "required": false,
            "description": "case-insensitive search term",
            "schema": {"type": "string"},
        }));
    }
    params
}

fn relationship<'r>(
    resource: &'r ResourceDescriptor,
    field: &str,
) -> Result<(&'r FieldDescriptor, &'r Relation)> {
    resource
        .relationships()
        .find(|(f, _)| f.name == field)
        .ok_or_else(|| {
            Error::configuration(format!(
                "{}.{field} is documented as a relationship but is not one",
                resource.name()
            ))
        })
}

/// A `__`-separated path in the dotted, formatted form clients use.
fn dotted(path: &str, ctx: &Context) -> String {
    path.split("__").map(|segment| ctx.format_field(segment)).join(".")
}

fn path_parameters(path: &str) -> Vec<Value> {
    path.split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}'))
        .map(|(name, _)| {
            json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": {"type": "string"},
            })
        })
        .collect()
}

fn attr_schema(ty: AttrType) -> Value {
    match ty {
        AttrType::Any => json!({}),
        AttrType::Array => json!({"type": "array", "items": {}}),
        ty => json!({"type": ty.to_string()}),
    }
}

fn relationship_schema(relation: &Relation) -> Value {
    let mut properties = Map::new();
    if !relation.skip_data() {
        properties.insert(
            "data".into(),
            reference(if relation.is_to_many() {
                "relationshipToMany"
            } else {
                "relationshipToOne"
            }),
        );
    }
    properties.insert(
        "links".into(),
        json!({
            "type": "object",
            "properties": {"self": reference("link"), "related": reference("link")},
        }),
    );
    properties.insert("meta".into(), reference("meta"));
    json!({"type": "object", "properties": properties})
}

/// Add the description and the `readOnly`, `writeOnly` and `nullable` flags of `field` to a schema.
fn flagged(mut schema: Value, field: &FieldDescriptor) -> Value {
    if let Value::Object(schema) = &mut schema {
        if let Some(description) = &field.description {
            schema.insert("description".into(), description.as_str().into());
        }
        if field.read_only {
            schema.insert("readOnly".into(), true.into());
        }
        if field.write_only {
            schema.insert("writeOnly".into(), true.into());
        }
        if field.nullable {
            schema.insert("nullable".into(), true.into());
        }
    }
    schema
}

fn reference(name: &str) -> Value {
    json!({"$ref": format!("#/components/schemas/{name}")})
}

fn collection_of(item: Value) -> Value {
    json!({"type": "array", "items": item})
}

fn operation(
    id: String,
    summary: String,
    parameters: Vec<Value>,
    body: Option<Value>,
    responses: Value,
) -> Value {
    let mut op = json!({
        "operationId": id,
        "summary": summary,
        "parameters": parameters,
        "responses": responses,
    });
    if let Some(body) = body {
        op["requestBody"] = body;
    }
    op
}

fn responses<const N: usize>(responses: [(&str, Value); N]) -> Value {
    Value::Object(
        responses
            .into_iter()
            .map(|(status, response)| (status.to_string(), response))
            .collect(),
    )
}

fn content(schema: Value) -> Value {
    json!({MEDIA_TYPE: {"schema": schema}})
}

fn request_body(data: Value) -> Value {
    json!({
        "required": true,
        "content": content(json!({
            "type": "object",
            "required": ["data"],
            "properties": {"data": data},
        })),
    })
}

fn data_response(data: Value) -> Value {
    json!({
        "description": "success",
        "content": content(json!({
            "type": "object",
            "required": ["data"],
            "properties": {
                "data": data,
                "included": {
                    "type": "array",
                    "uniqueItems": true,
                    "items": reference("resource"),
                },
                "links": {"allOf": [reference("links"), reference("pagination")]},
                "jsonapi": reference("jsonapi"),
                "meta": reference("meta"),
            },
        })),
    })
}

fn relationship_response(linkage: Value) -> Value {
    json!({
        "description": "success",
        "content": content(json!({
            "type": "object",
            "required": ["data"],
            "properties": {
                "data": linkage,
                "links": reference("links"),
                "jsonapi": reference("jsonapi"),
                "meta": reference("meta"),
            },
        })),
    })
}

fn failure(description: &str) -> Value {
    json!({
        "description": description,
        "content": content(reference("failure")),
    })
}

/// Schemas describing the structure shared by all JSON:API documents.
fn components() -> Map<String, Value> {
    let schemas = json!({
        "jsonapi": {
            "type": "object",
            "description": "the server's implementation",
            "properties": {
                "version": {"type": "string"},
                "meta": reference("meta"),
            },
            "additionalProperties": false,
        },
        "resource": {
            "type": "object",
            "required": ["type", "id"],
            "additionalProperties": false,
            "properties": {
                "type": reference("type"),
                "id": reference("id"),
                "attributes": {"type": "object"},
                "relationships": {"type": "object"},
                "links": reference("links"),
                "meta": reference("meta"),
            },
        },
        "link": {
            "oneOf": [
                {"type": "string", "format": "uri-reference", "description": "the link's URL"},
                {
                    "type": "object",
                    "required": ["href"],
                    "properties": {
                        "href": {"type": "string", "format": "uri-reference"},
                        "meta": reference("meta"),
                    },
                },
            ],
        },
        "links": {
            "type": "object",
            "additionalProperties": reference("link"),
        },
        "linkage": {
            "type": "object",
            "description": "a resource identifier object",
            "required": ["type", "id"],
            "properties": {
                "type": reference("type"),
                "id": reference("id"),
                "meta": reference("meta"),
            },
        },
        "relationshipToOne": {
            "description": "a single resource identifier object, or null",
            "anyOf": [reference("nulltype"), reference("linkage")],
        },
        "relationshipToMany": {
            "description": "an array of resource identifier objects",
            "type": "array",
            "items": reference("linkage"),
            "uniqueItems": true,
        },
        "failure": {
            "type": "object",
            "required": ["errors"],
            "additionalProperties": false,
            "properties": {
                "errors": {
                    "type": "array",
                    "uniqueItems": true,
                    "items": reference("error"),
                },
                "meta": reference("meta"),
                "jsonapi": reference("jsonapi"),
                "links": reference("links"),
            },
        },
        "error": {
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "status": {"type": "string"},
                "code": {"type": "string"},
                "title": {"type": "string"},
                "detail": {"type": "string"},
                "source": {
                    "type": "object",
                    "properties": {
                        "pointer": {
                            "type": "string",
                            "description": "a JSON pointer into the request document",
                        },
                        "parameter": {
                            "type": "string",
                            "description": "the query parameter at fault",
                        },
                    },
                },
                "meta": reference("meta"),
            },
        },
        "id": {"type": "string", "description": "the string-encoded primary key"},
        "type": {"type": "string", "description": "the resource type"},
        "meta": {"type": "object", "additionalProperties": true},
        "nulltype": {"type": "object", "nullable": true, "default": null},
        "pageref": {
            "oneOf": [
                {"type": "string", "format": "uri-reference"},
                reference("nulltype"),
            ],
        },
        "pagination": {
            "type": "object",
            "properties": {
                "first": reference("pageref"),
                "last": reference("pageref"),
                "prev": reference("pageref"),
                "next": reference("pageref"),
            },
        },
    });
    match schemas {
        Value::Object(schemas) => schemas,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        fixtures::Fixture,
        query::{FilterOp, FilterSet},
    };

    fn parameter_names(op: &Value) -> Vec<&str> {
        op["parameters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_components() {
        let fixture = Fixture::new();
        let doc = SchemaGenerator::new(fixture.context())
            .title("Blog API")
            .generate()
            .unwrap();
        assert_eq!(doc["openapi"], OPENAPI_VERSION);
        assert_eq!(doc["info"]["title"], "Blog API");
        let schemas = doc["components"]["schemas"].as_object().unwrap();
        for name in [
            "jsonapi",
            "resource",
            "link",
            "links",
            "linkage",
            "relationshipToOne",
            "relationshipToMany",
            "failure",
            "error",
            "Entry",
            "Blog",
            "Project",
        ] {
            assert!(schemas.contains_key(name), "missing {name}");
        }
    }

    #[test]
    fn test_resource_schema() {
        let fixture = Fixture::new();
        let doc = SchemaGenerator::new(fixture.context()).generate().unwrap();
        let entry = &doc["components"]["schemas"]["Entry"]["properties"];
        assert_eq!(entry["type"]["enum"], json!(["entries"]));

        let attributes = &entry["attributes"];
        assert_eq!(
            attributes["properties"]
                .as_object()
                .unwrap()
                .keys()
                .collect::<Vec<_>>(),
            ["headline", "bodyText", "pubDate", "secret", "created"]
        );
        assert_eq!(attributes["required"], json!(["headline", "bodyText", "secret"]));
        assert_eq!(attributes["properties"]["secret"]["writeOnly"], true);
        assert_eq!(attributes["properties"]["created"]["readOnly"], true);
        assert_eq!(
            attributes["properties"]["pubDate"],
            json!({"type": "string", "nullable": true})
        );
        assert_eq!(entry["meta"]["properties"]["rating"], json!({"type": "number"}));

        let relationships = &entry["relationships"]["properties"];
        assert_eq!(
            relationships["authors"]["properties"]["data"],
            reference("relationshipToMany")
        );
        assert_eq!(
            relationships["blog"]["properties"]["data"],
            reference("relationshipToOne")
        );
        assert!(relationships["suggested"]["properties"].get("data").is_none());

        assert_eq!(
            doc["components"]["schemas"]["Project"],
            json!({"oneOf": [reference("ArtProject"), reference("ResearchProject")]})
        );
    }

    #[test]
    fn test_paths_from_routes() {
        let fixture = Fixture::new();
        let doc = SchemaGenerator::new(fixture.context())
            .routes()
            .generate()
            .unwrap();
        let paths = doc["paths"].as_object().unwrap();
        for path in [
            "/entries",
            "/entries/{pk}",
            "/entries/{pk}/blog",
            "/entries/{pk}/relationships/authors",
            "/blogs",
            "/blogs/{pk}",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }

        let list = &paths["/entries"]["get"];
        assert_eq!(list["operationId"], "listEntry");
        assert_eq!(
            parameter_names(list),
            ["include", "fields[entries]", "sort", "page[number]", "page[size]"]
        );
        assert_eq!(
            list["parameters"][0]["schema"]["items"]["enum"],
            json!(["blog", "authors", "comments", "featured"])
        );
        assert!(paths["/entries"].get("post").is_some());

        let detail = &paths["/entries/{pk}"];
        assert_eq!(
            detail.as_object().unwrap().keys().collect::<Vec<_>>(),
            ["get", "patch", "delete"]
        );
        assert_eq!(detail["patch"]["parameters"][0]["name"], "pk");
        assert_eq!(detail["patch"]["parameters"][0]["required"], true);

        let related = &paths["/entries/{pk}/blog"]["get"];
        assert_eq!(
            parameter_names(related),
            ["pk", "fields[blogs]"]
        );

        let to_one = paths["/entries/{pk}/relationships/blog"].as_object().unwrap();
        assert_eq!(to_one.keys().collect::<Vec<_>>(), ["get", "patch"]);
        let to_many = paths["/entries/{pk}/relationships/authors"].as_object().unwrap();
        assert_eq!(
            to_many.keys().collect::<Vec<_>>(),
            ["get", "patch", "post", "delete"]
        );
        assert_eq!(
            to_many["post"]["requestBody"]["content"][MEDIA_TYPE]["schema"]["properties"]["data"],
            reference("relationshipToMany")
        );
    }

    #[test]
    fn test_filter_parameters() {
        let fixture = Fixture::new();
        let doc = SchemaGenerator::new(fixture.context())
            .endpoint(Endpoint::collection("/entries", "Entry").options(QueryOptions {
                filters: FilterSet::new()
                    .field("headline", [FilterOp::Exact, FilterOp::IContains])
                    .field("blog__name", [FilterOp::In])
                    .search(["headline"]),
                ordering_fields: Some(vec!["headline".into(), "blog__name".into()]),
                ..Default::default()
            }))
            .generate()
            .unwrap();
        let list = &doc["paths"]["/entries"]["get"];
        let names = parameter_names(list);
        assert_eq!(
            &names[3..7],
            [
                "filter[headline]",
                "filter[headline.icontains]",
                "filter[blog.name.in]",
                "filter[search]"
            ]
        );
        assert_eq!(
            list["parameters"][2]["schema"]["items"]["enum"],
            json!(["headline", "-headline", "blog.name", "-blog.name"])
        );
    }

    #[test]
    fn test_unknown_relationship_endpoint() {
        let fixture = Fixture::new();
        let err = SchemaGenerator::new(fixture.context())
            .endpoint(Endpoint::new(
                "/entries/{pk}/relationships/headline",
                "Entry",
                EndpointKind::Relationship("headline".into()),
            ))
            .generate()
            .unwrap_err();
        assert_eq!(err.status(), 500);
    }
}
