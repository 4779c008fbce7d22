//! Parsing of JSON:API request documents.
//!
//! The parser is the inverse of the [renderer](crate::render). It takes the resource object in the
//! `data` member of a request document and flattens it into a single map in declared field names:
//! `id` and `type`, then the attributes, then the relationships (each reduced to its resource
//! linkage), then the document's top-level `meta` under `_meta`.

use crate::{
    context::Context,
    inflection::undo_format_field_names,
    relation::json_type,
    request::Method,
    resource::ResourceDescriptor,
    Error, Result,
};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// The key under which the document's top-level `meta` is stored in a parsed resource.
pub const META_KEY: &str = "_meta";

#[derive(Clone, Copy, Debug)]
pub struct Parser<'a> {
    ctx: Context<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }

    /// Parse a request document for a resource endpoint.
    ///
    /// `lookup_id` is the id taken from the URL of a detail endpoint; for `PATCH` and `PUT` the
    /// resource object must carry the same id.
    pub fn parse(
        &self,
        body: &str,
        method: Method,
        resource: &ResourceDescriptor,
        lookup_id: Option<&str>,
    ) -> Result<Map<String, Value>> {
        let mut document = primary_document(body)?;
        let meta = document.remove("meta");
        let Some(Value::Object(data)) = document.remove("data") else {
            return Err(Error::parse(
                "Received data is not a valid JSON:API Resource Object.",
            ));
        };

        let ty = data.get("type").and_then(Value::as_str).unwrap_or_default();
        let expected = self.ctx.type_names(resource);
        if !expected.iter().any(|e| e == ty) {
            let expected = match expected.as_slice() {
                [single] => single.clone(),
                many => format!("one of [{}]", many.iter().join(", ")),
            };
            return Err(Error::conflict(format!(
                "The resource object's type ({ty}) is not the type that constitute the collection \
                 represented by the endpoint ({expected})."
            )));
        }

        let id = match data.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            Some(other) => {
                return Err(Error::parse(format!(
                    "Resource identifier must be a string, not {}.",
                    json_type(other)
                )))
            }
        };
        if matches!(method, Method::Patch | Method::Put) {
            let Some(id) = &id else {
                return Err(Error::parse(
                    "The resource identifier object must contain an 'id' member",
                ));
            };
            if let Some(lookup_id) = lookup_id {
                if id != lookup_id {
                    return Err(Error::conflict(format!(
                        "The resource object's id ({id}) does not match url's lookup id \
                         ({lookup_id})"
                    )));
                }
            }
        }

        let mut parsed = Map::new();
        if let Some(id) = id {
            parsed.insert("id".into(), id.into());
        }
        parsed.insert("type".into(), ty.into());
        if let Some(attributes) = object_member(&data, "attributes")? {
            parsed.extend(undo_format_field_names(
                attributes,
                self.ctx.config.field_names,
            ));
        }
        if let Some(relationships) = object_member(&data, "relationships")? {
            for (name, relationship) in
                undo_format_field_names(relationships, self.ctx.config.field_names)
            {
                if let Some(linkage) = relationship_linkage(&name, relationship)? {
                    parsed.insert(name, linkage);
                }
            }
        }
        if let Some(meta) = meta {
            parsed.insert(META_KEY.into(), meta);
        }
        Ok(parsed)
    }

    /// Parse a request document and deserialize the flattened resource into `T`.
    pub fn parse_into<T: DeserializeOwned>(
        &self,
        body: &str,
        method: Method,
        resource: &ResourceDescriptor,
        lookup_id: Option<&str>,
    ) -> Result<T> {
        let parsed = self.parse(body, method, resource, lookup_id)?;
        serde_json::from_value(Value::Object(parsed))
            .map_err(|err| Error::parse(format!("JSON parse error - {err}")))
    }

    /// Parse a request document for a relationship endpoint, returning its resource linkage.
    ///
    /// Only the shape of the identifiers is checked; their types are checked against the
    /// relationship by the caller.
    pub fn parse_relationship(&self, body: &str) -> Result<Value> {
        let mut document = primary_document(body)?;
        let data = document.remove("data").unwrap_or(Value::Null);
        let valid = match &data {
            Value::Null => true,
            Value::Object(identifier) => is_identifier(identifier),
            Value::Array(items) => items
                .iter()
                .all(|item| item.as_object().map(is_identifier).unwrap_or(false)),
            _ => false,
        };
        if !valid {
            return Err(Error::parse(
                "Received data is not a valid JSON:API Resource Identifier Object(s).",
            ));
        }
        Ok(data)
    }
}

/// Decode the body and check that it has primary data.
fn primary_document(body: &str) -> Result<Map<String, Value>> {
    let document = serde_json::from_str::<Value>(body)
        .map_err(|err| Error::parse(format!("JSON parse error - {err}")))?;
    match document {
        Value::Object(document) if document.contains_key("data") => Ok(document),
        _ => Err(Error::parse(
            "Received document does not contain primary data",
        )),
    }
}

fn is_identifier(obj: &Map<String, Value>) -> bool {
    let present = |key: &str| !matches!(obj.get(key), None | Some(Value::Null));
    present("type") && present("id")
}

/// An optional member of `data` which must be an object if present.
fn object_member(data: &Map<String, Value>, key: &str) -> Result<Option<Map<String, Value>>> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(obj)) => Ok(Some(obj.clone())),
        Some(other) => Err(Error::parse(format!(
            "The '{key}' member must be an object, not {}.",
            json_type(other)
        ))),
    }
}

/// Reduce a relationship object to its resource linkage.
///
/// A relationship object without `data`, such as one carrying only links, has no linkage.
fn relationship_linkage(name: &str, relationship: Value) -> Result<Option<Value>> {
    let Value::Object(mut relationship) = relationship else {
        return Err(Error::parse(format!(
            "Relationship {name} must be a relationship object."
        )));
    };
    let Some(data) = relationship.remove("data") else {
        return Ok(None);
    };
    let is_resource_object =
        |value: &Value| value.get("attributes").is_some() || value.get("relationships").is_some();
    let nested = match &data {
        Value::Object(_) => is_resource_object(&data),
        Value::Array(items) => items.iter().any(is_resource_object),
        _ => false,
    };
    if nested {
        return Err(Error::parse(format!(
            "Relationship {name} must contain resource identifier objects, not resource objects."
        )));
    }
    Ok(Some(data))
}
