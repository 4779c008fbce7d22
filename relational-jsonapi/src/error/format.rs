//! Conversion of errors into JSON:API error documents.
//!
//! Field-level validation failures become one error object per leaf message, each with a JSON
//! pointer into the request document. The first segment after `/data` is `relationships` or
//! `attributes` depending on how the failing field is declared; nested keys and list indices
//! follow.
//! Errors about query parameters carry `source.parameter` instead.

use super::{Error, FieldError, ValidationErrors, NON_FIELD_ERRORS};
use crate::{
    config::Config,
    context::Context,
    document::{ErrorDocument, ErrorObject, ErrorSource},
    resource::ResourceDescriptor,
};

/// Convert `error` into an error document.
///
/// `resource` is the resource whose document was being validated, if any; it decides whether a
/// failing field is addressed as an attribute or a relationship.
pub fn format_error(
    error: &Error,
    resource: Option<&ResourceDescriptor>,
    ctx: &Context,
) -> ErrorDocument {
    let status = error.status().to_string();
    let mut errors = match error {
        Error::Validation { errors } => {
            let mut objects = vec![];
            let mut formatter = PointerFormatter {
                resource,
                ctx,
                status: &status,
                objects: &mut objects,
            };
            formatter.top_level(errors, "/data");
            objects
        }
        _ => vec![ErrorObject {
            status,
            code: Some(error.code().into()),
            title: None,
            detail: error.to_string(),
            source: source(error),
            meta: None,
        }],
    };
    errors.sort_by(|a, b| pointer(a).cmp(pointer(b)));
    ErrorDocument { errors }
}

/// Convert an error raised outside of the JSON:API machinery, such as by a handler or middleware.
///
/// Returns [`None`] unless the configuration asks for uniform error documents, in which case the
/// caller is expected to fall back to its own error representation.
pub fn format_foreign(
    error: &dyn std::error::Error,
    status: u16,
    config: &Config,
) -> Option<ErrorDocument> {
    if !config.uniform_exceptions {
        return None;
    }
    Some(ErrorDocument {
        errors: vec![ErrorObject {
            status: status.to_string(),
            code: Some("error".into()),
            title: None,
            detail: error.to_string(),
            source: None,
            meta: None,
        }],
    })
}

fn source(error: &Error) -> Option<ErrorSource> {
    match error {
        Error::InvalidQuery { parameter, .. } | Error::InvalidFilter { parameter, .. } => {
            Some(ErrorSource::parameter(parameter.clone()))
        }
        Error::InvalidSort { .. } => Some(ErrorSource::parameter("sort")),
        Error::InvalidInclude { .. } => Some(ErrorSource::parameter("include")),
        Error::Parse { .. } | Error::Conflict { .. } | Error::MethodNotAllowed { .. } => {
            Some(ErrorSource::pointer("/data"))
        }
        _ => None,
    }
}

fn pointer(error: &ErrorObject) -> &str {
    error
        .source
        .as_ref()
        .and_then(|s| s.pointer.as_deref())
        .unwrap_or_default()
}

struct PointerFormatter<'a, 'c> {
    resource: Option<&'a ResourceDescriptor>,
    ctx: &'a Context<'c>,
    status: &'a str,
    objects: &'a mut Vec<ErrorObject>,
}

impl<'a, 'c> PointerFormatter<'a, 'c> {
    /// Format the errors for one resource object located at `base`.
    fn top_level(&mut self, errors: &ValidationErrors, base: &str) {
        match errors {
            ValidationErrors::Messages(messages) => self.leaves(messages, base),
            ValidationErrors::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.top_level(item, &format!("{base}/{i}"));
                }
            }
            ValidationErrors::Object(fields) => {
                for (field, errors) in fields {
                    if field == NON_FIELD_ERRORS {
                        self.nested(errors, base);
                    } else {
                        let pointer = format!(
                            "{base}/{}/{}",
                            self.section(field),
                            self.ctx.format_field(field)
                        );
                        self.nested(errors, &pointer);
                    }
                }
            }
        }
    }

    fn nested(&mut self, errors: &ValidationErrors, pointer: &str) {
        match errors {
            ValidationErrors::Messages(messages) => self.leaves(messages, pointer),
            ValidationErrors::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.nested(item, &format!("{pointer}/{i}"));
                }
            }
            ValidationErrors::Object(fields) => {
                for (key, errors) in fields {
                    if key == NON_FIELD_ERRORS {
                        self.nested(errors, pointer);
                    } else {
                        self.nested(errors, &format!("{pointer}/{key}"));
                    }
                }
            }
        }
    }

    fn leaves(&mut self, messages: &[FieldError], pointer: &str) {
        for message in messages {
            self.objects.push(ErrorObject {
                status: self.status.to_string(),
                code: Some(message.code.clone()),
                title: None,
                detail: message.message.clone(),
                source: Some(ErrorSource::pointer(pointer)),
                meta: None,
            });
        }
    }

    /// Whether `field` is addressed under `relationships` or `attributes`.
    fn section(&self, field: &str) -> &'static str {
        let is_relation = self.resource.into_iter().any(|resource| {
            self.ctx
                .registry
                .concrete(resource)
                .into_iter()
                .chain([resource])
                .any(|r| r.field(field).map(|f| f.is_relation()).unwrap_or(false))
        });
        if is_relation {
            "relationships"
        } else {
            "attributes"
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures::Fixture;
    use serde_json::json;

    fn format(error: &Error, resource: &str) -> serde_json::Value {
        let fixture = Fixture::new();
        let ctx = fixture.context();
        let resource = fixture.registry.resource(resource).unwrap();
        format_error(error, Some(resource), &ctx).to_value()
    }

    #[test]
    fn test_field_errors_point_into_document() {
        let mut errors = ValidationErrors::default();
        errors.add("body_text", FieldError::new("required", "This field is required."));
        errors.add("blog", FieldError::new("does_not_exist", "Invalid pk \"9\"."));
        errors.add(NON_FIELD_ERRORS, FieldError::invalid("Entry is locked."));
        let mut authors = ValidationErrors::List(vec![
            ValidationErrors::Messages(vec![]),
            ValidationErrors::Messages(vec![FieldError::new("missing_id", "Missing id.")]),
        ]);
        errors.nest("authors", std::mem::take(&mut authors));

        assert_eq!(
            format(&errors.into(), "Entry"),
            json!({"errors": [
                {
                    "status": "400",
                    "code": "invalid",
                    "detail": "Entry is locked.",
                    "source": {"pointer": "/data"},
                },
                {
                    "status": "400",
                    "code": "required",
                    "detail": "This field is required.",
                    "source": {"pointer": "/data/attributes/bodyText"},
                },
                {
                    "status": "400",
                    "code": "missing_id",
                    "detail": "Missing id.",
                    "source": {"pointer": "/data/relationships/authors/1"},
                },
                {
                    "status": "400",
                    "code": "does_not_exist",
                    "detail": "Invalid pk \"9\".",
                    "source": {"pointer": "/data/relationships/blog"},
                },
            ]})
        );
    }

    #[test]
    fn test_nested_attribute_errors() {
        let mut location = ValidationErrors::default();
        location.add("city", FieldError::invalid("Unknown city."));
        let mut errors = ValidationErrors::default();
        errors.nest("name", location);
        let doc = format(&errors.into(), "Blog");
        assert_eq!(
            doc["errors"][0]["source"]["pointer"],
            "/data/attributes/name/city"
        );
    }

    #[test]
    fn test_polymorphic_relationship_pointer() {
        let errors = ValidationErrors::field("current_project", FieldError::invalid("Bad."));
        assert_eq!(
            format(&errors.into(), "Company")["errors"][0]["source"]["pointer"],
            "/data/relationships/currentProject"
        );
    }

    #[test]
    fn test_parameter_errors() {
        let doc = format(&Error::query("invalid query parameter: bogus", "bogus"), "Entry");
        assert_eq!(
            doc,
            json!({"errors": [{
                "status": "400",
                "code": "invalid",
                "detail": "invalid query parameter: bogus",
                "source": {"parameter": "bogus"},
            }]})
        );
        let doc = format(
            &Error::InvalidSort {
                detail: "invalid sort parameter(s): x".into(),
            },
            "Entry",
        );
        assert_eq!(doc["errors"][0]["source"]["parameter"], "sort");
    }

    #[test]
    fn test_conflict_and_method_errors() {
        let doc = format(&Error::conflict("Incorrect type."), "Entry");
        assert_eq!(doc["errors"][0]["status"], "409");
        assert_eq!(doc["errors"][0]["source"]["pointer"], "/data");

        let doc = format(&Error::not_found(), "Entry");
        assert_eq!(
            doc,
            json!({"errors": [{"status": "404", "code": "not_found", "detail": "Not found."}]})
        );
    }

    #[test]
    fn test_foreign_errors() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        assert_eq!(format_foreign(&err, 500, &Config::default()), None);

        let config = Config::default().with_uniform_exceptions(true);
        let doc = format_foreign(&err, 503, &config).unwrap();
        assert_eq!(doc.errors[0].status, "503");
        assert_eq!(doc.errors[0].detail, "disk on fire");
    }
}
