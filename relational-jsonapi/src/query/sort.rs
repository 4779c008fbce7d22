//! The `sort` parameter.

use crate::{
    inflection::{undo_format_field_name, Format},
    resource::ResourceDescriptor,
    Error, Result,
};
use itertools::Itertools;

/// One term of a `sort` parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SortField {
    /// The declared field names along a relationship chain, ending with the sorted field.
    pub path: Vec<String>,
    pub descending: bool,
}

impl SortField {
    pub fn ascending(path: impl Into<String>) -> Self {
        Self {
            path: split_path(&path.into()),
            descending: false,
        }
    }

    pub fn descending(path: impl Into<String>) -> Self {
        Self {
            descending: true,
            ..Self::ascending(path)
        }
    }

    /// The path in `__`-separated form, e.g. `blog__name`.
    pub fn dundered(&self) -> String {
        self.path.join("__")
    }
}

/// Split a relationship chain written with `.` or `__` separators.
pub(crate) fn split_path(path: &str) -> Vec<String> {
    path.replace('.', "__").split("__").map(String::from).collect()
}

/// Split a relationship chain named in a request, converting each segment from the wire field
/// name `format` to its declared form.
pub(crate) fn unformat_path(path: &str, format: Format) -> Vec<String> {
    path.replace('.', "__")
        .split("__")
        .map(|segment| undo_format_field_name(segment, format))
        .collect()
}

/// The fields of `resource` which may be sorted on when no explicit list is configured: the
/// primary key and every attribute which is rendered.
pub fn default_sortable(resource: &ResourceDescriptor) -> Vec<String> {
    [resource.id_field_name().to_string()]
        .into_iter()
        .chain(
            resource
                .attributes()
                .filter(|f| !f.write_only)
                .map(|f| f.name.clone()),
        )
        .collect()
}

/// Parse a `sort` parameter.
///
/// Each comma-separated term names a field, optionally through a chain of relationships using `.`
/// or `__` separators, and is descending if prefixed with `-`. Every term must name one of the
/// `sortable` paths (in `__` form); otherwise all offending terms are reported in one error. Field
/// names are converted back from the wire `format`.
pub fn parse_sort(value: &str, sortable: &[String], format: Format) -> Result<Vec<SortField>> {
    let terms = value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>();

    let mut fields = vec![];
    let mut bad_terms = vec![];
    for term in terms {
        let name = term.trim_start_matches('-');
        let field = SortField {
            path: unformat_path(name, format),
            descending: term.starts_with('-'),
        };
        if sortable.contains(&field.dundered()) {
            fields.push(field);
        } else {
            bad_terms.push(term);
        }
    }

    if !bad_terms.is_empty() {
        tracing::debug!(?bad_terms, "rejecting sort");
        return Err(Error::InvalidSort {
            detail: format!("invalid sort parameter(s): {}", bad_terms.iter().join(",")),
        });
    }
    Ok(fields)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures::Fixture;

    fn sortable() -> Vec<String> {
        vec!["headline".into(), "body_text".into(), "blog__name".into()]
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!(
            parse_sort(
                "-headline,bodyText,blog.name,blog__name",
                &sortable(),
                Format::Camelize
            )
            .unwrap(),
            [
                SortField::descending("headline"),
                SortField::ascending("body_text"),
                SortField::ascending("blog.name"),
                SortField::ascending("blog__name"),
            ]
        );
        assert!(parse_sort("", &sortable(), Format::Camelize).unwrap().is_empty());
    }

    #[test]
    fn test_parse_sort_without_field_format() {
        let sortable = vec!["bodyText".to_string(), "blog__name".into()];
        assert_eq!(
            parse_sort("-bodyText,blog.name", &sortable, Format::None).unwrap(),
            [
                SortField::descending("bodyText"),
                SortField::ascending("blog__name"),
            ]
        );
        // Names are taken verbatim, so the underscored form is unknown.
        let err = parse_sort("body_text", &sortable, Format::None).unwrap_err();
        assert_eq!(err.to_string(), "invalid sort parameter(s): body_text");
    }

    #[test]
    fn test_invalid_sort() {
        let err = parse_sort(
            "nonesuch,headline,-not_a_field",
            &sortable(),
            Format::Camelize,
        )
        .unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.to_string(), "invalid sort parameter(s): nonesuch,-not_a_field");
    }

    #[test]
    fn test_default_sortable() {
        let fixture = Fixture::new();
        let entry = fixture.registry.resource("Entry").unwrap();
        assert_eq!(
            default_sortable(entry),
            ["id", "headline", "body_text", "pub_date", "created"]
        );
    }
}
