//! Conversion of identifiers between the case styles used on the wire.
//!
//! Field names and resource type names are declared in Rust's own snake_case convention and are
//! converted to the configured wire format whenever a document is rendered. Parsing performs the
//! inverse conversion. All functions here are pure.

use convert_case::{Boundary, Case, Casing};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A case style for identifiers on the wire.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Leave identifiers untouched.
    #[default]
    #[display(fmt = "none")]
    None,
    /// `lowerCamelCase`.
    #[display(fmt = "camelize")]
    Camelize,
    /// `UpperCamelCase`.
    #[display(fmt = "capitalize")]
    Capitalize,
    /// `kebab-case`.
    #[display(fmt = "dasherize")]
    Dasherize,
    /// `snake_case`.
    #[display(fmt = "underscore")]
    Underscore,
}

impl Format {
    /// Parse a format from its configuration name.
    ///
    /// Returns [`None`] for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "camelize" => Some(Self::Camelize),
            "capitalize" => Some(Self::Capitalize),
            "dasherize" => Some(Self::Dasherize),
            "underscore" => Some(Self::Underscore),
            _ => None,
        }
    }
}

/// Split an identifier into words.
///
/// Words are separated by hyphens, underscores, spaces, and lower-to-upper case transitions. Runs
/// of capital letters and digits do not start new words, so `HTTPServer` is a single word.
fn with_boundaries(value: &str, case: Case) -> String {
    use Boundary::*;
    value
        .with_boundaries(&[Hyphen, Underscore, Space, LowerUpper])
        .to_case(case)
}

/// Convert `value` to the case style `format`.
///
/// Dasherizing underscores first, so it handles input which is already camel cased.
pub fn format_value(value: &str, format: Format) -> String {
    match format {
        Format::None => value.to_string(),
        Format::Camelize => with_boundaries(value, Case::Camel),
        Format::Capitalize => with_boundaries(value, Case::Pascal),
        Format::Dasherize => with_boundaries(&underscore(value), Case::Kebab),
        Format::Underscore => underscore(value),
    }
}

/// Convert `value` to snake_case.
pub fn underscore(value: &str) -> String {
    with_boundaries(value, Case::Snake)
}

/// Words whose plural is not formed by a suffix rule.
const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("tooth", "teeth"),
    ("foot", "feet"),
];

/// Words which are the same in singular and plural.
const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "data",
];

/// Pluralize an English noun.
///
/// Only the trailing word of `value` is inflected, so compound identifiers in any case style
/// (`blog-entry`, `blogEntry`, `BlogEntry`) pluralize their last word.
pub fn pluralize(value: &str) -> String {
    // Find the start of the trailing word, so that irregular forms are matched on a word basis.
    let start = value
        .char_indices()
        .rev()
        .find(|(i, c)| {
            !c.is_alphanumeric()
                || (c.is_uppercase()
                    && value[..*i]
                        .chars()
                        .last()
                        .map(char::is_lowercase)
                        .unwrap_or(false))
        })
        .map(|(i, c)| if c.is_alphanumeric() { i } else { i + c.len_utf8() })
        .unwrap_or(0);
    let (head, word) = value.split_at(start);
    let lower = word.to_lowercase();

    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return value.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        // Preserve the capitalization of the first letter.
        let mut chars = plural.chars();
        let inflected = match (word.chars().next(), chars.next()) {
            (Some(first), Some(p)) if first.is_uppercase() => {
                p.to_uppercase().chain(chars).collect::<String>()
            }
            _ => plural.to_string(),
        };
        return format!("{head}{inflected}");
    }

    let ends_with_consonant_y = lower.ends_with('y')
        && !lower[..lower.len() - 1].ends_with(['a', 'e', 'i', 'o', 'u']);
    if ends_with_consonant_y {
        format!("{}ies", &value[..value.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        format!("{value}es")
    } else {
        format!("{value}s")
    }
}

/// Derive a wire type name from a model name.
pub fn format_resource_type(name: &str, format: Format, plural: bool) -> String {
    let formatted = format_value(name, format);
    if plural {
        pluralize(&formatted)
    } else {
        formatted
    }
}

/// Convert the top-level keys of `map` to `format`.
pub fn format_field_names(map: Map<String, Value>, format: Format) -> Map<String, Value> {
    if format == Format::None {
        return map;
    }
    map.into_iter()
        .map(|(key, value)| (format_value(&key, format), value))
        .collect()
}

/// Convert a wire field name back to its declared name.
///
/// Field names are only converted when a wire format is active; otherwise they are taken as-is.
pub fn undo_format_field_name(name: &str, format: Format) -> String {
    if format == Format::None {
        name.to_string()
    } else {
        underscore(name)
    }
}

/// Convert the top-level keys of `map` back to their declared names.
pub fn undo_format_field_names(map: Map<String, Value>, format: Format) -> Map<String, Value> {
    if format == Format::None {
        return map;
    }
    map.into_iter()
        .map(|(key, value)| (underscore(&key), value))
        .collect()
}

/// Recursively convert every object key in `value` to `format`.
pub fn format_keys(value: Value, format: Format) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (format_value(&key, format), format_keys(value, format)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| format_keys(v, format)).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value("first_name", Format::Camelize), "firstName");
        assert_eq!(format_value("first_name", Format::Capitalize), "FirstName");
        assert_eq!(format_value("first_name", Format::Dasherize), "first-name");
        assert_eq!(format_value("firstName", Format::Dasherize), "first-name");
        assert_eq!(format_value("firstName", Format::Underscore), "first_name");
        assert_eq!(format_value("first-name", Format::Underscore), "first_name");
        assert_eq!(format_value("firstName", Format::None), "firstName");
        assert_eq!(format_value("BlogEntry", Format::Dasherize), "blog-entry");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("dasherize"), Some(Format::Dasherize));
        assert_eq!(Format::parse("none"), Some(Format::None));
        assert_eq!(Format::parse("kebab"), None);
        assert_eq!(Format::Camelize.to_string(), "camelize");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("entry"), "entries");
        assert_eq!(pluralize("blog"), "blogs");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("Person"), "People");
        assert_eq!(pluralize("data"), "data");
        assert_eq!(pluralize("blog-entry"), "blog-entries");
        assert_eq!(pluralize("researchProject"), "researchProjects");
        assert_eq!(pluralize("ResearchPerson"), "ResearchPeople");
    }

    #[test]
    fn test_format_resource_type() {
        assert_eq!(format_resource_type("Entry", Format::None, false), "Entry");
        assert_eq!(format_resource_type("BlogEntry", Format::Dasherize, true), "blog-entries");
        assert_eq!(
            format_resource_type("ResearchProject", Format::Camelize, true),
            "researchProjects"
        );
        assert_eq!(format_resource_type("Entry", Format::Underscore, true), "entries");
    }

    #[test]
    fn test_format_keys_recursive() {
        let value = json!({"first_name": {"nested_key": [{"deep_key": 1}]}});
        assert_eq!(
            format_keys(value, Format::Camelize),
            json!({"firstName": {"nestedKey": [{"deepKey": 1}]}})
        );
    }

    #[test]
    fn test_field_names_round_trip() {
        let map = json!({"body_text": "x", "pub_date": null});
        let Value::Object(map) = map else { unreachable!() };
        let formatted = format_field_names(map.clone(), Format::Dasherize);
        assert!(formatted.contains_key("body-text"));
        assert_eq!(undo_format_field_names(formatted, Format::Dasherize), map);
    }

    fn identifier() -> impl Strategy<Value = String> {
        "[a-z]{1,8}(_[a-z]{1,8}){0,3}"
    }

    proptest! {
        #[test]
        fn test_dasherize_idempotent(x in identifier()) {
            prop_assert_eq!(
                format_value(&format_value(&x, Format::Dasherize), Format::Underscore),
                format_value(&x, Format::Underscore)
            );
        }

        #[test]
        fn test_camelize_idempotent(x in identifier()) {
            prop_assert_eq!(
                format_value(&format_value(&x, Format::Camelize), Format::Underscore),
                format_value(&x, Format::Underscore)
            );
            prop_assert_eq!(
                format_value(&format_value(&x, Format::Capitalize), Format::Underscore),
                format_value(&x, Format::Underscore)
            );
        }
    }
}
