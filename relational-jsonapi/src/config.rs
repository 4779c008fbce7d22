//! Process-wide settings for rendering and parsing.
//!
//! A [`Config`] is an immutable value. It is handed to each component when the component is
//! constructed, and is never mutated while requests are processed. To change settings at runtime,
//! build a new [`Config`] and new components from it.

use crate::{inflection::Format, Error, Result};
use serde::{Deserialize, Serialize};

/// The style of pagination used for collection endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationStyle {
    /// `page[number]` and `page[size]`.
    #[default]
    PageNumber,
    /// `page[limit]` and `page[offset]`.
    LimitOffset,
    /// Collections are rendered in full.
    Disabled,
}

/// Settings shared by all JSON:API components.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Case style of attribute, relationship and meta keys.
    pub field_names: Format,
    /// Case style of resource type names.
    pub type_names: Format,
    /// Whether resource type names are pluralized.
    pub pluralize_types: bool,
    /// Case style of relationship names when they appear as URL segments.
    pub related_links: Format,
    /// Style of pagination for collection endpoints.
    pub pagination: PaginationStyle,
    /// Number of items on a page when the client does not ask for a size.
    pub page_size: usize,
    /// Upper bound on the page size a client may request.
    pub max_page_size: usize,
    /// Convert errors raised outside of JSON:API endpoints to JSON:API error documents too.
    pub uniform_exceptions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            field_names: Format::None,
            type_names: Format::None,
            pluralize_types: false,
            related_links: Format::None,
            pagination: PaginationStyle::PageNumber,
            page_size: 100,
            max_page_size: 100,
            uniform_exceptions: false,
        }
    }
}

impl Config {
    /// Load settings from a JSON object.
    ///
    /// Missing keys take their default values. Unknown keys and unknown format names are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|err| Error::Configuration {
            detail: format!("invalid settings: {err}"),
        })?;
        if config.page_size == 0 || config.max_page_size < config.page_size {
            return Err(Error::Configuration {
                detail: format!(
                    "page size {} must be positive and at most {}",
                    config.page_size, config.max_page_size
                ),
            });
        }
        Ok(config)
    }

    /// Set the case style of field names.
    pub fn with_field_names(mut self, format: Format) -> Self {
        self.field_names = format;
        self
    }

    /// Set the case style and pluralization of resource type names.
    pub fn with_type_names(mut self, format: Format, pluralize: bool) -> Self {
        self.type_names = format;
        self.pluralize_types = pluralize;
        self
    }

    /// Set the case style of relationship URL segments.
    pub fn with_related_links(mut self, format: Format) -> Self {
        self.related_links = format;
        self
    }

    /// Set the pagination style and page sizes.
    ///
    /// Sizes are clamped so that `0 < size <= max`.
    pub fn with_pagination(mut self, style: PaginationStyle, size: usize, max: usize) -> Self {
        self.pagination = style;
        self.page_size = size.max(1);
        self.max_page_size = max.max(self.page_size);
        self
    }

    /// Set whether errors outside of JSON:API endpoints are converted as well.
    pub fn with_uniform_exceptions(mut self, uniform: bool) -> Self {
        self.uniform_exceptions = uniform;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_json_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_json() {
        let config = Config::from_json(
            r#"{
                "field_names": "dasherize",
                "type_names": "camelize",
                "pluralize_types": true,
                "pagination": "limit-offset",
                "page_size": 10
            }"#,
        )
        .unwrap();
        assert_eq!(config.field_names, Format::Dasherize);
        assert_eq!(config.type_names, Format::Camelize);
        assert!(config.pluralize_types);
        assert_eq!(config.pagination, PaginationStyle::LimitOffset);
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_from_json_rejects_unknown_format() {
        let err = Config::from_json(r#"{"field_names": "kebab"}"#).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }), "{err}");
    }

    #[test]
    fn test_from_json_rejects_bad_page_size() {
        let err = Config::from_json(r#"{"page_size": 500}"#).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }), "{err}");
    }

    #[test]
    fn test_with_pagination_clamps_sizes() {
        let config = Config::default().with_pagination(PaginationStyle::LimitOffset, 0, 0);
        assert_eq!(config.page_size, 1);
        assert_eq!(config.max_page_size, 1);

        let config = Config::default().with_pagination(PaginationStyle::PageNumber, 20, 5);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.max_page_size, 20);
    }
}
