//! The `filter[...]` parameters.
//!
//! A filter parameter names a field, optionally through a chain of relationships, and an optional
//! operator: `filter[headline]`, `filter[headline.icontains]`, `filter[blog.name.iexact]`. Only
//! field and operator pairs declared in a [`FilterSet`] are accepted.

use super::{
    sort::{split_path, unformat_path},
    QueryParams,
};
use crate::{inflection::Format, Error, Result};
use derive_more::Display;
use indexmap::IndexMap;

/// The name of the full-text search filter, `filter[search]`.
pub const SEARCH: &str = "search";

/// A comparison applied by a filter.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum FilterOp {
    #[display(fmt = "exact")]
    Exact,
    #[display(fmt = "iexact")]
    IExact,
    #[display(fmt = "contains")]
    Contains,
    #[display(fmt = "icontains")]
    IContains,
    #[display(fmt = "in")]
    In,
    #[display(fmt = "gt")]
    Gt,
    #[display(fmt = "gte")]
    Gte,
    #[display(fmt = "lt")]
    Lt,
    #[display(fmt = "lte")]
    Lte,
    #[display(fmt = "startswith")]
    StartsWith,
    #[display(fmt = "istartswith")]
    IStartsWith,
    #[display(fmt = "endswith")]
    EndsWith,
    #[display(fmt = "iendswith")]
    IEndsWith,
    #[display(fmt = "isnull")]
    IsNull,
    #[display(fmt = "range")]
    Range,
    /// Case-insensitive substring match over the configured search fields.
    #[display(fmt = "search")]
    Search,
}

impl FilterOp {
    const ALL: [FilterOp; 16] = [
        Self::Exact,
        Self::IExact,
        Self::Contains,
        Self::IContains,
        Self::In,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::StartsWith,
        Self::IStartsWith,
        Self::EndsWith,
        Self::IEndsWith,
        Self::IsNull,
        Self::Range,
        Self::Search,
    ];

    /// Parse an operator name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| *op != Self::Search && op.to_string() == s)
    }
}

/// The operand of a filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
    Single(String),
    List(Vec<String>),
    Bool(bool),
}

/// A validated filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    /// Declared field names along a relationship chain. Empty for [`FilterOp::Search`].
    pub path: Vec<String>,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Filter {
    pub fn dundered(&self) -> String {
        self.path.join("__")
    }
}

/// The filters accepted by an endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSet {
    fields: IndexMap<String, Vec<FilterOp>>,
    search_fields: Vec<String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the operators `ops` on the field at `path` (in `__` form, e.g. `blog__name`).
    pub fn field(
        mut self,
        path: impl Into<String>,
        ops: impl IntoIterator<Item = FilterOp>,
    ) -> Self {
        self.fields
            .entry(path.into())
            .or_default()
            .extend(ops);
        self
    }

    /// Accept `filter[search]`, matching against the fields at `paths`.
    pub fn search<S: Into<String>>(mut self, paths: impl IntoIterator<Item = S>) -> Self {
        self.search_fields.extend(paths.into_iter().map(Into::into));
        self
    }

    /// The fields matched by `filter[search]`, split into relationship chains.
    pub fn search_fields(&self) -> Vec<Vec<String>> {
        self.search_fields.iter().map(|f| split_path(f)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.search_fields.is_empty()
    }

    /// The declared fields and their operators.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FilterOp])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Validate and translate the `filter[...]` parameters of a request, whose field names are in
    /// the wire `format`.
    pub fn parse(&self, params: &QueryParams, format: Format) -> Result<Vec<Filter>> {
        params
            .bracketed("filter")
            .map(|(inner, value, qp)| self.parse_one(inner, value, qp, format))
            .collect()
    }

    fn parse_one(&self, inner: &str, value: &str, qp: &str, format: Format) -> Result<Filter> {
        if value.is_empty() {
            return Err(Error::filter(format!("missing {qp} test value"), qp));
        }
        let invalid = || {
            tracing::debug!(qp, "rejecting filter");
            Error::filter(format!("invalid filter[{inner}]"), qp)
        };

        if inner == SEARCH && !self.search_fields.is_empty() {
            return Ok(Filter {
                path: vec![],
                op: FilterOp::Search,
                value: FilterValue::Single(value.into()),
            });
        }

        let mut path = unformat_path(inner, format);
        let op = match path.last().and_then(|last| FilterOp::parse(last)) {
            Some(op) if path.len() > 1 => {
                path.pop();
                op
            }
            _ => FilterOp::Exact,
        };
        let accepted = self
            .fields
            .get(&path.join("__"))
            .map(|ops| ops.contains(&op))
            .unwrap_or(false);
        if !accepted {
            return Err(invalid());
        }

        let value = match op {
            FilterOp::In => FilterValue::List(value.split(',').map(String::from).collect()),
            FilterOp::Range => {
                let bounds = value.split(',').map(String::from).collect::<Vec<_>>();
                if bounds.len() != 2 {
                    return Err(Error::filter(
                        format!("invalid range value for {qp}: expected two comma-separated bounds"),
                        qp,
                    ));
                }
                FilterValue::List(bounds)
            }
            FilterOp::IsNull => match value {
                "true" | "True" | "1" => FilterValue::Bool(true),
                "false" | "False" | "0" => FilterValue::Bool(false),
                _ => {
                    return Err(Error::filter(
                        format!("invalid boolean value for {qp}: {value}"),
                        qp,
                    ))
                }
            },
            _ => FilterValue::Single(value.into()),
        };
        Ok(Filter { path, op, value })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn filters() -> FilterSet {
        FilterSet::new()
            .field("headline", [FilterOp::Exact, FilterOp::IContains, FilterOp::In])
            .field("blog__name", [FilterOp::Exact, FilterOp::IExact])
            .field("pub_date", [FilterOp::IsNull, FilterOp::Range])
            .search(["headline", "blog.name"])
    }

    fn parse(query: &str) -> Result<Vec<Filter>> {
        filters().parse(&QueryParams::parse(query), Format::Camelize)
    }

    #[test]
    fn test_parse_filters() {
        assert_eq!(
            parse("filter[headline]=a&filter[blog.name.iexact]=b&filter[headline.in]=x,y").unwrap(),
            [
                Filter {
                    path: vec!["headline".into()],
                    op: FilterOp::Exact,
                    value: FilterValue::Single("a".into()),
                },
                Filter {
                    path: vec!["blog".into(), "name".into()],
                    op: FilterOp::IExact,
                    value: FilterValue::Single("b".into()),
                },
                Filter {
                    path: vec!["headline".into()],
                    op: FilterOp::In,
                    value: FilterValue::List(vec!["x".into(), "y".into()]),
                },
            ]
        );
        assert_eq!(
            parse("filter[pubDate.isnull]=true").unwrap()[0].value,
            FilterValue::Bool(true)
        );
        assert_eq!(
            parse("filter[search]=foo").unwrap()[0].op,
            FilterOp::Search
        );
        assert_eq!(
            filters().search_fields(),
            [vec!["headline".to_string()], vec!["blog".into(), "name".into()]]
        );
    }

    #[test]
    fn test_invalid_filters() {
        for (query, detail) in [
            ("filter[nonesuch]=a", "invalid filter[nonesuch]"),
            ("filter[headline.gt]=a", "invalid filter[headline.gt]"),
            ("filter[blog.name.icontains]=a", "invalid filter[blog.name.icontains]"),
            ("filter[headline]=", "missing filter[headline] test value"),
            (
                "filter[pub_date.range]=1",
                "invalid range value for filter[pub_date.range]: expected two comma-separated bounds",
            ),
        ] {
            let err = parse(query).unwrap_err();
            assert_eq!(err.status(), 400, "{query}");
            assert_eq!(err.to_string(), detail, "{query}");
        }
        let err = FilterSet::new()
            .parse(&QueryParams::parse("filter[search]=x"), Format::Camelize)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid filter[search]");
    }

    #[test]
    fn test_parse_filters_without_field_format() {
        let filters =
            FilterSet::new().field("blog__bodyText", [FilterOp::Exact, FilterOp::IContains]);
        let params = QueryParams::parse("filter[blog.bodyText.icontains]=x");
        assert_eq!(
            filters.parse(&params, Format::None).unwrap(),
            [Filter {
                path: vec!["blog".into(), "bodyText".into()],
                op: FilterOp::IContains,
                value: FilterValue::Single("x".into()),
            }]
        );
        let params = QueryParams::parse("filter[blog.body_text]=x");
        assert_eq!(
            filters.parse(&params, Format::None).unwrap_err().to_string(),
            "invalid filter[blog.body_text]"
        );
    }

    #[test]
    fn test_op_names() {
        assert_eq!(FilterOp::parse("icontains"), Some(FilterOp::IContains));
        assert_eq!(FilterOp::parse("search"), None);
        assert_eq!(FilterOp::parse("name"), None);
    }
}
