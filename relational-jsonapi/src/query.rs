//! Validation and translation of JSON:API query parameters.
//!
//! The parameters of a request are handled as a whole. First the grammar of every parameter is
//! checked ([`QueryParams::validate`]), then the individual families are interpreted in a fixed
//! order: `include`, `fields[...]`, `filter[...]`, `sort`. Pagination parameters are interpreted by
//! the [paginator](crate::pagination). Any failure aborts the request before storage is touched.

use crate::{context::Context, resource::ResourceDescriptor, Result};
use itertools::Itertools;

pub mod fields;
pub mod filter;
pub mod include;
pub mod params;
pub mod sort;

pub use fields::SparseFieldsets;
pub use filter::{Filter, FilterOp, FilterSet, FilterValue};
pub use include::IncludeTree;
pub use params::QueryParams;
pub use sort::{default_sortable, parse_sort, SortField};

/// The interpreted query parameters of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestQuery {
    pub include: IncludeTree,
    pub fields: SparseFieldsets,
    pub filters: Vec<Filter>,
    pub sort: Vec<SortField>,
}

/// What an endpoint accepts beyond the declarations of its resource.
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    pub filters: FilterSet,
    /// Sortable paths in `__` form. Defaults to [`default_sortable`].
    pub ordering_fields: Option<Vec<String>>,
    /// Ordering applied when the request has no `sort` parameter.
    pub default_ordering: Vec<SortField>,
}

impl RequestQuery {
    /// Validate and interpret the query parameters of a request for `resource`.
    pub fn parse(
        params: &QueryParams,
        resource: &ResourceDescriptor,
        options: &QueryOptions,
        ctx: &Context,
    ) -> Result<Self> {
        Self::parse_any(params, &[resource], options, ctx)
    }

    /// Validate and interpret the query parameters of a request whose primary data may be records
    /// of any of `resources`.
    ///
    /// An include path or sort field is accepted if it is valid for at least one of the resources.
    pub fn parse_any(
        params: &QueryParams,
        resources: &[&ResourceDescriptor],
        options: &QueryOptions,
        ctx: &Context,
    ) -> Result<Self> {
        params.validate()?;

        let include = match params.get("include") {
            Some(value) => IncludeTree::parse(value, ctx),
            None => IncludeTree::from_paths(
                resources
                    .iter()
                    .flat_map(|r| r.default_includes())
                    .unique(),
            ),
        };
        include.validate_any(resources, ctx)?;

        let fields = SparseFieldsets::parse(params, ctx);
        let filters = options.filters.parse(params, ctx.config.field_names)?;

        let sort = match params.get("sort") {
            Some(value) => {
                let sortable = options.ordering_fields.clone().unwrap_or_else(|| {
                    resources
                        .iter()
                        .flat_map(|r| default_sortable(r))
                        .unique()
                        .collect()
                });
                parse_sort(value, &sortable, ctx.config.field_names)?
            }
            None => options.default_ordering.clone(),
        };

        Ok(Self {
            include,
            fields,
            filters,
            sort,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{config::Config, fixtures::Fixture};

    #[test]
    fn test_parse_request_query() {
        let fixture = Fixture::new();
        let ctx = fixture.context();
        let entry = fixture.registry.resource("Entry").unwrap();
        let options = QueryOptions {
            filters: FilterSet::new().field("headline", [FilterOp::IContains]),
            ..Default::default()
        };
        let params = QueryParams::parse(
            "include=blog,authors&fields%5Bentries%5D=headline&filter%5Bheadline.icontains%5D=x&sort=-id,bodyText",
        );
        let query = RequestQuery::parse(&params, entry, &options, &ctx).unwrap();
        assert_eq!(query.include.paths(), ["blog", "authors"]);
        assert_eq!(query.fields.get("entries").unwrap(), ["headline"]);
        assert_eq!(query.filters.len(), 1);
        assert_eq!(
            query.sort,
            [SortField::descending("id"), SortField::ascending("body_text")]
        );
    }

    #[test]
    fn test_grammar_checked_first() {
        let fixture = Fixture::new();
        let ctx = fixture.context();
        let entry = fixture.registry.resource("Entry").unwrap();
        let params = QueryParams::parse("include=nonesuch&bogus=1");
        let err = RequestQuery::parse(&params, entry, &QueryOptions::default(), &ctx).unwrap_err();
        assert_eq!(err.to_string(), "invalid query parameter: bogus");
    }

    #[test]
    fn test_sort_restricted_to_ordering_fields() {
        let fixture = Fixture::new();
        let ctx = fixture.context();
        let entry = fixture.registry.resource("Entry").unwrap();
        let options = QueryOptions {
            ordering_fields: Some(vec!["headline".into(), "body_text".into()]),
            ..Default::default()
        };
        let params = QueryParams::parse("sort=nonesuch,headline,-not_a_field");
        let err = RequestQuery::parse(&params, entry, &options, &ctx).unwrap_err();
        assert_eq!(err.to_string(), "invalid sort parameter(s): nonesuch,-not_a_field");

        let params = QueryParams::parse("sort=secret");
        let err = RequestQuery::parse(&params, entry, &QueryOptions::default(), &ctx).unwrap_err();
        assert_eq!(err.to_string(), "invalid sort parameter(s): secret");
    }

    #[test]
    fn test_field_names_taken_verbatim_without_format() {
        let fixture = Fixture::with_config(Config::default());
        let ctx = fixture.context();
        let entry = fixture.registry.resource("Entry").unwrap();
        let options = QueryOptions {
            filters: FilterSet::new().field("body_text", [FilterOp::IContains]),
            ..Default::default()
        };
        let params = QueryParams::parse("filter%5Bbody_text.icontains%5D=x&sort=-body_text");
        let query = RequestQuery::parse(&params, entry, &options, &ctx).unwrap();
        assert_eq!(query.filters[0].path, ["body_text"]);
        assert_eq!(query.sort, [SortField::descending("body_text")]);

        let params = QueryParams::parse("sort=bodyText");
        let err = RequestQuery::parse(&params, entry, &options, &ctx).unwrap_err();
        assert_eq!(err.to_string(), "invalid sort parameter(s): bodyText");
        let params = QueryParams::parse("filter%5BbodyText.icontains%5D=x");
        let err = RequestQuery::parse(&params, entry, &options, &ctx).unwrap_err();
        assert_eq!(err.to_string(), "invalid filter[bodyText.icontains]");
    }
}
