//! Pagination of collection endpoints.
//!
//! Two styles are supported, chosen by [`Config::pagination`]:
//!
//! * page number: `page[number]` (1-based, or `last`) and `page[size]`;
//! * limit/offset: `page[limit]` and `page[offset]`.
//!
//! Either way the paginator turns the parameters and the size of the filtered collection into a
//! [`Window`] for the data source, pagination `meta`, and `first`/`last`/`next`/`prev` links built
//! from the request URL.

use crate::{
    config::{Config, PaginationStyle},
    links::replace_query_param,
    query::QueryParams,
    storage::Window,
    Error, Result,
};
use serde_json::{json, Map, Value};
use url::Url;

pub const PAGE_NUMBER: &str = "page[number]";
pub const PAGE_SIZE: &str = "page[size]";
pub const PAGE_LIMIT: &str = "page[limit]";
pub const PAGE_OFFSET: &str = "page[offset]";

/// One page of a collection.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub window: Window,
    /// Root-level `meta`, holding the `pagination` member.
    pub meta: Map<String, Value>,
    /// Root-level `links`.
    pub links: Map<String, Value>,
}

/// Computes pages according to the configured pagination style.
#[derive(Clone, Copy, Debug)]
pub struct Paginator<'a> {
    config: &'a Config,
}

impl<'a> Paginator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// The page requested by `params` of a collection with `count` members.
    ///
    /// Returns [`None`] if pagination is disabled.
    pub fn paginate(&self, params: &QueryParams, count: usize, url: &Url) -> Result<Option<Page>> {
        match self.config.pagination {
            PaginationStyle::PageNumber => self.page_number(params, count, url).map(Some),
            PaginationStyle::LimitOffset => Ok(Some(self.limit_offset(params, count, url))),
            PaginationStyle::Disabled => Ok(None),
        }
    }

    /// The requested page size, falling back to the default when it is missing or malformed.
    ///
    /// The result is always positive.
    fn size(&self, param: Option<&str>) -> usize {
        match param.and_then(|size| size.parse::<usize>().ok()) {
            Some(size) if size > 0 => size.min(self.config.max_page_size),
            _ => self.config.page_size,
        }
        .max(1)
    }

    fn page_number(&self, params: &QueryParams, count: usize, url: &Url) -> Result<Page> {
        let size = self.size(params.get(PAGE_SIZE));
        let pages = count.div_ceil(size).max(1);
        let number = match params.get(PAGE_NUMBER) {
            None => 1,
            Some("last") => pages,
            Some(number) => number.parse::<usize>().map_err(|_| invalid_page())?,
        };
        if number == 0 || number > pages {
            tracing::debug!(number, pages, "page out of range");
            return Err(invalid_page());
        }

        let link = |number: usize| {
            json!(replace_query_param(url, PAGE_NUMBER, Some(&number.to_string())).as_str())
        };
        let links = Map::from_iter([
            ("first".into(), link(1)),
            ("last".into(), link(pages)),
            (
                "next".into(),
                if number < pages { link(number + 1) } else { Value::Null },
            ),
            (
                "prev".into(),
                if number > 1 { link(number - 1) } else { Value::Null },
            ),
        ]);
        Ok(Page {
            window: Window {
                offset: (number - 1) * size,
                limit: Some(size),
            },
            meta: pagination_meta(json!({"page": number, "pages": pages, "count": count})),
            links,
        })
    }

    fn limit_offset(&self, params: &QueryParams, count: usize, url: &Url) -> Page {
        let limit = self.size(params.get(PAGE_LIMIT));
        let offset = params
            .get(PAGE_OFFSET)
            .and_then(|offset| offset.parse::<usize>().ok())
            .unwrap_or(0);

        let link = |offset: Option<usize>| {
            let url = replace_query_param(url, PAGE_LIMIT, Some(&limit.to_string()));
            let offset = offset.map(|offset| offset.to_string());
            json!(replace_query_param(&url, PAGE_OFFSET, offset.as_deref()).as_str())
        };
        let (first, last) = if count == 0 {
            (Value::Null, Value::Null)
        } else {
            (link(None), link(Some(count.saturating_sub(limit))))
        };
        let next = match offset.checked_add(limit) {
            Some(end) if end < count => link(Some(end)),
            _ => Value::Null,
        };
        let prev = match offset {
            0 => Value::Null,
            offset if offset <= limit => link(None),
            offset => link(Some(offset - limit)),
        };
        Page {
            window: Window {
                offset,
                limit: Some(limit),
            },
            meta: pagination_meta(json!({"count": count, "limit": limit, "offset": offset})),
            links: Map::from_iter([
                ("first".into(), first),
                ("last".into(), last),
                ("next".into(), next),
                ("prev".into(), prev),
            ]),
        }
    }
}

fn pagination_meta(pagination: Value) -> Map<String, Value> {
    Map::from_iter([("pagination".into(), pagination)])
}

fn invalid_page() -> Error {
    Error::NotFound {
        detail: "Invalid page.".into(),
    }
}
