//! Named routes and link construction.
//!
//! Links are produced by reversing named URL templates such as
//! `/entries/{pk}/relationships/{related_field}`. Placeholders are filled from the parameters given
//! to [`Routes::reverse`]; reversing fails if the route is unknown or a placeholder has no value.

use indexmap::IndexMap;
use url::{form_urlencoded, Url};

/// A table of named URL templates.
#[derive(Clone, Debug, Default)]
pub struct Routes {
    base: Option<Url>,
    routes: IndexMap<String, String>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce absolute links by resolving reversed paths against `base`.
    pub fn with_base(mut self, base: Url) -> Self {
        self.base = Some(base);
        self
    }

    /// Add a named route.
    pub fn route(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.routes.insert(name.into(), template.into());
        self
    }

    /// All routes, in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.routes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn template(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(String::as_str)
    }

    /// Build a link from the route `name`, substituting `params` into its placeholders.
    pub fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        let template = self.routes.get(name)?;
        let mut path = String::with_capacity(template.len());
        let mut rest = template.as_str();
        while let Some(start) = rest.find('{') {
            let end = start + rest[start..].find('}')?;
            let key = &rest[start + 1..end];
            let (_, value) = params.iter().find(|(k, _)| *k == key)?;
            path.push_str(&rest[..start]);
            path.extend(form_urlencoded::byte_serialize(value.as_bytes()));
            rest = &rest[end + 1..];
        }
        path.push_str(rest);

        match &self.base {
            Some(base) => base.join(&path).ok().map(String::from),
            None => Some(path),
        }
    }
}

/// Replace (or remove, if `value` is [`None`]) the query parameter `key` in `url`.
pub fn replace_query_param(url: &Url, key: &str, value: Option<&str>) -> Url {
    let pairs = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect::<Vec<_>>();
    let mut url = url.clone();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.extend_pairs(pairs);
        if let Some(value) = value {
            query.append_pair(key, value);
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    url
}
