//! Raw query parameters and the global parameter grammar.

use crate::{Error, Result};
use itertools::Itertools;
use url::form_urlencoded;

/// The bracketed parameter families.
const FAMILIES: &[&str] = &["filter", "fields", "page"];

/// The decoded query parameters of a request, in order of appearance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Decode an `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Self {
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The first value of the parameter `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Parameters of the form `family[inner]`, as `(inner, value, raw key)` triples.
    ///
    /// Keys which are not well-formed members of the family are skipped;
    /// [`validate`](Self::validate) reports them.
    pub fn bracketed<'a>(
        &'a self,
        family: &'a str,
    ) -> impl 'a + Iterator<Item = (&'a str, &'a str, &'a str)> {
        self.iter()
            .filter_map(move |(k, v)| Some((bracket_inner(k, family)?, v, k)))
    }

    /// Check every parameter against the JSON:API parameter grammar.
    ///
    /// The recognized parameters are `sort`, `include`, and `filter[...]`, `fields[...]` and
    /// `page[...]` with a non-empty bracketed name. Unknown, malformed and repeated parameters are
    /// rejected with an error naming the raw parameter.
    pub fn validate(&self) -> Result<()> {
        let counts = self.pairs.iter().counts_by(|(k, _)| k.as_str());
        for (key, _) in &self.pairs {
            let key = key.as_str();
            let count = counts[key];
            if !is_recognized(key) {
                tracing::debug!(key, "rejecting unknown query parameter");
                return Err(Error::query(
                    format!("invalid query parameter: {key}"),
                    key,
                ));
            }
            if count > 1 {
                tracing::debug!(key, count, "rejecting repeated query parameter");
                return Err(Error::query(
                    format!("repeated query parameter not allowed: {key}"),
                    key,
                ));
            }
        }
        Ok(())
    }
}

/// The bracketed name of `key`, if `key` is `family[name]` with a well-formed `name`.
pub(crate) fn bracket_inner<'a>(key: &'a str, family: &str) -> Option<&'a str> {
    let inner = key
        .strip_prefix(family)?
        .strip_prefix('[')?
        .strip_suffix(']')?;
    let valid = !inner.is_empty()
        && inner
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'));
    valid.then_some(inner)
}

fn is_recognized(key: &str) -> bool {
    key == "sort"
        || key == "include"
        || FAMILIES
            .iter()
            .any(|family| bracket_inner(key, family).is_some())
}

#[cfg(test)]
mod test {
    use super::*;

    fn detail(params: &str) -> String {
        let err = QueryParams::parse(params).validate().unwrap_err();
        assert_eq!(err.status(), 400);
        err.to_string()
    }

    #[test]
    fn test_valid_params() {
        let params = QueryParams::parse(
            "sort=-headline&include=blog.authors&filter%5Bblog.name%5D=x&fields%5Bentries%5D=headline&page%5Bnumber%5D=2",
        );
        params.validate().unwrap();
        assert_eq!(params.get("sort"), Some("-headline"));
        assert_eq!(
            params.bracketed("fields").collect::<Vec<_>>(),
            [("entries", "headline", "fields[entries]")]
        );
        assert_eq!(
            params.bracketed("filter").collect::<Vec<_>>(),
            [("blog.name", "x", "filter[blog.name]")]
        );
    }

    #[test]
    fn test_invalid_params() {
        for qp in [
            "filter", "filter[", "filter]", "filter[]", "fields", "page[]", "sorts", "bogus",
            "filter[a b]", "include[x]",
        ] {
            let key = form_urlencoded::byte_serialize(qp.as_bytes()).collect::<String>();
            assert_eq!(
                detail(&format!("{key}=1")),
                format!("invalid query parameter: {qp}")
            );
        }
    }

    #[test]
    fn test_repeated_params() {
        assert_eq!(
            detail("sort=a&sort=b"),
            "repeated query parameter not allowed: sort"
        );
        assert_eq!(
            detail("filter[headline]=a&filter[headline]=b"),
            "repeated query parameter not allowed: filter[headline]"
        );
    }

    #[test]
    fn test_error_names_parameter() {
        let err = QueryParams::parse("bogus=1").validate().unwrap_err();
        let Error::InvalidQuery { parameter, .. } = err else {
            panic!("expected query error, got {err:?}");
        };
        assert_eq!(parameter, "bogus");
    }
}
