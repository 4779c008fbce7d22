//! The interface to the transport layer.
//!
//! The embedding application translates whatever HTTP framework it uses into a [`Request`], hands
//! it to a [view](crate::view), and writes the returned [`Response`] back out with the
//! [JSON:API media type](crate::MEDIA_TYPE).

use crate::{query::QueryParams, Error, Result};
use derive_more::Display;
use serde_json::Value;
use url::Url;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Method {
    #[display(fmt = "GET")]
    Get,
    #[display(fmt = "POST")]
    Post,
    #[display(fmt = "PATCH")]
    Patch,
    #[display(fmt = "PUT")]
    Put,
    #[display(fmt = "DELETE")]
    Delete,
}

impl Method {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PATCH" => Ok(Self::Patch),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(Error::MethodNotAllowed { method: s.into() }),
        }
    }

    /// Whether requests with this method carry a document to parse.
    pub fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Patch | Self::Put)
    }
}

/// An inbound request, as delivered by the transport layer.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    /// The absolute URL of the request, used to build pagination links.
    pub url: Url,
    pub query: QueryParams,
    /// The raw request body, if any.
    pub body: Option<String>,
}

impl Request {
    /// A request for `url`, taking the query parameters from the URL.
    pub fn new(method: Method, url: Url) -> Self {
        let query = QueryParams::parse(url.query().unwrap_or_default());
        Self {
            method,
            url,
            query,
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// A request with a JSON body.
    pub fn with_json(self, body: &Value) -> Self {
        self.with_body(body.to_string())
    }
}

/// A rendered response.
///
/// The body is always a JSON:API document: primary data for successful responses (`null` for
/// `204 No Content`) and `errors` otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_request_query_from_url() {
        let url = Url::parse("http://testserver/entries?include=blog&page%5Bnumber%5D=2").unwrap();
        let req = Request::get(url);
        assert_eq!(req.query.get("include"), Some("blog"));
        assert_eq!(req.query.get("page[number]"), Some("2"));
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(Method::parse("patch").unwrap(), Method::Patch);
        assert_eq!(
            Method::parse("TRACE").unwrap_err().to_string(),
            "Method \"TRACE\" not allowed."
        );
        assert!(Method::Put.has_body());
        assert!(!Method::Delete.has_body());
    }
}
