//! Incoming request types.
//!
//! The chain only needs two things from a request: a URL and a method. That
//! minimal shape is the [`Inbound`] trait, so a chain can run over any
//! request type an adapter hands it. [`Request`] is the crate's own
//! implementation: it wraps the `http` crate's request by composition and adds
//! the accessors resource code usually wants.

use std::collections::HashMap;
use std::str::Utf8Error;

use bytes::Bytes;
use http::header::{AsHeaderName, COOKIE};
use http::{HeaderMap, Uri};

use crate::context::Params;

/// The minimal request shape a chain works with.
pub trait Inbound: Send + 'static {
    /// The request target: origin-form (`/path?query`) or an absolute URL.
    fn url(&self) -> &str;

    /// The request method as sent on the wire.
    fn method(&self) -> &str;

    /// Receives the parameters parsed for this request. The default ignores
    /// them; they stay readable from the [`Context`](crate::Context).
    fn attach_params(&mut self, _params: &Params) {}
}

/// An incoming HTTP request.
#[derive(Debug)]
pub struct Request {
    head: http::request::Parts,
    body: Bytes,
    params: Params,
}

impl Request {
    /// Builds a bodiless request, mostly useful in tests.
    ///
    /// ```rust
    /// let req = skein::Request::new("GET", "/users/42?full=1").unwrap();
    /// assert_eq!(req.path(), "/users/42");
    /// ```
    pub fn new(method: &str, uri: &str) -> Result<Self, http::Error> {
        Self::with_body(method, uri, Bytes::new())
    }

    pub fn with_body(method: &str, uri: &str, body: impl Into<Bytes>) -> Result<Self, http::Error> {
        let req = http::Request::builder().method(method).uri(uri).body(body.into())?;
        Ok(Self::from(req))
    }

    pub fn method(&self) -> &str { self.head.method.as_str() }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn path(&self) -> &str { self.head.uri.path() }
    pub fn query_string(&self) -> Option<&str> { self.head.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// The body as UTF-8 text.
    pub fn text(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: impl AsHeaderName) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Looks up a cookie sent in any `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.head
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.trim_matches('"'))
    }

    /// Returns a named path parameter.
    ///
    /// For a resource path `/users/:id`, `req.param("id")` on `/users/42`
    /// returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.param(key)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        self.params.path()
    }

    /// Returns the first value of a query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.params.query(key)
    }

    /// Returns every value of a repeated query parameter, in order.
    pub fn query_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.params.query_all(key)
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (head, body) = req.into_parts();
        Self { head, body, params: Params::default() }
    }
}

impl Inbound for Request {
    /// Authority-form targets (`CONNECT host:443`) resolve as `/`; the host
    /// stays readable through [`Request::uri`].
    fn url(&self) -> &str {
        match self.head.uri.path_and_query() {
            Some(pq) => pq.as_str(),
            None if self.head.uri.authority().is_some() => "/",
            None => "",
        }
    }

    fn method(&self) -> &str {
        self.head.method.as_str()
    }

    fn attach_params(&mut self, params: &Params) {
        self.params = params.clone();
    }
}

/// Splits a request URL into its path and raw query string.
pub(crate) fn split_url(url: &str) -> Option<(String, Option<String>)> {
    let uri: Uri = url.parse().ok()?;
    Some((uri.path().to_owned(), uri.query().map(str::to_owned)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_cookies_from_every_header() {
        let req = http::Request::builder()
            .uri("/")
            .header(COOKIE, "theme=dark; session=\"abc\"")
            .header(COOKIE, "lang=en")
            .body(Bytes::new())
            .unwrap();
        let req = Request::from(req);
        assert_eq!(req.cookie("theme"), Some("dark"));
        assert_eq!(req.cookie("session"), Some("abc"));
        assert_eq!(req.cookie("lang"), Some("en"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = http::Request::builder()
            .uri("/")
            .header("X-Request-Id", "7")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(Request::from(req).header("x-request-id"), Some("7"));
    }

    #[test]
    fn url_keeps_the_query() {
        let req = Request::new("GET", "http://example.com/a/b?c=d").unwrap();
        assert_eq!(Inbound::url(&req), "/a/b?c=d");
        assert_eq!(req.path(), "/a/b");
        assert_eq!(req.query_string(), Some("c=d"));
    }

    #[test]
    fn authority_form_targets_resolve_as_root() {
        let req = Request::new("CONNECT", "example.com:443").unwrap();
        assert_eq!(Inbound::url(&req), "/");
        assert_eq!(req.uri().authority().map(|a| a.as_str()), Some("example.com:443"));
    }

    #[test]
    fn split_url_handles_both_forms() {
        assert_eq!(split_url("/x?y=1"), Some(("/x".into(), Some("y=1".into()))));
        assert_eq!(split_url("https://h.test/x"), Some(("/x".into(), None)));
        assert_eq!(split_url(""), None);
    }
}
