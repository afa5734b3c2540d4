//! The per-request lifecycle context.

use std::collections::HashMap;

use crate::registry::Resolution;
use crate::request::Request;

/// Path and query parameters parsed for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    path: HashMap<String, String>,
    query: Vec<(String, String)>,
}

impl Params {
    pub fn new(path: HashMap<String, String>, query: Vec<(String, String)>) -> Self {
        Self { path, query }
    }

    /// Parses a raw query string (`a=1&b=two%20words`).
    pub fn parse_query(raw: &str) -> Vec<(String, String)> {
        url::form_urlencoded::parse(raw.as_bytes()).into_owned().collect()
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.path.get(key).map(String::as_str)
    }

    pub fn path(&self) -> &HashMap<String, String> { &self.path }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn query_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn query_pairs(&self) -> &[(String, String)] { &self.query }
}

/// The value threaded through a chain for one request.
///
/// `R` is the inbound request type; `X` holds whatever extra state your own
/// handlers need (a user session, a response slot, timings…). Exactly one
/// context exists per request and only the chain's handlers touch it, in order.
pub struct Context<R = Request, X = ()> {
    request: R,
    resolution: Option<Resolution<R>>,
    params: Params,
    extra: X,
}

impl<R, X> Context<R, X> {
    pub fn new(request: R, extra: X) -> Self {
        Self { request, resolution: None, params: Params::default(), extra }
    }

    pub fn request(&self) -> &R { &self.request }
    pub fn request_mut(&mut self) -> &mut R { &mut self.request }
    pub fn extra(&self) -> &X { &self.extra }
    pub fn extra_mut(&mut self) -> &mut X { &mut self.extra }
    pub fn params(&self) -> &Params { &self.params }

    /// The resource resolution, once [`ResourceIndex`](crate::builtin::ResourceIndex)
    /// has run.
    pub fn resolution(&self) -> Option<&Resolution<R>> {
        self.resolution.as_ref()
    }

    pub fn set_resolution(&mut self, resolution: Resolution<R>) {
        self.resolution = Some(resolution);
    }

    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn into_request(self) -> R {
        self.request
    }

    /// Takes the context apart: request, resolution, params, extras.
    pub fn into_parts(self) -> (R, Option<Resolution<R>>, Params, X) {
        (self.request, self.resolution, self.params, self.extra)
    }
}

impl<R: std::fmt::Debug, X: std::fmt::Debug> std::fmt::Debug for Context<R, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request", &self.request)
            .field("resolution", &self.resolution)
            .field("params", &self.params)
            .field("extra", &self.extra)
            .finish()
    }
}
