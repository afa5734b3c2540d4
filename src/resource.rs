//! Resource definitions.
//!
//! A resource binds one or more path patterns to per-method handler
//! functions. It is a plain record built with a fluent builder:
//!
//! ```rust
//! use skein::{Request, Resource, Response, BoxError};
//!
//! async fn show(req: Request) -> Result<Response, BoxError> {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Ok(Response::text(format!("user {id}")))
//! }
//!
//! async fn remove(_req: Request) -> Result<&'static str, BoxError> {
//!     Err("users cannot be deleted".into())
//! }
//!
//! let users = Resource::new(["/users/:id", "/people/:id"])
//!     .get(show)
//!     .delete(remove);
//! ```
//!
//! Handler functions have the shape
//! `async fn(R) -> Result<impl IntoResponse, impl Into<BoxError>>`.
//! Returning an [`HttpError`](crate::HttpError) ends the request with its
//! status; any other error surfaces as `500`.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::{BoxError, Error};
use crate::handler::{BoxFuture, BoxedHandler, Handler, into_boxed};
use crate::method::Method;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Endpoint (per-method handler function) ────────────────────────────────────

/// Object-safe per-method handler.
#[doc(hidden)]
pub trait ErasedEndpoint<R> {
    fn call(&self, req: R) -> BoxFuture<'static, Result<Response, Error>>;
}

/// A type-erased per-method handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedEndpoint<R> = Arc<dyn ErasedEndpoint<R> + Send + Sync + 'static>;

/// Implemented for every valid per-method resource handler.
///
/// Sealed: the blanket impl over functions is the only implementation.
pub trait Endpoint<R>: private::Sealed<R> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_endpoint(self) -> BoxedEndpoint<R>;
}

mod private {
    pub trait Sealed<R> {}
}

impl<F, Fut, T, E, R> private::Sealed<R> for F
where
    F: Fn(R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: IntoResponse,
    E: Into<BoxError>,
{
}

impl<F, Fut, T, E, R> Endpoint<R> for F
where
    F: Fn(R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: IntoResponse,
    E: Into<BoxError>,
    R: 'static,
{
    fn into_boxed_endpoint(self) -> BoxedEndpoint<R> {
        Arc::new(FnEndpoint(self))
    }
}

/// Newtype bridging a concrete function to [`ErasedEndpoint`].
struct FnEndpoint<F>(F);

impl<F, Fut, T, E, R> ErasedEndpoint<R> for FnEndpoint<F>
where
    F: Fn(R) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: IntoResponse,
    E: Into<BoxError>,
{
    fn call(&self, req: R) -> BoxFuture<'static, Result<Response, Error>> {
        let fut = (self.0)(req);
        Box::pin(async move {
            fut.await
                .map(IntoResponse::into_response)
                .map_err(Error::invocation)
        })
    }
}

// ── Resource ──────────────────────────────────────────────────────────────────

/// A set of path patterns bound to per-method handlers and optional hooks.
pub struct Resource<R = Request> {
    paths: Vec<String>,
    methods: BTreeMap<Method, BoxedEndpoint<R>>,
    before: Vec<BoxedHandler<R, R>>,
    after: Vec<BoxedHandler<Response, Response>>,
}

impl<R: Send + 'static> Resource<R> {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            methods: BTreeMap::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Binds `endpoint` to `method`. Binding a method twice keeps the last one.
    pub fn on(mut self, method: Method, endpoint: impl Endpoint<R>) -> Self {
        self.methods.insert(method, endpoint.into_boxed_endpoint());
        self
    }

    pub fn get(self, endpoint: impl Endpoint<R>) -> Self { self.on(Method::Get, endpoint) }
    pub fn head(self, endpoint: impl Endpoint<R>) -> Self { self.on(Method::Head, endpoint) }
    pub fn post(self, endpoint: impl Endpoint<R>) -> Self { self.on(Method::Post, endpoint) }
    pub fn put(self, endpoint: impl Endpoint<R>) -> Self { self.on(Method::Put, endpoint) }
    pub fn patch(self, endpoint: impl Endpoint<R>) -> Self { self.on(Method::Patch, endpoint) }
    pub fn delete(self, endpoint: impl Endpoint<R>) -> Self { self.on(Method::Delete, endpoint) }
    pub fn options(self, endpoint: impl Endpoint<R>) -> Self { self.on(Method::Options, endpoint) }

    /// Adds a hook that runs on the request before any method handler of this
    /// resource. Hooks run in the order they were added; an error ends the
    /// request.
    pub fn before<H>(mut self, hook: H) -> Self
    where
        H: Handler<R, Output = R>,
    {
        self.before.push(into_boxed(hook));
        self
    }

    /// Adds a hook that runs on the response after the method handler.
    pub fn after<H>(mut self, hook: H) -> Self
    where
        H: Handler<Response, Output = Response>,
    {
        self.after.push(into_boxed(hook));
        self
    }
}

impl<R> Resource<R> {
    pub fn paths(&self) -> &[String] { &self.paths }

    /// Implemented methods in `Allow` header order.
    pub fn methods(&self) -> Vec<Method> {
        self.methods.keys().copied().collect()
    }

    pub fn endpoint(&self, method: Method) -> Option<&BoxedEndpoint<R>> {
        self.methods.get(&method)
    }

    /// Runs the before hooks, `endpoint`, then the after hooks.
    pub(crate) async fn invoke(&self, endpoint: &BoxedEndpoint<R>, mut req: R) -> Result<Response, Error> {
        for hook in &self.before {
            req = hook.call(req).await?;
        }
        let mut res = endpoint.call(req).await?;
        for hook in &self.after {
            res = hook.call(res).await?;
        }
        Ok(res)
    }
}

impl<R> fmt::Debug for Resource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("paths", &self.paths)
            .field("methods", &self.methods())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}
