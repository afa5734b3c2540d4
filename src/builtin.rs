//! Handlers shipped with the framework.
//!
//! [`ChainBuilder::resources`](crate::ChainBuilder::resources) appends the
//! resource handlers in this order:
//!
//! ```text
//! ResourceIndex → ResourceNotFound → RequestParamsParser → ResourceCaller
//! ```
//!
//! [`RequestValidator`] and [`Lifecycle`] usually come first, turning the raw
//! request into a [`Context`].

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::context::{Context, Params};
use crate::error::{Error, HttpError, ValidationError};
use crate::handler::Handler;
use crate::registry::{Registry, Resolution};
use crate::request::{Inbound, split_url};
use crate::response::Response;

/// Rejects requests without a usable URL or method.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestValidator;

impl<R: Inbound> Handler<R> for RequestValidator {
    type Output = R;

    async fn handle(&self, req: R) -> Result<R, Error> {
        if req.method().is_empty() {
            return Err(ValidationError::new("missing method").into());
        }
        if req.url().is_empty() {
            return Err(ValidationError::new("missing url").into());
        }
        if split_url(req.url()).is_none() {
            return Err(ValidationError::new(format!("malformed url `{}`", req.url())).into());
        }
        Ok(req)
    }
}

/// Wraps the request in a fresh [`Context`] with default extras.
pub struct Lifecycle<X = ()>(PhantomData<fn() -> X>);

impl<X> Lifecycle<X> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<X> Default for Lifecycle<X> {
    fn default() -> Self { Self::new() }
}

impl<R, X> Handler<R> for Lifecycle<X>
where
    R: Inbound,
    X: Default + Send + 'static,
{
    type Output = Context<R, X>;

    async fn handle(&self, req: R) -> Result<Context<R, X>, Error> {
        Ok(Context::new(req, X::default()))
    }
}

/// Resolves the request against a [`Registry`] and records the outcome on the
/// context. Never produces a response itself.
pub struct ResourceIndex<R> {
    registry: Arc<Registry<R>>,
}

impl<R> ResourceIndex<R> {
    pub fn new(registry: Arc<Registry<R>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry<R> { &self.registry }
}

impl<R, X> Handler<Context<R, X>> for ResourceIndex<R>
where
    R: Inbound,
    X: Send + 'static,
{
    type Output = Context<R, X>;

    async fn handle(&self, mut ctx: Context<R, X>) -> Result<Context<R, X>, Error> {
        let (path, _) = split_url(ctx.request().url())
            .ok_or_else(|| ValidationError::new(format!("malformed url `{}`", ctx.request().url())))?;
        let resolution = self.registry.resolve(&path, ctx.request().method());
        debug!(method = ctx.request().method(), path = %path, ?resolution, "resource lookup");
        ctx.set_resolution(resolution);
        Ok(ctx)
    }
}

/// Turns a missing resource into `404` and a missing method into `405`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResourceNotFound;

impl<R, X> Handler<Context<R, X>> for ResourceNotFound
where
    R: Inbound,
    X: Send + 'static,
{
    type Output = Context<R, X>;

    async fn handle(&self, ctx: Context<R, X>) -> Result<Context<R, X>, Error> {
        if ctx.resolution().is_some_and(Resolution::is_matched) {
            return Ok(ctx);
        }
        match ctx.resolution() {
            Some(Resolution::MethodNotAllowed { allowed, .. }) => {
                Err(HttpError::method_not_allowed(allowed).into())
            }
            _ => Err(HttpError::not_found().into()),
        }
    }
}

/// Copies path parameters from the match and query parameters from the URL
/// onto the context and the request.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestParamsParser;

impl<R, X> Handler<Context<R, X>> for RequestParamsParser
where
    R: Inbound,
    X: Send + 'static,
{
    type Output = Context<R, X>;

    async fn handle(&self, mut ctx: Context<R, X>) -> Result<Context<R, X>, Error> {
        let path = match ctx.resolution() {
            Some(Resolution::Matched(m)) => m.params.clone(),
            _ => Default::default(),
        };
        let query = split_url(ctx.request().url())
            .and_then(|(_, query)| query)
            .map(|q| Params::parse_query(&q))
            .unwrap_or_default();

        let params = Params::new(path, query);
        ctx.request_mut().attach_params(&params);
        ctx.set_params(params);
        Ok(ctx)
    }
}

/// Invokes the resolved method handler and returns its response.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResourceCaller;

impl<R, X> Handler<Context<R, X>> for ResourceCaller
where
    R: Inbound,
    X: Send + 'static,
{
    type Output = Response;

    async fn handle(&self, ctx: Context<R, X>) -> Result<Response, Error> {
        let (req, resolution, _, _) = ctx.into_parts();
        match resolution {
            Some(Resolution::Matched(m)) => m.resource.invoke(&m.endpoint, req).await,
            // Chains built without `ResourceNotFound` still answer correctly.
            Some(Resolution::MethodNotAllowed { allowed, .. }) => {
                Err(HttpError::method_not_allowed(&allowed).into())
            }
            Some(Resolution::NotFound) | None => Err(HttpError::not_found().into()),
        }
    }
}
