//! The handler chain.
//!
//! # How a chain is put together
//!
//! Each [`ChainBuilder::handler`] call wraps the steps added so far in one more
//! closure, so the builder's type always names the chain's input and its
//! current output:
//!
//! ```text
//! ChainBuilder<Request, Request>                      new()
//!        ↓ .handler(RequestValidator)
//! ChainBuilder<Request, Request>
//!        ↓ .context::<()>()
//! ChainBuilder<Request, Context<Request, ()>>
//!        ↓ .resources([...])
//! ChainBuilder<Request, Response>
//!        ↓ .build()
//! Chain<Request, Response>
//! ```
//!
//! A handler whose input does not match the previous output is a compile
//! error, not a runtime surprise.
//!
//! # Running
//!
//! [`Chain::handle`] awaits every step in order. The first error stops the
//! chain and is returned as-is; turning it into a response is the caller's
//! job (see [`ErrorTranslator`](crate::ErrorTranslator)).
//!
//! There is no built-in timeout. To impose a deadline, race `handle` against a
//! timer and drop the loser. Dropping the future stops the chain at its next
//! suspension point; anything a handler spawned elsewhere keeps running.

use std::sync::Arc;

use tracing::{Instrument, debug_span, trace};

use crate::builtin::{Lifecycle, RequestParamsParser, RequestValidator, ResourceCaller, ResourceIndex, ResourceNotFound};
use crate::context::Context;
use crate::error::{BuildError, Error};
use crate::handler::{BoxFuture, Handler};
use crate::registry::Registry;
use crate::request::{Inbound, Request};
use crate::resource::Resource;
use crate::response::Response;

type Run<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, Error>> + Send + Sync>;

/// Assembles a [`Chain`]. See the [module docs](self).
pub struct ChainBuilder<I, O> {
    run: Run<I, O>,
    steps: Vec<&'static str>,
    deferred: Option<BuildError>,
}

impl<I: Send + 'static> ChainBuilder<I, I> {
    pub fn new() -> Self {
        Self {
            run: Arc::new(|input: I| -> BoxFuture<'static, Result<I, Error>> {
                Box::pin(async move { Ok(input) })
            }),
            steps: Vec::new(),
            deferred: None,
        }
    }
}

impl<I: Send + 'static> Default for ChainBuilder<I, I> {
    fn default() -> Self { Self::new() }
}

impl<I, O> ChainBuilder<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Appends one handler.
    pub fn handler<H>(self, handler: H) -> ChainBuilder<I, H::Output>
    where
        H: Handler<O>,
        H::Output: Send + 'static,
    {
        let prev = self.run;
        let handler = Arc::new(handler);
        let name = std::any::type_name::<H>();

        let run: Run<I, H::Output> = Arc::new(move |input: I| -> BoxFuture<'static, Result<H::Output, Error>> {
            let prev = Arc::clone(&prev);
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let value = prev(input).await?;
                trace!(handler = name, "entering handler");
                handler.handle(value).await
            })
        });

        let mut steps = self.steps;
        steps.push(name);
        ChainBuilder { run, steps, deferred: self.deferred }
    }

    /// Freezes the handler sequence.
    pub fn build(self) -> Result<Chain<I, O>, BuildError> {
        if let Some(err) = self.deferred {
            return Err(err);
        }
        if self.steps.is_empty() {
            return Err(BuildError::Empty);
        }
        Ok(Chain { run: self.run, steps: self.steps.into() })
    }
}

impl<I, R> ChainBuilder<I, R>
where
    I: Send + 'static,
    R: Inbound,
{
    /// Appends [`Lifecycle`], wrapping the request in a [`Context`] with
    /// extras `X`.
    pub fn context<X>(self) -> ChainBuilder<I, Context<R, X>>
    where
        X: Default + Send + 'static,
    {
        self.handler(Lifecycle::<X>::new())
    }
}

impl<I, R, X> ChainBuilder<I, Context<R, X>>
where
    I: Send + 'static,
    R: Inbound,
    X: Send + 'static,
{
    /// Appends resource dispatch: index, not-found, params parser, caller.
    ///
    /// Registration problems (bad patterns, ambiguous paths) are reported by
    /// [`build`](ChainBuilder::build).
    pub fn resources<T>(self, resources: T) -> ChainBuilder<I, Response>
    where
        T: IntoIterator<Item = Resource<R>>,
    {
        let mut registry = Registry::new();
        let failed = registry.register(resources).err();

        let mut next = self
            .handler(ResourceIndex::new(Arc::new(registry)))
            .handler(ResourceNotFound)
            .handler(RequestParamsParser)
            .handler(ResourceCaller);
        if let Some(err) = failed {
            next.deferred.get_or_insert(err.into());
        }
        next
    }
}

/// An immutable, shareable sequence of handlers.
///
/// Cloning is cheap: clones share the same handlers.
pub struct Chain<I, O> {
    run: Run<I, O>,
    steps: Arc<[&'static str]>,
}

impl<I, O> Chain<I, O> {
    /// Runs `input` through every handler in order.
    pub async fn handle(&self, input: I) -> Result<O, Error> {
        let span = debug_span!("chain", handlers = self.steps.len());
        (self.run)(input).instrument(span).await
    }

    /// Handler type names, in execution order.
    pub fn handlers(&self) -> &[&'static str] {
        &self.steps
    }
}

impl Chain<Request, Response> {
    /// The standard HTTP chain: validate, build the context, dispatch to
    /// `resources`.
    pub fn http<T>(resources: T) -> Result<Self, BuildError>
    where
        T: IntoIterator<Item = Resource>,
    {
        ChainBuilder::<Request, Request>::new()
            .handler(RequestValidator)
            .context::<()>()
            .resources(resources)
            .build()
    }
}

impl<I, O> Clone for Chain<I, O> {
    fn clone(&self) -> Self {
        Self { run: Arc::clone(&self.run), steps: Arc::clone(&self.steps) }
    }
}
