//! The pipeline step trait and its type erasure.
//!
//! # What a handler is
//!
//! A [`Handler<I>`] takes one input value and produces one output value (or an
//! [`Error`]), asynchronously. Chains are built by feeding the output of one
//! handler into the next, so the output type of step *n* must be the input
//! type of step *n + 1*. The [`ChainBuilder`](crate::ChainBuilder) checks that
//! at compile time.
//!
//! You rarely implement the trait by hand. It is satisfied by any function or
//! closure of shape:
//!
//! ```text
//! async fn step(input: I) -> Result<O, skein::Error>
//! ```
//!
//! Synchronous steps are wrapped with [`from_sync`].
//!
//! # How handlers are stored
//!
//! Resource hooks hold handlers of different concrete types in one `Vec`, so
//! they go behind a trait object:
//!
//! ```text
//! hook (concrete H: Handler<I>)
//!        ↓ into_boxed(hook)
//! Arc<dyn ErasedHandler<I, O>>          ← BoxedHandler<I, O>
//!        ↓ at request time
//! handler.call(input) -> BoxFuture      ← one vtable dispatch
//! ```

use std::future::{Future, ready};
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;

/// A heap-allocated, type-erased future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// One step of a chain.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as a handler for `{I}`",
    label = "not a `Handler<{I}>`",
    note = "handlers are `Fn({I}) -> impl Future<Output = Result<_, skein::Error>>`, \
            or a synchronous function wrapped with `skein::handler::from_sync`"
)]
pub trait Handler<I>: Send + Sync + 'static {
    type Output;

    fn handle(&self, input: I) -> impl Future<Output = Result<Self::Output, Error>> + Send;
}

impl<F, Fut, I, O> Handler<I> for F
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, Error>> + Send,
{
    type Output = O;

    fn handle(&self, input: I) -> impl Future<Output = Result<O, Error>> + Send {
        (self)(input)
    }
}

// ── Synchronous handlers ──────────────────────────────────────────────────────

/// A handler built from a synchronous function. See [`from_sync`].
#[derive(Clone, Copy, Debug)]
pub struct SyncFn<F>(F);

/// Adapts a plain `Fn(I) -> Result<O, Error>` into a [`Handler`].
///
/// ```rust
/// use skein::{ChainBuilder, handler::from_sync};
///
/// let chain = ChainBuilder::new()
///     .handler(from_sync(|n: u32| Ok(n + 1)))
///     .build()
///     .unwrap();
/// ```
pub fn from_sync<F, I, O>(f: F) -> SyncFn<F>
where
    F: Fn(I) -> Result<O, Error>,
{
    SyncFn(f)
}

impl<F, I, O> Handler<I> for SyncFn<F>
where
    F: Fn(I) -> Result<O, Error> + Send + Sync + 'static,
    O: Send,
{
    type Output = O;

    fn handle(&self, input: I) -> impl Future<Output = Result<O, Error>> + Send {
        ready((self.0)(input))
    }
}

// ── Type erasure ──────────────────────────────────────────────────────────────

/// Object-safe mirror of [`Handler`].
#[doc(hidden)]
pub trait ErasedHandler<I, O>: Send + Sync {
    fn call(&self, input: I) -> BoxFuture<'_, Result<O, Error>>;
}

impl<H, I> ErasedHandler<I, H::Output> for H
where
    H: Handler<I>,
    I: Send + 'static,
{
    fn call(&self, input: I) -> BoxFuture<'_, Result<H::Output, Error>> {
        Box::pin(self.handle(input))
    }
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler<I, O> = Arc<dyn ErasedHandler<I, O> + Send + Sync + 'static>;

pub(crate) fn into_boxed<H, I>(handler: H) -> BoxedHandler<I, H::Output>
where
    H: Handler<I>,
    I: Send + 'static,
{
    Arc::new(handler)
}
