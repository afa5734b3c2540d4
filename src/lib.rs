//! # skein
//!
//! A small HTTP framework built around one idea: a request is a value that
//! flows through an ordered chain of handlers, and each handler turns one
//! value into the next.
//!
//! ## The model
//!
//! - A [`Chain`] is an immutable sequence of handlers. The output of each step
//!   is the input of the following one, checked at compile time by
//!   [`ChainBuilder`].
//! - A [`Resource`] binds path patterns (`/users/:id`, `/files/*rest`) to
//!   per-method handler functions.
//! - The standard chain validates the request, wraps it in a [`Context`],
//!   resolves the resource, rejects unknown paths and methods, parses
//!   parameters and calls the resource.
//! - Errors travel unchanged to the end of the chain. The
//!   [`ErrorTranslator`] turns them into responses exactly once.
//!
//! The [`Server`] adapts a chain to hyper and tokio: it collects bodies,
//! enforces deadlines, isolates panics and drains connections on shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use skein::{BoxError, Chain, HttpError, Request, Resource, Response, Server};
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() {
//!     let chain = Chain::http([
//!         Resource::new(["/users/:id"]).get(get_user),
//!         Resource::new(["/users"]).post(create_user),
//!     ])
//!     .unwrap();
//!
//!     Server::bind(([0, 0, 0, 0], 3000)).serve(chain).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Result<Response, BoxError> {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Ok(Response::json(format!(r#"{{"id":"{id}"}}"#)))
//! }
//!
//! async fn create_user(req: Request) -> Result<Response, HttpError> {
//!     if req.body().is_empty() {
//!         return Err(HttpError::new(StatusCode::BAD_REQUEST));
//!     }
//!     Ok(Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header(http::header::LOCATION, "/users/99")
//!         .json(r#"{"id":"99"}"#))
//! }
//! ```

mod chain;
mod config;
mod context;
mod error;
mod method;
mod path;
mod registry;
mod request;
mod resource;
mod response;
mod server;
mod translate;

pub mod builtin;
pub mod handler;

pub use chain::{Chain, ChainBuilder};
pub use config::{Config, ConfigError};
pub use context::{Context, Params};
pub use error::{BoxError, BuildError, Error, HttpError, PatternError, RegistryError, ServeError, ValidationError};
pub use handler::Handler;
pub use method::{Method, UnknownMethod};
pub use path::{CompiledPath, Segment};
pub use registry::{Registry, Resolution, ResourceMatch};
pub use request::{Inbound, Request};
pub use resource::{Endpoint, Resource};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use server::Server;
pub use translate::{ErrorDetail, ErrorTranslator};
