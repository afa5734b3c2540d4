//! Error-to-response translation.
//!
//! Runs once, at the boundary where a chain's result is consumed. The chain
//! itself never calls it.
//!
//! | Error                 | Status          | Body                               |
//! |-----------------------|-----------------|------------------------------------|
//! | [`Error::Http`]       | the error's     | the error's message                |
//! | [`Error::Validation`] | `400`           | the validation reason              |
//! | [`Error::Invocation`] | `500`           | the message, or a generic one      |

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use http::header::{ALLOW, HeaderValue};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Error;
use crate::response::Response;

/// How much of an internal error reaches the client.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDetail {
    /// Send the error's own message.
    #[default]
    Expose,
    /// Send the canonical `Internal Server Error` text.
    Redact,
}

type Translate = Arc<dyn Fn(Error) -> Response + Send + Sync>;

/// Converts any [`Error`] into a [`Response`]. Total: every error maps to
/// something.
#[derive(Clone)]
pub struct ErrorTranslator {
    translate: Translate,
}

impl ErrorTranslator {
    /// The built-in translation with the given detail policy.
    pub fn new(detail: ErrorDetail) -> Self {
        Self { translate: Arc::new(move |err| default_translation(err, detail)) }
    }

    /// A caller-supplied translation, used instead of the built-in one.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Error) -> Response + Send + Sync + 'static,
    {
        Self { translate: Arc::new(f) }
    }

    pub fn translate(&self, err: Error) -> Response {
        (self.translate)(err)
    }
}

impl Default for ErrorTranslator {
    fn default() -> Self { Self::new(ErrorDetail::default()) }
}

impl fmt::Debug for ErrorTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorTranslator").finish_non_exhaustive()
    }
}

fn default_translation(err: Error, detail: ErrorDetail) -> Response {
    let status = err.status();
    match err {
        Error::Http(e) => {
            if status.is_server_error() {
                warn!(status = e.code(), error = %e, "request failed");
            } else {
                debug!(status = e.code(), error = %e, "request rejected");
            }
            let mut res = Response::builder().status(status).text(e.message());
            if !e.allow().is_empty() {
                let allow = e.allow().iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    res.headers_mut().insert(ALLOW, value);
                }
            }
            res
        }
        Error::Validation(e) => {
            debug!(error = %e, "invalid request");
            Response::builder().status(StatusCode::BAD_REQUEST).text(e.reason())
        }
        Error::Invocation(e) => {
            warn!(error = %e, "resource failed");
            let body = match detail {
                ErrorDetail::Expose => e.to_string(),
                ErrorDetail::Redact => status.canonical_reason().unwrap_or_default().to_owned(),
            };
            Response::builder().status(status).text(body)
        }
    }
}
