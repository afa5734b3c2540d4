//! Error taxonomy.
//!
//! Two families live here:
//!
//! - **Startup errors** ([`PatternError`], [`RegistryError`], [`BuildError`])
//!   are raised while the chain is assembled. They are fatal: fix the code and
//!   restart.
//! - **Per-request errors** ([`Error`]) flow out of [`Chain::handle`]. The
//!   chain never turns them into responses; that is the job of the
//!   [`ErrorTranslator`] at the adapter boundary.
//!
//! [`Chain::handle`]: crate::Chain::handle
//! [`ErrorTranslator`]: crate::ErrorTranslator

use http::StatusCode;
use thiserror::Error;

use crate::method::Method;

/// An opaque error returned by application code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ── Startup errors ────────────────────────────────────────────────────────────

/// A resource path pattern could not be compiled.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("path pattern is empty")]
    Empty,

    #[error("path pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    #[error("path pattern `{0}` contains an empty segment")]
    EmptySegment(String),

    #[error("path pattern `{pattern}` has an invalid parameter name `{name}`")]
    InvalidParamName { pattern: String, name: String },

    #[error("path pattern `{pattern}` declares parameter `{name}` more than once")]
    DuplicateParam { pattern: String, name: String },

    #[error("path pattern `{0}` has a wildcard that is not the last segment")]
    WildcardNotLast(String),

    #[error("path pattern `{pattern}` has an unbalanced brace in segment `{segment}`")]
    UnbalancedBrace { pattern: String, segment: String },
}

/// A set of resources could not be registered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("resource declares no paths")]
    NoPaths,

    /// Two patterns would match exactly the same set of request paths.
    #[error("path pattern `{pattern}` is ambiguous with already registered `{existing}`")]
    DuplicatePattern { pattern: String, existing: String },
}

/// A chain could not be built.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("chain has no handlers")]
    Empty,

    #[error("resource registration failed: {0}")]
    Registry(#[from] RegistryError),
}

// ── Per-request errors ────────────────────────────────────────────────────────

/// An error that maps directly onto an HTTP status.
///
/// Return one from a resource handler (or any chain handler) to end the
/// request with that status:
///
/// ```rust
/// use skein::HttpError;
/// use http::StatusCode;
///
/// let err = HttpError::new(StatusCode::CONFLICT).with_message("user exists");
/// assert_eq!(err.code(), 409);
/// assert_eq!(err.description(), "Conflict");
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{} {}", .status.as_u16(), .message)]
pub struct HttpError {
    status: StatusCode,
    message: String,
    allow: Vec<Method>,
}

impl HttpError {
    /// An error whose message is the canonical reason phrase of `status`.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: status.canonical_reason().unwrap_or_default().to_owned(),
            allow: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// `405` carrying the methods the matched resource does implement.
    pub fn method_not_allowed(allowed: &[Method]) -> Self {
        let mut err = Self::new(StatusCode::METHOD_NOT_ALLOWED);
        err.allow = allowed.to_vec();
        err
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn code(&self) -> u16 { self.status.as_u16() }
    pub fn message(&self) -> &str { &self.message }
    pub fn allow(&self) -> &[Method] { &self.allow }

    /// The canonical status text, e.g. `"Method Not Allowed"`.
    pub fn description(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }
}

/// The inbound request does not have the minimal shape the chain needs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid request: {reason}")]
pub struct ValidationError {
    reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    pub fn reason(&self) -> &str { &self.reason }
}

/// The error type produced by [`Chain::handle`](crate::Chain::handle).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A failure escaping a resource that is not an [`HttpError`].
    ///
    /// The message is kept for diagnostics; it may not be safe to show to
    /// untrusted clients.
    #[error("{0}")]
    Invocation(#[source] BoxError),
}

impl Error {
    /// Classifies an application error.
    ///
    /// Errors that already belong to this taxonomy keep their class even when
    /// they arrive boxed; anything else becomes [`Error::Invocation`].
    pub fn invocation(err: impl Into<BoxError>) -> Self {
        let err = match err.into().downcast::<Error>() {
            Ok(e) => return *e,
            Err(e) => e,
        };
        let err = match err.downcast::<HttpError>() {
            Ok(e) => return Error::Http(*e),
            Err(e) => e,
        };
        match err.downcast::<ValidationError>() {
            Ok(e) => Error::Validation(*e),
            Err(e) => Error::Invocation(e),
        }
    }

    /// The status this error surfaces as.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Http(e) => e.status(),
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Invocation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BoxError> for Error {
    fn from(err: BoxError) -> Self {
        Self::invocation(err)
    }
}

/// The server adapter failed to bind or accept.
#[derive(Debug, Error)]
#[error("io: {0}")]
pub struct ServeError(#[from] std::io::Error);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_defaults_to_reason_phrase() {
        let err = HttpError::not_found();
        assert_eq!(err.code(), 404);
        assert_eq!(err.message(), "Not Found");
        assert_eq!(err.to_string(), "404 Not Found");
    }

    #[test]
    fn plain_errors_become_invocation_errors() {
        let err = Error::invocation("boom");
        assert!(matches!(err, Error::Invocation(_)));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn boxed_http_errors_keep_their_status() {
        let boxed: BoxError = Box::new(HttpError::new(StatusCode::IM_A_TEAPOT));
        let err = Error::invocation(boxed);
        assert_eq!(err.status(), StatusCode::IM_A_TEAPOT);

        let nested: BoxError = Box::new(Error::Validation(ValidationError::new("no url")));
        assert!(matches!(Error::invocation(nested), Error::Validation(_)));
    }
}
