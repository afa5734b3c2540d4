//! The resource index.
//!
//! # Resolution order
//!
//! Every compiled path of every resource goes into one list, sorted once at
//! registration by [`CompiledPath::precedence`] and then by registration
//! order. [`Registry::resolve`] walks that list:
//!
//! 1. The first path match whose resource implements the method wins.
//! 2. A path match *without* the method is remembered (only the first one)
//!    and the walk continues, since a later resource may serve the same path
//!    with the needed method.
//! 3. If nothing wins, the remembered match becomes `MethodNotAllowed`;
//!    otherwise the result is `NotFound`.
//!
//! # Ambiguity
//!
//! Two patterns with the same shape (same literals, parameters in the same
//! positions) would make one of them unreachable. Registering such a pair is
//! an error instead of a silent shadow.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::RegistryError;
use crate::method::Method;
use crate::path::CompiledPath;
use crate::request::Request;
use crate::resource::{BoxedEndpoint, Resource};

/// A successful resolution.
pub struct ResourceMatch<R = Request> {
    pub resource: Arc<Resource<R>>,
    pub params: HashMap<String, String>,
    pub endpoint: BoxedEndpoint<R>,
    pub method: Method,
    pub pattern: String,
}

impl<R> ResourceMatch<R> {
    /// Every method the matched resource implements.
    pub fn allowed(&self) -> Vec<Method> {
        self.resource.methods()
    }
}

/// The outcome of [`Registry::resolve`].
pub enum Resolution<R = Request> {
    Matched(ResourceMatch<R>),
    MethodNotAllowed {
        resource: Arc<Resource<R>>,
        allowed: Vec<Method>,
    },
    NotFound,
}

impl<R> Resolution<R> {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

impl<R> fmt::Debug for Resolution<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched(m) => f
                .debug_struct("Matched")
                .field("pattern", &m.pattern)
                .field("method", &m.method)
                .field("params", &m.params)
                .finish(),
            Self::MethodNotAllowed { allowed, .. } => f
                .debug_struct("MethodNotAllowed")
                .field("allowed", allowed)
                .finish(),
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

struct Route<R> {
    path: CompiledPath,
    resource: Arc<Resource<R>>,
}

/// Holds registered resources and resolves requests against them.
///
/// Fill it before serving traffic; after that it is only read, so one
/// instance behind an `Arc` serves every request without locking.
pub struct Registry<R = Request> {
    routes: Vec<Route<R>>,
}

impl<R> Registry<R> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registers `resources`. Either every resource is added or none is.
    pub fn register<I>(&mut self, resources: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = Resource<R>>,
    {
        let mut staged: Vec<Route<R>> = Vec::new();

        for resource in resources {
            if resource.paths().is_empty() {
                return Err(RegistryError::NoPaths);
            }
            let resource = Arc::new(resource);
            for pattern in resource.paths() {
                let path = CompiledPath::compile(pattern)?;
                let clash = self
                    .routes
                    .iter()
                    .chain(&staged)
                    .find(|r| r.path.same_shape(&path));
                if let Some(existing) = clash {
                    return Err(RegistryError::DuplicatePattern {
                        pattern: pattern.clone(),
                        existing: existing.path.pattern().to_owned(),
                    });
                }
                staged.push(Route { path, resource: Arc::clone(&resource) });
            }
        }

        debug!(added = staged.len(), "registered resource paths");
        self.routes.extend(staged);
        // Stable sort: equal precedence keeps registration order.
        self.routes.sort_by(|a, b| a.path.precedence(&b.path));
        Ok(())
    }

    /// Resolves a request path and method.
    ///
    /// `path` is the path component only (no query). A method outside
    /// [`Method::ALL`] never matches a handler.
    pub fn resolve(&self, path: &str, method: &str) -> Resolution<R> {
        let method = method.parse::<Method>().ok();
        let mut not_allowed: Option<&Route<R>> = None;

        for route in &self.routes {
            let Some(params) = route.path.match_path(path) else {
                continue;
            };
            let found = method.and_then(|m| route.resource.endpoint(m).map(|e| (m, e)));
            match found {
                Some((method, endpoint)) => {
                    trace!(path, pattern = route.path.pattern(), "resolved");
                    return Resolution::Matched(ResourceMatch {
                        resource: Arc::clone(&route.resource),
                        params,
                        endpoint: Arc::clone(endpoint),
                        method,
                        pattern: route.path.pattern().to_owned(),
                    });
                }
                None => {
                    not_allowed.get_or_insert(route);
                }
            }
        }

        match not_allowed {
            Some(route) => Resolution::MethodNotAllowed {
                resource: Arc::clone(&route.resource),
                allowed: route.resource.methods(),
            },
            None => Resolution::NotFound,
        }
    }

    /// Registered patterns in resolution order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.path.pattern())
    }

    pub fn len(&self) -> usize { self.routes.len() }
    pub fn is_empty(&self) -> bool { self.routes.is_empty() }
}

impl<R> Default for Registry<R> {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BoxError, PatternError};
    use crate::response::Response;

    async fn ok(_req: Request) -> Result<Response, BoxError> {
        Ok(Response::text("ok"))
    }

    fn registry(resources: Vec<Resource>) -> Registry {
        let mut registry = Registry::new();
        registry.register(resources).unwrap();
        registry
    }

    fn matched_pattern(resolution: Resolution) -> String {
        match resolution {
            Resolution::Matched(m) => m.pattern,
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn resolves_params() {
        let reg = registry(vec![Resource::new(["/users/:id/posts/:post"]).get(ok)]);
        match reg.resolve("/users/7/posts/hello", "GET") {
            Resolution::Matched(m) => {
                assert_eq!(m.params["id"], "7");
                assert_eq!(m.params["post"], "hello");
                assert_eq!(m.method, Method::Get);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unmatched_paths_are_not_found() {
        let reg = registry(vec![Resource::new(["/users/:id"]).get(ok)]);
        for path in ["/users", "/users/1/extra", "/accounts/1", "/"] {
            assert!(matches!(reg.resolve(path, "GET"), Resolution::NotFound), "{path}");
        }
    }

    #[test]
    fn wrong_method_lists_all_implemented_methods() {
        let reg = registry(vec![Resource::new(["/"]).get(ok).post(ok)]);
        match reg.resolve("/", "PATCH") {
            Resolution::MethodNotAllowed { allowed, .. } => {
                assert_eq!(allowed, [Method::Get, Method::Post]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(reg.resolve("/", "BREW"), Resolution::MethodNotAllowed { .. }));
    }

    #[test]
    fn literal_beats_parameter_regardless_of_order() {
        let reg = registry(vec![
            Resource::new(["/users/:id"]).get(ok),
            Resource::new(["/users/active"]).get(ok),
        ]);
        assert_eq!(matched_pattern(reg.resolve("/users/active", "GET")), "/users/active");
        assert_eq!(matched_pattern(reg.resolve("/users/42", "GET")), "/users/:id");
        assert_eq!(reg.patterns().collect::<Vec<_>>(), ["/users/active", "/users/:id"]);
    }

    #[test]
    fn scanning_continues_past_a_method_mismatch() {
        let reg = registry(vec![
            Resource::new(["/users/active"]).post(ok),
            Resource::new(["/users/:id"]).get(ok),
        ]);
        assert_eq!(matched_pattern(reg.resolve("/users/active", "GET")), "/users/:id");
        assert_eq!(matched_pattern(reg.resolve("/users/active", "POST")), "/users/active");
        match reg.resolve("/users/active", "DELETE") {
            Resolution::MethodNotAllowed { allowed, .. } => assert_eq!(allowed, [Method::Post]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn resolving_twice_gives_the_same_answer() {
        let reg = registry(vec![
            Resource::new(["/a/:x"]).get(ok),
            Resource::new(["/a/b"]).put(ok),
        ]);
        for (path, method) in [("/a/b", "GET"), ("/a/b", "PUT"), ("/a/c", "POST"), ("/z", "GET")] {
            let first = format!("{:?}", reg.resolve(path, method));
            let second = format!("{:?}", reg.resolve(path, method));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn same_shape_patterns_are_rejected() {
        let mut reg = Registry::new();
        let err = reg
            .register(vec![
                Resource::new(["/users/:id"]).get(ok),
                Resource::new(["/users/{uid}"]).post(ok),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicatePattern {
                pattern: "/users/{uid}".into(),
                existing: "/users/:id".into(),
            }
        );
        assert!(reg.is_empty(), "failed batches must not be partially applied");
    }

    #[test]
    fn invalid_resources_are_rejected() {
        let mut reg = Registry::<Request>::new();
        assert_eq!(
            reg.register(vec![Resource::new(Vec::<String>::new()).get(ok)]),
            Err(RegistryError::NoPaths)
        );
        assert_eq!(
            reg.register(vec![Resource::new(["users"]).get(ok)]),
            Err(RegistryError::Pattern(PatternError::MissingLeadingSlash("users".into())))
        );
    }
}
