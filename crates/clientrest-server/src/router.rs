//! Request routing.
//!
//! A [`Router`] owns the typed service, a global middleware chain, and a set
//! of route groups mounted under a path prefix (e.g. `/v1`). Each group can
//! add its own middleware, which runs inside the global chain.
//!
//! Path templates use `{name}` segments; the captured values reach the
//! handler through [`HandlerContext::param`](clientrest_endpoint::HandlerContext::param).
//! Segments are percent-decoded before they are compared or captured.
//! Routes are matched in registration order and the first match wins.
//! A request that matches nothing still runs through the global chain and is
//! answered with a `NotFound` error.
//!
//! # Example
//!
//! ```rust
//! use clientrest_endpoint::{ok, with_body, with_error, ContentTypeJson, HandlerContext, HandlerResult};
//! use clientrest_server::Router;
//! use http::Method;
//!
//! struct Greeter;
//!
//! async fn greet(ctx: HandlerContext<Greeter>) -> HandlerResult {
//!     let name = ctx.param("name").unwrap_or("stranger").to_string();
//!     Ok(ok(vec![with_body(serde_json::json!({ "hello": name }))]))
//! }
//!
//! let mut router = Router::new(Greeter);
//! router.layer(ContentTypeJson::new());
//! router
//!     .group("/v1")
//!     .route(Method::GET, "/greet/{name}", with_error(greet));
//!
//! assert_eq!(router.route_count(), 1);
//! assert_eq!(router.routes(), vec![(Method::GET, "/v1/greet/{name}".to_string())]);
//! ```

use std::sync::Arc;

use clientrest_endpoint::{
    invoke, ApiError, BoxFuture, Chain, Handler, Middleware, MiddlewareContext, PathParams,
    Request, Response,
};
use http::Method;

/// Anything that can turn a request into a response.
///
/// The server only knows this trait, so it never sees the service type.
pub trait Dispatch: Send + Sync + 'static {
    /// Routes one request and produces its response.
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Response>;
}

/// A segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

fn parse_segments(pattern: &str) -> Vec<PathSegment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => PathSegment::Param(name.to_string()),
            None => PathSegment::Literal(s.to_string()),
        })
        .collect()
}

struct Route<S> {
    method: Method,
    segments: Vec<PathSegment>,
    handler: Handler<S>,
    pattern: String,
}

impl<S> Route<S> {
    /// Returns the captured parameters if the decoded `segments` fit this route.
    fn match_path(&self, segments: &[String]) -> Option<PathParams> {
        if segments.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, value) in self.segments.iter().zip(segments) {
            match segment {
                PathSegment::Literal(expected) if expected == value => {}
                PathSegment::Literal(_) => return None,
                PathSegment::Param(name) => {
                    params.insert(name.clone(), value.clone());
                }
            }
        }
        Some(params)
    }
}

/// Splits a request path into percent-decoded segments.
///
/// Returns `None` when a segment does not decode to UTF-8; such a path
/// matches no route.
fn decode_segments(path: &str) -> Option<Vec<String>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::decode(s).ok().map(std::borrow::Cow::into_owned))
        .collect()
}

struct Group<S> {
    prefix: String,
    /// Middleware registered on the group itself.
    chain: Chain,
    /// The global chain followed by `chain`; rebuilt whenever either changes.
    full: Chain,
    routes: Vec<Route<S>>,
}

impl<S> Group<S> {
    fn rebuild(&mut self, global: &Chain) {
        self.full = global.then(&self.chain);
    }
}

/// A matched route and the parameters captured from the path.
struct Matched<'r, S> {
    group: &'r Group<S>,
    route: &'r Route<S>,
    params: PathParams,
}

/// Routes requests for a typed service through middleware to handlers.
pub struct Router<S> {
    service: Arc<S>,
    global: Chain,
    groups: Vec<Group<S>>,
}

impl<S> Router<S>
where
    S: Send + Sync + 'static,
{
    /// Creates a router with no middleware and no routes.
    #[must_use]
    pub fn new(service: S) -> Self {
        Self::with_shared(Arc::new(service))
    }

    /// Creates a router around an already shared service.
    #[must_use]
    pub fn with_shared(service: Arc<S>) -> Self {
        Self {
            service,
            global: Chain::new(),
            groups: Vec::new(),
        }
    }

    /// Returns the service handlers are called with.
    #[must_use]
    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Appends a middleware to the global chain. It wraps every group,
    /// including requests that match no route.
    pub fn layer<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.global = std::mem::take(&mut self.global).with(middleware);
        for group in &mut self.groups {
            group.rebuild(&self.global);
        }
        self
    }

    /// Returns the group mounted at `prefix`, creating it on first use.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_, S> {
        let prefix = normalize_prefix(prefix);
        let index = match self.groups.iter().position(|g| g.prefix == prefix) {
            Some(index) => index,
            None => {
                self.groups.push(Group {
                    prefix,
                    chain: Chain::new(),
                    full: self.global.clone(),
                    routes: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        RouteGroup {
            group: &mut self.groups[index],
            global: &self.global,
        }
    }

    /// Returns the number of registered routes across all groups.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.groups.iter().map(|g| g.routes.len()).sum()
    }

    /// Returns every route as `(method, full pattern)`, in match order.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.groups
            .iter()
            .flat_map(|g| g.routes.iter().map(|r| (r.method.clone(), r.pattern.clone())))
            .collect()
    }

    /// Returns the names of the global middleware, outermost first.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.global.names()
    }

    fn match_route(&self, method: &Method, path: &str) -> Option<Matched<'_, S>> {
        let segments = decode_segments(path)?;
        self.groups.iter().find_map(|group| {
            group.routes.iter().find_map(|route| {
                if route.method != *method {
                    return None;
                }
                route.match_path(&segments).map(|params| Matched {
                    group,
                    route,
                    params,
                })
            })
        })
    }
}

impl<S> Dispatch for Router<S>
where
    S: Send + Sync + 'static,
{
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut ctx = MiddlewareContext::new();
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            match self.match_route(&method, &path) {
                Some(Matched {
                    group,
                    route,
                    params,
                }) => {
                    ctx.set_params(params);
                    group
                        .full
                        .process(ctx, request, |ctx, request| {
                            invoke(&route.handler, &self.service, ctx, request)
                        })
                        .await
                }
                None => {
                    self.global
                        .process(ctx, request, move |_ctx, _request| {
                            Box::pin(async move {
                                ApiError::not_found(format!("no route for {method} {path}"))
                                    .respond_error()
                            })
                        })
                        .await
                }
            }
        })
    }
}

impl<S> std::fmt::Debug for Router<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("global", &self.global)
            .field(
                "groups",
                &self.groups.iter().map(|g| &g.prefix).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Registration handle for one route group.
pub struct RouteGroup<'a, S> {
    group: &'a mut Group<S>,
    global: &'a Chain,
}

impl<S> RouteGroup<'_, S> {
    /// Appends a middleware that runs only for this group's routes, inside
    /// the global chain.
    pub fn layer<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.group.chain = std::mem::take(&mut self.group.chain).with(middleware);
        self.group.rebuild(self.global);
        self
    }

    /// Registers a handler for `method` on `path`, relative to the group prefix.
    pub fn route(&mut self, method: Method, path: &str, handler: Handler<S>) -> &mut Self {
        let pattern = format!("{}{}", self.group.prefix, normalize_path(path));
        self.group.routes.push(Route {
            method,
            segments: parse_segments(&pattern),
            handler,
            pattern,
        });
        self
    }

    /// Registers a `GET` route.
    pub fn get(&mut self, path: &str, handler: Handler<S>) -> &mut Self {
        self.route(Method::GET, path, handler)
    }

}

/// `"v1/"` and `"/v1"` both become `"/v1"`; the root group is `""`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
