//! Per-request state shared by the middleware chain.
//!
//! The [`MiddlewareContext`] lives for exactly one request. Stages use it to
//! stage response headers before the handler runs (so a handler never needs
//! to know about them) and to pass data such as the resolved path
//! parameters down to the handler.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use http::header::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

use crate::types::Response;

/// Path parameters captured by `{name}` route segments.
pub type PathParams = HashMap<String, String>;

/// Unique, time-ordered identifier of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a request ID propagated by a client, if it is a UUID.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context that flows through the middleware chain.
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    started_at: Instant,

    /// Headers applied to the final response unless it already has them.
    headers: HeaderMap,

    params: PathParams,

    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a new context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            started_at: Instant::now(),
            headers: HeaderMap::new(),
            params: PathParams::new(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Replaces the request ID, e.g. with one propagated by the client.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// Returns the time spent since the request entered the chain.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stages a response header.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Returns the staged response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Copies staged headers onto `response`.
    ///
    /// Headers the response already carries win, so a stage that renders its
    /// own response is never overridden by one staged earlier.
    pub fn apply_headers(&self, response: &mut Response) {
        let target = response.headers_mut();
        for (name, value) in &self.headers {
            if !target.contains_key(name) {
                target.insert(name.clone(), value.clone());
            }
        }
    }

    /// Records the parameters captured by route matching.
    pub fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }

    /// Returns the captured path parameters.
    #[must_use]
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Moves the captured path parameters out of the context.
    pub fn take_params(&mut self) -> PathParams {
        std::mem::take(&mut self.params)
    }

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::CONTENT_TYPE;
    use http_body_util::Full;

    #[test]
    fn test_request_ids_are_unique_and_ordered() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert!(a.as_uuid() < b.as_uuid());
    }

    #[test]
    fn test_parse_request_id() {
        let id = RequestId::new();
        assert_eq!(RequestId::parse(&id.to_string()), Some(id));
        assert_eq!(RequestId::parse("not-a-uuid"), None);
    }

    #[test]
    fn test_apply_headers_keeps_existing() {
        let mut ctx = MiddlewareContext::new();
        ctx.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        ctx.set_header(
            HeaderName::from_static("x-extra"),
            HeaderValue::from_static("1"),
        );

        let mut response = Response::new(Full::new(Bytes::new()));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        ctx.apply_headers(&mut response);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(response.headers()["x-extra"], "1");
    }

    #[test]
    fn test_params_take() {
        let mut ctx = MiddlewareContext::new();
        let mut params = PathParams::new();
        params.insert("id".to_string(), "42".to_string());
        ctx.set_params(params);

        assert_eq!(ctx.params().get("id").map(String::as_str), Some("42"));
        let taken = ctx.take_params();
        assert_eq!(taken.len(), 1);
        assert!(ctx.params().is_empty());
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, PartialEq)]
        struct Visited(&'static str);

        let mut ctx = MiddlewareContext::new();
        assert!(ctx.get_extension::<Visited>().is_none());
        ctx.set_extension(Visited("recovery"));
        assert_eq!(ctx.get_extension::<Visited>(), Some(&Visited("recovery")));
    }
}
