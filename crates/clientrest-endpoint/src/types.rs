//! Common types used by handlers and middleware.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::Full;

/// The HTTP request type seen by middleware and handlers.
///
/// The body has already been collected by the server.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type produced by handlers and middleware.
pub type Response = http::Response<Full<Bytes>>;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The `application/json` media type every response carries.
pub const APPLICATION_JSON: &str = "application/json";

/// Builds a response with the given status and payload and no headers.
pub(crate) fn raw_response(status: http::StatusCode, payload: Bytes) -> Response {
    let mut response = http::Response::new(Full::new(payload));
    *response.status_mut() = status;
    response
}
