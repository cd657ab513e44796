//! Adapting domain handlers to the transport.
//!
//! A domain handler is an async function from a [`HandlerContext`] to a
//! [`HandlerResult`]. [`with_error`] turns it into a transport [`Handler`]
//! that writes exactly one of the two halves of that result:
//!
//! - `Ok(responder)` is written with [`Responder::respond`].
//! - `Err(HandlerError::Render(e))` is written with [`ApiError::respond_error`].
//! - `Err(HandlerError::Opaque(e))` is logged and answered with a generic
//!   `500 Internal Server Error`; its message never reaches the client.
//!
//! # Example
//!
//! ```
//! use clientrest_endpoint::{ok, with_body, with_error, ApiError, HandlerContext, HandlerResult};
//!
//! struct Baskets;
//!
//! async fn get_basket(ctx: HandlerContext<Baskets>) -> HandlerResult {
//!     let id = ctx
//!         .param("id")
//!         .ok_or_else(|| ApiError::bad_request("missing basket id"))?;
//!     Ok(ok(vec![with_body(serde_json::json!({ "id": id }))]))
//! }
//!
//! let handler = with_error(get_basket);
//! # let _ = handler;
//! ```

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

use crate::context::{MiddlewareContext, PathParams, RequestId};
use crate::error::{ApiError, HandlerError};
use crate::response::Responder;
use crate::types::{BoxFuture, Request, Response};

/// What a domain handler returns.
pub type HandlerResult = Result<Responder, HandlerError>;

/// A transport handler: writes a full response for a request.
pub type Handler<S> = Arc<dyn Fn(HandlerContext<S>) -> BoxFuture<'static, Response> + Send + Sync>;

/// Everything a handler gets to see about one request.
#[derive(Debug)]
pub struct HandlerContext<S> {
    service: Arc<S>,
    parts: Parts,
    body: Bytes,
    params: PathParams,
    request_id: RequestId,
}

impl<S> HandlerContext<S> {
    /// Builds a context, collecting the already buffered request body.
    pub async fn from_request(
        service: Arc<S>,
        request: Request,
        params: PathParams,
        request_id: RequestId,
    ) -> Self {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };
        Self::from_parts(service, parts, body, params, request_id)
    }

    /// Builds a context from request parts and a body.
    pub fn from_parts(
        service: Arc<S>,
        parts: Parts,
        body: Bytes,
        params: PathParams,
        request_id: RequestId,
    ) -> Self {
        Self {
            service,
            parts,
            body,
            params,
            request_id,
        }
    }

    /// Returns the domain service.
    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Returns the raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns a path parameter captured by a `{name}` segment.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns all captured path parameters.
    #[must_use]
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Returns the raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserializes the body as JSON.
    ///
    /// A malformed body is a client error and maps to `400 Bad Request`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

/// Adapts a domain handler into a transport [`Handler`].
pub fn with_error<S, F, Fut>(handler: F) -> Handler<S>
where
    S: Send + Sync + 'static,
    F: Fn(HandlerContext<S>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx: HandlerContext<S>| {
        let fut = handler(ctx);
        Box::pin(async move { write_result(fut.await) }) as BoxFuture<'static, Response>
    })
}

/// Runs `handler` as the terminal step of a middleware chain.
///
/// The request ID and the path parameters recorded in `ctx` are handed to the
/// handler through its [`HandlerContext`].
pub fn invoke<S>(
    handler: &Handler<S>,
    service: &Arc<S>,
    ctx: &mut MiddlewareContext,
    request: Request,
) -> BoxFuture<'static, Response>
where
    S: Send + Sync + 'static,
{
    let handler = Arc::clone(handler);
    let service = Arc::clone(service);
    let params = ctx.take_params();
    let request_id = ctx.request_id();

    Box::pin(async move {
        let context = HandlerContext::from_request(service, request, params, request_id).await;
        handler(context).await
    })
}

/// Writes one handler result: the error if there is one, the success value
/// otherwise.
pub fn write_result(result: HandlerResult) -> Response {
    match result {
        Ok(responder) => responder.respond(),
        Err(HandlerError::Render(error)) => error.respond_error(),
        Err(HandlerError::Opaque(error)) => {
            tracing::error!(error = %error, "handler failed with a non-renderable error");
            ApiError::internal_server("internal server error").respond_error()
        }
    }
}
