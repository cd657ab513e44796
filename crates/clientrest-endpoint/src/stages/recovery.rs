//! Panic recovery.
//!
//! Converts a panic anywhere inside the wrapped chain into a
//! `500 Internal Server Error` JSON response, so one faulty handler never
//! takes the connection (or the process) down with it.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use clientrest_telemetry::Logger;
use futures_util::FutureExt;
use http::header::{HeaderValue, CONTENT_TYPE};

use crate::context::MiddlewareContext;
use crate::error::ApiError;
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request, Response, APPLICATION_JSON};

/// Catches panics from the rest of the chain.
#[derive(Debug, Clone)]
pub struct Recovery {
    logger: Logger,
}

impl Recovery {
    /// Creates the stage; recovered panics are reported through `logger`.
    #[must_use]
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl Middleware for Recovery {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            let outcome = AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await;
            match outcome {
                Ok(response) => response,
                Err(payload) => {
                    self.logger.error(format_args!(
                        "recovered from panic in {method} {path} (request {}): {}",
                        ctx.request_id(),
                        panic_message(payload.as_ref())
                    ));

                    let mut response = ApiError::internal_server("internal server error").respond_error();
                    response
                        .headers_mut()
                        .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
                    response
                }
            }
        })
    }
}

/// Extracts the message of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::{BodyExt, Full};
    use serde_json::Value;

    async fn exploding() -> Response {
        panic!("handler exploded")
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/v1/boom")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let chain = Chain::new().with(Recovery::new(Logger::disabled()));
        let response = chain
            .process(MiddlewareContext::new(), request(), |_ctx, _req| {
                Box::pin(exploding())
            })
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], APPLICATION_JSON);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], 500);
        assert_eq!(body["message"], "internal server error");
    }

    #[tokio::test]
    async fn test_no_panic_passes_through() {
        let chain = Chain::new().with(Recovery::new(Logger::disabled()));
        let response = chain
            .process(MiddlewareContext::new(), request(), |_ctx, _req| {
                Box::pin(async {
                    let mut response = Response::new(Full::new(Bytes::new()));
                    *response.status_mut() = StatusCode::NO_CONTENT;
                    response
                })
            })
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_panic_message() {
        let text: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(text.as_ref()), "static");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
