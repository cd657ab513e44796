//! Request logging.
//!
//! Opens one span per request (a child of the [`Logger`]'s root span, so it
//! carries the service name and static fields) and emits one record when the
//! response is ready. Everything the handler logs while the span is entered
//! inherits `method`, `path` and `request_id`. Like the root span, the
//! request span is created at `ERROR` level so it outlives any level filter.
//!
//! The stage also owns the request ID: an incoming `X-Request-ID` is reused
//! when it is a UUID and trusted, otherwise the context's fresh UUID v7 is
//! kept. Either way the ID is echoed back in the response header.

use clientrest_telemetry::Logger;
use http::header::HeaderValue;
use tracing::{Instrument, Level};

use crate::context::{MiddlewareContext, RequestId};
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request, Response};

/// The header carrying the request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Logs every request with its status and duration.
#[derive(Debug, Clone)]
pub struct RequestLogging {
    logger: Logger,
    trust_incoming: bool,
}

impl RequestLogging {
    /// Creates the stage. Incoming request IDs are ignored.
    #[must_use]
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            trust_incoming: false,
        }
    }

    /// Reuses a valid incoming `X-Request-ID` instead of generating one.
    #[must_use]
    pub fn trust_incoming(mut self, trust: bool) -> Self {
        self.trust_incoming = trust;
        self
    }

    fn incoming_request_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(RequestId::parse)
    }
}

impl Middleware for RequestLogging {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if let Some(request_id) = self.incoming_request_id(&request) {
                ctx.set_request_id(request_id);
            }
            let request_id = ctx.request_id();
            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                ctx.set_header(http::header::HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            if !self.logger.is_enabled() {
                return next.run(ctx, request).await;
            }

            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let span = tracing::span!(
                parent: self.logger.span(),
                Level::ERROR,
                "request",
                method = %method,
                path = %path,
                request_id = %request_id,
            );

            let response = next.run(ctx, request).instrument(span.clone()).await;

            let status = response.status().as_u16();
            let duration_ms = ctx.elapsed().as_secs_f64() * 1000.0;
            span.in_scope(|| {
                if status >= 500 {
                    tracing::error!(status, duration_ms, "request failed");
                } else if status >= 400 {
                    tracing::warn!(status, duration_ms, "request rejected");
                } else {
                    tracing::info!(status, duration_ms, "request completed");
                }
            });

            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use serde_json::Value;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::EnvFilter;

    fn request(incoming: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/v1/health");
        if let Some(id) = incoming {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    async fn run(stage: RequestLogging, request: Request) -> Response {
        run_with_status(stage, request, StatusCode::OK).await
    }

    async fn run_with_status(
        stage: RequestLogging,
        request: Request,
        status: StatusCode,
    ) -> Response {
        Chain::new()
            .with(stage)
            .process(MiddlewareContext::new(), request, move |_ctx, _req| {
                Box::pin(async move {
                    let mut response = Response::new(Full::new(Bytes::new()));
                    *response.status_mut() = status;
                    response
                })
            })
            .await
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn response_id(response: &Response) -> RequestId {
        let raw = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        RequestId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_sets_request_id_header() {
        let response = run(RequestLogging::new(Logger::disabled()), request(None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_id(&response).as_uuid().get_version_num(), 7);
    }

    #[tokio::test]
    async fn test_incoming_id_ignored_by_default() {
        let incoming = RequestId::new().to_string();
        let response = run(RequestLogging::new(Logger::disabled()), request(Some(&incoming))).await;
        assert_ne!(response_id(&response).to_string(), incoming);
    }

    #[tokio::test]
    async fn test_trusted_incoming_id_is_propagated() {
        let incoming = RequestId::new().to_string();
        let stage = RequestLogging::new(Logger::disabled()).trust_incoming(true);
        let response = run(stage, request(Some(&incoming))).await;
        assert_eq!(response_id(&response).to_string(), incoming);
    }

    #[tokio::test]
    async fn test_invalid_incoming_id_is_replaced() {
        let stage = RequestLogging::new(Logger::disabled()).trust_incoming(true);
        let response = run(stage, request(Some("not-a-uuid"))).await;
        assert_eq!(response_id(&response).as_uuid().get_version_num(), 7);
    }

    #[tokio::test]
    async fn test_logs_with_enabled_logger() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let logger = Logger::new(&clientrest_telemetry::LogConfig::default());
        let response = run(RequestLogging::new(logger), request(None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejected_request_keeps_span_fields_under_warn_filter() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_env_filter(EnvFilter::new("warn"))
            .with_writer(capture.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let config = clientrest_telemetry::LogConfig {
            service_name: "basket".to_string(),
            ..Default::default()
        };
        let stage = RequestLogging::new(Logger::new(&config));
        let response = run_with_status(stage, request(None), StatusCode::NOT_FOUND).await;
        let request_id = response_id(&response).to_string();

        let output = capture.0.lock().unwrap().clone();
        let records: Vec<Value> = String::from_utf8_lossy(&output)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record["fields"]["message"], "request rejected");
        assert_eq!(record["fields"]["status"], 404);
        assert_eq!(record["span"]["method"], "GET");
        assert_eq!(record["span"]["path"], "/v1/health");
        assert_eq!(record["span"]["request_id"], request_id);
        assert_eq!(record["spans"][0]["service"], "basket");
    }
}
