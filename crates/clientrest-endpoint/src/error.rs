//! The closed error taxonomy.
//!
//! An [`ApiError`] is at the same time a regular error (for propagation with
//! `?` and for logging) and the renderer of its own wire response, so the
//! handler adapter never needs a lookup from error type to status code.
//!
//! Every error renders the same JSON envelope:
//!
//! ```json
//! {"code": 404, "date": "2026-10-16T09:12:44Z", "message": "basket not found"}
//! ```
//!
//! `ServiceUnavailable` additionally sets `Retry-After` to an HTTP date 100
//! seconds after the moment it is rendered.

use std::time::{Duration, SystemTime};

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use http::header::RETRY_AFTER;
use http::{HeaderValue, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::types::{raw_response, Response};

/// How far in the future `Retry-After` points for `ServiceUnavailable`.
pub const RETRY_AFTER_SECS: u64 = 100;

/// The four kinds of renderable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `400 Bad Request`
    BadRequest,
    /// `404 Not Found`
    NotFound,
    /// `503 Service Unavailable`
    ServiceUnavailable,
    /// `500 Internal Server Error`
    InternalServer,
}

impl ErrorKind {
    /// Returns the HTTP status this kind renders with.
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalServer => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A renderable error: kind, human-readable message and generation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    date: DateTime<Utc>,
}

/// Wire envelope; field order is part of the format.
#[derive(Serialize)]
struct ErrorBody<'a> {
    code: u16,
    date: String,
    message: &'a str,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            date: Utc::now(),
        }
    }

    /// A `400 Bad Request` error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// A `404 Not Found` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// A `503 Service Unavailable` error, rendered with `Retry-After`.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    /// A `500 Internal Server Error`.
    pub fn internal_server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalServer, message)
    }

    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns when the error was created.
    #[must_use]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Renders the error as its JSON response.
    pub fn respond_error(&self) -> Response {
        let mut response = raw_response(self.status(), self.encode_body());

        if self.kind == ErrorKind::ServiceUnavailable {
            let headers = response.headers_mut();
            headers.insert(RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
            headers.insert(RETRY_AFTER, retry_after_value(SystemTime::now()));
        }

        response
    }

    fn encode_body(&self) -> Bytes {
        let body = ErrorBody {
            code: self.status().as_u16(),
            date: self.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            message: &self.message,
        };
        // A struct of plain strings and integers always serializes
        serde_json::to_vec(&body)
            .map(Bytes::from)
            .unwrap_or_else(|_| Bytes::from_static(b"{}"))
    }
}

/// HTTP date `RETRY_AFTER_SECS` seconds after `now`.
fn retry_after_value(now: SystemTime) -> HeaderValue {
    let at = now + Duration::from_secs(RETRY_AFTER_SECS);
    HeaderValue::from_str(&httpdate::fmt_http_date(at))
        .unwrap_or_else(|_| HeaderValue::from(RETRY_AFTER_SECS))
}

/// The error half of a domain handler's result.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// An error that renders itself.
    #[error(transparent)]
    Render(#[from] ApiError),

    /// Any other failure. Logged and answered with a generic 500.
    #[error(transparent)]
    Opaque(#[from] anyhow::Error),
}

impl HandlerError {
    /// Returns the renderable error, if this is one.
    #[must_use]
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Render(e) => Some(e),
            Self::Opaque(_) => None,
        }
    }
}
