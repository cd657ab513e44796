//! Success results built from composable options.
//!
//! A [`Responder`] starts from a default of `404 Not Found` with no body,
//! so a handler that forgets to choose a status code is visible on the wire
//! rather than silently answering `200`. Options mutate one field each:
//!
//! ```rust
//! use clientrest_endpoint::{ok, response, with_body, with_code};
//! use http::StatusCode;
//!
//! let custom = response(vec![with_code(StatusCode::ACCEPTED)]);
//! assert_eq!(custom.code(), StatusCode::ACCEPTED);
//!
//! // The convenience constructors apply their code after user options.
//! let pinned = ok(vec![with_body(serde_json::json!({"a": 1})), with_code(StatusCode::IM_A_TEAPOT)]);
//! assert_eq!(pinned.code(), StatusCode::OK);
//! ```

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{raw_response, Response};

/// An option applied to a [`Responder`] under construction.
pub type ResponderOption = Box<dyn FnOnce(&mut Responder) + Send>;

/// A success result: status code plus optional JSON body.
///
/// Immutable once built; written to the transport with [`Responder::respond`].
#[derive(Debug, Clone, PartialEq)]
pub struct Responder {
    code: StatusCode,
    body: Option<Value>,
    /// Set when a body option failed to serialize.
    body_error: Option<String>,
}

impl Default for Responder {
    fn default() -> Self {
        Self {
            code: StatusCode::NOT_FOUND,
            body: None,
            body_error: None,
        }
    }
}

impl Responder {
    /// Returns the status code.
    #[must_use]
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// Returns the body, if one was set.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Writes the status line and serializes the body as the payload.
    ///
    /// A missing body is written as `null`, except for `204` and `304`
    /// which never carry a payload. A body that failed to serialize is
    /// answered with a `500` error instead.
    pub fn respond(self) -> Response {
        if let Some(reason) = self.body_error {
            tracing::error!(error = %reason, "failed to encode response body");
            return ApiError::internal_server("failed to encode response body").respond_error();
        }

        let payload = if matches!(self.code, StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED) {
            Bytes::new()
        } else {
            serde_json::to_vec(&self.body)
                .map(Bytes::from)
                .unwrap_or_else(|_| Bytes::from_static(b"null"))
        };

        raw_response(self.code, payload)
    }
}

/// Sets the status code.
pub fn with_code(code: StatusCode) -> ResponderOption {
    Box::new(move |r: &mut Responder| r.code = code)
}

/// Sets the body. The value is serialized to JSON immediately.
pub fn with_body<T: Serialize>(body: T) -> ResponderOption {
    match serde_json::to_value(&body) {
        Ok(value) => Box::new(move |r: &mut Responder| {
            r.body = Some(value);
            r.body_error = None;
        }),
        Err(e) => {
            let reason = e.to_string();
            Box::new(move |r: &mut Responder| {
                r.body = None;
                r.body_error = Some(reason);
            })
        }
    }
}

/// Builds a result by applying `options` in order to the default result.
pub fn response(options: Vec<ResponderOption>) -> Responder {
    let mut responder = Responder::default();
    for option in options {
        option(&mut responder);
    }
    responder
}

/// Applies the caller's options, then pins `code` so they cannot override it.
fn with_fixed_code(mut options: Vec<ResponderOption>, code: StatusCode) -> Responder {
    options.push(with_code(code));
    response(options)
}

/// `201 Created` with the given options.
pub fn created(options: Vec<ResponderOption>) -> Responder {
    with_fixed_code(options, StatusCode::CREATED)
}

/// `200 OK` with the given options.
pub fn ok(options: Vec<ResponderOption>) -> Responder {
    with_fixed_code(options, StatusCode::OK)
}

/// `204 No Content` with the given options.
pub fn no_content(options: Vec<ResponderOption>) -> Responder {
    with_fixed_code(options, StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::collections::HashMap;

    async fn body_bytes(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn test_default_is_not_found() {
        let r = response(vec![]);
        assert_eq!(r.code(), StatusCode::NOT_FOUND);
        assert!(r.body().is_none());
    }

    #[test]
    fn test_options_apply_in_order() {
        let r = response(vec![
            with_code(StatusCode::ACCEPTED),
            with_body("first"),
            with_code(StatusCode::CONFLICT),
            with_body("second"),
        ]);
        assert_eq!(r.code(), StatusCode::CONFLICT);
        assert_eq!(r.body(), Some(&json!("second")));
    }

    #[test]
    fn test_ok_without_options() {
        let r = ok(vec![]);
        assert_eq!(r.code(), StatusCode::OK);
        assert!(r.body().is_none());
    }

    #[test]
    fn test_ok_with_body() {
        let r = ok(vec![with_body(json!({"a": 1}))]);
        assert_eq!(r.code(), StatusCode::OK);
        assert_eq!(r.body(), Some(&json!({"a": 1})));
    }

    #[test]
    fn test_fixed_code_cannot_be_overridden() {
        let custom = StatusCode::from_u16(999).unwrap();

        assert_eq!(ok(vec![with_code(custom)]).code(), StatusCode::OK);
        assert_eq!(created(vec![with_code(custom)]).code(), StatusCode::CREATED);
        assert_eq!(
            no_content(vec![with_code(StatusCode::OK)]).code(),
            StatusCode::NO_CONTENT
        );
    }

    #[test]
    fn test_created_keeps_body() {
        #[derive(Serialize)]
        struct Basket {
            id: u32,
        }

        let r = created(vec![with_body(Basket { id: 7 })]);
        assert_eq!(r.code(), StatusCode::CREATED);
        assert_eq!(r.body(), Some(&json!({"id": 7})));
    }

    #[tokio::test]
    async fn test_respond_writes_status_and_json() {
        let resp = ok(vec![with_body(json!({"a": 1}))]).respond();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_bytes(resp).await, Bytes::from_static(br#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_respond_without_body_writes_null() {
        let resp = ok(vec![]).respond();
        assert_eq!(body_bytes(resp).await, Bytes::from_static(b"null"));
    }

    #[tokio::test]
    async fn test_no_content_has_empty_payload() {
        let resp = no_content(vec![with_body("ignored")]).respond();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_unserializable_body_becomes_internal_error() {
        // JSON object keys must be strings
        let mut map = HashMap::new();
        map.insert(vec![1u8], "value");

        let r = ok(vec![with_body(map)]);
        assert!(r.body().is_none());

        let resp = r.respond();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(body["code"], 500);
    }

    #[test]
    fn test_later_body_clears_encoding_failure() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], "value");

        let r = ok(vec![with_body(map), with_body(json!([1, 2]))]);
        assert_eq!(r.body(), Some(&json!([1, 2])));
        assert_eq!(r, ok(vec![with_body(json!([1, 2]))]));
    }
}
