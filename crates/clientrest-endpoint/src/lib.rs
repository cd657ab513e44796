//! # clientrest endpoint
//!
//! The handler result protocol: how a request handler tells the transport
//! what to write.
//!
//! - [`response`] builds success results ([`Responder`]) from composable
//!   options, with [`ok`], [`created`] and [`no_content`] pinning their
//!   status code after user options are applied.
//! - [`error`] is the closed error taxonomy ([`ApiError`]): every value is
//!   both an error and a renderer of its own JSON response.
//! - [`handler`] adapts a domain handler returning
//!   `Result<Responder, HandlerError>` into a transport handler.
//! - [`middleware`], [`chain`] and [`stages`] compose ordered request
//!   interceptors around that handler.
//!
//! ## Flow
//!
//! ```text
//! Request → ContentType → Recovery → Logging → with_error(handler)
//!                                                   ↓
//!                                   Ok(Responder)  → respond()
//!                                   Err(ApiError)  → respond_error()
//!                                   Err(opaque)    → 500 InternalServer
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod context;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod response;
pub mod stages;
pub mod types;

pub use chain::{BoxedMiddleware, Chain};
pub use context::{MiddlewareContext, PathParams, RequestId};
pub use error::{ApiError, ErrorKind, HandlerError};
pub use handler::{invoke, with_error, write_result, Handler, HandlerContext, HandlerResult};
pub use middleware::{FnMiddleware, Middleware, Next};
pub use response::{
    created, no_content, ok, response, with_body, with_code, Responder, ResponderOption,
};
pub use stages::{ContentTypeJson, Recovery, RequestLogging};
pub use types::{BoxFuture, Request, Response, APPLICATION_JSON};
