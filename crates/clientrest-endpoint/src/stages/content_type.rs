//! JSON content type injection.

use http::header::{HeaderValue, CONTENT_TYPE};

use crate::context::MiddlewareContext;
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request, Response, APPLICATION_JSON};

/// Stages `Content-Type: application/json` before the rest of the chain runs.
///
/// A response that sets its own content type keeps it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTypeJson;

impl ContentTypeJson {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for ContentTypeJson {
    fn name(&self) -> &'static str {
        "content_type"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        ctx.set_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        Box::pin(next.run(ctx, request))
    }
}
