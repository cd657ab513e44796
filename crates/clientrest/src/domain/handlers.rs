//! `/v1` handlers.

use clientrest_endpoint::{ok, with_body, ApiError, HandlerContext, HandlerResult};

use super::service::ApiService;

/// `GET /v1/health`
pub async fn health<S: ApiService>(ctx: HandlerContext<S>) -> HandlerResult {
    Ok(ok(vec![with_body(ctx.service().health())]))
}

/// `GET /v1/ready`: 200 while ready, 503 with `Retry-After` otherwise.
pub async fn ready<S: ApiService>(ctx: HandlerContext<S>) -> HandlerResult {
    let status = ctx.service().readiness();
    if status.is_ready() {
        Ok(ok(vec![with_body(status)]))
    } else {
        Err(ApiError::service_unavailable("draining").into())
    }
}
