//! Ordered middleware composition.
//!
//! A [`Chain`] is a list of middleware in registration order. The first
//! registered middleware wraps outermost: it sees the request first and the
//! response last.
//!
//! ```text
//! chain [A, B, C] around handler H
//!
//! A ─▶ B ─▶ C ─▶ H
//! A ◀─ B ◀─ C ◀─ H
//! ```
//!
//! Chains are built once at startup and shared immutably across requests.

use std::sync::Arc;

use crate::context::MiddlewareContext;
use crate::middleware::{Middleware, Next};
use crate::types::{BoxFuture, Request, Response};

/// A type-erased middleware that can be stored in a chain.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An ordered, immutable-after-build list of middleware.
#[derive(Clone, Default)]
pub struct Chain {
    stages: Vec<BoxedMiddleware>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware; it will run inside every one added before it.
    #[must_use]
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Returns a chain running `self` outside `inner`.
    #[must_use]
    pub fn then(&self, inner: &Self) -> Self {
        let mut stages = self.stages.clone();
        stages.extend(inner.stages.iter().cloned());
        Self { stages }
    }

    /// Returns the names of the middleware, outermost first.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of middleware.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the chain has no middleware.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs `request` through every middleware and finally `handler`.
    ///
    /// Headers staged in the context are applied to the response that leaves
    /// the outermost middleware.
    pub async fn process<H>(&self, mut ctx: MiddlewareContext, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send,
    {
        let next = self.build(handler);
        let mut response = next.run(&mut ctx, request).await;
        ctx.apply_headers(&mut response);
        response
    }

    fn build<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("stages", &self.names()).finish()
    }
}
