//! The middleware pipeline.
//!
//! Middleware kinds are registered once, in order. For every route the kinds are folded around
//! the route's handler when the dispatcher is built, so the first registered middleware is the
//! outermost one: it runs first on the way in and sees the response last on the way out.
//!
//! The chain holds kinds, not instances. Each step resolves a fresh instance of its middleware
//! from the request's dependency scope right before running it.

use crate::body::ResponseBody;
use crate::error::{DependencyError, DispatchError};
use crate::handler::RequestHandler;
use crate::request::RequestContext;
use crate::services::Scope;
use async_trait::async_trait;
use http::Response;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A step of a composed pipeline.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn run(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, DispatchError>;
}

/// A pre/post-processing step wrapped around the handler.
///
/// Calling [`Next::run`] runs the rest of the chain; returning without calling it
/// short-circuits the request and the returned response is the final one.
///
/// # Example
/// ```no_run
/// # use async_trait::async_trait;
/// # use http::{Response, StatusCode};
/// # use micro_dispatch::{DispatchError, RequestContext, ResponseBody};
/// # use micro_dispatch::middleware::{Middleware, Next};
/// struct RequireApiKey;
///
/// #[async_trait]
/// impl Middleware for RequireApiKey {
///     async fn invoke(&self, ctx: &RequestContext, next: Next<'_>) -> Result<Response<ResponseBody>, DispatchError> {
///         if ctx.header_value("x-api-key").is_none() {
///             let mut response = Response::new(ResponseBody::empty());
///             *response.status_mut() = StatusCode::UNAUTHORIZED;
///             return Ok(response);
///         }
///         next.run(ctx).await
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn invoke(&self, ctx: &RequestContext, next: Next<'_>) -> Result<Response<ResponseBody>, DispatchError>;
}

/// The remainder of the pipeline after the current middleware.
pub struct Next<'a> {
    endpoint: &'a dyn Endpoint,
}

impl Next<'_> {
    pub async fn run(self, ctx: &RequestContext) -> Result<Response<ResponseBody>, DispatchError> {
        self.endpoint.run(ctx).await
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next")
    }
}

type ResolveMiddleware = fn(&Scope) -> Result<Arc<dyn Middleware>, DependencyError>;

/// A registered middleware type, resolved per request.
#[derive(Clone, Copy)]
pub struct MiddlewareKind {
    name: &'static str,
    resolve: ResolveMiddleware,
}

impl MiddlewareKind {
    pub fn of<M: Middleware>() -> Self {
        Self { name: type_name::<M>(), resolve: resolve_middleware::<M> }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for MiddlewareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn resolve_middleware<M: Middleware>(scope: &Scope) -> Result<Arc<dyn Middleware>, DependencyError> {
    let middleware: Arc<dyn Middleware> = scope.resolve::<M>()?;
    Ok(middleware)
}

/// The terminal step: the route's handler.
pub struct HandlerEndpoint {
    handler: Arc<dyn RequestHandler>,
}

impl HandlerEndpoint {
    pub fn new(handler: Arc<dyn RequestHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Endpoint for HandlerEndpoint {
    async fn run(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, DispatchError> {
        self.handler.invoke(ctx).await
    }
}

struct MiddlewareStep {
    kind: MiddlewareKind,
    next: Arc<dyn Endpoint>,
}

#[async_trait]
impl Endpoint for MiddlewareStep {
    async fn run(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, DispatchError> {
        let middleware = (self.kind.resolve)(ctx.scope())?;
        trace!(middleware = self.kind.name, "invoke middleware");
        middleware.invoke(ctx, Next { endpoint: self.next.as_ref() }).await
    }
}

/// Folds `kinds` around `terminal`, `kinds[0]` being the outermost step.
pub fn build_pipeline(kinds: &[MiddlewareKind], terminal: Arc<dyn Endpoint>) -> Arc<dyn Endpoint> {
    kinds.iter().rev().fold(terminal, |next, kind| Arc::new(MiddlewareStep { kind: *kind, next }))
}
