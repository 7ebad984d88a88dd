use crate::body::ResponseBody;
use crate::controller::Controller;
use crate::error::DispatchError;
use crate::extract::{Bind, ParamDescriptor};
use crate::fn_trait::{FnTrait, Prepend, SyncFnTrait};
use crate::request::RequestContext;
use crate::responder::{self, IntoOutcome, Returned};
use async_trait::async_trait;
use futures::FutureExt;
use http::Response;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// The invokable unit a route dispatches to: binds the arguments, calls the function and
/// resolves its result.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, DispatchError>;

    /// The handler's parameters, in declaration order.
    fn params(&self) -> Vec<ParamDescriptor>;
}

/// an async function together with the descriptors of its parameters
pub struct FnHandler<B, F> {
    binder: B,
    f: F,
}

/// Wraps an async function; `binder` describes its parameters.
pub fn handler_fn<B, F>(binder: B, f: F) -> FnHandler<B, F>
where
    B: Bind,
    F: FnTrait<B::Output>,
{
    FnHandler { binder, f }
}

impl<B, F> FnHandler<B, F>
where
    B: Bind,
    F: FnTrait<B::Output>,
    F::Output: IntoOutcome,
{
    fn bind_and_call(&self, ctx: &RequestContext) -> Result<Returned, DispatchError> {
        let args = self.binder.bind(ctx)?;
        Ok(Returned::Pending(self.f.call(args).map(IntoOutcome::into_outcome).boxed()))
    }
}

#[async_trait]
impl<B, F> RequestHandler for FnHandler<B, F>
where
    B: Bind,
    F: FnTrait<B::Output>,
    F::Output: IntoOutcome,
{
    async fn invoke(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, DispatchError> {
        let returned = self.bind_and_call(ctx)?;
        responder::resolve(returned).await
    }

    fn params(&self) -> Vec<ParamDescriptor> {
        let mut params = Vec::new();
        self.binder.describe(&mut params);
        params
    }
}

impl<B, F> fmt::Debug for FnHandler<B, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnHandler({})", type_name::<F>())
    }
}

/// a plain function together with the descriptors of its parameters
pub struct SyncFnHandler<B, F> {
    binder: B,
    f: F,
}

/// Wraps a function that produces its result without awaiting.
pub fn sync_handler_fn<B, F>(binder: B, f: F) -> SyncFnHandler<B, F>
where
    B: Bind,
    F: SyncFnTrait<B::Output>,
{
    SyncFnHandler { binder, f }
}

#[async_trait]
impl<B, F> RequestHandler for SyncFnHandler<B, F>
where
    B: Bind,
    F: SyncFnTrait<B::Output>,
    F::Output: IntoOutcome,
{
    async fn invoke(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, DispatchError> {
        let args = self.binder.bind(ctx)?;
        let returned = Returned::Ready(self.f.call(args).into_outcome());
        responder::resolve(returned).await
    }

    fn params(&self) -> Vec<ParamDescriptor> {
        let mut params = Vec::new();
        self.binder.describe(&mut params);
        params
    }
}

impl<B, F> fmt::Debug for SyncFnHandler<B, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncFnHandler({})", type_name::<F>())
    }
}

/// An action of controller `C`.
///
/// The controller instance is resolved from the request's scope before the arguments are
/// bound and handed to the action as its first argument.
pub struct ControllerAction<C, B, F> {
    binder: B,
    action: F,
    _controller: PhantomData<fn() -> C>,
}

impl<C, B, F> ControllerAction<C, B, F> {
    pub(crate) fn new(binder: B, action: F) -> Self {
        Self { binder, action, _controller: PhantomData }
    }
}

#[async_trait]
impl<C, B, F> RequestHandler for ControllerAction<C, B, F>
where
    C: Controller,
    B: Bind,
    B::Output: Prepend<Arc<C>>,
    F: FnTrait<<B::Output as Prepend<Arc<C>>>::Output>,
    F::Output: IntoOutcome,
{
    async fn invoke(&self, ctx: &RequestContext) -> Result<Response<ResponseBody>, DispatchError> {
        let controller = ctx.scope().resolve::<C>()?;
        let args = self.binder.bind(ctx)?.prepend(controller);
        let future = self.action.call(args).map(IntoOutcome::into_outcome).boxed();
        responder::resolve(Returned::Pending(future)).await
    }

    fn params(&self) -> Vec<ParamDescriptor> {
        let mut params = Vec::new();
        self.binder.describe(&mut params);
        params
    }
}

impl<C, B, F> fmt::Debug for ControllerAction<C, B, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ControllerAction<{}>({})", type_name::<C>(), type_name::<F>())
    }
}
