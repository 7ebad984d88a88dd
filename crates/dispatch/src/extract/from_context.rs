//! Parameters that are not read from the request's text: injected services, the execution
//! context and the transport request, plus the route-else-service inference.

use crate::error::{BindingError, DependencyError, DispatchError, ParamSource};
use crate::extract::{Bind, FromValue, ParamDescriptor, bind_text};
use crate::request::RequestContext;
use crate::services::Scope;
use bytes::Bytes;
use http::Request;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct FromServices<T> {
    pub(crate) _shape: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for FromServices<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FromServices<{}>", type_name::<T>())
    }
}

impl<T: Send + Sync + 'static> Bind for FromServices<T> {
    type Output = Arc<T>;

    fn bind(&self, ctx: &RequestContext) -> Result<Arc<T>, DispatchError> {
        Ok(ctx.scope().resolve::<T>()?)
    }

    fn describe(&self, params: &mut Vec<ParamDescriptor>) {
        params.push(ParamDescriptor { name: None, source: ParamSource::Services, shape: type_name::<T>() });
    }
}

/// A shape that can be bound without an explicit source.
///
/// Text shapes (every [`FromValue`]) read a captured route value and otherwise clone a
/// registered instance out of the scope. `Arc<S>` is never read from text and always resolves
/// `S` from the scope.
pub trait Inferable: Sized + Send + 'static {
    /// `None` when the shape has no text form.
    fn from_route_value(ctx: &RequestContext, name: &str, raw: &str) -> Option<Result<Self, BindingError>>;

    fn from_scope(scope: &Scope) -> Result<Self, DependencyError>;
}

impl<T: FromValue + Clone + Send + Sync + 'static> Inferable for T {
    fn from_route_value(ctx: &RequestContext, name: &str, raw: &str) -> Option<Result<Self, BindingError>> {
        Some(bind_text(ctx, ParamSource::Route, name, Some(raw)))
    }

    fn from_scope(scope: &Scope) -> Result<Self, DependencyError> {
        scope.resolve::<T>().map(|service| T::clone(&service))
    }
}

impl<S: Send + Sync + 'static> Inferable for Arc<S> {
    fn from_route_value(_ctx: &RequestContext, _name: &str, _raw: &str) -> Option<Result<Self, BindingError>> {
        None
    }

    fn from_scope(scope: &Scope) -> Result<Self, DependencyError> {
        scope.resolve::<S>()
    }
}

/// A parameter without an explicit source.
///
/// Bound from the route value of the same name when the matched route captured one and the
/// shape has a text form, otherwise resolved from the dependency scope.
pub struct Inferred<T> {
    pub(crate) name: &'static str,
    pub(crate) _shape: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Inferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Inferred<{}>({})", type_name::<T>(), self.name)
    }
}

impl<T: Inferable> Bind for Inferred<T> {
    type Output = T;

    fn bind(&self, ctx: &RequestContext) -> Result<T, DispatchError> {
        let from_route = ctx.route_values().get(self.name).and_then(|raw| T::from_route_value(ctx, self.name, raw));
        match from_route {
            Some(bound) => Ok(bound?),
            None => Ok(T::from_scope(ctx.scope())?),
        }
    }

    fn describe(&self, params: &mut Vec<ParamDescriptor>) {
        params.push(ParamDescriptor { name: Some(self.name), source: ParamSource::Inferred, shape: type_name::<T>() });
    }
}

/// Binds the [`RequestContext`] of the current request.
#[derive(Debug, Copy, Clone)]
pub struct Context;

impl Bind for Context {
    type Output = RequestContext;

    fn bind(&self, ctx: &RequestContext) -> Result<RequestContext, DispatchError> {
        Ok(ctx.clone())
    }

    fn describe(&self, params: &mut Vec<ParamDescriptor>) {
        params.push(ParamDescriptor { name: None, source: ParamSource::Context, shape: type_name::<RequestContext>() });
    }
}

/// Binds a copy of the buffered transport request.
#[derive(Debug, Copy, Clone)]
pub struct TransportRequest;

impl Bind for TransportRequest {
    type Output = Request<Bytes>;

    fn bind(&self, ctx: &RequestContext) -> Result<Request<Bytes>, DispatchError> {
        Ok(ctx.request().clone())
    }

    fn describe(&self, params: &mut Vec<ParamDescriptor>) {
        params.push(ParamDescriptor { name: None, source: ParamSource::Context, shape: type_name::<Request<Bytes>>() });
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{DependencyError, DispatchError};
    use crate::extract::tests::context_with;
    use crate::extract::{Bind, BindingPolicy, context, inferred, request, service};
    use crate::request::RouteValues;
    use crate::services::ServiceCollection;
    use std::sync::Arc;

    struct Clock(u64);

    #[derive(Default)]
    struct CounterService {
        hits: std::sync::atomic::AtomicU64,
    }

    #[test]
    fn inferred_prefers_route_value() {
        let mut services = ServiceCollection::new();
        services.add_singleton_instance(String::from("from services"));
        let provider = services.build();

        let with_value = context_with("/a/x", "", RouteValues::from_iter([("name", "x")]), BindingPolicy::default(), &provider);
        let without = context_with("/a", "", RouteValues::new(), BindingPolicy::default(), &provider);

        assert_eq!(inferred::<String>("name").bind(&with_value).unwrap(), "x");
        assert_eq!(inferred::<String>("name").bind(&without).unwrap(), "from services");
    }

    #[test]
    fn inferred_service_is_resolved_from_the_scope() {
        let mut services = ServiceCollection::new();
        services.add_singleton_instance(CounterService::default());
        let provider = services.build();

        let without = context_with("/counter", "", RouteValues::new(), BindingPolicy::default(), &provider);
        let counter = inferred::<Arc<CounterService>>("counter").bind(&without).unwrap();
        counter.hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        assert!(Arc::ptr_eq(&counter, &without.scope().resolve::<CounterService>().unwrap()));

        // a route value of the same name has no text form to bind into
        let with_value =
            context_with("/counter/7", "", RouteValues::from_iter([("counter", "7")]), BindingPolicy::default(), &provider);
        let counter = inferred::<Arc<CounterService>>("counter").bind(&with_value).unwrap();
        assert_eq!(counter.hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn inferred_service_without_registration_is_a_dependency_error() {
        let provider = ServiceCollection::new().build();
        let ctx = context_with("/", "", RouteValues::new(), BindingPolicy::default(), &provider);
        assert!(matches!(
            inferred::<Arc<CounterService>>("counter").bind(&ctx),
            Err(DispatchError::Dependency { source: DependencyError::NotRegistered { .. } })
        ));
    }

    #[test]
    fn inferred_without_registration_is_a_dependency_error() {
        let provider = ServiceCollection::new().build();
        let ctx = context_with("/", "", RouteValues::new(), BindingPolicy::default(), &provider);
        assert!(matches!(
            inferred::<u32>("id").bind(&ctx),
            Err(DispatchError::Dependency { source: DependencyError::NotRegistered { .. } })
        ));
    }

    #[test]
    fn services_and_context_types() {
        let mut services = ServiceCollection::new();
        services.add_singleton_instance(Clock(17));
        let provider = services.build();
        let ctx = context_with("/now?tz=utc", "", RouteValues::new(), BindingPolicy::default(), &provider);

        let (clock, same_ctx, transport) = (service::<Clock>(), context(), request()).bind(&ctx).unwrap();
        assert_eq!(clock.0, 17);
        assert!(Arc::ptr_eq(&clock, &ctx.scope().resolve::<Clock>().unwrap()));
        assert_eq!(same_ctx.query_value("tz"), Some("utc"));
        assert_eq!(transport.uri().path(), "/now");
    }
}
