//! Parameter binding.
//!
//! A handler declares its parameters as a tuple of descriptors, built once when the route is
//! registered:
//!
//! ```no_run
//! # use micro_dispatch::extract::{body, route, query, service};
//! # #[derive(serde::Deserialize, Default)] struct LogEntry { message: String }
//! # struct Clock;
//! let binder = (route::<u64>("id"), query::<Option<String>>("filter"), body::<LogEntry>(), service::<Clock>());
//! ```
//!
//! Each descriptor names exactly one source. At request time the tuple binds every parameter in
//! declaration order and stops at the first failure. An explicit descriptor always wins over
//! inference: `query::<u64>("id")` reads the query even when the route captured an `id` too.

mod extract_body;
mod extract_header;
mod extract_tuple;
mod extract_url;
mod from_context;
pub(crate) mod json;
mod value;

pub use extract_body::FromBody;
pub use extract_header::FromHeader;
pub use extract_url::{FromQuery, FromRoute};
pub use from_context::{Context, FromServices, Inferable, Inferred, TransportRequest};
pub use value::FromValue;

use crate::error::{BindingError, DispatchError, ParamSource};
use crate::request::RequestContext;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::any::type_name;
use std::marker::PhantomData;

/// Binds a handler's arguments from a request.
///
/// Implemented by every descriptor and by tuples of descriptors.
pub trait Bind: Send + Sync + 'static {
    type Output: Send + 'static;

    fn bind(&self, ctx: &RequestContext) -> Result<Self::Output, DispatchError>;

    /// Appends one [`ParamDescriptor`] per bound parameter, in declaration order.
    fn describe(&self, params: &mut Vec<ParamDescriptor>);
}

/// What a registered handler parameter is bound from and into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: Option<&'static str>,
    pub source: ParamSource,
    pub shape: &'static str,
}

/// How a required value that is absent from the request is bound.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValue {
    /// bind the shape's default value (`0`, `""`, `false`, an empty struct)
    #[default]
    UseDefault,
    /// fail the request with a 400
    Reject,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BindingPolicy {
    pub missing: MissingValue,
}

impl BindingPolicy {
    pub fn reject_missing() -> Self {
        Self { missing: MissingValue::Reject }
    }
}

/// Binds the JSON request body.
///
/// Keys match field names ignoring case, `_` and `-`: `{"SourceSystem": "X"}` fills a plain
/// `source_system` field. When several keys name one field the last one wins.
pub fn body<T: DeserializeOwned + Default + Send + 'static>() -> FromBody<T> {
    FromBody { _shape: PhantomData }
}

/// Binds the route value captured by the `{name}` segment.
pub fn route<T: FromValue + Send + 'static>(name: &'static str) -> FromRoute<T> {
    FromRoute { name, _shape: PhantomData }
}

/// Binds the first query value called `name`.
pub fn query<T: FromValue + Send + 'static>(name: &'static str) -> FromQuery<T> {
    FromQuery { name, _shape: PhantomData }
}

/// Binds the request header called `name`.
pub fn header<T: FromValue + Send + 'static>(name: &'static str) -> FromHeader<T> {
    FromHeader { name, _shape: PhantomData }
}

/// Resolves `T` from the request's dependency scope.
pub fn service<T: Send + Sync + 'static>() -> FromServices<T> {
    FromServices { _shape: PhantomData }
}

/// Binds the route value called `name` when the matched route captured one, otherwise resolves
/// `T` from the dependency scope. Services are inferred as `Arc<S>`.
pub fn inferred<T: Inferable>(name: &'static str) -> Inferred<T> {
    Inferred { name, _shape: PhantomData }
}

/// Binds the execution context itself.
pub fn context() -> Context {
    Context
}

/// Binds a copy of the transport request.
pub fn request() -> TransportRequest {
    TransportRequest
}

/// Converts an optional text value, applying the binding policy when it is absent.
pub(crate) fn bind_text<T: FromValue>(
    ctx: &RequestContext,
    origin: ParamSource,
    name: &str,
    raw: Option<&str>,
) -> Result<T, BindingError> {
    match raw {
        Some(raw) => {
            T::from_value(raw).map_err(|e| BindingError::conversion(origin, name, raw, type_name::<T>(), e))
        }
        None => missing(ctx, origin, name),
    }
}

fn missing<T: FromValue>(ctx: &RequestContext, origin: ParamSource, name: &str) -> Result<T, BindingError> {
    if let Some(value) = T::when_absent() {
        return Ok(value);
    }
    match ctx.binding_policy().missing {
        MissingValue::UseDefault => Ok(T::default()),
        MissingValue::Reject => Err(BindingError::missing(origin, name)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::request::RouteValues;
    use crate::services::{ServiceCollection, ServiceProvider};
    use bytes::Bytes;
    use http::Request;

    pub(crate) fn context_with(
        uri: &str,
        body: &'static str,
        values: RouteValues,
        policy: BindingPolicy,
        provider: &ServiceProvider,
    ) -> RequestContext {
        let request = Request::builder()
            .uri(uri)
            .header("X-Page-Size", "25")
            .header("X-Trace", "abc")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap();
        RequestContext::new(provider.create_scope(), request, values, policy)
    }

    #[test]
    fn missing_value_uses_default_unless_rejected() {
        let provider = ServiceProvider::default();
        let lenient = context_with("/", "", RouteValues::new(), BindingPolicy::default(), &provider);
        let strict = context_with("/", "", RouteValues::new(), BindingPolicy::reject_missing(), &provider);

        assert_eq!(query::<u32>("page").bind(&lenient).unwrap(), 0);
        assert!(matches!(
            query::<u32>("page").bind(&strict),
            Err(DispatchError::Binding { source: BindingError::Missing { .. } })
        ));
        // an optional parameter is never missing
        assert_eq!(query::<Option<u32>>("page").bind(&strict).unwrap(), None);
    }

    #[test]
    fn policy_reads_from_json() {
        let policy: BindingPolicy = serde_json::from_str(r#"{"missing": "reject"}"#).unwrap();
        assert_eq!(policy, BindingPolicy::reject_missing());
        let policy: BindingPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy.missing, MissingValue::UseDefault);
    }

    #[test]
    fn explicit_query_wins_over_route_value() {
        let provider = ServiceCollection::new().build();
        let values = RouteValues::from_iter([("id", "7")]);
        let ctx = context_with("/items/7?id=9", "", values, BindingPolicy::default(), &provider);

        let (from_query, from_route) = (query::<u32>("id"), route::<u32>("id")).bind(&ctx).unwrap();
        assert_eq!(from_query, 9);
        assert_eq!(from_route, 7);
    }

    #[test]
    fn describe_lists_parameters_in_order() {
        let binder = (route::<u64>("id"), header::<String>("x-trace"), body::<Vec<u8>>(), context());
        let mut params = Vec::new();
        binder.describe(&mut params);

        let sources: Vec<_> = params.iter().map(|p| p.source).collect();
        assert_eq!(sources, vec![ParamSource::Route, ParamSource::Header, ParamSource::Body, ParamSource::Context]);
        assert_eq!(params[0].name, Some("id"));
        assert_eq!(params[0].shape, "u64");
        assert_eq!(params[2].name, None);
    }
}
