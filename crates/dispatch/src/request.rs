//! Request handling module that provides access to the in-flight request and its route values.
//!
//! This module contains the core types for working with HTTP requests in the dispatcher:
//! - `RequestContext`: the per-request execution context (dependency scope, transport request,
//!   route values) threaded through the middleware pipeline, the binder and the handler
//! - `RouteValues`: the values captured by `{name}` segments of the matched route template

use crate::extract::BindingPolicy;
use crate::services::Scope;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, Uri};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Represents the execution context of a single request.
///
/// A context is created after a route matched, owns the request's dependency scope and is
/// dropped once the response has been written. Cloning it is cheap and yields a handle to the
/// same request, which is how handlers can take the context itself as a parameter.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    scope: Scope,
    request: Request<Bytes>,
    route_values: RouteValues,
    query: Vec<(String, String)>,
    binding_policy: BindingPolicy,
}

impl RequestContext {
    /// Creates a new RequestContext for the given scope, transport request and route values
    pub fn new(scope: Scope, request: Request<Bytes>, route_values: RouteValues, binding_policy: BindingPolicy) -> Self {
        let query = parse_query(request.uri());
        Self { inner: Arc::new(ContextInner { scope, request, route_values, query, binding_policy }) }
    }

    /// Returns the dependency scope of this request
    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    /// Returns the underlying transport request
    pub fn request(&self) -> &Request<Bytes> {
        &self.inner.request
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        self.inner.request.method()
    }

    /// Returns the URI of the request, including the query
    pub fn uri(&self) -> &Uri {
        self.inner.request.uri()
    }

    /// Returns the path of the request without its query
    pub fn path(&self) -> &str {
        self.inner.request.uri().path()
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        self.inner.request.headers()
    }

    /// Returns the buffered request body
    pub fn body(&self) -> &Bytes {
        self.inner.request.body()
    }

    /// Returns the values captured from the route template
    pub fn route_values(&self) -> &RouteValues {
        &self.inner.route_values
    }

    /// Gets the first query value with the given name, names compare case-insensitively
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.inner.query.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }

    /// Gets a header value as text, `None` when absent or not visible ascii
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|value| value.to_str().ok())
    }

    pub fn binding_policy(&self) -> BindingPolicy {
        self.inner.binding_policy
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", self.method())
            .field("uri", self.uri())
            .field("route_values", self.route_values())
            .finish_non_exhaustive()
    }
}

fn parse_query(uri: &Uri) -> Vec<(String, String)> {
    let Some(query) = uri.query() else {
        return Vec::new();
    };
    serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_else(|e| {
        warn!(cause = %e, query, "ignore malformed query string");
        Vec::new()
    })
}

/// Represents the values captured by the `{name}` segments of a matched route template.
///
/// Values are kept verbatim, without decoding or conversion. Names are looked up
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteValues {
    values: Vec<(String, String)>,
}

impl RouteValues {
    /// Creates an empty RouteValues instance with no values
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: &str, value: &str) {
        self.values.push((name.to_owned(), value.to_owned()));
    }

    /// Returns true if there are no route values
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of route values
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Gets the value of a route parameter by its name
    /// Returns None if the parameter doesn't exist
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.values.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: impl AsRef<str>) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteValues {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}
