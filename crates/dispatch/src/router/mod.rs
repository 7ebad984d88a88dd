//! The route table and its matcher.
//!
//! Routes are appended during startup and read by every request afterwards. Matching is a
//! linear scan in registration order: the first route whose method equals the request method
//! and whose template structurally matches the path wins.
//!
//! Overlapping templates are therefore resolved by registration order, not by specificity.
//! With `/items/{id}` registered before `/items/active`, a request for `/items/active` reaches
//! the `{id}` route with `id = "active"`. Register literal routes before parameterized ones
//! when both should be reachable.
//!
//! Literal segments and duplicate templates compare ignoring case, non-ascii letters included.

pub mod template;

use crate::error::RouteError;
use crate::request::RouteValues;
use http::Method;
use std::fmt;
use template::RouteTemplate;
use tracing::{debug, warn};

/// A registered route: a method, a normalized template and the value it dispatches to.
#[derive(Clone)]
pub struct Route<T> {
    method: Method,
    template: RouteTemplate,
    target: T,
}

impl<T> Route<T> {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    pub fn target(&self) -> &T {
        &self.target
    }
}

impl<T> fmt::Debug for Route<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.template)
    }
}

/// Result of matching a request against the table.
#[derive(Debug)]
pub struct RouteMatch<'table, T> {
    route: &'table Route<T>,
    values: RouteValues,
}

impl<'table, T> RouteMatch<'table, T> {
    pub fn route(&self) -> &'table Route<T> {
        self.route
    }

    pub fn target(&self) -> &'table T {
        &self.route.target
    }

    /// Gets the route values extracted from the path
    pub fn values(&self) -> &RouteValues {
        &self.values
    }

    pub fn into_values(self) -> RouteValues {
        self.values
    }
}

/// Ordered set of routes, unique per (method, normalized template).
#[derive(Clone)]
pub struct RouteTable<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T> fmt::Debug for RouteTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.routes).finish()
    }
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route.
    ///
    /// Returns `Ok(true)` when the route was added and `Ok(false)` when the same method and
    /// template were already registered: the first registration wins and later ones are no-ops.
    /// A malformed template is rejected and the table is left unchanged.
    pub fn register(&mut self, method: Method, template: &str, target: T) -> Result<bool, RouteError> {
        let template = RouteTemplate::parse(template).inspect_err(|e| {
            warn!(%method, template, cause = %e, "reject malformed route template");
        })?;

        if self.contains(&method, template.as_str()) {
            warn!(%method, template = %template, "route already registered, ignore the later one");
            return Ok(false);
        }

        debug!(%method, template = %template, "register route");
        self.routes.push(Route { method, template, target });
        Ok(true)
    }

    pub fn contains(&self, method: &Method, normalized_template: &str) -> bool {
        self.routes
            .iter()
            .any(|route| route.method == *method && template::eq_ignore_case(route.template.as_str(), normalized_template))
    }

    /// Finds the first route matching the method and the path; a query component is ignored.
    pub fn at<'table>(&'table self, method: &Method, raw_path: &str) -> Option<RouteMatch<'table, T>> {
        let path = raw_path.split_once('?').map_or(raw_path, |(path, _query)| path);
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| route.template.matches(path).map(|values| RouteMatch { route, values }))
    }

    pub fn routes(&self) -> &[Route<T>] {
        &self.routes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Converts every target, keeping order and templates.
    pub fn map<U>(self, mut f: impl FnMut(&Method, &RouteTemplate, T) -> U) -> RouteTable<U> {
        let routes = self
            .routes
            .into_iter()
            .map(|Route { method, template, target }| {
                let target = f(&method, &template, target);
                Route { method, template, target }
            })
            .collect();
        RouteTable { routes }
    }
}
