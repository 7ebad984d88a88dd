//! Startup configuration: where to listen, which routes, controllers and middleware to serve,
//! and how to bind missing values.

use crate::controller::{Controller, ControllerRegistration};
use crate::dispatcher::{DispatchObserver, Dispatcher, TracingObserver};
use crate::extract::BindingPolicy;
use crate::handler::RequestHandler;
use crate::middleware::{Endpoint, HandlerEndpoint, Middleware, MiddlewareKind, build_pipeline};
use crate::router::RouteTable;
use crate::services::{Injectable, ServiceCollection};
use http::Method;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the listener binds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListenOptions {
    pub hostname: String,
    pub port: u16,
    pub use_tls: bool,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self { hostname: "127.0.0.1".to_owned(), port: 8080, use_tls: false }
    }
}

impl ListenOptions {
    /// Reads the options from a JSON object; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// `http(s)://hostname:port/`
    pub fn prefix(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{scheme}://{}:{}/", self.hostname, self.port)
    }
}

/// Collects everything the dispatcher serves.
///
/// Routes keep the order of the calls that registered them, which is also their matching
/// order. Nothing registered here is visible to requests before [`WebserverOptions::build`].
pub struct WebserverOptions {
    listen: ListenOptions,
    binding_policy: BindingPolicy,
    routes: RouteTable<Arc<dyn RequestHandler>>,
    middleware: Vec<MiddlewareKind>,
    service_registrations: Vec<fn(&mut ServiceCollection)>,
    observer: Arc<dyn DispatchObserver>,
}

impl Default for WebserverOptions {
    fn default() -> Self {
        Self {
            listen: ListenOptions::default(),
            binding_policy: BindingPolicy::default(),
            routes: RouteTable::new(),
            middleware: Vec::new(),
            service_registrations: Vec::new(),
            observer: Arc::new(TracingObserver),
        }
    }
}

impl fmt::Debug for WebserverOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebserverOptions")
            .field("listen", &self.listen)
            .field("binding_policy", &self.binding_policy)
            .field("routes", &self.routes)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

impl WebserverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&mut self, listen: ListenOptions) -> &mut Self {
        self.listen = listen;
        self
    }

    pub fn listen_options(&self) -> &ListenOptions {
        &self.listen
    }

    pub fn binding_policy(&mut self, policy: BindingPolicy) -> &mut Self {
        self.binding_policy = policy;
        self
    }

    /// Replaces the default [`TracingObserver`].
    pub fn observer(&mut self, observer: Arc<dyn DispatchObserver>) -> &mut Self {
        self.observer = observer;
        self
    }

    /// Maps `template` to `handler`; a malformed template is logged and skipped.
    pub fn map(&mut self, method: Method, template: &str, handler: impl RequestHandler + 'static) -> &mut Self {
        // rejected and duplicate templates are logged by the route table
        let _added = self.routes.register(method, template, Arc::new(handler));
        self
    }

    pub fn map_get(&mut self, template: &str, handler: impl RequestHandler + 'static) -> &mut Self {
        self.map(Method::GET, template, handler)
    }

    pub fn map_post(&mut self, template: &str, handler: impl RequestHandler + 'static) -> &mut Self {
        self.map(Method::POST, template, handler)
    }

    pub fn map_put(&mut self, template: &str, handler: impl RequestHandler + 'static) -> &mut Self {
        self.map(Method::PUT, template, handler)
    }

    pub fn map_delete(&mut self, template: &str, handler: impl RequestHandler + 'static) -> &mut Self {
        self.map(Method::DELETE, template, handler)
    }

    pub fn map_patch(&mut self, template: &str, handler: impl RequestHandler + 'static) -> &mut Self {
        self.map(Method::PATCH, template, handler)
    }

    pub fn map_controller<C: Controller>(&mut self) -> &mut Self {
        self.map_controllers([ControllerRegistration::of::<C>()])
    }

    /// Maps the actions of every controller, each controller registered as a scoped service
    /// unless the collection already has it.
    pub fn map_controllers(&mut self, controllers: impl IntoIterator<Item = ControllerRegistration>) -> &mut Self {
        for controller in controllers {
            let routes = controller.routes();
            if routes.is_empty() {
                debug!(controller = controller.name(), "controller declares no routes");
                continue;
            }
            for route in routes {
                let _added = self.routes.register(route.method, &route.template, route.handler);
            }
            self.service_registrations.push(controller.register_service_fn());
        }
        self
    }

    /// Appends a middleware kind; the first one registered is the outermost.
    ///
    /// `M` is registered as a scoped service unless the collection already has it.
    pub fn use_middleware<M: Middleware + Injectable>(&mut self) -> &mut Self {
        self.middleware.push(MiddlewareKind::of::<M>());
        self.service_registrations.push(|services| {
            services.try_add_scoped::<M>();
        });
        self
    }

    /// Publishes the routes and composes one pipeline per route.
    pub fn build(self, mut services: ServiceCollection) -> Dispatcher {
        for register in &self.service_registrations {
            register(&mut services);
        }

        let middleware = self.middleware;
        let routes: RouteTable<Arc<dyn Endpoint>> = self.routes.map(|_method, _template, handler| {
            build_pipeline(&middleware, Arc::new(HandlerEndpoint::new(handler)))
        });
        info!(routes = routes.len(), middleware = middleware.len(), "dispatcher built");

        Dispatcher::new(routes, middleware, services.build(), self.binding_policy, self.observer)
    }
}
