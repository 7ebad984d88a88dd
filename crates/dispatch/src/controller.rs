//! Controllers: groups of actions sharing a base path and a per-request instance.
//!
//! A controller lists its routes explicitly in [`Controller::routes`]. Every action path is
//! joined to the controller's base path and normalized before it lands in the route table.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use micro_dispatch::controller::{Controller, ControllerRoutes};
//! # use micro_dispatch::services::{Injectable, Scope};
//! # use micro_dispatch::error::DependencyError;
//! # use micro_dispatch::extract::route;
//! # use micro_dispatch::responder::{ok, Outcome};
//! struct OrdersController;
//!
//! impl Injectable for OrdersController {
//!     fn inject(_scope: &Scope) -> Result<Self, DependencyError> {
//!         Ok(Self)
//!     }
//! }
//!
//! impl OrdersController {
//!     async fn get(self: Arc<Self>, id: u64) -> Outcome {
//!         ok(id)
//!     }
//! }
//!
//! impl Controller for OrdersController {
//!     fn routes(routes: &mut ControllerRoutes<Self>) {
//!         // GET /orders/{id}
//!         routes.get("{id}", (route::<u64>("id"),), Self::get);
//!     }
//! }
//! ```

use crate::handler::{ControllerAction, RequestHandler};
use crate::router::template;
use crate::services::{Injectable, ServiceCollection};
use http::Method;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

pub trait Controller: Injectable {
    /// The path every action of this controller is relative to.
    ///
    /// Defaults to the type name without its `Controller` suffix, lowercased:
    /// `CounterController` is served under `/counter`.
    fn base_path() -> Option<&'static str> {
        None
    }

    fn routes(routes: &mut ControllerRoutes<Self>);
}

/// The base path used when a controller doesn't declare one.
pub fn default_base_path<C: ?Sized>() -> String {
    let full = type_name::<C>();
    let without_generics = full.split('<').next().unwrap_or(full);
    let name = without_generics.rsplit("::").next().unwrap_or(without_generics);
    format!("/{}", name.replace("Controller", "").to_lowercase())
}

pub(crate) struct ControllerRoute {
    pub(crate) method: Method,
    pub(crate) template: String,
    pub(crate) handler: Arc<dyn RequestHandler>,
}

/// Collects the actions of controller `C`.
pub struct ControllerRoutes<C> {
    base: String,
    routes: Vec<ControllerRoute>,
    _controller: PhantomData<fn() -> C>,
}

impl<C: Controller> ControllerRoutes<C> {
    fn new() -> Self {
        let base = C::base_path().map_or_else(default_base_path::<C>, template::normalize);
        Self { base, routes: Vec::new(), _controller: PhantomData }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Adds an action; `path` is relative to the controller's base path.
    pub fn route<B, F>(&mut self, method: Method, path: &str, binder: B, action: F) -> &mut Self
    where
        ControllerAction<C, B, F>: RequestHandler + 'static,
    {
        let template = template::compose(&self.base, path);
        self.routes.push(ControllerRoute {
            method,
            template,
            handler: Arc::new(ControllerAction::<C, B, F>::new(binder, action)),
        });
        self
    }

    pub fn get<B, F>(&mut self, path: &str, binder: B, action: F) -> &mut Self
    where
        ControllerAction<C, B, F>: RequestHandler + 'static,
    {
        self.route(Method::GET, path, binder, action)
    }

    pub fn post<B, F>(&mut self, path: &str, binder: B, action: F) -> &mut Self
    where
        ControllerAction<C, B, F>: RequestHandler + 'static,
    {
        self.route(Method::POST, path, binder, action)
    }

    pub fn put<B, F>(&mut self, path: &str, binder: B, action: F) -> &mut Self
    where
        ControllerAction<C, B, F>: RequestHandler + 'static,
    {
        self.route(Method::PUT, path, binder, action)
    }

    pub fn delete<B, F>(&mut self, path: &str, binder: B, action: F) -> &mut Self
    where
        ControllerAction<C, B, F>: RequestHandler + 'static,
    {
        self.route(Method::DELETE, path, binder, action)
    }

    pub fn patch<B, F>(&mut self, path: &str, binder: B, action: F) -> &mut Self
    where
        ControllerAction<C, B, F>: RequestHandler + 'static,
    {
        self.route(Method::PATCH, path, binder, action)
    }
}

impl<C> fmt::Debug for ControllerRoutes<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: Vec<_> = self.routes.iter().map(|r| format!("{} {}", r.method, r.template)).collect();
        f.debug_struct("ControllerRoutes").field("base", &self.base).field("routes", &routes).finish()
    }
}

/// A controller type, ready to be mapped by
/// [`WebserverOptions::map_controllers`](crate::options::WebserverOptions::map_controllers).
#[derive(Clone, Copy)]
pub struct ControllerRegistration {
    name: &'static str,
    register_service: fn(&mut ServiceCollection),
    collect_routes: fn() -> Vec<ControllerRoute>,
}

impl ControllerRegistration {
    pub fn of<C: Controller>() -> Self {
        Self {
            name: type_name::<C>(),
            register_service: |services| {
                services.try_add_scoped::<C>();
            },
            collect_routes: collect_routes::<C>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn register_service_fn(&self) -> fn(&mut ServiceCollection) {
        self.register_service
    }

    pub(crate) fn routes(&self) -> Vec<ControllerRoute> {
        (self.collect_routes)()
    }
}

impl fmt::Debug for ControllerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn collect_routes<C: Controller>() -> Vec<ControllerRoute> {
    let mut routes = ControllerRoutes::<C>::new();
    C::routes(&mut routes);
    routes.routes
}
