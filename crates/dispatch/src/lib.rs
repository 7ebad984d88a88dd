//! Controller-style request dispatch on top of an async HTTP listener.
//!
//! A request flows through four stages:
//!
//! 1. the [`router`] matches method and path against the registered route templates,
//! 2. a fresh dependency [`services::Scope`] is opened and wrapped in a [`RequestContext`],
//! 3. the route's [`middleware`] pipeline runs, ending in the route's handler, which binds its
//!    parameters with [`extract`] and turns its return value into a response with [`responder`],
//! 4. the response is written through a [`ResponseWriter`] and the scope is released.
//!
//! Routes, controllers and middleware are collected by [`WebserverOptions`] and published
//! as a [`Dispatcher`]; [`Server`] serves a dispatcher over HTTP/1.1.
//!
//! ```no_run
//! use micro_dispatch::extract::route;
//! use micro_dispatch::responder::{ok, Outcome};
//! use micro_dispatch::services::ServiceCollection;
//! use micro_dispatch::{handler_fn, ListenOptions, Server, WebserverOptions};
//!
//! async fn hello(name: String) -> Outcome {
//!     ok(format!("hello, {name}"))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut options = WebserverOptions::new();
//!     options.listen(ListenOptions::default()).map_get("/hello/{name}", handler_fn((route::<String>("name"),), hello));
//!     let listen = options.listen_options().clone();
//!     let dispatcher = options.build(ServiceCollection::new());
//!
//!     let server = Server::builder().listen(listen).dispatcher(dispatcher).build().unwrap();
//!     server.start().await.unwrap();
//! }
//! ```

mod body;
mod fn_trait;
mod request;

pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod handler;
pub mod middleware;
pub mod options;
pub mod responder;
pub mod router;
pub mod server;
pub mod services;

pub use body::ResponseBody;
pub use dispatcher::{DispatchObserver, Dispatcher, ResponseWriter, TracingObserver};
pub use error::DispatchError;
pub use fn_trait::{FnTrait, Prepend, SyncFnTrait};
pub use handler::{RequestHandler, handler_fn, sync_handler_fn};
pub use options::{ListenOptions, WebserverOptions};
pub use request::{RequestContext, RouteValues};
pub use server::Server;
