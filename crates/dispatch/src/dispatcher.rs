//! The per-request dispatch loop.
//!
//! A request goes through `Matching -> Scoped -> Piping -> Bound -> Invoked -> Resulted -> Closed`:
//!
//! - no matching route answers `404` with an empty body before any scope is opened
//! - a matched request gets a fresh dependency scope and a [`RequestContext`] wrapping it
//! - the route's pipeline (middleware, then binder, handler and result handler) produces the
//!   response, or a [`DispatchError`] which is reported to the [`DispatchObserver`] and
//!   answered with a safe message
//! - the response goes to the [`ResponseWriter`]; a write failure is reported and ends the
//!   request
//!
//! The scope is released exactly once whichever way the request ends, including when the
//! dispatch future is dropped before it completes.

use crate::body::ResponseBody;
use crate::error::{BindingError, DispatchError, RouteError, TransportError};
use crate::extract::BindingPolicy;
use crate::handler::RequestHandler;
use crate::middleware::{Endpoint, HandlerEndpoint, MiddlewareKind, build_pipeline};
use crate::request::RequestContext;
use crate::responder::Outcome;
use crate::router::RouteTable;
use crate::services::{Scope, ServiceProvider};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use http::header::CONTENT_TYPE;
use http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use serde_json::json;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The writable half of the transport's request/response abstraction.
#[async_trait]
pub trait ResponseWriter: Send {
    fn set_status(&mut self, status: StatusCode);

    fn set_content_type(&mut self, content_type: &HeaderValue);

    fn set_header(&mut self, name: &HeaderName, value: &HeaderValue);

    /// Sends the response; can only succeed once.
    async fn send(&mut self, body: Option<Bytes>) -> Result<(), TransportError>;
}

/// Receives the structured events of the dispatch loop.
///
/// Fault detail is only ever handed to the observer, never written into a response.
#[cfg_attr(test, mockall::automock)]
pub trait DispatchObserver: Send + Sync {
    fn request_started(&self, method: &Method, path: &str);

    fn route_not_found(&self, method: &Method, path: &str);

    fn fault(&self, method: &Method, path: &str, error: &DispatchError);

    fn transport_fault(&self, method: &Method, path: &str, error: &TransportError);
}

/// Writes the dispatch events as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn request_started(&self, method: &Method, path: &str) {
        debug!(%method, path, "request started");
    }

    fn route_not_found(&self, method: &Method, path: &str) {
        info!(%method, path, "route not found");
    }

    fn fault(&self, method: &Method, path: &str, error: &DispatchError) {
        match error {
            DispatchError::Binding { source } => warn!(%method, path, cause = %source, "request binding failed"),
            _ => error!(%method, path, cause = %error.detail(), "unhandled fault while dispatching request"),
        }
    }

    fn transport_fault(&self, method: &Method, path: &str, error: &TransportError) {
        error!(%method, path, cause = %error, "failed to write response");
    }
}

/// Routes requests to their pipelines.
///
/// The route table is published behind an [`ArcSwap`]: requests read a snapshot without
/// locking, and [`Dispatcher::add_route`] swaps in an extended copy.
pub struct Dispatcher {
    routes: ArcSwap<RouteTable<Arc<dyn Endpoint>>>,
    middleware: Vec<MiddlewareKind>,
    services: ServiceProvider,
    binding_policy: BindingPolicy,
    observer: Arc<dyn DispatchObserver>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.load().len())
            .field("middleware", &self.middleware)
            .field("binding_policy", &self.binding_policy)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub(crate) fn new(
        routes: RouteTable<Arc<dyn Endpoint>>,
        middleware: Vec<MiddlewareKind>,
        services: ServiceProvider,
        binding_policy: BindingPolicy,
        observer: Arc<dyn DispatchObserver>,
    ) -> Self {
        Self { routes: ArcSwap::from_pointee(routes), middleware, services, binding_policy, observer }
    }

    pub fn services(&self) -> &ServiceProvider {
        &self.services
    }

    pub fn route_count(&self) -> usize {
        self.routes.load().len()
    }

    /// Adds a route while requests are being served.
    ///
    /// In-flight requests keep the table they started with; the same first-registration-wins
    /// rule as during startup applies.
    pub fn add_route(
        &self,
        method: Method,
        template: &str,
        handler: impl RequestHandler + 'static,
    ) -> Result<bool, RouteError> {
        let endpoint = build_pipeline(&self.middleware, Arc::new(HandlerEndpoint::new(Arc::new(handler))));
        let mut added = Ok(false);
        self.routes.rcu(|current| {
            let mut table = RouteTable::clone(current);
            added = table.register(method.clone(), template, Arc::clone(&endpoint));
            table
        });
        added
    }

    /// Dispatches one request and writes its response.
    pub async fn dispatch<W>(&self, request: Request<Bytes>, writer: &mut W)
    where
        W: ResponseWriter + ?Sized,
    {
        let method = request.method().clone();
        let path = request.uri().path().to_owned();
        self.observer.request_started(&method, &path);

        let routes = self.routes.load_full();
        let Some(matched) = routes.at(&method, &path) else {
            self.observer.route_not_found(&method, &path);
            let mut response = Response::new(ResponseBody::empty());
            *response.status_mut() = StatusCode::NOT_FOUND;
            self.write(writer, response, &method, &path).await;
            return;
        };
        let endpoint = Arc::clone(matched.target());
        let route_values = matched.into_values();

        let scope = self.services.create_scope();
        let _release = ReleaseOnDrop(scope.clone());
        let ctx = RequestContext::new(scope, request, route_values, self.binding_policy);

        let result = AssertUnwindSafe(endpoint.run(&ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(DispatchError::Panicked { message: panic_message(payload.as_ref()) }));

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.observer.fault(&method, &path, &e);
                error_response(&e)
            }
        };
        self.write(writer, response, &method, &path).await;
    }

    async fn write<W>(&self, writer: &mut W, response: Response<ResponseBody>, method: &Method, path: &str)
    where
        W: ResponseWriter + ?Sized,
    {
        let (parts, body) = response.into_parts();
        writer.set_status(parts.status);
        for (name, value) in &parts.headers {
            if *name == CONTENT_TYPE {
                writer.set_content_type(value);
            } else {
                writer.set_header(name, value);
            }
        }
        if let Err(e) = writer.send(body.into_bytes()).await {
            self.observer.transport_fault(method, path, &e);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Releases the request scope when the dispatch ends, whichever way it ends.
struct ReleaseOnDrop(Scope);

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.release();
    }
}

fn error_response(error: &DispatchError) -> Response<ResponseBody> {
    let outcome = match error {
        DispatchError::Binding { source } => binding_outcome(source),
        _ => Outcome::Json(StatusCode::INTERNAL_SERVER_ERROR, error.client_message().into()),
    };
    outcome.into_response().unwrap_or_else(|_e| {
        let mut response = Response::new(ResponseBody::empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

fn binding_outcome(error: &BindingError) -> Outcome {
    Outcome::Json(StatusCode::BAD_REQUEST, json!({ "error": error.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DependencyError;
    use crate::extract::{body, query, route, service};
    use crate::handler::{handler_fn, sync_handler_fn};
    use crate::middleware::{Middleware, Next};
    use crate::options::WebserverOptions;
    use crate::responder::{Json, ok, status};
    use crate::services::{Injectable, ServiceCollection};
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use thiserror::Error;

    /// A response writer that keeps everything it is given.
    #[derive(Debug, Default)]
    struct RecordingWriter {
        status: Option<StatusCode>,
        content_type: Option<String>,
        headers: Vec<(String, String)>,
        body: Option<Bytes>,
        sent: usize,
    }

    impl RecordingWriter {
        fn body_text(&self) -> String {
            self.body.as_ref().map(|b| String::from_utf8_lossy(b).into_owned()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl ResponseWriter for RecordingWriter {
        fn set_status(&mut self, status: StatusCode) {
            self.status = Some(status);
        }

        fn set_content_type(&mut self, content_type: &HeaderValue) {
            self.content_type = content_type.to_str().ok().map(str::to_owned);
        }

        fn set_header(&mut self, name: &HeaderName, value: &HeaderValue) {
            self.headers.push((name.to_string(), value.to_str().unwrap_or_default().to_owned()));
        }

        async fn send(&mut self, body: Option<Bytes>) -> Result<(), TransportError> {
            self.sent += 1;
            self.body = body;
            Ok(())
        }
    }

    struct ClosedWriter;

    #[async_trait]
    impl ResponseWriter for ClosedWriter {
        fn set_status(&mut self, _status: StatusCode) {}

        fn set_content_type(&mut self, _content_type: &HeaderValue) {}

        fn set_header(&mut self, _name: &HeaderName, _value: &HeaderValue) {}

        async fn send(&mut self, _body: Option<Bytes>) -> Result<(), TransportError> {
            Err(TransportError::Closed)
        }
    }

    /// Counts how often request scopes drop their scoped instances.
    struct ScopeMarker(Arc<AtomicUsize>);

    impl Drop for ScopeMarker {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Resolves the marker in every request, before anything else runs.
    struct Marking;

    impl Injectable for Marking {
        fn inject(scope: &Scope) -> Result<Self, DependencyError> {
            scope.resolve::<ScopeMarker>()?;
            Ok(Self)
        }
    }

    #[async_trait]
    impl Middleware for Marking {
        async fn invoke(&self, ctx: &RequestContext, next: Next<'_>) -> Result<Response<ResponseBody>, DispatchError> {
            next.run(ctx).await
        }
    }

    struct Journal(Mutex<Vec<&'static str>>);

    macro_rules! journaling_middleware {
        ($name:ident, $label_in:literal, $label_out:literal) => {
            struct $name(Arc<Journal>);

            impl Injectable for $name {
                fn inject(scope: &Scope) -> Result<Self, DependencyError> {
                    Ok(Self(scope.resolve()?))
                }
            }

            #[async_trait]
            impl Middleware for $name {
                async fn invoke(&self, ctx: &RequestContext, next: Next<'_>) -> Result<Response<ResponseBody>, DispatchError> {
                    self.0.0.lock().unwrap().push($label_in);
                    let response = next.run(ctx).await;
                    self.0.0.lock().unwrap().push($label_out);
                    response
                }
            }
        };
    }

    journaling_middleware!(First, "A in", "A out");
    journaling_middleware!(Second, "B in", "B out");

    struct RequireApiKey;

    impl Injectable for RequireApiKey {
        fn inject(_scope: &Scope) -> Result<Self, DependencyError> {
            Ok(Self)
        }
    }

    #[async_trait]
    impl Middleware for RequireApiKey {
        async fn invoke(&self, ctx: &RequestContext, next: Next<'_>) -> Result<Response<ResponseBody>, DispatchError> {
            if ctx.header_value("x-api-key") == Some("secret") {
                return next.run(ctx).await;
            }
            status(StatusCode::UNAUTHORIZED).into_response()
        }
    }

    #[derive(Deserialize, Serialize, Debug, Default, PartialEq)]
    #[serde(default)]
    struct LogEntry {
        timestamp: String,
        level: String,
        message: String,
        source_system: String,
    }

    #[derive(Error, Debug)]
    #[error("failed to persist entry")]
    struct PersistError {
        #[source]
        cause: std::io::Error,
    }

    struct NotRegistered;

    async fn item(id: i64) -> Outcome {
        ok(id)
    }

    async fn echo_log(entry: LogEntry) -> Json<LogEntry> {
        Json(entry)
    }

    async fn failing(_id: i64) -> Result<Outcome, PersistError> {
        Err(PersistError { cause: std::io::Error::other("disk is full") })
    }

    async fn journaled(journal: Arc<Journal>) -> Outcome {
        journal.0.lock().unwrap().push("H");
        ok("done")
    }

    async fn needs_missing(_missing: Arc<NotRegistered>) -> Outcome {
        ok("unreachable")
    }

    async fn slow() -> Outcome {
        tokio::time::sleep(Duration::from_secs(60)).await;
        ok("late")
    }

    fn panicking() -> Outcome {
        panic!("handler bug")
    }

    fn ledger_entry(index: usize) -> Outcome {
        let entries: [i64; 3] = [10, 20, 30];
        match entries.get(index) {
            Some(entry) => ok(*entry),
            None => panic!("ledger index {index} out of range"),
        }
    }

    fn services(drops: &Arc<AtomicUsize>) -> ServiceCollection {
        let drops = Arc::clone(drops);
        let mut services = ServiceCollection::new();
        services
            .add_scoped_with(move |_| Ok(ScopeMarker(Arc::clone(&drops))))
            .add_singleton_with(|_| Ok(Journal(Mutex::new(Vec::new()))));
        services
    }

    fn options() -> WebserverOptions {
        let mut options = WebserverOptions::new();
        options
            .use_middleware::<Marking>()
            .map_get("/items/{id}", handler_fn((route::<i64>("id"),), item))
            .map_get("/items/{id}/fail", handler_fn((route::<i64>("id"),), failing))
            .map_post("/logs", handler_fn((body::<LogEntry>(),), echo_log))
            .map_get("/search/{id}", handler_fn((query::<i64>("id"),), item))
            .map_get("/missing", handler_fn((service::<NotRegistered>(),), needs_missing))
            .map_get("/slow", handler_fn((), slow))
            .map_get("/panic", sync_handler_fn((), panicking));
        options
    }

    fn dispatcher_with(mut options: WebserverOptions, observer: Arc<dyn DispatchObserver>) -> (Dispatcher, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        options.observer(observer);
        let dispatcher = options.build(services(&drops));
        (dispatcher, drops)
    }

    fn dispatcher() -> (Dispatcher, Arc<AtomicUsize>) {
        dispatcher_with(options(), Arc::new(TracingObserver))
    }

    fn get(uri: &str) -> Request<Bytes> {
        Request::get(uri).body(Bytes::new()).unwrap()
    }

    async fn send(dispatcher: &Dispatcher, request: Request<Bytes>) -> RecordingWriter {
        let mut writer = RecordingWriter::default();
        dispatcher.dispatch(request, &mut writer).await;
        writer
    }

    #[tokio::test]
    async fn route_value_binds_to_integer() {
        let (dispatcher, _) = dispatcher();
        let writer = send(&dispatcher, get("/items/42")).await;
        assert_eq!(writer.status, Some(StatusCode::OK));
        assert_eq!(writer.content_type.as_deref(), Some("application/json"));
        assert_eq!(writer.body_text(), "42");
        assert_eq!(writer.sent, 1);
    }

    #[tokio::test]
    async fn route_value_conversion_failure_is_bad_request() {
        let (dispatcher, _) = dispatcher();
        let writer = send(&dispatcher, get("/items/abc")).await;
        assert_eq!(writer.status, Some(StatusCode::BAD_REQUEST));
        assert!(writer.body_text().contains("'id'"));
    }

    #[tokio::test]
    async fn body_binds_case_insensitively() {
        let (dispatcher, _) = dispatcher();
        let raw = r#"{"timestamp":"2025-09-05T10:18:00Z","LEVEL":"Info","Message":"hi","SourceSystem":"X"}"#;
        let request = Request::post("/logs").body(Bytes::from_static(raw.as_bytes())).unwrap();

        let writer = send(&dispatcher, request).await;
        assert_eq!(writer.status, Some(StatusCode::OK));
        let echoed: LogEntry = serde_json::from_str(&writer.body_text()).unwrap();
        assert_eq!(echoed, LogEntry {
            timestamp: "2025-09-05T10:18:00Z".into(),
            level: "Info".into(),
            message: "hi".into(),
            source_system: "X".into(),
        });
    }

    #[tokio::test]
    async fn explicit_query_wins_over_route_value() {
        let (dispatcher, _) = dispatcher();
        let writer = send(&dispatcher, get("/search/1?id=2")).await;
        assert_eq!(writer.body_text(), "2");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found_without_scope() {
        let (dispatcher, drops) = dispatcher();
        let writer = send(&dispatcher, get("/nowhere")).await;
        assert_eq!(writer.status, Some(StatusCode::NOT_FOUND));
        assert!(writer.body.is_none());
        assert!(writer.content_type.is_none());

        let writer = send(&dispatcher, Request::delete("/items/1").body(Bytes::new()).unwrap()).await;
        assert_eq!(writer.status, Some(StatusCode::NOT_FOUND));
        assert_eq!(drops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_fault_hides_detail_from_client() {
        let mut observer = MockDispatchObserver::new();
        observer.expect_request_started().times(1).return_const(());
        observer
            .expect_fault()
            .withf(|method, path, error| {
                *method == Method::GET && path == "/items/7/fail" && error.detail().contains("failed to persist entry")
            })
            .times(1)
            .return_const(());
        let (dispatcher, _) = dispatcher_with(options(), Arc::new(observer));

        let writer = send(&dispatcher, get("/items/7/fail")).await;
        assert_eq!(writer.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        let body = writer.body_text();
        assert_eq!(body, r#""disk is full""#);
        assert!(!body.contains("PersistError"));
        assert!(!body.contains("persist"));
    }

    #[tokio::test]
    async fn unresolved_dependency_is_internal_error() {
        let mut observer = MockDispatchObserver::new();
        observer.expect_request_started().return_const(());
        observer
            .expect_fault()
            .withf(|_, _, error| matches!(error, DispatchError::Dependency { .. }))
            .times(1)
            .return_const(());
        let (dispatcher, _) = dispatcher_with(options(), Arc::new(observer));

        let writer = send(&dispatcher, get("/missing")).await;
        assert_eq!(writer.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!writer.body_text().contains("NotRegistered"));
    }

    #[tokio::test]
    async fn panic_is_a_fault() {
        let mut observer = MockDispatchObserver::new();
        observer.expect_request_started().return_const(());
        observer
            .expect_fault()
            .withf(|_, path, error| {
                path == "/panic"
                    && matches!(error, DispatchError::Panicked { message } if message == "handler bug")
                    && error.detail().contains("handler bug")
            })
            .times(1)
            .return_const(());
        let (dispatcher, drops) = dispatcher_with(options(), Arc::new(observer));

        let writer = send(&dispatcher, get("/panic")).await;
        assert_eq!(writer.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!writer.body_text().contains("handler bug"));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn formatted_panic_message_reaches_the_observer() {
        let mut observer = MockDispatchObserver::new();
        observer.expect_request_started().return_const(());
        observer
            .expect_fault()
            .withf(|_, _, error| matches!(error, DispatchError::Panicked { message } if message == "ledger index 7 out of range"))
            .times(1)
            .return_const(());
        let mut options = options();
        options.map_get("/ledger/{index}", sync_handler_fn((route::<usize>("index"),), ledger_entry));
        let (dispatcher, _) = dispatcher_with(options, Arc::new(observer));

        let writer = send(&dispatcher, get("/ledger/7")).await;
        assert_eq!(writer.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(writer.body_text(), "\"internal server error\"");
    }

    #[tokio::test]
    async fn transport_fault_is_reported() {
        let mut observer = MockDispatchObserver::new();
        observer.expect_request_started().return_const(());
        observer
            .expect_transport_fault()
            .withf(|_, path, error| path == "/items/1" && matches!(error, TransportError::Closed))
            .times(1)
            .return_const(());
        let (dispatcher, drops) = dispatcher_with(options(), Arc::new(observer));

        dispatcher.dispatch(get("/items/1"), &mut ClosedWriter).await;
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scope_is_released_once_on_every_exit_path() {
        let (dispatcher, drops) = dispatcher();

        // success
        send(&dispatcher, get("/items/1")).await;
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        // binding error
        send(&dispatcher, get("/items/x")).await;
        assert_eq!(drops.load(Ordering::SeqCst), 2);

        // handler fault
        send(&dispatcher, get("/items/1/fail")).await;
        assert_eq!(drops.load(Ordering::SeqCst), 3);

        // cancellation: the dispatch future is dropped while the handler is suspended
        let mut writer = RecordingWriter::default();
        let cancelled = tokio::time::timeout(Duration::from_millis(20), dispatcher.dispatch(get("/slow"), &mut writer)).await;
        assert!(cancelled.is_err());
        assert_eq!(drops.load(Ordering::SeqCst), 4);
        assert_eq!(writer.sent, 0);
    }

    #[tokio::test]
    async fn middleware_runs_in_registration_order() {
        let mut options = WebserverOptions::new();
        options
            .use_middleware::<First>()
            .use_middleware::<Second>()
            .map_get("/", handler_fn((service::<Journal>(),), journaled));
        let (dispatcher, _) = dispatcher_with(options, Arc::new(TracingObserver));

        let writer = send(&dispatcher, get("/")).await;
        assert_eq!(writer.status, Some(StatusCode::OK));
        let journal = dispatcher.services().create_scope().resolve::<Journal>().unwrap();
        assert_eq!(*journal.0.lock().unwrap(), vec!["A in", "B in", "H", "B out", "A out"]);
    }

    #[tokio::test]
    async fn short_circuit_decides_the_response() {
        let mut options = WebserverOptions::new();
        options
            .use_middleware::<First>()
            .use_middleware::<RequireApiKey>()
            .map_get("/", handler_fn((service::<Journal>(),), journaled));
        let (dispatcher, drops) = dispatcher_with(options, Arc::new(TracingObserver));

        let writer = send(&dispatcher, get("/")).await;
        assert_eq!(writer.status, Some(StatusCode::UNAUTHORIZED));
        assert!(writer.body.is_none());
        let journal = dispatcher.services().create_scope().resolve::<Journal>().unwrap();
        assert_eq!(*journal.0.lock().unwrap(), vec!["A in", "A out"]);
        // the marker is never resolved without the marking middleware
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        let request = Request::get("/").header("X-Api-Key", "secret").body(Bytes::new()).unwrap();
        let writer = send(&dispatcher, request).await;
        assert_eq!(writer.status, Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn missing_value_is_rejected_by_strict_policy() {
        let mut options = options();
        options.binding_policy(BindingPolicy::reject_missing());
        let (strict, _) = dispatcher_with(options, Arc::new(TracingObserver));

        let writer = send(&strict, get("/search/1")).await;
        assert_eq!(writer.status, Some(StatusCode::BAD_REQUEST));

        let (lenient, _) = dispatcher();
        let writer = send(&lenient, get("/search/1")).await;
        assert_eq!(writer.body_text(), "0");
    }

    #[tokio::test]
    async fn route_added_at_runtime_is_served() {
        let (dispatcher, _) = dispatcher();
        let before = dispatcher.route_count();

        let added = dispatcher.add_route(Method::GET, "/late/{id}", handler_fn((route::<i64>("id"),), item));
        assert_eq!(added, Ok(true));
        assert_eq!(dispatcher.route_count(), before + 1);
        assert_eq!(send(&dispatcher, get("/late/5")).await.body_text(), "5");

        let duplicate = dispatcher.add_route(Method::GET, "/items/{id}", handler_fn((route::<i64>("id"),), item));
        assert_eq!(duplicate, Ok(false));
    }

    #[tokio::test]
    async fn concurrent_requests_get_their_own_scope() {
        let (dispatcher, drops) = dispatcher();
        let dispatcher = Arc::new(dispatcher);

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move { send(&dispatcher, get(&format!("/items/{i}"))).await.body_text() })
            })
            .collect();
        for (i, task) in tasks.into_iter().enumerate() {
            assert_eq!(task.await.unwrap(), i.to_string());
        }
        assert_eq!(drops.load(Ordering::SeqCst), 16);
    }
}
