//! A counter controller and a log endpoint.
//!
//! ```text
//! curl -v http://127.0.0.1:8080/api/counter
//! curl -v -X POST http://127.0.0.1:8080/api/counter/increment
//! curl -v -X POST http://127.0.0.1:8080/api/counter/reset
//! curl -v -H 'Content-Type: application/json' \
//!     -d '{"Timestamp":"2025-09-05T10:18:00Z","Level":"Warn","Message":"disk almost full","SourceSystem":"X"}' \
//!     http://127.0.0.1:8080/logs
//! ```

use micro_dispatch::controller::{Controller, ControllerRoutes};
use micro_dispatch::error::DependencyError;
use micro_dispatch::extract::{body, service};
use micro_dispatch::responder::{Outcome, ok, status};
use micro_dispatch::services::{Injectable, Scope, ServiceCollection};
use micro_dispatch::{ListenOptions, Server, WebserverOptions, handler_fn};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Default)]
struct CounterService {
    value: AtomicI64,
}

struct CounterController {
    counter: Arc<CounterService>,
}

impl Injectable for CounterController {
    fn inject(scope: &Scope) -> Result<Self, DependencyError> {
        Ok(Self { counter: scope.resolve()? })
    }
}

impl CounterController {
    async fn value(self: Arc<Self>) -> Outcome {
        ok(self.counter.value.load(Ordering::SeqCst))
    }

    async fn increment(self: Arc<Self>) -> Outcome {
        ok(self.counter.value.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn reset(self: Arc<Self>) -> Outcome {
        self.counter.value.store(0, Ordering::SeqCst);
        status(http::StatusCode::NO_CONTENT)
    }
}

impl Controller for CounterController {
    fn base_path() -> Option<&'static str> {
        Some("api/counter")
    }

    fn routes(routes: &mut ControllerRoutes<Self>) {
        routes.get("", (), Self::value).post("increment", (), Self::increment).post("reset", (), Self::reset);
    }
}

#[derive(Deserialize, Default, Debug)]
struct LogEntry {
    timestamp: String,
    level: String,
    message: String,
    source_system: String,
}

struct Journal;

impl Journal {
    fn write(&self, entry: &LogEntry) {
        if entry.level.eq_ignore_ascii_case("warn") {
            warn!(timestamp = %entry.timestamp, source = %entry.source_system, message = %entry.message, "client log");
        } else {
            info!(
                timestamp = %entry.timestamp,
                source = %entry.source_system,
                level = %entry.level,
                message = %entry.message,
                "client log"
            );
        }
    }
}

async fn write_log(entry: LogEntry, journal: Arc<Journal>) -> Outcome {
    journal.write(&entry);
    status(http::StatusCode::ACCEPTED)
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut services = ServiceCollection::new();
    services.add_singleton_instance(CounterService::default()).add_singleton_instance(Journal);

    let mut options = WebserverOptions::new();
    options
        .listen(ListenOptions::default())
        .map_controller::<CounterController>()
        .map_post("/logs", handler_fn((body::<LogEntry>(), service::<Journal>()), write_log));

    let listen = options.listen_options().clone();
    let server = Server::builder().listen(listen).dispatcher(options.build(services)).build().unwrap();
    server.start().await.unwrap();
}
