//! The transport adapter: serves a [`Dispatcher`] over HTTP/1.1 with hyper on tokio.

use crate::body::ResponseBody;
use crate::dispatcher::{Dispatcher, ResponseWriter};
use crate::error::{ServerError, TransportError};
use crate::options::ListenOptions;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Buffers the response written by the dispatcher until it is handed back to hyper.
#[derive(Debug)]
pub struct BufferedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
    sent: bool,
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: None, sent: false }
    }
}

impl BufferedResponse {
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub fn into_response(self) -> Response<ResponseBody> {
        let mut response = Response::new(ResponseBody::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[async_trait]
impl ResponseWriter for BufferedResponse {
    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn set_content_type(&mut self, content_type: &HeaderValue) {
        self.headers.insert(CONTENT_TYPE, content_type.clone());
    }

    fn set_header(&mut self, name: &HeaderName, value: &HeaderValue) {
        self.headers.append(name.clone(), value.clone());
    }

    async fn send(&mut self, body: Option<Bytes>) -> Result<(), TransportError> {
        if self.sent {
            return Err(TransportError::AlreadySent);
        }
        self.sent = true;
        self.body = body;
        Ok(())
    }
}

pub struct ServerBuilder {
    listen: ListenOptions,
    dispatcher: Option<Dispatcher>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { listen: ListenOptions::default(), dispatcher: None }
    }

    pub fn listen(mut self, listen: ListenOptions) -> Self {
        self.listen = listen;
        self
    }

    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let dispatcher = self.dispatcher.ok_or(ServerBuildError::MissingDispatcher)?;
        Ok(Server { listen: self.listen, dispatcher: Arc::new(dispatcher) })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("listen", &self.listen).finish_non_exhaustive()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ServerBuildError {
    #[error("dispatcher must be set")]
    MissingDispatcher,
}

#[derive(Debug)]
pub struct Server {
    listen: ListenOptions,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Serves until Ctrl-C.
    pub async fn start(self) -> Result<(), ServerError> {
        self.start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(cause = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serves until `shutdown` completes. Connections already accepted finish on their own tasks.
    pub async fn start_with_shutdown<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        if self.listen.use_tls {
            return Err(ServerError::Tls);
        }

        info!("starting");
        let address = self.listen.address();
        let mut resolved = tokio::net::lookup_host(address.as_str())
            .await
            .map_err(|source| ServerError::Address { address: address.clone(), source })?;
        let socket_address = resolved.next().ok_or_else(|| ServerError::Address {
            address: address.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved"),
        })?;

        let tcp_listener = TcpListener::bind(socket_address)
            .await
            .map_err(|source| ServerError::Bind { address: address.clone(), source })?;
        info!("listening on {}", self.listen.prefix());

        tokio::pin!(shutdown);
        loop {
            let (tcp_stream, remote_addr) = tokio::select! {
                () = &mut shutdown => break,
                accepted = tcp_listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                let service = service_fn(move |request| serve(Arc::clone(&dispatcher), request));
                if let Err(e) = http1::Builder::new().serve_connection(TokioIo::new(tcp_stream), service).await {
                    warn!(cause = %e, %remote_addr, "connection closed with error");
                }
            });
        }

        info!("stopping");
        drop(tcp_listener);
        info!("stopped");
        Ok(())
    }
}

async fn serve(dispatcher: Arc<Dispatcher>, request: Request<Incoming>) -> Result<Response<ResponseBody>, Infallible> {
    let (parts, body) = request.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(cause = %e, "failed to read request body");
            let mut response = Response::new(ResponseBody::empty());
            *response.status_mut() = StatusCode::BAD_REQUEST;
            return Ok(response);
        }
    };

    let mut writer = BufferedResponse::default();
    dispatcher.dispatch(Request::from_parts(parts, bytes), &mut writer).await;
    Ok(writer.into_response())
}
