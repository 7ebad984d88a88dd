//! Result handling: turns whatever a handler returns into a concrete response.
//!
//! Every handler result is normalized into an [`Outcome`] through [`IntoOutcome`]:
//!
//! - a tagged outcome ([`Outcome::Status`] or [`Outcome::Json`]) is written as is
//! - any other value is wrapped as a `200` JSON response ([`Outcome::Raw`])
//!
//! A handler result may also still be pending ([`Returned::Pending`]). [`resolve`] awaits
//! exactly one such layer before classifying the value, so an async handler that produces a
//! tagged outcome has its status honored.

use crate::body::ResponseBody;
use crate::error::{DispatchError, HandlerError};
use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// The designated result of a handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// a status code without body
    Status(StatusCode),
    /// a status code with a JSON body; a `null` value writes no body at all
    Json(StatusCode, Value),
    /// a produced value that still needs the default wrapping as `200` JSON
    Raw(Value),
}

/// `200` with `value` as JSON body
pub fn ok(value: impl Into<Value>) -> Outcome {
    Outcome::Json(StatusCode::OK, value.into())
}

pub fn json(status: StatusCode, value: impl Into<Value>) -> Outcome {
    Outcome::Json(status, value.into())
}

pub fn status(status: StatusCode) -> Outcome {
    Outcome::Status(status)
}

pub fn not_found() -> Outcome {
    Outcome::Status(StatusCode::NOT_FOUND)
}

pub fn bad_request(value: impl Into<Value>) -> Outcome {
    Outcome::Json(StatusCode::BAD_REQUEST, value.into())
}

pub fn internal_server_error(value: impl Into<Value>) -> Outcome {
    Outcome::Json(StatusCode::INTERNAL_SERVER_ERROR, value.into())
}

impl Outcome {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Outcome::Status(status) | Outcome::Json(status, _) => *status,
            Outcome::Raw(_) => StatusCode::OK,
        }
    }

    /// Writes the outcome as a response.
    pub fn into_response(self) -> Result<Response<ResponseBody>, DispatchError> {
        match self {
            Outcome::Status(status) => Ok(with_status(status, ResponseBody::empty())),
            Outcome::Json(status, Value::Null) => Ok(with_status(status, ResponseBody::empty())),
            Outcome::Raw(Value::Null) => Ok(with_status(StatusCode::OK, ResponseBody::empty())),
            Outcome::Json(status, value) => json_response(status, &value),
            Outcome::Raw(value) => json_response(StatusCode::OK, &value),
        }
    }
}

fn with_status(status: StatusCode, body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}

fn json_response(status: StatusCode, value: &Value) -> Result<Response<ResponseBody>, DispatchError> {
    let bytes = serde_json::to_vec(value).map_err(DispatchError::handler)?;
    let mut response = with_status(status, ResponseBody::once(Bytes::from(bytes)));
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

/// Serializes `T` into the response body, `200` by default.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

/// A type that can be returned from a handler.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Outcome, HandlerError>;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Result<Outcome, HandlerError> {
        Ok(self)
    }
}

impl IntoOutcome for StatusCode {
    fn into_outcome(self) -> Result<Outcome, HandlerError> {
        Ok(Outcome::Status(self))
    }
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<Outcome, HandlerError> {
        Ok(Outcome::Raw(Value::Null))
    }
}

impl IntoOutcome for Value {
    fn into_outcome(self) -> Result<Outcome, HandlerError> {
        Ok(Outcome::Raw(self))
    }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Result<Outcome, HandlerError> {
        Ok(Outcome::Raw(Value::String(self)))
    }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Result<Outcome, HandlerError> {
        Ok(Outcome::Raw(Value::from(self)))
    }
}

impl<T: Serialize> IntoOutcome for Json<T> {
    fn into_outcome(self) -> Result<Outcome, HandlerError> {
        Ok(Outcome::Raw(serde_json::to_value(self.0)?))
    }
}

/// `None` is an empty `200`, not a `404`.
impl<T: IntoOutcome> IntoOutcome for Option<T> {
    fn into_outcome(self) -> Result<Outcome, HandlerError> {
        match self {
            Some(t) => t.into_outcome(),
            None => Ok(Outcome::Raw(Value::Null)),
        }
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<HandlerError>,
{
    fn into_outcome(self) -> Result<Outcome, HandlerError> {
        self.map_err(Into::into)?.into_outcome()
    }
}

/// A handler's result before it is classified.
pub enum Returned {
    Ready(Result<Outcome, HandlerError>),
    Pending(BoxFuture<'static, Result<Outcome, HandlerError>>),
}

impl fmt::Debug for Returned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Returned::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Returned::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Awaits a pending result, classifies it and writes the response.
pub async fn resolve(returned: Returned) -> Result<Response<ResponseBody>, DispatchError> {
    let outcome = match returned {
        Returned::Ready(result) => result,
        Returned::Pending(future) => future.await,
    }
    .map_err(|e| DispatchError::Handler { source: e })?;

    outcome.into_response()
}
