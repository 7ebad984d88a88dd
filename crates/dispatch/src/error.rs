use std::error::Error as StdError;
use std::fmt;
use std::io;
use thiserror::Error;

/// The error a handler returns; any error type can be boxed into it.
pub type HandlerError = Box<dyn StdError + Send + Sync>;

/// Where a bindable value comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ParamSource {
    Body,
    Route,
    Query,
    Header,
    Services,
    /// route value when present under the parameter name, dependency resolution otherwise
    Inferred,
    Context,
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamSource::Body => "body",
            ParamSource::Route => "route",
            ParamSource::Query => "query",
            ParamSource::Header => "header",
            ParamSource::Services => "services",
            ParamSource::Inferred => "inferred",
            ParamSource::Context => "context",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum BindingError {
    #[error("invalid {origin} parameter '{name}': cannot convert {value:?} to {shape}: {reason}")]
    Conversion { origin: ParamSource, name: String, value: String, shape: &'static str, reason: String },

    #[error("missing required {origin} parameter '{name}'")]
    Missing { origin: ParamSource, name: String },

    #[error("invalid body: {reason}")]
    Body { reason: String },
}

impl BindingError {
    pub fn conversion<S: ToString>(
        origin: ParamSource,
        name: &str,
        value: &str,
        shape: &'static str,
        reason: S,
    ) -> Self {
        Self::Conversion { origin, name: name.to_owned(), value: value.to_owned(), shape, reason: reason.to_string() }
    }

    pub fn missing(origin: ParamSource, name: &str) -> Self {
        Self::Missing { origin, name: name.to_owned() }
    }

    pub fn body<S: ToString>(str: S) -> Self {
        Self::Body { reason: str.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("no service registered for {type_name}")]
    NotRegistered { type_name: &'static str },

    #[error("scope already released, cannot resolve {type_name}")]
    ScopeReleased { type_name: &'static str },

    #[error("registered factory for {type_name} produced an instance of another type")]
    TypeMismatch { type_name: &'static str },
}

impl DependencyError {
    pub fn not_registered<T: ?Sized>() -> Self {
        Self::NotRegistered { type_name: std::any::type_name::<T>() }
    }
}

/// Everything that can abort a request after a route matched.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("binding error: {source}")]
    Binding {
        #[from]
        source: BindingError,
    },

    #[error("dependency error: {source}")]
    Dependency {
        #[from]
        source: DependencyError,
    },

    #[error("handler error: {source}")]
    Handler { source: HandlerError },

    #[error("handler panicked: {message}")]
    Panicked { message: String },
}

impl DispatchError {
    pub fn handler<E: Into<HandlerError>>(e: E) -> Self {
        Self::Handler { source: e.into() }
    }

    /// Message of the innermost error in the chain, the only part of a fault a client may see.
    pub fn client_message(&self) -> String {
        match self {
            DispatchError::Handler { source } => {
                let mut deepest: &(dyn StdError + 'static) = source.as_ref();
                while let Some(next) = deepest.source() {
                    deepest = next;
                }
                deepest.to_string()
            }
            DispatchError::Binding { source } => source.to_string(),
            DispatchError::Dependency { .. } | DispatchError::Panicked { .. } => "internal server error".to_owned(),
        }
    }

    /// Full chain for the error-reporting side: every `source()` joined.
    pub fn detail(&self) -> String {
        let mut detail = self.to_string();
        let mut current = StdError::source(self);
        while let Some(cause) = current {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            current = cause.source();
        }
        detail
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("response has already been sent")]
    AlreadySent,

    #[error("connection closed before the response was written")]
    Closed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// A route template that cannot be registered.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("template '{template}' contains an empty segment")]
    EmptySegment { template: String },

    #[error("template '{template}' has unbalanced braces in segment '{segment}'")]
    UnbalancedBraces { template: String, segment: String },

    #[error("template '{template}' has a placeholder without a name")]
    EmptyPlaceholder { template: String },

    #[error("template '{template}' declares placeholder '{name}' twice")]
    DuplicatePlaceholder { template: String, name: String },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("can't resolve listen address '{address}': {source}")]
    Address { address: String, source: io::Error },

    #[error("bind {address} error: {source}")]
    Bind { address: String, source: io::Error },

    #[error("tls is enabled but this transport does not terminate tls")]
    Tls,
}
