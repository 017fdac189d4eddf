//! Error types for the forum API client.
//!
//! # Design
//! Failures fall into four families: a request method the remote endpoint
//! does not accept, input that fails validation before anything reaches the
//! network, transport failures, and bootstrap failures. A bootstrap failure
//! always wraps the underlying error so `source()` still reaches the root
//! cause, also for callers that only waited on a handshake run by another.

use std::sync::Arc;

use thiserror::Error;

use crate::http::HttpMethod;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Errors returned by [`Api`](crate::Api) and the request descriptors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request method is neither GET nor POST.
    #[error("can not call request, unsupported request method provided: {0}")]
    UnsupportedMethod(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The `api.init` handshake failed. Credentials were left untouched.
    #[error("can not init connection with API because: {source}")]
    Bootstrap {
        #[source]
        source: Arc<ApiError>,
    },

    /// Another caller ran the handshake while this one waited, and it failed.
    #[error("can not init connection with API, concurrent attempt failed: {0}")]
    BootstrapShared(#[source] Arc<ApiError>),

    #[error("can not overwrite instance of API client named '{0}'")]
    InstanceExists(String),
}

/// Rejected input, raised before a request is built.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is missing")]
    Missing { field: &'static str },

    #[error("{field} must be a non-empty string")]
    Empty { field: &'static str },

    #[error("{field} must be a string, got {value}")]
    NotAString { field: &'static str, value: String },

    #[error("{field} must be an integer greater than zero, got {value}")]
    NotPositive { field: &'static str, value: String },

    #[error("value \"{0}\" was expected to be a valid e-mail address")]
    InvalidEmail(String),
}

/// Failures of the HTTP round-trip or of decoding its body.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("can not send {method} request: {source}")]
    Request {
        method: HttpMethod,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("can not send {method} request: HTTP {status}: {body}")]
    Status {
        method: HttpMethod,
        status: u16,
        body: String,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected response body: expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}
