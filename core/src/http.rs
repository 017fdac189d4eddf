//! Transport seam between the session manager and the network.
//!
//! # Design
//! The session manager only ever hands a flat parameter map to a
//! [`Transport`] and gets a decoded JSON object back. Everything below that
//! line (connection reuse, TLS, timeouts) belongs to the implementation.
//! [`UreqTransport`](crate::UreqTransport) is the blocking HTTP
//! implementation; tests substitute in-memory ones.

use std::fmt;
use std::str::FromStr;

use crate::error::{ApiError, TransportError};
use crate::params::Params;

/// Decoded body of a remote API response.
pub type Response = serde_json::Map<String, serde_json::Value>;

/// HTTP method for a request. The remote endpoint only accepts GET and POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            _ => Err(ApiError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Sends flat parameter maps to the remote API and decodes the JSON object
/// it answers with.
pub trait Transport: Send + Sync {
    fn send_get(&self, params: &Params) -> Result<Response, TransportError>;

    fn send_post(&self, params: &Params) -> Result<Response, TransportError>;
}

/// Decode a response body, rejecting anything that is not a JSON object.
pub fn decode_response(body: &str) -> Result<Response, TransportError> {
    match serde_json::from_str::<serde_json::Value>(body)? {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Array(_) => Err(TransportError::NotAnObject("an array")),
        serde_json::Value::String(_) => Err(TransportError::NotAnObject("a string")),
        serde_json::Value::Number(_) => Err(TransportError::NotAnObject("a number")),
        serde_json::Value::Bool(_) => Err(TransportError::NotAnObject("a boolean")),
        serde_json::Value::Null => Err(TransportError::NotAnObject("null")),
    }
}
