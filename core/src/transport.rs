//! Blocking HTTP transport backed by `ureq`.
//!
//! Every call goes to `{base_url}/api.php`: GET parameters travel in the
//! query string, POST parameters as a form body.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::TransportError;
use crate::http::{decode_response, HttpMethod, Response, Transport};
use crate::params::Params;

const ENDPOINT: &str = "api.php";

fn default_timeout_secs() -> u64 {
    30
}

/// Where the forum lives and how long a round-trip may take.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransportConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Clone)]
pub struct UreqTransport {
    endpoint: String,
    agent: ureq::Agent,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(base_url: &str) -> Self {
        Self::from_config(&TransportConfig::new(base_url))
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        // Status codes are checked here so the body can be reported.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .new_agent();
        Self::with_agent(&config.base_url, agent)
    }

    pub fn with_agent(base_url: &str, agent: ureq::Agent) -> Self {
        Self {
            endpoint: format!("{}/{ENDPOINT}", base_url.trim_end_matches('/')),
            agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for UreqTransport {
    fn send_get(&self, params: &Params) -> Result<Response, TransportError> {
        let response = self
            .agent
            .get(&self.endpoint)
            .query_pairs(params.to_pairs())
            .call()
            .map_err(|e| request_error(HttpMethod::Get, e))?;
        read_response(HttpMethod::Get, response)
    }

    fn send_post(&self, params: &Params) -> Result<Response, TransportError> {
        let response = self
            .agent
            .post(&self.endpoint)
            .send_form(params.to_pairs())
            .map_err(|e| request_error(HttpMethod::Post, e))?;
        read_response(HttpMethod::Post, response)
    }
}

fn request_error(method: HttpMethod, source: ureq::Error) -> TransportError {
    TransportError::Request {
        method,
        source: Box::new(source),
    }
}

fn read_response(
    method: HttpMethod,
    mut response: ureq::http::Response<ureq::Body>,
) -> Result<Response, TransportError> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| request_error(method, e))?;
    debug!(%method, status, bytes = body.len(), "API response received");

    if !(200..300).contains(&status) {
        return Err(TransportError::Status { method, status, body });
    }
    decode_response(&body)
}
