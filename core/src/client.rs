//! Session manager for the forum API.
//!
//! # Design
//! `Api` owns the client configuration, the transport and the access data
//! obtained from `api.init`. The handshake runs lazily on the first call that
//! needs it (or eagerly through [`Api::connect`]) and at most once at a time:
//! callers that find it in flight wait for it and share its outcome.
//!
//! Signing differs per method. GET requests are signed over the caller
//! parameters including `api_m`; POST requests are signed over an empty set,
//! the body is not part of the signature.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::credentials::{AccessData, ApiConfig};
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, Response, Transport};
use crate::params::Params;
use crate::request::ApiRequest;
use crate::signer::auth_params;

/// Method that initializes the connection. It is the only one that can be
/// called without access data.
pub const API_INIT: &str = "api.init";

/// Parameter carrying the API method name.
pub const PARAM_METHOD: &str = "api_m";

/// Client for the forum API, holding one signed session.
pub struct Api {
    config: ApiConfig,
    transport: Box<dyn Transport>,
    access: RwLock<Option<AccessData>>,
    /// Held while a handshake runs; remembers why the last one failed.
    bootstrap_gate: Mutex<Option<Arc<ApiError>>>,
    /// Completed handshake attempts, successful or not.
    bootstrap_attempts: AtomicU64,
}

impl Api {
    /// Create a client that initializes the connection on first use.
    pub fn new(config: ApiConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Box::new(transport),
            access: RwLock::new(None),
            bootstrap_gate: Mutex::new(None),
            bootstrap_attempts: AtomicU64::new(0),
        }
    }

    /// Create a client and initialize the connection immediately.
    pub fn connect(config: ApiConfig, transport: impl Transport + 'static) -> Result<Self> {
        let api = Self::new(config, transport);
        api.initialize()?;
        Ok(api)
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.access.read().is_some()
    }

    /// Access data from the handshake, if it has run.
    pub fn access_data(&self) -> Option<AccessData> {
        self.access.read().clone()
    }

    /// Run the `api.init` handshake unless it already succeeded.
    pub fn initialize(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }

        let observed = self.bootstrap_attempts.load(Ordering::Acquire);
        let mut last_failure = self.bootstrap_gate.lock();
        if self.is_initialized() {
            return Ok(());
        }
        if self.bootstrap_attempts.load(Ordering::Acquire) != observed {
            if let Some(cause) = last_failure.as_ref() {
                return Err(ApiError::BootstrapShared(Arc::clone(cause)));
            }
        }

        let outcome = self.bootstrap();
        self.bootstrap_attempts.fetch_add(1, Ordering::AcqRel);
        match outcome {
            Ok(access) => {
                info!(
                    client_id = access.client_id(),
                    api_version = access.api_version(),
                    "API connection initialized"
                );
                *self.access.write() = Some(access);
                *last_failure = None;
                Ok(())
            }
            Err(cause) => {
                warn!(error = %cause, "API connection initialization failed");
                let cause = Arc::new(cause);
                *last_failure = Some(Arc::clone(&cause));
                Err(ApiError::Bootstrap { source: cause })
            }
        }
    }

    /// Run `api.init` once, returning the unwrapped cause on failure.
    fn bootstrap(&self) -> Result<AccessData> {
        debug!(unique_id = self.config.unique_id(), "initializing API connection");
        let response = self.call(API_INIT, self.config.init_params(), HttpMethod::Get)?;
        Ok(AccessData::from_init_response(&response)?)
    }

    /// Call an API method directly, returning the decoded response.
    pub fn call(
        &self,
        api_method: &str,
        mut params: Params,
        method: HttpMethod,
    ) -> Result<Response> {
        if api_method != API_INIT {
            self.initialize()?;
        }

        params.insert(PARAM_METHOD, api_method);
        debug!(api_method, %method, params = params.len(), "calling API");

        let access = self.access_data();
        let api_key = self.config.api_key();
        let response = match method {
            HttpMethod::Get => {
                let mut request = auth_params(&params, access.as_ref(), api_key);
                request.merge(params);
                self.transport.send_get(&request)?
            }
            HttpMethod::Post => {
                let mut request = auth_params(&Params::new(), access.as_ref(), api_key);
                request.merge(params);
                self.transport.send_post(&request)?
            }
        };
        Ok(response)
    }

    /// Send a request descriptor and post-process its response.
    pub fn call_request<R: ApiRequest + ?Sized>(&self, request: &R) -> Result<Response> {
        let response = self.call(request.api_method(), request.params(), request.http_method())?;
        request.parse_response(response)
    }
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
