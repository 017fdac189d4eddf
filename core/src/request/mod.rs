//! Request descriptors: one immutable value per remote operation.
//!
//! A descriptor knows its API method name, HTTP method and parameters, and
//! may post-process the decoded response. Inputs are validated when the
//! descriptor is built, so an invalid one never exists.

mod user;

pub use user::{FetchByEmail, FetchCurrentUserInfo, Login, Register};

use crate::error::Result;
use crate::http::{HttpMethod, Response};
use crate::params::Params;

/// A single remote operation, ready to be sent through
/// [`Api::call_request`](crate::Api::call_request).
pub trait ApiRequest {
    fn api_method(&self) -> &'static str;

    fn http_method(&self) -> HttpMethod;

    fn params(&self) -> Params;

    /// Post-process the decoded response. Returns it unchanged by default.
    fn parse_response(&self, response: Response) -> Result<Response> {
        Ok(response)
    }
}
