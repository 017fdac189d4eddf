//! Client core for a forum platform's remote API.
//!
//! # Overview
//! Every request to the forum is signed with credentials obtained from a
//! one-time `api.init` handshake. [`Api`] runs that handshake on first use,
//! signs each call and hands the flat parameter map to a [`Transport`].
//! Individual operations are described by [`request::ApiRequest`] values.
//!
//! # Design
//! - The signature is a pure function of the parameters and the credentials
//!   ([`signer::compute_signature`]), so it is tested against fixed vectors.
//! - The handshake is serialized per [`Api`]: concurrent first calls wait for
//!   a single `api.init` round-trip.
//! - [`Transport`] is the only I/O seam. [`UreqTransport`] talks HTTP; tests
//!   plug in in-memory transports or the `mock-server` crate.
//! - Named instances live in an explicit [`Registry`] rather than global
//!   state.

pub mod client;
pub mod credentials;
pub mod error;
pub mod http;
pub mod params;
pub mod registry;
pub mod request;
pub mod signer;
pub mod transport;

pub use client::{Api, API_INIT};
pub use credentials::{AccessData, ApiConfig};
pub use error::{ApiError, Result, TransportError, ValidationError};
pub use http::{HttpMethod, Response, Transport};
pub use params::{ParamValue, Params};
pub use registry::Registry;
pub use request::ApiRequest;
pub use transport::{TransportConfig, UreqTransport};
