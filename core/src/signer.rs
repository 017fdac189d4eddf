//! Request signing.
//!
//! The signature is `md5(query + access_token + client_id + secret + api_key)`
//! in lowercase hex, where `query` is the form-encoded parameter map sorted by
//! key with `api_v` left out. It has to match the forum's own computation bit
//! for bit, so neither the order nor the exclusion set may change.

use crate::credentials::AccessData;
use crate::params::{ParamValue, Params};

/// Parameters never covered by the signature.
pub const UNSIGNED_PARAMS: &[&str] = &["api_v"];

pub const PARAM_SIGNATURE: &str = "api_sig";
pub const PARAM_CLIENT_ID: &str = "api_c";
pub const PARAM_ACCESS_TOKEN: &str = "api_s";
pub const PARAM_API_VERSION: &str = "api_v";

/// The secrets a signature is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningKeys<'a> {
    pub access_token: &'a str,
    pub client_id: &'a str,
    pub secret: &'a str,
    pub api_key: &'a str,
}

pub fn compute_signature(params: &Params, keys: &SigningKeys<'_>) -> String {
    let signed: Params = params
        .iter()
        .filter(|(key, _)| !UNSIGNED_PARAMS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let mut payload = signed.to_query_string();
    payload.push_str(keys.access_token);
    payload.push_str(keys.client_id);
    payload.push_str(keys.secret);
    payload.push_str(keys.api_key);

    md5_hex(&payload)
}

/// Build `api_sig`, `api_c`, `api_s` and `api_v` for `params`.
///
/// Before the handshake there is no access data: the signature is computed
/// with empty keys and only `api_sig` (plus a caller supplied `api_v`) is
/// produced.
pub fn auth_params(params: &Params, access: Option<&AccessData>, api_key: &str) -> Params {
    let client_id = access.map(|a| a.client_id().to_string()).unwrap_or_default();
    let keys = SigningKeys {
        access_token: access.map_or("", AccessData::access_token),
        client_id: &client_id,
        secret: access.map_or("", AccessData::secret),
        api_key,
    };

    let mut auth = Params::new();
    auth.insert(PARAM_SIGNATURE, compute_signature(params, &keys));
    if let Some(access) = access {
        auth.insert(PARAM_CLIENT_ID, access.client_id());
        auth.insert(PARAM_ACCESS_TOKEN, access.access_token());
    }
    let api_version = params
        .get(PARAM_API_VERSION)
        .cloned()
        .or_else(|| access.map(|a| ParamValue::from(a.api_version())));
    if let Some(api_version) = api_version {
        auth.insert(PARAM_API_VERSION, api_version);
    }
    auth
}

/// Lowercase hex MD5 digest, also used for the password fields.
pub fn md5_hex(input: &str) -> String {
    hex::encode(md5::compute(input.as_bytes()).0)
}
