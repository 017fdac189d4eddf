//! Session credentials: the long-lived client identity and the access data
//! handed out by the `api.init` handshake.
//!
//! # Design
//! [`ApiConfig`] is validated once at construction (or deserialization) and
//! never changes. [`AccessData`] only exists as a fully validated value, so
//! the four handshake fields are either all known or all unknown.

use serde::Deserialize;

use crate::error::ValidationError;
use crate::http::Response;
use crate::params::Params;

/// API key and the client description sent with `api.init`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawApiConfig")]
pub struct ApiConfig {
    api_key: String,
    unique_id: String,
    client_name: String,
    client_version: String,
    platform_name: String,
    platform_version: String,
}

#[derive(Deserialize)]
struct RawApiConfig {
    api_key: String,
    unique_id: String,
    client_name: String,
    client_version: String,
    platform_name: String,
    platform_version: String,
}

impl TryFrom<RawApiConfig> for ApiConfig {
    type Error = ValidationError;

    fn try_from(raw: RawApiConfig) -> Result<Self, Self::Error> {
        ApiConfig::new(
            raw.api_key,
            raw.unique_id,
            raw.client_name,
            raw.client_version,
            raw.platform_name,
            raw.platform_version,
        )
    }
}

impl ApiConfig {
    pub fn new(
        api_key: impl Into<String>,
        unique_id: impl Into<String>,
        client_name: impl Into<String>,
        client_version: impl Into<String>,
        platform_name: impl Into<String>,
        platform_version: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            api_key: non_empty("api key", api_key.into())?,
            unique_id: non_empty("unique id", unique_id.into())?,
            client_name: non_empty("client name", client_name.into())?,
            client_version: non_empty("client version", client_version.into())?,
            platform_name: non_empty("platform name", platform_name.into())?,
            platform_version: non_empty("platform version", platform_version.into())?,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn client_version(&self) -> &str {
        &self.client_version
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    pub fn platform_version(&self) -> &str {
        &self.platform_version
    }

    /// Parameters of the `api.init` request.
    pub fn init_params(&self) -> Params {
        Params::from([
            ("uniqueid", self.unique_id.as_str()),
            ("clientname", self.client_name.as_str()),
            ("clientversion", self.client_version.as_str()),
            ("platformname", self.platform_name.as_str()),
            ("platformversion", self.platform_version.as_str()),
        ])
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(value)
}

/// Short-lived access data returned by `api.init`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessData {
    access_token: String,
    secret: String,
    client_id: u32,
    api_version: u32,
}

impl AccessData {
    pub fn new(
        access_token: impl Into<String>,
        secret: impl Into<String>,
        client_id: u32,
        api_version: u32,
    ) -> Result<Self, ValidationError> {
        let access_token = non_empty("apiaccesstoken", access_token.into())?;
        let secret = non_empty("secret", secret.into())?;
        if client_id == 0 {
            return Err(ValidationError::NotPositive {
                field: "apiclientid",
                value: "0".to_string(),
            });
        }
        if api_version == 0 {
            return Err(ValidationError::NotPositive {
                field: "apiversion",
                value: "0".to_string(),
            });
        }
        Ok(Self {
            access_token,
            secret,
            client_id,
            api_version,
        })
    }

    /// Validate all four fields of an `api.init` response. Nothing is
    /// returned unless every field is valid.
    pub fn from_init_response(response: &Response) -> Result<Self, ValidationError> {
        let access_token = string_field(response, "apiaccesstoken")?;
        let secret = string_field(response, "secret")?;
        let api_version = positive_field(response, "apiversion")?;
        let client_id = positive_field(response, "apiclientid")?;
        Self::new(access_token, secret, client_id, api_version)
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn client_id(&self) -> u32 {
        self.client_id
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }
}

impl std::fmt::Debug for AccessData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessData")
            .field("access_token", &self.access_token)
            .field("secret", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("api_version", &self.api_version)
            .finish()
    }
}

fn string_field(response: &Response, field: &'static str) -> Result<String, ValidationError> {
    match response.get(field) {
        None | Some(serde_json::Value::Null) => Err(ValidationError::Missing { field }),
        Some(serde_json::Value::String(s)) if s.is_empty() => Err(ValidationError::Empty { field }),
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ValidationError::NotAString {
            field,
            value: other.to_string(),
        }),
    }
}

/// Accepts JSON integers and strings of plain digits such as `"3"`.
fn positive_field(response: &Response, field: &'static str) -> Result<u32, ValidationError> {
    let value = match response.get(field) {
        None | Some(serde_json::Value::Null) => return Err(ValidationError::Missing { field }),
        Some(value) => value,
    };
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) if s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse::<u64>().ok()
        }
        _ => None,
    };
    match parsed.and_then(|n| u32::try_from(n).ok()) {
        Some(n) if n > 0 => Ok(n),
        _ => Err(ValidationError::NotPositive {
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(value: serde_json::Value) -> Response {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!("test responses are objects"),
        }
    }

    #[test]
    fn config_exposes_init_params() {
        let config = ApiConfig::new("a", "b", "c", "d", "e", "f").unwrap();
        assert_eq!(config.api_key(), "a");
        assert_eq!(
            config.init_params(),
            Params::from([
                ("uniqueid", "b"),
                ("clientname", "c"),
                ("clientversion", "d"),
                ("platformname", "e"),
                ("platformversion", "f"),
            ])
        );
    }

    #[test]
    fn config_rejects_empty_fields() {
        let err = ApiConfig::new("a", "b", "", "d", "e", "f").unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "client name" });
        assert!(ApiConfig::new("", "b", "c", "d", "e", "f").is_err());
        assert!(ApiConfig::new("a", "b", "c", "d", "e", "").is_err());
    }

    #[test]
    fn config_deserializes_through_validation() {
        let config: ApiConfig = serde_json::from_value(json!({
            "api_key": "key",
            "unique_id": "device-1",
            "client_name": "forum-core",
            "client_version": "0.1.0",
            "platform_name": "linux",
            "platform_version": "6.1",
        }))
        .unwrap();
        assert_eq!(config.client_name(), "forum-core");

        let result: Result<ApiConfig, _> = serde_json::from_value(json!({
            "api_key": "",
            "unique_id": "device-1",
            "client_name": "forum-core",
            "client_version": "0.1.0",
            "platform_name": "linux",
            "platform_version": "6.1",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn access_data_from_valid_response() {
        let access = AccessData::from_init_response(&response(json!({
            "apiaccesstoken": "a",
            "secret": "b",
            "apiversion": 1,
            "apiclientid": 2,
        })))
        .unwrap();
        assert_eq!(access.access_token(), "a");
        assert_eq!(access.secret(), "b");
        assert_eq!(access.api_version(), 1);
        assert_eq!(access.client_id(), 2);
    }

    #[test]
    fn access_data_accepts_integer_strings() {
        let access = AccessData::from_init_response(&response(json!({
            "apiaccesstoken": "a",
            "secret": "b",
            "apiversion": "6",
            "apiclientid": "42",
        })))
        .unwrap();
        assert_eq!(access.api_version(), 6);
        assert_eq!(access.client_id(), 42);
    }

    #[test]
    fn access_data_rejects_padded_or_signed_integer_strings() {
        for version in [" 6 ", "+6", "6 ", "", "-6"] {
            let err = AccessData::from_init_response(&response(json!({
                "apiaccesstoken": "a",
                "secret": "b",
                "apiversion": version,
                "apiclientid": 2,
            })))
            .unwrap_err();
            assert!(
                matches!(err, ValidationError::NotPositive { field: "apiversion", .. }),
                "{version:?}"
            );
        }
    }

    #[test]
    fn access_data_rejects_invalid_responses() {
        let cases = [
            (
                json!({"apiaccesstoken": "a", "secret": "b", "apiversion": "c", "apiclientid": 2}),
                "apiversion",
            ),
            (
                json!({"apiaccesstoken": "a", "secret": "b", "apiversion": 1, "apiclientid": "d"}),
                "apiclientid",
            ),
            (
                json!({"apiaccesstoken": 1, "secret": "b", "apiversion": 1, "apiclientid": 2}),
                "apiaccesstoken",
            ),
            (
                json!({"apiaccesstoken": "a", "secret": 2, "apiversion": 1, "apiclientid": 2}),
                "secret",
            ),
            (
                json!({"apiaccesstoken": "a", "secret": "b", "apiversion": 0, "apiclientid": 2}),
                "apiversion",
            ),
            (
                json!({"apiaccesstoken": "a", "secret": "b", "apiversion": 1, "apiclientid": -3}),
                "apiclientid",
            ),
            (
                json!({"apiaccesstoken": "", "secret": "b", "apiversion": 1, "apiclientid": 2}),
                "apiaccesstoken",
            ),
            (
                json!({"secret": "b", "apiversion": 1, "apiclientid": 2}),
                "apiaccesstoken",
            ),
        ];
        for (body, field) in cases {
            let err = AccessData::from_init_response(&response(body.clone())).unwrap_err();
            let rejected = match err {
                ValidationError::Missing { field }
                | ValidationError::Empty { field }
                | ValidationError::NotAString { field, .. }
                | ValidationError::NotPositive { field, .. } => field,
                ValidationError::InvalidEmail(_) => unreachable!(),
            };
            assert_eq!(rejected, field, "{body}");
        }
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let access = AccessData::new("token", "hunter2", 1, 1).unwrap();
        assert!(!format!("{access:?}").contains("hunter2"));
    }
}
