//! User operations: lookup, login and registration.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;
use crate::http::HttpMethod;
use crate::params::Params;
use crate::request::ApiRequest;
use crate::signer::md5_hex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

fn email(value: String) -> Result<String, ValidationError> {
    if !EMAIL.is_match(&value) {
        return Err(ValidationError::InvalidEmail(value));
    }
    Ok(value)
}

fn non_empty(field: &'static str, value: String) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(value)
}

/// `user.fetchByEmail`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchByEmail {
    email: String,
}

impl FetchByEmail {
    pub fn new(email_address: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            email: email(email_address.into())?,
        })
    }
}

impl ApiRequest for FetchByEmail {
    fn api_method(&self) -> &'static str {
        "user.fetchByEmail"
    }

    fn http_method(&self) -> HttpMethod {
        HttpMethod::Post
    }

    fn params(&self) -> Params {
        Params::from([("email", self.email.as_str())])
    }
}

/// `user.fetchCurrentUserinfo`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchCurrentUserInfo;

impl ApiRequest for FetchCurrentUserInfo {
    fn api_method(&self) -> &'static str {
        "user.fetchCurrentUserinfo"
    }

    fn http_method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    fn params(&self) -> Params {
        Params::new()
    }
}

/// `user.login`. Only the MD5 digest of the password is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    username: String,
    password_md5: String,
}

impl Login {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let username = non_empty("username", username.into())?;
        let password = non_empty("password", password.into())?;
        Ok(Self {
            username,
            password_md5: md5_hex(&password),
        })
    }
}

impl ApiRequest for Login {
    fn api_method(&self) -> &'static str {
        "user.login"
    }

    fn http_method(&self) -> HttpMethod {
        HttpMethod::Post
    }

    fn params(&self) -> Params {
        Params::from([
            ("username", self.username.as_str()),
            ("md5password", self.password_md5.as_str()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FacebookAccount {
    name: String,
    user_id: String,
}

/// `register_addmember`
///
/// Optional parts are added with the `with_*` methods:
///
/// ```
/// use chrono::NaiveDate;
/// use forum_core::request::Register;
///
/// # fn main() -> Result<(), forum_core::ValidationError> {
/// let register = Register::new("alice", "alice@example.com", "hunter2")?
///     .with_birthday(NaiveDate::from_ymd_opt(1990, 3, 5).unwrap())
///     .with_facebook("Alice", "100042")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    username: String,
    email: String,
    password_md5: String,
    user_fields: BTreeMap<String, String>,
    birthday: Option<NaiveDate>,
    facebook: Option<FacebookAccount>,
}

impl Register {
    pub fn new(
        username: impl Into<String>,
        email_address: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let username = non_empty("username", username.into())?;
        let email = email(email_address.into())?;
        let password = non_empty("password", password.into())?;
        Ok(Self {
            username,
            email,
            password_md5: md5_hex(&password),
            user_fields: BTreeMap::new(),
            birthday: None,
            facebook: None,
        })
    }

    /// Custom profile fields, sent as `userfield[<name>]`.
    pub fn with_user_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        self.user_fields = fields;
        self
    }

    pub fn with_birthday(mut self, birthday: NaiveDate) -> Self {
        self.birthday = Some(birthday);
        self
    }

    /// Link a Facebook account. Both the name and the id are required.
    pub fn with_facebook(
        mut self,
        name: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        self.facebook = Some(FacebookAccount {
            name: non_empty("facebook name", name.into())?,
            user_id: non_empty("facebook user id", user_id.into())?,
        });
        Ok(self)
    }
}

impl ApiRequest for Register {
    fn api_method(&self) -> &'static str {
        "register_addmember"
    }

    fn http_method(&self) -> HttpMethod {
        HttpMethod::Post
    }

    fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("api_v", 1);
        params.insert("agree", true);
        params.insert("username", &self.username);
        params.insert("email", &self.email);
        params.insert("emailconfirm", &self.email);
        params.insert("password_md5", &self.password_md5);
        params.insert("passwordconfirm_md5", &self.password_md5);

        if !self.user_fields.is_empty() {
            params.insert("userfield", self.user_fields.clone());
        }
        if let Some(birthday) = self.birthday {
            params.insert("day", format!("{:02}", birthday.day()));
            params.insert("month", format!("{:02}", birthday.month()));
            params.insert("year", format!("{:04}", birthday.year()));
        }
        if let Some(facebook) = &self.facebook {
            params.insert("fbname", &facebook.name);
            params.insert("fbuserid", &facebook.user_id);
        }
        params
    }
}
