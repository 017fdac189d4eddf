//! In-memory stand-in for the forum's `api.php` endpoint.
//!
//! It hands out sessions through `api.init`, checks the signature of every
//! other request with its own implementation of the algorithm, and keeps
//! registered users in memory. Rejections are reported the way the forum
//! does it: a 200 response whose `response.errormessage` names the problem.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub const API_VERSION: u32 = 6;

const AUTH_PARAMS: &[&str] = &["api_sig", "api_c", "api_s", "api_v"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub userid: u32,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_md5: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbuserid: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub userfield: BTreeMap<String, String>,
}

#[derive(Debug)]
struct Session {
    secret: String,
    client_id: u32,
    userid: Option<u32>,
}

#[derive(Debug)]
pub struct Forum {
    api_key: String,
    sessions: HashMap<String, Session>,
    users: Vec<User>,
    next_client_id: u32,
    next_user_id: u32,
    init_calls: u64,
}

pub type Db = Arc<RwLock<Forum>>;

impl Forum {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            sessions: HashMap::new(),
            users: Vec::new(),
            next_client_id: 1,
            next_user_id: 1,
            init_calls: 0,
        }
    }

    /// Number of `api.init` requests received, accepted or not.
    pub fn init_calls(&self) -> u64 {
        self.init_calls
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Seed a user directly, returning its id.
    pub fn add_user(&mut self, username: &str, email: &str, password_md5: &str) -> u32 {
        let userid = self.next_user_id;
        self.next_user_id += 1;
        self.users.push(User {
            userid,
            username: username.to_string(),
            email: email.to_string(),
            password_md5: password_md5.to_string(),
            birthday: None,
            fbuserid: None,
            userfield: BTreeMap::new(),
        });
        userid
    }

    /// Handle one `api.php` request.
    pub fn handle(&mut self, verb: Verb, pairs: &[(String, String)]) -> Value {
        let Some(method) = param(pairs, "api_m") else {
            return error_message("invalid_api_method");
        };
        if method == "api.init" {
            return self.init(verb, pairs);
        }

        let token = match self.authenticate(verb, pairs) {
            Ok(token) => token,
            Err(code) => {
                warn!(method, code, "rejected API request");
                return error_message(code);
            }
        };

        match method {
            "user.login" => self.login(&token, pairs),
            "user.fetchByEmail" => self.fetch_by_email(pairs),
            "user.fetchCurrentUserinfo" => self.fetch_current_user(&token),
            "register_addmember" => self.register(&token, pairs),
            _ => error_message("invalid_method"),
        }
    }

    fn init(&mut self, verb: Verb, pairs: &[(String, String)]) -> Value {
        self.init_calls += 1;
        if verb != Verb::Get {
            return error_message("invalid_request_method");
        }
        let expected = signature(Verb::Get, pairs, "", "", "", &self.api_key);
        if param(pairs, "api_sig") != Some(expected.as_str()) {
            warn!("rejected api.init: invalid signature");
            return error_message("invalid_api_signature");
        }
        let client_info = [
            "uniqueid",
            "clientname",
            "clientversion",
            "platformname",
            "platformversion",
        ];
        for required in client_info {
            if param(pairs, required).map_or(true, str::is_empty) {
                return error_message("invalid_client_info");
            }
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;
        let token = Uuid::new_v4().simple().to_string();
        let secret = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                secret: secret.clone(),
                client_id,
                userid: None,
            },
        );
        info!(client_id, "session initialized");

        json!({
            "apiversion": API_VERSION,
            "apiaccesstoken": token,
            "bbtitle": "Mock Forum",
            "bbactive": true,
            "apiclientid": client_id,
            "secret": secret,
        })
    }

    fn authenticate(&self, verb: Verb, pairs: &[(String, String)]) -> Result<String, &'static str> {
        let token = param(pairs, "api_s").ok_or("invalid_accesstoken")?;
        let session = self.sessions.get(token).ok_or("invalid_accesstoken")?;
        let client_id = session.client_id.to_string();
        if param(pairs, "api_c") != Some(client_id.as_str()) {
            return Err("invalid_clientid");
        }
        let expected = signature(verb, pairs, token, &client_id, &session.secret, &self.api_key);
        if param(pairs, "api_sig") != Some(expected.as_str()) {
            return Err("invalid_api_signature");
        }
        Ok(token.to_string())
    }

    fn login(&mut self, token: &str, pairs: &[(String, String)]) -> Value {
        let username = param(pairs, "username").unwrap_or_default();
        let password_md5 = param(pairs, "md5password").unwrap_or_default();
        let Some(userid) = self
            .users
            .iter()
            .find(|u| u.username == username && u.password_md5 == password_md5)
            .map(|u| u.userid)
        else {
            return error_message("badlogin");
        };
        if let Some(session) = self.sessions.get_mut(token) {
            session.userid = Some(userid);
        }
        json!({
            "session": { "userid": userid, "dbsessionhash": Uuid::new_v4().simple().to_string() },
            "response": { "errormessage": ["redirect_login"] },
        })
    }

    fn fetch_by_email(&self, pairs: &[(String, String)]) -> Value {
        let email = param(pairs, "email").unwrap_or_default();
        match self.users.iter().find(|u| u.email == email) {
            Some(user) => json!(user),
            None => error_message("invalid_user_specified"),
        }
    }

    fn fetch_current_user(&self, token: &str) -> Value {
        let userid = self.sessions.get(token).and_then(|s| s.userid);
        match userid.and_then(|id| self.users.iter().find(|u| u.userid == id)) {
            Some(user) => json!(user),
            None => json!({ "userid": 0, "username": "Guest" }),
        }
    }

    fn register(&mut self, token: &str, pairs: &[(String, String)]) -> Value {
        if param(pairs, "agree") != Some("1") {
            return error_message("register_not_agreed");
        }
        let username = param(pairs, "username").unwrap_or_default();
        let email = param(pairs, "email").unwrap_or_default();
        let password_md5 = param(pairs, "password_md5").unwrap_or_default();
        if username.is_empty() || email.is_empty() || password_md5.is_empty() {
            return error_message("fieldmissing");
        }
        if param(pairs, "emailconfirm") != Some(email) {
            return error_message("emailmismatch");
        }
        if param(pairs, "passwordconfirm_md5") != Some(password_md5) {
            return error_message("passwordmismatch");
        }
        if self.users.iter().any(|u| u.username == username) {
            return error_message("usernametaken");
        }
        if self.users.iter().any(|u| u.email == email) {
            return error_message("emailtaken");
        }

        let birthday = match (param(pairs, "year"), param(pairs, "month"), param(pairs, "day")) {
            (Some(year), Some(month), Some(day)) => Some(format!("{year}-{month}-{day}")),
            (None, None, None) => None,
            _ => return error_message("birthdayfield"),
        };
        let fbuserid = match (param(pairs, "fbname"), param(pairs, "fbuserid")) {
            (Some(_), Some(id)) => Some(id.to_string()),
            (None, None) => None,
            _ => return error_message("facebook_incomplete"),
        };
        let userfield = pairs
            .iter()
            .filter_map(|(key, value)| {
                let field = key.strip_prefix("userfield[")?.strip_suffix(']')?;
                Some((field.to_string(), value.clone()))
            })
            .collect();

        let userid = self.add_user(username, email, password_md5);
        if let Some(user) = self.users.last_mut() {
            user.birthday = birthday;
            user.fbuserid = fbuserid;
            user.userfield = userfield;
        }
        if let Some(session) = self.sessions.get_mut(token) {
            session.userid = Some(userid);
        }
        json!({
            "session": { "userid": userid },
            "response": { "errormessage": ["registration_complete"] },
        })
    }
}

fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn error_message(code: &str) -> Value {
    json!({ "response": { "errormessage": [code] } })
}

/// Signature the forum expects for a request carrying `pairs`.
///
/// GET requests are signed over every non-auth parameter, POST requests over
/// nothing. Flattened keys such as `userfield[x]` sort by their base name.
pub fn signature(
    verb: Verb,
    pairs: &[(String, String)],
    access_token: &str,
    client_id: &str,
    secret: &str,
    api_key: &str,
) -> String {
    let mut signed: Vec<(&str, &str)> = match verb {
        Verb::Get => pairs
            .iter()
            .filter(|(k, _)| !AUTH_PARAMS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect(),
        Verb::Post => Vec::new(),
    };
    signed.sort_by(|(a, _), (b, _)| base_key(a).cmp(base_key(b)));

    let mut payload = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(signed)
        .finish()
        .replace('*', "%2A");
    payload.push_str(access_token);
    payload.push_str(client_id);
    payload.push_str(secret);
    payload.push_str(api_key);
    hex::encode(md5::compute(payload.as_bytes()).0)
}

fn base_key(key: &str) -> &str {
    key.split_once('[').map_or(key, |(base, _)| base)
}

pub fn state(api_key: &str) -> Db {
    Arc::new(RwLock::new(Forum::new(api_key)))
}

pub fn app(api_key: &str) -> Router {
    router(state(api_key))
}

pub fn router(db: Db) -> Router {
    Router::new()
        .route("/api.php", get(handle_get).post(handle_post))
        .with_state(db)
}

pub async fn run(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, router(db)).await
}

async fn handle_get(
    State(db): State<Db>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Json<Value> {
    Json(db.write().await.handle(Verb::Get, &pairs))
}

async fn handle_post(
    State(db): State<Db>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Json<Value> {
    Json(db.write().await.handle(Verb::Post, &pairs))
}
