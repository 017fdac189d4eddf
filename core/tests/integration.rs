//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `Api` over real HTTP
//! through `UreqTransport`. The server checks every signature with its own
//! implementation, so these tests catch drift between the two.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use forum_core::request::{FetchByEmail, FetchCurrentUserInfo, Login, Register};
use forum_core::{Api, ApiConfig, ApiError, Registry, UreqTransport};
use mock_server::Db;

const API_KEY: &str = "integration-key";

/// Start a mock forum on a random port and return its URL and state.
fn start_server() -> (String, Db) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let db = mock_server::state(API_KEY);
    let server_db = db.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, server_db).await
        })
        .unwrap();
    });

    (format!("http://{addr}/"), db)
}

fn init_calls(db: &Db) -> u64 {
    db.blocking_read().init_calls()
}

fn config(api_key: &str) -> ApiConfig {
    ApiConfig::new(api_key, "integration-device", "forum-core", "0.1.0", "linux", "6.1").unwrap()
}

fn error_code(response: &forum_core::Response) -> Option<&str> {
    response.get("response")?.get("errormessage")?.get(0)?.as_str()
}

#[test]
fn user_lifecycle() {
    let (url, db) = start_server();
    let api = Api::new(config(API_KEY), UreqTransport::new(&url));

    // Step 1: nothing has been sent yet.
    assert!(!api.is_initialized());
    assert_eq!(init_calls(&db), 0);

    // Step 2: first call bootstraps the session, then runs as a guest.
    let me = api.call_request(&FetchCurrentUserInfo).unwrap();
    assert_eq!(me["userid"], 0);
    assert!(api.is_initialized());
    assert_eq!(init_calls(&db), 1);

    // Step 3: register with every optional field.
    let mut fields = BTreeMap::new();
    fields.insert("field5".to_string(), "blue & green*".to_string());
    let register = Register::new("alice", "alice@example.com", "secret123")
        .unwrap()
        .with_user_fields(fields)
        .with_birthday(NaiveDate::from_ymd_opt(1990, 3, 5).unwrap())
        .with_facebook("Alice A.", "100042")
        .unwrap();
    let response = api.call_request(&register).unwrap();
    assert_eq!(error_code(&response), Some("registration_complete"));

    // Step 4: look the new user up by email.
    let user = api.call_request(&FetchByEmail::new("alice@example.com").unwrap()).unwrap();
    assert_eq!(user["username"], "alice");
    assert_eq!(user["birthday"], "1990-03-05");
    assert_eq!(user["fbuserid"], "100042");
    assert_eq!(user["userfield"]["field5"], "blue & green*");

    // Step 5: log in and read the current user back.
    let response = api.call_request(&Login::new("alice", "secret123").unwrap()).unwrap();
    assert_eq!(error_code(&response), Some("redirect_login"));
    let me = api.call_request(&FetchCurrentUserInfo).unwrap();
    assert_eq!(me["username"], "alice");

    // Step 6: a wrong password is reported by the forum, not the client.
    let response = api.call_request(&Login::new("alice", "wrong").unwrap()).unwrap();
    assert_eq!(error_code(&response), Some("badlogin"));

    // Still a single handshake.
    assert_eq!(init_calls(&db), 1);
}

#[test]
fn connect_with_wrong_api_key_fails() {
    let (url, db) = start_server();
    let err = Api::connect(config("not-the-key"), UreqTransport::new(&url)).unwrap_err();

    assert!(matches!(err, ApiError::Bootstrap { .. }), "{err:?}");
    assert_eq!(init_calls(&db), 1);
}

#[test]
fn transport_error_when_server_is_unreachable() {
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let api = Api::new(config(API_KEY), UreqTransport::new(&format!("http://127.0.0.1:{port}")));

    let err = api.call_request(&FetchCurrentUserInfo).unwrap_err();
    match err {
        ApiError::Bootstrap { source } => assert!(matches!(*source, ApiError::Transport(_))),
        other => panic!("expected a bootstrap error, got {other:?}"),
    }
    assert!(!api.is_initialized());
}

#[test]
fn concurrent_first_calls_bootstrap_once() {
    let (url, db) = start_server();
    let api = Arc::new(Api::new(config(API_KEY), UreqTransport::new(&url)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let api = Arc::clone(&api);
            std::thread::spawn(move || api.call_request(&FetchCurrentUserInfo))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(init_calls(&db), 1);
}

#[test]
fn registry_shares_a_session() {
    let (url, db) = start_server();
    let registry = Registry::new();
    registry
        .remember("forum", Arc::new(Api::new(config(API_KEY), UreqTransport::new(&url))), false)
        .unwrap();

    registry.get("forum").unwrap().call_request(&FetchCurrentUserInfo).unwrap();
    registry.get("forum").unwrap().call_request(&FetchCurrentUserInfo).unwrap();
    assert_eq!(init_calls(&db), 1);
}
