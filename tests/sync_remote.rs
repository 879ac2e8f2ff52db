//! Sync adapter integration tests against an in-process mock of the remote
//! identity + document-store API (same REST shape the production backend
//! exposes: `accounts:*` for auth, `users/{uid}/{doc}.json` for documents).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use pixlet_data::sync::remote::SyncConfig;
use pixlet_data::{Bookmark, HistoryEntry, PasswordEntry, SyncClient, SyncError, SyncStatus};

#[derive(Default)]
struct MockBackend {
    // email -> password
    users: Mutex<HashMap<String, String>>,
    // "uid/doc" -> last written value
    docs: Mutex<HashMap<String, Value>>,
}

fn uid_for(email: &str) -> String {
    format!("uid-{}", email)
}

fn token_for(email: &str) -> String {
    format!("token-{}", email)
}

async fn identity(
    State(state): State<Arc<MockBackend>>,
    Path(endpoint): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let mut users = state.users.lock().unwrap();

    match endpoint.as_str() {
        "accounts:signUp" => {
            if users.contains_key(&email) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {"message": "EMAIL_EXISTS"}})),
                );
            }
            users.insert(email.clone(), password);
        }
        "accounts:signInWithPassword" => match users.get(&email) {
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {"message": "EMAIL_NOT_FOUND"}})),
                );
            }
            Some(stored) if *stored != password => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {"message": "INVALID_PASSWORD"}})),
                );
            }
            Some(_) => {}
        },
        _ => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": {"message": "UNKNOWN_ENDPOINT"}})),
            );
        }
    }

    (
        StatusCode::OK,
        Json(json!({"localId": uid_for(&email), "idToken": token_for(&email)})),
    )
}

fn authorized(uid: &str, params: &HashMap<String, String>) -> bool {
    // token issued for uid-<email> is token-<email>
    let email = uid.strip_prefix("uid-").unwrap_or(uid);
    params.get("auth").map(String::as_str) == Some(token_for(email).as_str())
}

async fn db_put(
    State(state): State<Arc<MockBackend>>,
    Path((uid, doc)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&uid, &params) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "denied"})));
    }
    let doc = doc.trim_end_matches(".json");
    state
        .docs
        .lock()
        .unwrap()
        .insert(format!("{}/{}", uid, doc), body.clone());
    (StatusCode::OK, Json(body))
}

async fn db_get(
    State(state): State<Arc<MockBackend>>,
    Path((uid, doc)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&uid, &params) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "denied"})));
    }
    let doc = doc.trim_end_matches(".json");
    let value = state
        .docs
        .lock()
        .unwrap()
        .get(&format!("{}/{}", uid, doc))
        .cloned()
        .unwrap_or(Value::Null);
    (StatusCode::OK, Json(value))
}

async fn spawn_backend() -> SyncConfig {
    let state = Arc::new(MockBackend::default());
    let app = Router::new()
        .route("/identity/{endpoint}", post(identity))
        .route("/db/users/{uid}/{doc}", axum::routing::put(db_put).get(db_get))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    SyncConfig {
        api_key: "test-key".into(),
        identity_url: format!("http://{}/identity", addr),
        database_url: format!("http://{}/db", addr),
    }
}

fn sample_history() -> Vec<HistoryEntry> {
    vec![HistoryEntry {
        url: "https://rust-lang.org".into(),
        title: "Rust".into(),
        timestamp: "2026-08-30T10:00:00.000Z".into(),
        visited: "2026-08-30 10:00".into(),
    }]
}

fn sample_bookmarks() -> Vec<Bookmark> {
    vec![Bookmark {
        url: "https://a.com".into(),
        title: "A".into(),
        added: "2026-08-30T10:00:00.000Z".into(),
    }]
}

fn sample_passwords() -> Vec<PasswordEntry> {
    // already-ciphertext on the wire — the adapter never sees plaintext
    vec![PasswordEntry {
        service: "a.com".into(),
        username: "alice".into(),
        password: "AAAAAAAAAAAAb2xkIGNpcGhlcnRleHQ=".into(),
        added: "2026-08-30T10:00:00.000Z".into(),
    }]
}

#[tokio::test]
async fn register_push_and_pull_roundtrip() {
    let config = spawn_backend().await;
    let client = SyncClient::new(config).unwrap();

    client.register("alice@example.com", "hunter22").await.unwrap();
    assert_eq!(client.status(), SyncStatus::Connected);
    assert!(client.is_connected());

    client
        .sync_now(&sample_history(), &sample_bookmarks(), &sample_passwords())
        .await
        .unwrap();
    assert_eq!(client.status(), SyncStatus::Connected);

    assert_eq!(client.fetch_history().await.unwrap(), sample_history());
    assert_eq!(client.fetch_bookmarks().await.unwrap(), sample_bookmarks());

    let pulled = client.fetch_passwords().await.unwrap();
    assert_eq!(pulled.len(), 1);
    assert_eq!(pulled[0].service, "a.com");
    assert_eq!(pulled[0].username, "alice");
    assert_eq!(pulled[0].password, sample_passwords()[0].password);
}

#[tokio::test]
async fn login_works_after_register_and_rejects_bad_password() {
    let config = spawn_backend().await;

    let client = SyncClient::new(config.clone()).unwrap();
    client.register("bob@example.com", "correct horse").await.unwrap();
    client.logout();

    client.login("bob@example.com", "correct horse").await.unwrap();
    assert_eq!(client.status(), SyncStatus::Connected);
    client.logout();

    let err = client.login("bob@example.com", "wrong").await.unwrap_err();
    match err {
        SyncError::Auth(message) => assert_eq!(message, "INVALID_PASSWORD"),
        other => panic!("expected auth error, got {:?}", other),
    }
    assert_eq!(client.status(), SyncStatus::Disconnected);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn unknown_account_is_an_auth_error() {
    let config = spawn_backend().await;
    let client = SyncClient::new(config).unwrap();

    let err = client.login("nobody@example.com", "pw").await.unwrap_err();
    match err {
        SyncError::Auth(message) => assert_eq!(message, "EMAIL_NOT_FOUND"),
        other => panic!("expected auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn pull_before_any_push_is_empty() {
    let config = spawn_backend().await;
    let client = SyncClient::new(config).unwrap();
    client.register("carol@example.com", "pw123456").await.unwrap();

    assert!(client.fetch_history().await.unwrap().is_empty());
    assert!(client.fetch_bookmarks().await.unwrap().is_empty());
    assert!(client.fetch_passwords().await.unwrap().is_empty());
}

#[tokio::test]
async fn sync_enabled_flag_roundtrip() {
    let config = spawn_backend().await;
    let client = SyncClient::new(config).unwrap();
    client.register("dave@example.com", "pw123456").await.unwrap();

    // never written — defaults off
    assert!(!client.sync_enabled().await.unwrap());
    client.set_sync_enabled(true).await.unwrap();
    assert!(client.sync_enabled().await.unwrap());
}

#[tokio::test]
async fn logout_drops_the_session_but_keeps_remote_data() {
    let config = spawn_backend().await;
    let client = SyncClient::new(config).unwrap();
    client.register("erin@example.com", "pw123456").await.unwrap();
    client
        .sync_now(&sample_history(), &[], &[])
        .await
        .unwrap();

    client.logout();
    assert!(matches!(
        client.sync_now(&[], &[], &[]).await.unwrap_err(),
        SyncError::NotConnected
    ));

    // logging back in sees the previously pushed data untouched
    client.login("erin@example.com", "pw123456").await.unwrap();
    assert_eq!(client.fetch_history().await.unwrap(), sample_history());
}

#[tokio::test]
async fn push_overwrites_wholesale_last_writer_wins() {
    let config = spawn_backend().await;
    let client = SyncClient::new(config).unwrap();
    client.register("frank@example.com", "pw123456").await.unwrap();

    client.sync_now(&sample_history(), &sample_bookmarks(), &[]).await.unwrap();
    // second push with empty history replaces the remote copy entirely
    client.sync_now(&[], &sample_bookmarks(), &[]).await.unwrap();

    assert!(client.fetch_history().await.unwrap().is_empty());
    assert_eq!(client.fetch_bookmarks().await.unwrap(), sample_bookmarks());
}
