//! Integration tests for the user CRUD API
//!
//! These tests drive the full router in process (Basic-auth middleware
//! included) with oneshot requests against a fresh in-memory store per
//! test, covering the end-to-end account lifecycle and the status-code
//! contract.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use tower::ServiceExt;
use userd::{
    api::{router, AppState},
    auth::CredentialVerifier,
    models::bootstrap_admin,
    store::{MemoryStore, UserStore},
    validation::ValidationPolicy,
};

const ADMIN: (&str, &str) = ("admin", "admin");
const ALICE: (&str, &str) = ("alice1234", "Passw0rd1");

// Minimum bcrypt cost keeps the tests fast; production uses DEFAULT_COST.
const TEST_COST: u32 = 4;

fn test_app() -> Router {
    test_app_with_unique_email(true)
}

fn test_app_with_unique_email(unique_email: bool) -> Router {
    let admin_hash = bcrypt::hash(ADMIN.1, TEST_COST).unwrap();
    let admin = bootstrap_admin(ADMIN.0, "admin@admin.ru", &admin_hash);
    let store: Arc<dyn UserStore> = Arc::new(MemoryStore::new(admin, unique_email));

    let state = AppState {
        store: store.clone(),
        verifier: Arc::new(CredentialVerifier::new(store)),
        policy: ValidationPolicy::default(),
        bcrypt_cost: TEST_COST,
    };

    router(state)
}

fn basic_auth(credentials: (&str, &str)) -> String {
    format!(
        "Basic {}",
        BASE64.encode(format!("{}:{}", credentials.0, credentials.1))
    )
}

/// Fire one request and return (status, decoded body). Non-JSON bodies come
/// back as plain strings, empty bodies as Null.
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(credentials) = auth {
        builder = builder.header(header::AUTHORIZATION, basic_auth(credentials));
    }
    let request = match body {
        Some(json_body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, value)
}

async fn create_user(app: &Router, username: &str, password: &str, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/users",
        Some(ADMIN),
        Some(json!({"username": username, "password": password, "email": email})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_ping_is_public() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("pong".to_string()));
}

#[tokio::test]
async fn test_account_lifecycle() {
    let app = test_app();

    // The bootstrap admin can authenticate and sees only itself.
    let (status, body) = send(&app, "GET", "/users", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Create alice; the response carries the assigned id and never the
    // password in any form.
    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(ADMIN),
        Some(json!({"username": ALICE.0, "password": ALICE.1, "email": "a@b.co"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], ALICE.0);
    assert_eq!(body["email"], "a@b.co");
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
    let alice_id = body["id"].as_str().unwrap().to_string();

    // The same username again conflicts.
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(ADMIN),
        Some(json!({"username": ALICE.0, "password": ALICE.1, "email": "other@b.co"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Alice can authenticate and list users.
    let (status, body) = send(&app, "GET", "/users", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    // But deleting another user is an admin operation.
    let bob_id = create_user(&app, "bobby1234", "Passw0rd2", "b@c.co").await;
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/users/{}", bob_id),
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Patch alice's email only; username stays, and the old password keeps
    // working, so the stored hash was untouched.
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/users/{}", alice_id),
        Some(ADMIN),
        Some(json!({"email": "new@mail.ru"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/users/{}", alice_id),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "new@mail.ru");
    assert_eq!(body["username"], ALICE.0);

    let (status, _) = send(&app, "GET", "/users", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);

    // Delete alice; the record is gone for good.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/users/{}", alice_id),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/users/{}", alice_id),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // And her credentials no longer authenticate.
    let (status, _) = send(&app, "GET", "/users", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_credentials_get_challenge() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response.headers().get(header::WWW_AUTHENTICATE).unwrap();
    assert!(challenge.to_str().unwrap().starts_with("Basic"));
}

#[tokio::test]
async fn test_bad_credentials_are_unauthorized() {
    let app = test_app();

    let (status, _) = send(&app, "GET", "/users", Some(("admin", "wrong")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unknown usernames report identically.
    let (status, _) = send(&app, "GET", "/users", Some(("ghost1234", "wrong")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_admin_can_fetch_by_id() {
    let app = test_app();

    let alice_id = create_user(&app, ALICE.0, ALICE.1, "a@b.co").await;
    let (status, body) = send(
        &app,
        "GET",
        &format!("/users/{}", alice_id),
        Some(ALICE),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], ALICE.0);
}

#[tokio::test]
async fn test_non_admin_cannot_create() {
    let app = test_app();

    create_user(&app, ALICE.0, ALICE.1, "a@b.co").await;
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(ALICE),
        Some(json!({"username": "bobby1234", "password": "Passw0rd2", "email": "b@c.co"})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_validation() {
    let app = test_app();

    // Missing field.
    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(ADMIN),
        Some(json!({"username": ALICE.0, "password": ALICE.1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, Value::String("empty email".to_string()));

    // Short username.
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(ADMIN),
        Some(json!({"username": "short", "password": ALICE.1, "email": "a@b.co"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Password without an uppercase letter.
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(ADMIN),
        Some(json!({"username": ALICE.0, "password": "passw0rd123", "email": "a@b.co"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Malformed email.
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(ADMIN),
        Some(json!({"username": ALICE.0, "password": ALICE.1, "email": "not-an-email"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_email_conflict() {
    let app = test_app();

    create_user(&app, ALICE.0, ALICE.1, "same@mail.ru").await;
    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(ADMIN),
        Some(json!({"username": "bobby1234", "password": "Passw0rd2", "email": "same@mail.ru"})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, Value::String("email already exists".to_string()));
}

#[tokio::test]
async fn test_email_uniqueness_can_be_disabled() {
    let app = test_app_with_unique_email(false);

    create_user(&app, ALICE.0, ALICE.1, "same@mail.ru").await;
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(ADMIN),
        Some(json!({"username": "bobby1234", "password": "Passw0rd2", "email": "same@mail.ru"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_invalid_user_id_is_bad_request() {
    let app = test_app();

    let (status, _) = send(&app, "GET", "/users/not-a-uuid", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_empty_document_is_rejected() {
    let app = test_app();

    let alice_id = create_user(&app, ALICE.0, ALICE.1, "a@b.co").await;
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/users/{}", alice_id),
        Some(ADMIN),
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, Value::String("nothing to update".to_string()));
}

#[tokio::test]
async fn test_patch_username_conflict() {
    let app = test_app();

    create_user(&app, ALICE.0, ALICE.1, "a@b.co").await;
    let bob_id = create_user(&app, "bobby1234", "Passw0rd2", "b@c.co").await;

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/users/{}", bob_id),
        Some(ADMIN),
        Some(json!({"username": ALICE.0})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_patch_admin_flag_promotes() {
    let app = test_app();

    let alice_id = create_user(&app, ALICE.0, ALICE.1, "a@b.co").await;

    // Alice cannot create users until promoted.
    let payload = json!({"username": "bobby1234", "password": "Passw0rd2", "email": "b@c.co"});
    let (status, _) = send(&app, "POST", "/users", Some(ALICE), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/users/{}", alice_id),
        Some(ADMIN),
        Some(json!({"admin": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/users", Some(ALICE), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_put_replaces_record() {
    let app = test_app();

    let alice_id = create_user(&app, ALICE.0, ALICE.1, "a@b.co").await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/users/{}", alice_id),
        Some(ADMIN),
        Some(json!({"username": "renamed123", "password": "Newpassw0rd", "email": "new@mail.ru"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/users/{}", alice_id),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "renamed123");
    assert_eq!(body["email"], "new@mail.ru");

    // The replaced credentials are live, the old ones are not.
    let (status, _) = send(
        &app,
        "GET",
        "/users",
        Some(("renamed123", "Newpassw0rd")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/users", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_put_requires_all_fields() {
    let app = test_app();

    let alice_id = create_user(&app, ALICE.0, ALICE.1, "a@b.co").await;
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/users/{}", alice_id),
        Some(ADMIN),
        Some(json!({"username": "renamed123", "email": "new@mail.ru"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, Value::String("empty password".to_string()));
}

#[tokio::test]
async fn test_put_unknown_user_is_not_found() {
    let app = test_app();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/users/{}", uuid::Uuid::new_v4()),
        Some(ADMIN),
        Some(json!({"username": "renamed123", "password": "Newpassw0rd", "email": "new@mail.ru"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_flag_round_trips_on_create() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(ADMIN),
        Some(json!({
            "username": "bobby1234",
            "password": "Passw0rd2",
            "email": "b@c.co",
            "admin": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["admin"], true);

    // Without the flag the field stays unset and off the wire.
    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(ADMIN),
        Some(json!({"username": ALICE.0, "password": ALICE.1, "email": "a@b.co"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.get("admin").is_none());
}

#[tokio::test]
async fn test_list_offset() {
    let app = test_app();

    create_user(&app, "username101", "Passw0rd1", "one@mail.ru").await;
    create_user(&app, "username102", "Passw0rd2", "two@mail.ru").await;
    create_user(&app, "username103", "Passw0rd3", "three@mail.ru").await;

    let (status, body) = send(&app, "GET", "/users?offset=2", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    // 4 records total (bootstrap admin included), 2 skipped.
    assert_eq!(body.as_array().unwrap().len(), 2);
}
