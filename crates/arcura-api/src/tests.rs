//! End-to-end tests driving the router in-process against an in-memory store.

use arcura_credentials::TokenService;
use arcura_store_sqlite::SqliteStore;
use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, router};

const SECRET: &[u8] = b"test-secret-that-is-32-bytes-long!!";

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let tokens = TokenService::new(SECRET).unwrap();
  router(AppState::new(store, tokens))
}

async fn call(
  app: &Router,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  call_raw(app, method, uri, token, body.map(|json| json.to_string())).await
}

/// Like [`call`] but with a literal body, which need not be valid JSON. A
/// response body that is not JSON comes back as a `Value::String`.
async fn call_raw(
  app: &Router,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<String>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let body = match body {
    Some(text) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(text)
    }
    None => Body::empty(),
  };

  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes)
      .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
  };
  (status, value)
}

async fn register(app: &Router, name: &str) -> u64 {
  let (status, body) = call(
    app,
    "POST",
    "/auth/register",
    None,
    Some(json!({
      "first_name": name,
      "last_name": "Tester",
      "username": name,
      "email": format!("{name}@example.com"),
      "phone_number": format!("tel:{name}"),
      "password": format!("{name}-password"),
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["id"].as_u64().unwrap()
}

async fn login(app: &Router, name: &str, password: &str) -> (StatusCode, Value) {
  call(
    app,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "username": name, "password": password })),
  )
  .await
}

async fn session(app: &Router, name: &str) -> String {
  let (status, body) = login(app, name, &format!("{name}-password")).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  body["token"].as_str().unwrap().to_owned()
}

// ─── Sessions ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_login_and_profile() {
  let app = app().await;
  let id = register(&app, "alice").await;

  let (status, body) = login(&app, "alice", "alice-password").await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["expiresAt"].is_string());
  let token = body["token"].as_str().unwrap();

  for path in ["/auth/me", "/profile"] {
    let (status, me) = call(&app, "GET", path, Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"].as_u64(), Some(id));
    assert_eq!(me["username"], "alice");
    assert!(me.get("password_hash").is_none());
  }
}

#[tokio::test]
async fn bad_credentials_are_unauthenticated() {
  let app = app().await;
  register(&app, "alice").await;

  let (status, _) = login(&app, "alice", "wrong").await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  let (status, _) = login(&app, "nobody", "whatever").await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
  let app = app().await;
  let (status, body) = call(&app, "GET", "/auth/me", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "unauthenticated");

  let (status, _) = call(&app, "GET", "/auth/me", Some("not.a.token"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
  let app = app().await;
  register(&app, "alice").await;
  let (status, _) = call(
    &app,
    "POST",
    "/auth/register",
    None,
    Some(json!({
      "first_name": "Other",
      "last_name": "Person",
      "username": "alice",
      "email": "other@example.com",
      "phone_number": "tel:other",
      "password": "pw",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn logged_out_token_is_rejected() {
  let app = app().await;
  register(&app, "alice").await;
  let token = session(&app, "alice").await;

  let (status, _) = call(&app, "POST", "/auth/logout", Some(&token), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  // The token still verifies cryptographically but is no longer current.
  let (status, _) = call(&app, "GET", "/auth/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  let (status, _) = call(&app, "POST", "/auth/refresh", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_replaces_the_current_token() {
  let app = app().await;
  register(&app, "alice").await;
  let old = session(&app, "alice").await;

  let (status, body) = call(
    &app,
    "POST",
    "/auth/refresh",
    None,
    Some(json!({ "token": old })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let new = body["token"].as_str().unwrap().to_owned();
  assert_ne!(new, old);

  let (status, _) = call(&app, "GET", "/auth/me", Some(&old), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  let (status, _) = call(&app, "GET", "/auth/me", Some(&new), None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_token_is_a_bad_request() {
  let app = app().await;
  let (status, _) = call(&app, "POST", "/auth/refresh", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn new_login_supersedes_previous_token() {
  let app = app().await;
  register(&app, "alice").await;
  let first = session(&app, "alice").await;
  let second = session(&app, "alice").await;
  assert_ne!(first, second);

  let (status, _) = call(&app, "GET", "/auth/me", Some(&first), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  let (status, _) = call(&app, "GET", "/auth/me", Some(&second), None).await;
  assert_eq!(status, StatusCode::OK);
}

/// A 400 with a JSON `{"error": "..."}` body.
#[track_caller]
fn assert_invalid_input(status: StatusCode, body: &Value) {
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
  assert!(body["error"].is_string(), "not a JSON error body: {body}");
}

#[tokio::test]
async fn malformed_payloads_are_invalid_input() {
  let app = app().await;

  let (status, body) = call(
    &app,
    "POST",
    "/auth/register",
    None,
    Some(json!({ "username": "x" })),
  )
  .await;
  assert_invalid_input(status, &body);

  let (status, body) = call(
    &app,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "username": 5, "password": "pw" })),
  )
  .await;
  assert_invalid_input(status, &body);

  let (status, body) =
    call_raw(&app, "POST", "/auth/login", None, Some("{not json".to_owned())).await;
  assert_invalid_input(status, &body);

  // No content type at all.
  let req = Request::builder()
    .method("POST")
    .uri("/auth/login")
    .body(Body::from(r#"{"username":"a","password":"b"}"#))
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_ids_and_bodies_with_a_session_are_invalid_input() {
  let app = app().await;
  register(&app, "alice").await;
  let alice = session(&app, "alice").await;

  let (status, body) = call(
    &app,
    "POST",
    "/friends/request",
    Some(&alice),
    Some(json!({ "receiver_id": 0 })),
  )
  .await;
  assert_invalid_input(status, &body);

  let (status, body) = call(
    &app,
    "POST",
    "/friends/request",
    Some(&alice),
    Some(json!({ "receiver_id": "bob" })),
  )
  .await;
  assert_invalid_input(status, &body);

  for uri in ["/users/abc", "/users/0", "/users/-1"] {
    let (status, body) = call(&app, "GET", uri, Some(&alice), None).await;
    assert_invalid_input(status, &body);
  }

  let (status, body) = call(
    &app,
    "POST",
    "/messages/send",
    Some(&alice),
    Some(json!({ "conversation_id": "one", "content": "hi" })),
  )
  .await;
  assert_invalid_input(status, &body);

  let (status, body) =
    call(&app, "GET", "/search/users?query=a&limit=many", None, None).await;
  assert_invalid_input(status, &body);
}

// ─── Accounts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn accounts_are_self_only() {
  let app = app().await;
  let alice = register(&app, "alice").await;
  let bob = register(&app, "bob").await;
  let token = session(&app, "alice").await;

  let (status, _) = call(&app, "GET", &format!("/users/{bob}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call(&app, "DELETE", &format!("/users/{bob}"), Some(&token), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = call(
    &app,
    "PUT",
    &format!("/users/{alice}"),
    Some(&token),
    Some(json!({ "first_name": "Alicia" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["first_name"], "Alicia");
  assert_eq!(body["email"], "alice@example.com");
}

#[tokio::test]
async fn password_change_ends_the_session() {
  let app = app().await;
  let alice = register(&app, "alice").await;
  let token = session(&app, "alice").await;
  let uri = format!("/users/{alice}/password");

  let (status, _) = call(
    &app,
    "PUT",
    &uri,
    Some(&token),
    Some(json!({ "old_password": "wrong", "new_password": "fresh" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = call(
    &app,
    "PUT",
    &uri,
    Some(&token),
    Some(json!({ "old_password": "alice-password", "new_password": "fresh" })),
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _) = call(&app, "GET", "/auth/me", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  let (status, _) = login(&app, "alice", "alice-password").await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  let (status, _) = login(&app, "alice", "fresh").await;
  assert_eq!(status, StatusCode::OK);
}

// ─── Messages ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn only_the_sender_edits_or_deletes() {
  let app = app().await;
  register(&app, "alice").await;
  register(&app, "bob").await;
  let alice = session(&app, "alice").await;
  let bob = session(&app, "bob").await;

  let (status, msg) = call(
    &app,
    "POST",
    "/messages/send",
    Some(&alice),
    Some(json!({ "conversation_id": 7, "content": "helo" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let id = msg["id"].as_i64().unwrap();

  let edit = json!({ "content": "hello" });
  let uri = format!("/messages/{id}/edit");
  let (status, _) = call(&app, "PUT", &uri, Some(&bob), Some(edit.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, body) = call(&app, "PUT", &uri, Some(&alice), Some(edit)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["content"], "hello");

  let (status, list) = call(&app, "GET", "/messages/7", Some(&bob), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list.as_array().unwrap().len(), 1);

  let uri = format!("/messages/{id}");
  let (status, _) = call(&app, "DELETE", &uri, Some(&bob), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call(&app, "DELETE", &uri, Some(&alice), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&app, "DELETE", &uri, Some(&alice), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn marking_read_twice_changes_nothing() {
  let app = app().await;
  register(&app, "alice").await;
  let alice = session(&app, "alice").await;

  let (_, msg) = call(
    &app,
    "POST",
    "/messages/send",
    Some(&alice),
    Some(json!({ "conversation_id": 1, "content": "ping" })),
  )
  .await;
  let uri = format!("/messages/{}/read", msg["id"]);

  let (status, first) = call(&app, "POST", &uri, Some(&alice), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(first["changed"], true);

  let (status, second) = call(&app, "POST", &uri, Some(&alice), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(second["changed"], false);
  assert_eq!(second["read_at"], first["read_at"]);

  let (status, _) = call(&app, "POST", "/messages/999/read", Some(&alice), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Groups ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn group_owner_controls_the_group() {
  let app = app().await;
  register(&app, "alice").await;
  let bob_id = register(&app, "bob").await;
  let alice = session(&app, "alice").await;
  let bob = session(&app, "bob").await;

  let (status, group) = call(
    &app,
    "POST",
    "/groups/create",
    Some(&alice),
    Some(json!({ "name": "hikers" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let gid = group["id"].as_i64().unwrap();
  let uri = format!("/groups/{gid}");
  let members = format!("/groups/{gid}/members");

  let (status, _) = call(&app, "DELETE", &uri, Some(&bob), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call(
    &app,
    "POST",
    &members,
    Some(&bob),
    Some(json!({ "user_id": bob_id })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let add = json!({ "user_id": bob_id });
  let (status, _) = call(&app, "POST", &members, Some(&alice), Some(add.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, _) = call(&app, "POST", &members, Some(&alice), Some(add)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  let (status, _) = call(
    &app,
    "POST",
    &members,
    Some(&alice),
    Some(json!({ "user_id": 999 })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, detail) = call(&app, "GET", &uri, Some(&bob), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(detail["name"], "hikers");
  assert_eq!(detail["members"].as_array().unwrap().len(), 1);

  let (status, _) = call(&app, "DELETE", &uri, Some(&alice), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&app, "GET", &uri, Some(&alice), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn removing_absent_member_is_not_found() {
  let app = app().await;
  register(&app, "alice").await;
  let bob_id = register(&app, "bob").await;
  let alice = session(&app, "alice").await;

  let (_, group) = call(
    &app,
    "POST",
    "/groups/create",
    Some(&alice),
    Some(json!({ "name": "quiet" })),
  )
  .await;
  let uri = format!("/groups/{}/members/{bob_id}", group["id"]);
  let (status, _) = call(&app, "DELETE", &uri, Some(&alice), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Friends ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn friendship_lifecycle() {
  let app = app().await;
  let alice_id = register(&app, "alice").await;
  let bob_id = register(&app, "bob").await;
  let alice = session(&app, "alice").await;
  let bob = session(&app, "bob").await;

  let (status, request) = call(
    &app,
    "POST",
    "/friends/request",
    Some(&alice),
    Some(json!({ "receiver_id": bob_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(request["status"], "pending");
  let accept = format!("/friends/accept/{}", request["id"]);

  let (status, pending) = call(&app, "GET", "/friends/requests", Some(&bob), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(pending.as_array().unwrap().len(), 1);

  // Only the receiver may answer.
  let (status, _) = call(&app, "POST", &accept, Some(&alice), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, answered) = call(&app, "POST", &accept, Some(&bob), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(answered["status"], "accepted");

  let (_, alices) = call(&app, "GET", "/friends", Some(&alice), None).await;
  let (_, bobs) = call(&app, "GET", "/friends", Some(&bob), None).await;
  assert_eq!(alices[0]["friend_id"].as_u64(), Some(bob_id));
  assert_eq!(bobs[0]["friend_id"].as_u64(), Some(alice_id));

  // Terminal requests cannot be answered again.
  let (status, _) = call(&app, "POST", &accept, Some(&bob), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = call(
    &app,
    "POST",
    "/friends/request",
    Some(&alice),
    Some(json!({ "receiver_id": bob_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  // Removal drops only the caller's edge.
  let (status, _) = call(&app, "DELETE", &format!("/friends/{bob_id}"), Some(&alice), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (_, alices) = call(&app, "GET", "/friends", Some(&alice), None).await;
  let (_, bobs) = call(&app, "GET", "/friends", Some(&bob), None).await;
  assert!(alices.as_array().unwrap().is_empty());
  assert_eq!(bobs.as_array().unwrap().len(), 1);

  let (status, _) = call(&app, "DELETE", &format!("/friends/{bob_id}"), Some(&alice), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rejected_request_and_duplicates() {
  let app = app().await;
  register(&app, "alice").await;
  let bob_id = register(&app, "bob").await;
  let alice = session(&app, "alice").await;
  let bob = session(&app, "bob").await;
  let body = json!({ "receiver_id": bob_id });

  let (_, request) = call(&app, "POST", "/friends/request", Some(&alice), Some(body.clone())).await;
  let (status, _) = call(&app, "POST", "/friends/request", Some(&alice), Some(body)).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let reject = format!("/friends/reject/{}", request["id"]);
  let (status, answered) = call(&app, "DELETE", &reject, Some(&bob), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(answered["status"], "rejected");

  let (_, friends) = call(&app, "GET", "/friends", Some(&bob), None).await;
  assert!(friends.as_array().unwrap().is_empty());

  let (status, _) = call(&app, "POST", "/friends/accept/999", Some(&bob), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn self_request_is_invalid() {
  let app = app().await;
  let alice_id = register(&app, "alice").await;
  let alice = session(&app, "alice").await;

  let (status, _) = call(
    &app,
    "POST",
    "/friends/request",
    Some(&alice),
    Some(json!({ "receiver_id": alice_id })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Search ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_requires_a_query() {
  let app = app().await;
  register(&app, "alice").await;
  register(&app, "bob").await;

  let (status, _) = call(&app, "GET", "/search/users", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = call(&app, "GET", "/search/groups?query=%20", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, hits) = call(&app, "GET", "/search/users?query=ali", None, None).await;
  assert_eq!(status, StatusCode::OK);
  let hits = hits.as_array().unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0]["username"], "alice");

  let (status, hits) = call(&app, "GET", "/search/messages?query=x", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(hits.as_array().unwrap().is_empty());
}
