//! Handlers for account and session endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | 201 with the new profile |
//! | `POST` | `/auth/login` | `{"username","password"}` → `{"token","expiresAt"}` |
//! | `POST` | `/auth/logout` | Clears the current token |
//! | `POST` | `/auth/refresh` | Bearer header or `{"token"}` body |
//! | `GET`  | `/auth/me`, `/profile` | The caller's profile |
//! | `GET`/`PUT`/`DELETE` | `/users/{id}` | Self only |
//! | `PUT`  | `/users/{id}/password` | Self only; ends the current session |

use arcura_core::{
  Error, UserId,
  account::{NewUser, Profile, StoredSession, User, UserUpdate},
  policy,
  store::ChatStore,
};
use arcura_credentials::{IssuedToken, password};
use axum::{
  Json,
  body::Bytes,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{Session, authenticate, bearer_token},
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

// ─── Password hashing off the async runtime ──────────────────────────────────

async fn hash_password(secret: String) -> Result<String, ApiError> {
  tokio::task::spawn_blocking(move || password::hash(&secret))
    .await
    .map_err(ApiError::internal)?
    .map_err(ApiError::internal)
}

async fn verify_password(digest: String, secret: String) -> Result<bool, ApiError> {
  tokio::task::spawn_blocking(move || password::verify(&digest, &secret))
    .await
    .map_err(ApiError::internal)?
    .map_err(ApiError::internal)
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
  if value.trim().is_empty() {
    return Err(ApiError::bad_request(format!("{field} must not be empty")));
  }
  Ok(())
}

// ─── Token response ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
  pub token:      String,
  #[serde(rename = "expiresAt")]
  pub expires_at: DateTime<Utc>,
}

/// Make `issued` the account's only valid token.
async fn start_session<S: ChatStore>(
  state: &AppState<S>,
  issued: IssuedToken,
) -> Result<TokenResponse, ApiError> {
  state
    .store
    .set_session(issued.subject, Some(StoredSession {
      token:      issued.token.clone(),
      expires_at: issued.expires_at,
    }))
    .await
    .map_err(ApiError::store)?;
  Ok(TokenResponse { token: issued.token, expires_at: issued.expires_at })
}

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub first_name:   String,
  pub last_name:    String,
  pub username:     String,
  pub email:        String,
  pub phone_number: String,
  pub password:     String,
}

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ChatStore + 'static,
{
  require("first_name", &body.first_name)?;
  require("last_name", &body.last_name)?;
  require("username", &body.username)?;
  require("email", &body.email)?;
  require("phone_number", &body.phone_number)?;
  if body.password.is_empty() {
    return Err(ApiError::bad_request("password must not be empty"));
  }

  let password_hash = hash_password(body.password).await?;
  let user = state
    .store
    .create_user(NewUser {
      first_name: body.first_name.trim().to_owned(),
      last_name: body.last_name.trim().to_owned(),
      username: body.username.trim().to_owned(),
      email: body.email.trim().to_owned(),
      phone_number: body.phone_number.trim().to_owned(),
      password_hash,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(user_id = %user.id, "registered account");
  Ok((StatusCode::CREATED, Json(user.profile())))
}

// ─── Login / logout / refresh ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<LoginBody>,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: ChatStore + 'static,
{
  let Some(user) = state
    .store
    .find_user_by_username(body.username.trim())
    .await
    .map_err(ApiError::store)?
  else {
    tracing::warn!("login for unknown username");
    return Err(Error::Unauthenticated.into());
  };

  if !verify_password(user.password_hash, body.password).await? {
    tracing::warn!(user_id = %user.id, "login with wrong password");
    return Err(Error::Unauthenticated.into());
  }

  let issued = state.tokens.issue(user.id).map_err(ApiError::internal)?;
  let response = start_session(&state, issued).await?;
  tracing::info!(user_id = %user.id, "logged in");
  Ok(Json(response))
}

/// `POST /auth/logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<StatusCode, ApiError>
where
  S: ChatStore + 'static,
{
  state
    .store
    .set_session(session.user_id(), None)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(user_id = %session.user_id(), "logged out");
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RefreshBody {
  pub token: String,
}

/// `POST /auth/refresh`
///
/// The presented token must pass the same checks as any protected route,
/// so a token that was already replaced or logged out cannot be refreshed.
pub async fn refresh<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: ChatStore + 'static,
{
  let presented = match bearer_token(&headers) {
    Some(token) => token.to_owned(),
    None => {
      serde_json::from_slice::<RefreshBody>(&body)
        .map_err(|_| ApiError::bad_request("token is required"))?
        .token
    }
  };

  let user = authenticate(&state, &presented).await?;
  let issued = state.tokens.refresh(&presented).map_err(|e| {
    tracing::warn!(user_id = %user.id, error = %e, "refresh rejected");
    ApiError::from(Error::Unauthenticated)
  })?;
  let response = start_session(&state, issued).await?;
  tracing::info!(user_id = %user.id, "refreshed session");
  Ok(Json(response))
}

// ─── Own profile ─────────────────────────────────────────────────────────────

/// `GET /auth/me` and `GET /profile`
pub async fn me(session: Session) -> Json<Profile> { Json(session.user.profile()) }

// ─── /users/{id} ─────────────────────────────────────────────────────────────

async fn load_user<S: ChatStore>(state: &AppState<S>, id: UserId) -> Result<User, ApiError> {
  state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| Error::not_found("user").into())
}

/// `GET /users/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(id): ApiPath<UserId>,
) -> Result<Json<Profile>, ApiError>
where
  S: ChatStore + 'static,
{
  policy::authorize(session.user_id(), &id)?;
  let user = load_user(&state, id).await?;
  Ok(Json(user.profile()))
}

/// `PUT /users/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(id): ApiPath<UserId>,
  ApiJson(body): ApiJson<UserUpdate>,
) -> Result<Json<Profile>, ApiError>
where
  S: ChatStore + 'static,
{
  policy::authorize(session.user_id(), &id)?;
  if body.is_empty() {
    return Err(ApiError::bad_request("no fields to update"));
  }
  body.validate()?;

  let user = state
    .store
    .update_user(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::from(Error::not_found("user")))?;
  Ok(Json(user.profile()))
}

/// `DELETE /users/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(id): ApiPath<UserId>,
) -> Result<StatusCode, ApiError>
where
  S: ChatStore + 'static,
{
  policy::authorize(session.user_id(), &id)?;
  if !state.store.delete_user(id).await.map_err(ApiError::store)? {
    return Err(Error::not_found("user").into());
  }
  tracing::info!(user_id = %id, "deleted account");
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
  pub old_password: String,
  pub new_password: String,
}

/// `PUT /users/{id}/password`
///
/// A successful change clears the current token; the caller must log in
/// again with the new password.
pub async fn change_password<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(id): ApiPath<UserId>,
  ApiJson(body): ApiJson<PasswordChange>,
) -> Result<StatusCode, ApiError>
where
  S: ChatStore + 'static,
{
  policy::authorize(session.user_id(), &id)?;
  if body.new_password.is_empty() {
    return Err(ApiError::bad_request("new_password must not be empty"));
  }

  let digest = session.user.password_hash.clone();
  if !verify_password(digest, body.old_password).await? {
    tracing::warn!(user_id = %id, "password change with wrong old password");
    return Err(Error::Unauthenticated.into());
  }

  let password_hash = hash_password(body.new_password).await?;
  state
    .store
    .set_password_hash(id, password_hash)
    .await
    .map_err(ApiError::store)?;
  state.store.set_session(id, None).await.map_err(ApiError::store)?;

  tracing::info!(user_id = %id, "password changed, session ended");
  Ok(StatusCode::NO_CONTENT)
}
