//! Bearer-token session extractor.
//!
//! A request is authenticated only when its token verifies (signature and
//! expiry) AND is still the account's current token. Logout, refresh and
//! password changes replace or clear the current token, so older tokens stop
//! working immediately even though they remain cryptographically valid.

use arcura_core::{Error, UserId, account::User, store::ChatStore};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};

use crate::{AppState, error::ApiError};

/// The authenticated caller. Present in a handler means the request carried
/// the account's current, unexpired token.
#[derive(Debug, Clone)]
pub struct Session {
  pub user: User,
}

impl Session {
  pub fn user_id(&self) -> UserId { self.user.id }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;
  if !scheme.eq_ignore_ascii_case("bearer") {
    return None;
  }
  let token = token.trim();
  (!token.is_empty()).then_some(token)
}

/// Run every session check against `token` and return the account it
/// belongs to.
///
/// Each failure is logged with its reason; the caller only ever sees
/// `Unauthenticated`.
pub async fn authenticate<S>(state: &AppState<S>, token: &str) -> Result<User, ApiError>
where
  S: ChatStore,
{
  let user_id = state.tokens.verify(token).map_err(|reason| {
    tracing::warn!(%reason, "rejected bearer token");
    Error::Unauthenticated
  })?;

  let Some(user) = state.store.get_user(user_id).await.map_err(ApiError::store)? else {
    tracing::warn!(%user_id, "token subject no longer exists");
    return Err(Error::Unauthenticated.into());
  };

  if !user.holds_token(token) {
    tracing::warn!(%user_id, "token is not the current session");
    return Err(Error::Unauthenticated.into());
  }

  Ok(user)
}

impl<S> FromRequestParts<AppState<S>> for Session
where
  S: ChatStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or_else(|| {
      tracing::warn!("missing or malformed authorization header");
      ApiError::from(Error::Unauthenticated)
    })?;
    let user = authenticate(state, token).await?;
    Ok(Session { user })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn bearer_token_parsing() {
    assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
    assert_eq!(bearer_token(&headers("bearer  abc ")), Some("abc"));
    assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
    assert_eq!(bearer_token(&headers("Bearer ")), None);
    assert_eq!(bearer_token(&headers("abc.def.ghi")), None);
    assert_eq!(bearer_token(&HeaderMap::new()), None);
  }
}
