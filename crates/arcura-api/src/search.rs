//! Handlers for `GET /search/{users,groups,messages}?query=...`.
//!
//! The query text is matched literally as a substring; `limit` and `offset`
//! page through results ordered by id.

use arcura_core::{
  account::Profile,
  group::Group,
  message::Message,
  store::{ChatStore, SearchQuery},
};
use axum::{
  Json,
  extract::State,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError, extract::ApiQuery};

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
  pub query:  Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl SearchParams {
  fn into_query(self) -> Result<SearchQuery, ApiError> {
    let text = self.query.unwrap_or_default();
    if text.trim().is_empty() {
      return Err(ApiError::bad_request("query parameter is required"));
    }
    Ok(SearchQuery { text, limit: self.limit, offset: self.offset })
  }
}

/// `GET /search/users?query=...` — matches username or email.
pub async fn users<S>(
  State(state): State<AppState<S>>,
  ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<Profile>>, ApiError>
where
  S: ChatStore + 'static,
{
  let query = params.into_query()?;
  let users = state
    .store
    .search_users(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(users.iter().map(|u| u.profile()).collect()))
}

/// `GET /search/groups?query=...`
pub async fn groups<S>(
  State(state): State<AppState<S>>,
  ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<Group>>, ApiError>
where
  S: ChatStore + 'static,
{
  let query = params.into_query()?;
  let groups = state
    .store
    .search_groups(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(groups))
}

/// `GET /search/messages?query=...`
pub async fn messages<S>(
  State(state): State<AppState<S>>,
  ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: ChatStore + 'static,
{
  let query = params.into_query()?;
  let messages = state
    .store
    .search_messages(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(messages))
}
