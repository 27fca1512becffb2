//! Handlers for `/groups` endpoints. Every mutation authorizes against the
//! group's owner.

use arcura_core::{
  Error, UserId,
  group::{Group, GroupDetail, GroupId},
  policy,
  store::ChatStore,
};
use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::Session,
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

async fn load_group<S: ChatStore>(state: &AppState<S>, id: GroupId) -> Result<Group, ApiError> {
  state
    .store
    .get_group(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| Error::not_found("group").into())
}

#[derive(Debug, Deserialize)]
pub struct NameBody {
  pub name: String,
}

impl NameBody {
  fn into_name(self) -> Result<String, ApiError> {
    let name = self.name.trim();
    if name.is_empty() {
      return Err(ApiError::bad_request("name must not be empty"));
    }
    Ok(name.to_owned())
  }
}

/// `POST /groups/create`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiJson(body): ApiJson<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ChatStore + 'static,
{
  let name = body.into_name()?;
  let group = state
    .store
    .create_group(name, session.user_id())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(group)))
}

/// `GET /groups/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _session: Session,
  ApiPath(id): ApiPath<GroupId>,
) -> Result<Json<GroupDetail>, ApiError>
where
  S: ChatStore + 'static,
{
  let group = load_group(&state, id).await?;
  let members = state.store.list_members(id).await.map_err(ApiError::store)?;
  Ok(Json(GroupDetail { group, members }))
}

/// `PUT /groups/{id}`
pub async fn rename<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(id): ApiPath<GroupId>,
  ApiJson(body): ApiJson<NameBody>,
) -> Result<Json<Group>, ApiError>
where
  S: ChatStore + 'static,
{
  let group = load_group(&state, id).await?;
  policy::authorize(session.user_id(), &group)?;
  let name = body.into_name()?;

  let renamed = state
    .store
    .rename_group(id, name)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::from(Error::not_found("group")))?;
  Ok(Json(renamed))
}

/// `DELETE /groups/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(id): ApiPath<GroupId>,
) -> Result<StatusCode, ApiError>
where
  S: ChatStore + 'static,
{
  let group = load_group(&state, id).await?;
  policy::authorize(session.user_id(), &group)?;

  if !state.store.delete_group(id).await.map_err(ApiError::store)? {
    return Err(Error::not_found("group").into());
  }
  tracing::info!(group_id = id, "deleted group");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Members ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MemberBody {
  pub user_id: UserId,
}

/// `POST /groups/{id}/members`
pub async fn add_member<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(id): ApiPath<GroupId>,
  ApiJson(body): ApiJson<MemberBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ChatStore + 'static,
{
  let group = load_group(&state, id).await?;
  policy::authorize(session.user_id(), &group)?;

  if state
    .store
    .get_user(body.user_id)
    .await
    .map_err(ApiError::store)?
    .is_none()
  {
    return Err(Error::not_found("user").into());
  }

  let member = state
    .store
    .add_member(id, body.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(member)))
}

/// `DELETE /groups/{id}/members/{user_id}`
pub async fn remove_member<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath((id, user_id)): ApiPath<(GroupId, UserId)>,
) -> Result<StatusCode, ApiError>
where
  S: ChatStore + 'static,
{
  let group = load_group(&state, id).await?;
  policy::authorize(session.user_id(), &group)?;

  if !state
    .store
    .remove_member(id, user_id)
    .await
    .map_err(ApiError::store)?
  {
    return Err(Error::not_found("group member").into());
  }
  Ok(StatusCode::NO_CONTENT)
}
