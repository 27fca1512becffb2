//! Handlers for `/friends` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`   | `/friends/request` | Body: `{"receiver_id":2}` |
//! | `GET`    | `/friends/requests` | Pending requests addressed to the caller |
//! | `GET`    | `/friends` | The caller's outgoing edges |
//! | `POST`   | `/friends/accept/{request_id}` | Receiver only |
//! | `DELETE` | `/friends/reject/{request_id}` | Receiver only |
//! | `DELETE` | `/friends/{friend_id}` | Removes the caller's edge only |

use arcura_core::{
  Error, UserId,
  friendship::{Answer, FriendRequest, FriendRequestId, Friendship},
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

#[derive(Debug, Deserialize)]
pub struct RequestBody {
  pub receiver_id: UserId,
}

/// `POST /friends/request`
pub async fn send_request<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiJson(body): ApiJson<RequestBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ChatStore + 'static,
{
  let request = state
    .store
    .create_friend_request(session.user_id(), body.receiver_id)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    request_id = request.id,
    sender = %request.sender_id,
    receiver = %request.receiver_id,
    "friend request sent"
  );
  Ok((StatusCode::CREATED, Json(request)))
}

/// `GET /friends/requests`
pub async fn pending<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Vec<FriendRequest>>, ApiError>
where
  S: ChatStore + 'static,
{
  let requests = state
    .store
    .pending_requests_for(session.user_id())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(requests))
}

/// `GET /friends`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Vec<Friendship>>, ApiError>
where
  S: ChatStore + 'static,
{
  let friends = state
    .store
    .list_friendships(session.user_id())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(friends))
}

/// Load the request, let the state machine validate the caller's answer, then
/// have the store apply the result in one transaction.
async fn answer<S: ChatStore>(
  state: &AppState<S>,
  session: &Session,
  request_id: FriendRequestId,
  answer: Answer,
) -> Result<FriendRequest, ApiError> {
  let request = state
    .store
    .get_friend_request(request_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::from(Error::not_found("friend request")))?;

  let resolution = request.decide(session.user_id(), answer)?;
  let updated = state
    .store
    .apply_resolution(resolution)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(request_id, status = %updated.status, "friend request answered");
  Ok(updated)
}

/// `POST /friends/accept/{request_id}`
pub async fn accept<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(request_id): ApiPath<FriendRequestId>,
) -> Result<Json<FriendRequest>, ApiError>
where
  S: ChatStore + 'static,
{
  Ok(Json(answer(&state, &session, request_id, Answer::Accept).await?))
}

/// `DELETE /friends/reject/{request_id}`
pub async fn reject<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(request_id): ApiPath<FriendRequestId>,
) -> Result<Json<FriendRequest>, ApiError>
where
  S: ChatStore + 'static,
{
  Ok(Json(answer(&state, &session, request_id, Answer::Reject).await?))
}

/// `DELETE /friends/{friend_id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(friend_id): ApiPath<UserId>,
) -> Result<StatusCode, ApiError>
where
  S: ChatStore + 'static,
{
  if !state
    .store
    .remove_friendship(session.user_id(), friend_id)
    .await
    .map_err(ApiError::store)?
  {
    return Err(Error::not_found("friendship").into());
  }
  Ok(StatusCode::NO_CONTENT)
}
