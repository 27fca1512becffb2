//! Handlers for `/messages` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`   | `/messages/send` | Body: `{"conversation_id":1,"content":"hi"}` |
//! | `GET`    | `/messages/{id}` | `id` is a conversation id; oldest first |
//! | `PUT`    | `/messages/{id}/edit` | Sender only |
//! | `DELETE` | `/messages/{id}` | Sender only |
//! | `POST`   | `/messages/{id}/read` | Idempotent |

use arcura_core::{
  Error,
  message::{ConversationId, Message, MessageId, NewMessage},
  policy,
  store::ChatStore,
};
use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::Session,
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

async fn load_message<S: ChatStore>(
  state: &AppState<S>,
  id: MessageId,
) -> Result<Message, ApiError> {
  state
    .store
    .get_message(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| Error::not_found("message").into())
}

// ─── Send ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendBody {
  pub conversation_id: ConversationId,
  pub content:         String,
}

/// `POST /messages/send`
pub async fn send<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiJson(body): ApiJson<SendBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ChatStore + 'static,
{
  if body.content.trim().is_empty() {
    return Err(ApiError::bad_request("content must not be empty"));
  }
  let message = state
    .store
    .create_message(NewMessage {
      conversation_id: body.conversation_id,
      sender_id:       session.user_id(),
      content:         body.content,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(message)))
}

// ─── Conversation ─────────────────────────────────────────────────────────────

/// `GET /messages/{id}`
pub async fn conversation<S>(
  State(state): State<AppState<S>>,
  _session: Session,
  ApiPath(conversation_id): ApiPath<ConversationId>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: ChatStore + 'static,
{
  let messages = state
    .store
    .list_conversation(conversation_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(messages))
}

// ─── Edit / delete ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EditBody {
  pub content: String,
}

/// `PUT /messages/{id}/edit`
pub async fn edit<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(id): ApiPath<MessageId>,
  ApiJson(body): ApiJson<EditBody>,
) -> Result<Json<Message>, ApiError>
where
  S: ChatStore + 'static,
{
  let message = load_message(&state, id).await?;
  policy::authorize(session.user_id(), &message)?;
  if body.content.trim().is_empty() {
    return Err(ApiError::bad_request("content must not be empty"));
  }

  let edited = state
    .store
    .edit_message(id, body.content)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::from(Error::not_found("message")))?;
  Ok(Json(edited))
}

/// `DELETE /messages/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  session: Session,
  ApiPath(id): ApiPath<MessageId>,
) -> Result<StatusCode, ApiError>
where
  S: ChatStore + 'static,
{
  let message = load_message(&state, id).await?;
  policy::authorize(session.user_id(), &message)?;

  if !state.store.delete_message(id).await.map_err(ApiError::store)? {
    return Err(Error::not_found("message").into());
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Read receipts ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadResponse {
  pub message_id: MessageId,
  /// `false` when the message was already read.
  pub changed:    bool,
  pub read_at:    Option<DateTime<Utc>>,
}

/// `POST /messages/{id}/read`
pub async fn mark_read<S>(
  State(state): State<AppState<S>>,
  _session: Session,
  ApiPath(id): ApiPath<MessageId>,
) -> Result<Json<ReadResponse>, ApiError>
where
  S: ChatStore + 'static,
{
  let receipt = state
    .store
    .mark_read(id, Utc::now())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::from(Error::not_found("message")))?;

  Ok(Json(ReadResponse {
    message_id: id,
    changed:    receipt.changed(),
    read_at:    receipt.read_at(),
  }))
}
