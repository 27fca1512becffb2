//! Chat messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

pub type MessageId = i64;
pub type ConversationId = i64;

/// A message in a conversation. Only the sender may edit or delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id:              MessageId,
  pub conversation_id: ConversationId,
  pub sender_id:       UserId,
  pub content:         String,
  pub is_read:         bool,
  /// Set exactly once, when `is_read` first becomes `true`.
  pub read_at:         Option<DateTime<Utc>>,
  pub created_at:      DateTime<Utc>,
  pub edited_at:       Option<DateTime<Utc>>,
}

/// Input to [`crate::store::ChatStore::create_message`].
#[derive(Debug, Clone)]
pub struct NewMessage {
  pub conversation_id: ConversationId,
  pub sender_id:       UserId,
  pub content:         String,
}

/// Outcome of marking a message as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReadReceipt {
  /// The message went from unread to read at this instant.
  Marked { read_at: DateTime<Utc> },
  /// The message was already read; nothing changed.
  AlreadyRead { read_at: Option<DateTime<Utc>> },
}

impl ReadReceipt {
  pub fn changed(&self) -> bool { matches!(self, Self::Marked { .. }) }

  pub fn read_at(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Marked { read_at } => Some(*read_at),
      Self::AlreadyRead { read_at } => *read_at,
    }
  }
}
