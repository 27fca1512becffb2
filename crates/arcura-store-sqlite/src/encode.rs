//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and identities as their integer
//! rowids. Rows are first read into `Raw*` structs of primitive values inside
//! the database thread, then decoded into domain types outside it.

use arcura_core::{
  UserId,
  account::{StoredSession, User},
  friendship::{FriendRequest, FriendRequestStatus, Friendship},
  group::{Group, GroupMember},
  message::Message,
};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Identity ────────────────────────────────────────────────────────────────

pub fn decode_user_id(raw: i64) -> Result<UserId> {
  UserId::from_i64(raw).ok_or_else(|| Error::Corrupt(format!("invalid user id {raw}")))
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<FriendRequestStatus> {
  s.parse()
    .map_err(|_| Error::Corrupt(format!("unknown friend request status: {s:?}")))
}

// ─── LIKE patterns ───────────────────────────────────────────────────────────

/// Build a `%…%` pattern that matches `text` literally. Must be used with
/// `ESCAPE '\'`.
pub fn contains_pattern(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len() + 2);
  escaped.push('%');
  for c in text.trim().chars() {
    if matches!(c, '\\' | '%' | '_') {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped.push('%');
  escaped
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "id, first_name, last_name, username, email, phone_number,
   password_hash, token, token_expires_at, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:               i64,
  pub first_name:       String,
  pub last_name:        String,
  pub username:         String,
  pub email:            String,
  pub phone_number:     String,
  pub password_hash:    String,
  pub token:            Option<String>,
  pub token_expires_at: Option<String>,
  pub created_at:       String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      first_name:       row.get(1)?,
      last_name:        row.get(2)?,
      username:         row.get(3)?,
      email:            row.get(4)?,
      phone_number:     row.get(5)?,
      password_hash:    row.get(6)?,
      token:            row.get(7)?,
      token_expires_at: row.get(8)?,
      created_at:       row.get(9)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    let session = match (self.token, self.token_expires_at) {
      (Some(token), Some(at)) => Some(StoredSession {
        token,
        expires_at: decode_dt(&at)?,
      }),
      _ => None,
    };

    Ok(User {
      id: decode_user_id(self.id)?,
      first_name: self.first_name,
      last_name: self.last_name,
      username: self.username,
      email: self.email,
      phone_number: self.phone_number,
      password_hash: self.password_hash,
      session,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const MESSAGE_COLUMNS: &str =
  "id, conversation_id, sender_id, content, is_read, read_at, created_at, edited_at";

/// Raw values read directly from a `messages` row.
pub struct RawMessage {
  pub id:              i64,
  pub conversation_id: i64,
  pub sender_id:       i64,
  pub content:         String,
  pub is_read:         bool,
  pub read_at:         Option<String>,
  pub created_at:      String,
  pub edited_at:       Option<String>,
}

impl RawMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      conversation_id: row.get(1)?,
      sender_id:       row.get(2)?,
      content:         row.get(3)?,
      is_read:         row.get(4)?,
      read_at:         row.get(5)?,
      created_at:      row.get(6)?,
      edited_at:       row.get(7)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      id:              self.id,
      conversation_id: self.conversation_id,
      sender_id:       decode_user_id(self.sender_id)?,
      content:         self.content,
      is_read:         self.is_read,
      read_at:         decode_opt_dt(self.read_at)?,
      created_at:      decode_dt(&self.created_at)?,
      edited_at:       decode_opt_dt(self.edited_at)?,
    })
  }
}

pub const GROUP_COLUMNS: &str = "id, name, owner_id, created_at";

/// Raw values read directly from a `chat_groups` row.
pub struct RawGroup {
  pub id:         i64,
  pub name:       String,
  pub owner_id:   i64,
  pub created_at: String,
}

impl RawGroup {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      owner_id:   row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_group(self) -> Result<Group> {
    Ok(Group {
      id:         self.id,
      name:       self.name,
      owner_id:   decode_user_id(self.owner_id)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `group_members` row.
pub struct RawMember {
  pub id:        i64,
  pub group_id:  i64,
  pub user_id:   i64,
  pub joined_at: String,
}

impl RawMember {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      group_id:  row.get(1)?,
      user_id:   row.get(2)?,
      joined_at: row.get(3)?,
    })
  }

  pub fn into_member(self) -> Result<GroupMember> {
    Ok(GroupMember {
      id:        self.id,
      group_id:  self.group_id,
      user_id:   decode_user_id(self.user_id)?,
      joined_at: decode_dt(&self.joined_at)?,
    })
  }
}

pub const REQUEST_COLUMNS: &str =
  "id, sender_id, receiver_id, status, created_at, updated_at";

/// Raw values read directly from a `friend_requests` row.
pub struct RawFriendRequest {
  pub id:          i64,
  pub sender_id:   i64,
  pub receiver_id: i64,
  pub status:      String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawFriendRequest {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      sender_id:   row.get(1)?,
      receiver_id: row.get(2)?,
      status:      row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  pub fn into_request(self) -> Result<FriendRequest> {
    Ok(FriendRequest {
      id:          self.id,
      sender_id:   decode_user_id(self.sender_id)?,
      receiver_id: decode_user_id(self.receiver_id)?,
      status:      decode_status(&self.status)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `friendships` row.
pub struct RawFriendship {
  pub id:         i64,
  pub user_id:    i64,
  pub friend_id:  i64,
  pub created_at: String,
}

impl RawFriendship {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      user_id:    row.get(1)?,
      friend_id:  row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_friendship(self) -> Result<Friendship> {
    Ok(Friendship {
      id:         self.id,
      user_id:    decode_user_id(self.user_id)?,
      friend_id:  decode_user_id(self.friend_id)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn like_pattern_escapes_wildcards() {
    assert_eq!(contains_pattern("  ab "), "%ab%");
    assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
  }
}
