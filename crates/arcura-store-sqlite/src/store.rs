//! [`SqliteStore`] — the SQLite implementation of [`ChatStore`].

use std::path::Path;

use arcura_core::{
  UserId,
  account::{NewUser, StoredSession, User, UserUpdate},
  friendship::{
    FriendRequest, FriendRequestId, Friendship, Resolution, admit_request,
  },
  group::{Group, GroupId, GroupMember},
  message::{ConversationId, Message, MessageId, NewMessage, ReadReceipt},
  store::{ChatStore, SearchQuery},
};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior, types::Value};

use crate::{
  Error, Result,
  encode::{
    GROUP_COLUMNS, MESSAGE_COLUMNS, REQUEST_COLUMNS, RawFriendRequest,
    RawFriendship, RawGroup, RawMember, RawMessage, RawUser, USER_COLUMNS,
    contains_pattern, decode_dt, decode_status, decode_user_id, encode_dt,
  },
  error::{conflict_on_unique, is_unique_rusqlite},
  schema::SCHEMA,
};

const DEFAULT_SEARCH_LIMIT: usize = 100;

type RowMapper<T> = fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Arcura chat store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a query and map every row.
  async fn select_all<T>(
    &self,
    sql: String,
    args: Vec<Value>,
    map: RowMapper<T>,
  ) -> Result<Vec<T>>
  where
    T: Send + 'static,
  {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), map)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// Run a query expected to match at most one row.
  async fn select_one<T>(
    &self,
    sql: String,
    args: Vec<Value>,
    map: RowMapper<T>,
  ) -> Result<Option<T>>
  where
    T: Send + 'static,
  {
    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(args), map)
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  /// Run a single data-modifying statement and return the changed row count.
  async fn execute(&self, sql: &'static str, args: Vec<Value>) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, rusqlite::params_from_iter(args))?))
      .await?;
    Ok(changed)
  }

  async fn search<T>(
    &self,
    select: &str,
    filter: &str,
    query: &SearchQuery,
    map: RowMapper<T>,
  ) -> Result<Vec<T>>
  where
    T: Send + 'static,
  {
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT) as i64;
    let offset = query.offset.unwrap_or(0) as i64;
    let sql = format!("{select} WHERE {filter} ORDER BY id LIMIT ?2 OFFSET ?3");
    self
      .select_all(
        sql,
        vec![
          Value::Text(contains_pattern(&query.text)),
          Value::Integer(limit),
          Value::Integer(offset),
        ],
        map,
      )
      .await
  }
}

fn exists(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, params, |_| Ok(())).optional()?.is_some())
}

fn uid(id: UserId) -> Value { Value::Integer(id.to_i64()) }

fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

fn opt_text(s: Option<String>) -> Value { s.map_or(Value::Null, Value::Text) }

// ─── ChatStore impl ──────────────────────────────────────────────────────────

impl ChatStore for SqliteStore {
  type Error = Error;

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let row = input.clone();

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             first_name, last_name, username, email, phone_number,
             password_hash, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            row.first_name,
            row.last_name,
            row.username,
            row.email,
            row.phone_number,
            row.password_hash,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| {
        conflict_on_unique(e, "username, email or phone number is already registered")
      })?;

    Ok(User {
      id: decode_user_id(id)?,
      first_name: input.first_name,
      last_name: input.last_name,
      username: input.username,
      email: input.email,
      phone_number: input.phone_number,
      password_hash: input.password_hash,
      session: None,
      created_at,
    })
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    self
      .select_one(
        format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        vec![uid(id)],
        RawUser::from_row,
      )
      .await?
      .map(RawUser::into_user)
      .transpose()
  }

  async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
    self
      .select_one(
        format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
        vec![text(username)],
        RawUser::from_row,
      )
      .await?
      .map(RawUser::into_user)
      .transpose()
  }

  async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET
             first_name   = COALESCE(?1, first_name),
             last_name    = COALESCE(?2, last_name),
             email        = COALESCE(?3, email),
             phone_number = COALESCE(?4, phone_number)
           WHERE id = ?5",
          rusqlite::params![
            update.first_name,
            update.last_name,
            update.email,
            update.phone_number,
            id.to_i64(),
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
              rusqlite::params![id.to_i64()],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(|e| conflict_on_unique(e, "email or phone number is already registered"))?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn set_password_hash(&self, id: UserId, password_hash: String) -> Result<()> {
    let changed = self
      .execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        vec![text(password_hash), uid(id)],
      )
      .await?;
    if changed == 0 {
      return Err(arcura_core::Error::not_found("user").into());
    }
    Ok(())
  }

  async fn delete_user(&self, id: UserId) -> Result<bool> {
    let changed = self
      .execute("DELETE FROM users WHERE id = ?1", vec![uid(id)])
      .await?;
    Ok(changed > 0)
  }

  async fn set_session(&self, id: UserId, session: Option<StoredSession>) -> Result<()> {
    let (token, expires_at) = match session {
      Some(s) => (Some(s.token), Some(encode_dt(s.expires_at))),
      None => (None, None),
    };
    let changed = self
      .execute(
        "UPDATE users SET token = ?1, token_expires_at = ?2 WHERE id = ?3",
        vec![opt_text(token), opt_text(expires_at), uid(id)],
      )
      .await?;
    if changed == 0 {
      return Err(arcura_core::Error::not_found("user").into());
    }
    Ok(())
  }

  async fn search_users(&self, query: &SearchQuery) -> Result<Vec<User>> {
    self
      .search(
        &format!("SELECT {USER_COLUMNS} FROM users"),
        "username LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\'",
        query,
        RawUser::from_row,
      )
      .await?
      .into_iter()
      .map(RawUser::into_user)
      .collect()
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn create_message(&self, input: NewMessage) -> Result<Message> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let content = input.content.clone();

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO messages (conversation_id, sender_id, content, is_read, created_at)
           VALUES (?1, ?2, ?3, 0, ?4)",
          rusqlite::params![
            input.conversation_id,
            input.sender_id.to_i64(),
            content,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Message {
      id,
      conversation_id: input.conversation_id,
      sender_id: input.sender_id,
      content: input.content,
      is_read: false,
      read_at: None,
      created_at,
      edited_at: None,
    })
  }

  async fn get_message(&self, id: MessageId) -> Result<Option<Message>> {
    self
      .select_one(
        format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
        vec![Value::Integer(id)],
        RawMessage::from_row,
      )
      .await?
      .map(RawMessage::into_message)
      .transpose()
  }

  async fn list_conversation(&self, conversation_id: ConversationId) -> Result<Vec<Message>> {
    self
      .select_all(
        format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1 ORDER BY id"
        ),
        vec![Value::Integer(conversation_id)],
        RawMessage::from_row,
      )
      .await?
      .into_iter()
      .map(RawMessage::into_message)
      .collect()
  }

  async fn edit_message(&self, id: MessageId, content: String) -> Result<Option<Message>> {
    let edited_at = encode_dt(Utc::now());
    let changed = self
      .execute(
        "UPDATE messages SET content = ?1, edited_at = ?2 WHERE id = ?3",
        vec![text(content), text(edited_at), Value::Integer(id)],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.get_message(id).await
  }

  async fn delete_message(&self, id: MessageId) -> Result<bool> {
    let changed = self
      .execute("DELETE FROM messages WHERE id = ?1", vec![Value::Integer(id)])
      .await?;
    Ok(changed > 0)
  }

  async fn mark_read(&self, id: MessageId, at: DateTime<Utc>) -> Result<Option<ReadReceipt>> {
    let at_str = encode_dt(at);

    // The conditional UPDATE makes the unread → read flip happen at most once
    // even under concurrent calls.
    let outcome: Option<(bool, Option<String>)> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE messages SET is_read = 1, read_at = ?1 WHERE id = ?2 AND is_read = 0",
          rusqlite::params![at_str, id],
        )?;
        if changed > 0 {
          return Ok(Some((true, None)));
        }
        let existing: Option<Option<String>> = conn
          .query_row(
            "SELECT read_at FROM messages WHERE id = ?1",
            rusqlite::params![id],
            |r| r.get(0),
          )
          .optional()?;
        Ok(existing.map(|read_at| (false, read_at)))
      })
      .await?;

    match outcome {
      None => Ok(None),
      Some((true, _)) => Ok(Some(ReadReceipt::Marked { read_at: at })),
      Some((false, read_at)) => Ok(Some(ReadReceipt::AlreadyRead {
        read_at: read_at.as_deref().map(decode_dt).transpose()?,
      })),
    }
  }

  async fn search_messages(&self, query: &SearchQuery) -> Result<Vec<Message>> {
    self
      .search(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages"),
        "content LIKE ?1 ESCAPE '\\'",
        query,
        RawMessage::from_row,
      )
      .await?
      .into_iter()
      .map(RawMessage::into_message)
      .collect()
  }

  // ── Groups ────────────────────────────────────────────────────────────────

  async fn create_group(&self, name: String, owner_id: UserId) -> Result<Group> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let row_name = name.clone();

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO chat_groups (name, owner_id, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![row_name, owner_id.to_i64(), at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Group { id, name, owner_id, created_at })
  }

  async fn get_group(&self, id: GroupId) -> Result<Option<Group>> {
    self
      .select_one(
        format!("SELECT {GROUP_COLUMNS} FROM chat_groups WHERE id = ?1"),
        vec![Value::Integer(id)],
        RawGroup::from_row,
      )
      .await?
      .map(RawGroup::into_group)
      .transpose()
  }

  async fn list_members(&self, group_id: GroupId) -> Result<Vec<GroupMember>> {
    self
      .select_all(
        "SELECT id, group_id, user_id, joined_at FROM group_members
         WHERE group_id = ?1 ORDER BY id"
          .to_owned(),
        vec![Value::Integer(group_id)],
        RawMember::from_row,
      )
      .await?
      .into_iter()
      .map(RawMember::into_member)
      .collect()
  }

  async fn rename_group(&self, id: GroupId, name: String) -> Result<Option<Group>> {
    let changed = self
      .execute(
        "UPDATE chat_groups SET name = ?1 WHERE id = ?2",
        vec![text(name), Value::Integer(id)],
      )
      .await?;
    if changed == 0 {
      return Ok(None);
    }
    self.get_group(id).await
  }

  async fn delete_group(&self, id: GroupId) -> Result<bool> {
    // Member rows go with the group via ON DELETE CASCADE.
    let changed = self
      .execute("DELETE FROM chat_groups WHERE id = ?1", vec![Value::Integer(id)])
      .await?;
    Ok(changed > 0)
  }

  async fn add_member(&self, group_id: GroupId, user_id: UserId) -> Result<GroupMember> {
    let joined_at = Utc::now();
    let at_str = encode_dt(joined_at);

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![group_id, user_id.to_i64(), at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| conflict_on_unique(e, "user is already a member of this group"))?;

    Ok(GroupMember { id, group_id, user_id, joined_at })
  }

  async fn remove_member(&self, group_id: GroupId, user_id: UserId) -> Result<bool> {
    let changed = self
      .execute(
        "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
        vec![Value::Integer(group_id), uid(user_id)],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn search_groups(&self, query: &SearchQuery) -> Result<Vec<Group>> {
    self
      .search(
        &format!("SELECT {GROUP_COLUMNS} FROM chat_groups"),
        "name LIKE ?1 ESCAPE '\\'",
        query,
        RawGroup::from_row,
      )
      .await?
      .into_iter()
      .map(RawGroup::into_group)
      .collect()
  }

  // ── Friend requests and friendships ───────────────────────────────────────

  async fn create_friend_request(
    &self,
    sender_id: UserId,
    receiver_id: UserId,
  ) -> Result<FriendRequest> {
    let at_str = encode_dt(Utc::now());

    let raw: std::result::Result<RawFriendRequest, arcura_core::Error> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (s, r) = (sender_id.to_i64(), receiver_id.to_i64());

        if !exists(&tx, "SELECT 1 FROM users WHERE id = ?1", rusqlite::params![r])? {
          return Ok(Err(arcura_core::Error::not_found("user")));
        }
        let already_friends = exists(
          &tx,
          "SELECT 1 FROM friendships WHERE user_id = ?1 AND friend_id = ?2",
          rusqlite::params![s, r],
        )?;
        let pending_exists = exists(
          &tx,
          "SELECT 1 FROM friend_requests
           WHERE sender_id = ?1 AND receiver_id = ?2 AND status = 'pending'",
          rusqlite::params![s, r],
        )?;
        if let Err(e) = admit_request(sender_id, receiver_id, already_friends, pending_exists) {
          return Ok(Err(e));
        }

        let inserted = tx.execute(
          "INSERT INTO friend_requests (sender_id, receiver_id, status, created_at, updated_at)
           VALUES (?1, ?2, 'pending', ?3, ?3)",
          rusqlite::params![s, r, at_str],
        );
        match inserted {
          Ok(_) => {}
          Err(e) if is_unique_rusqlite(&e) => {
            return Ok(Err(arcura_core::Error::conflict(
              "a pending friend request to this user already exists",
            )));
          }
          Err(e) => return Err(e.into()),
        }

        let raw = tx.query_row(
          &format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = ?1"),
          rusqlite::params![tx.last_insert_rowid()],
          RawFriendRequest::from_row,
        )?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    raw?.into_request()
  }

  async fn get_friend_request(&self, id: FriendRequestId) -> Result<Option<FriendRequest>> {
    self
      .select_one(
        format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = ?1"),
        vec![Value::Integer(id)],
        RawFriendRequest::from_row,
      )
      .await?
      .map(RawFriendRequest::into_request)
      .transpose()
  }

  async fn pending_requests_for(&self, receiver_id: UserId) -> Result<Vec<FriendRequest>> {
    self
      .select_all(
        format!(
          "SELECT {REQUEST_COLUMNS} FROM friend_requests
           WHERE receiver_id = ?1 AND status = 'pending' ORDER BY id"
        ),
        vec![uid(receiver_id)],
        RawFriendRequest::from_row,
      )
      .await?
      .into_iter()
      .map(RawFriendRequest::into_request)
      .collect()
  }

  async fn apply_resolution(&self, resolution: Resolution) -> Result<FriendRequest> {
    let at_str = encode_dt(Utc::now());
    let Resolution { request_id, status, edges } = resolution;

    // Ok(Err(current_status)) means the request was no longer pending.
    let outcome: std::result::Result<RawFriendRequest, Option<String>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
          "UPDATE friend_requests SET status = ?1, updated_at = ?2
           WHERE id = ?3 AND status = 'pending'",
          rusqlite::params![status.as_str(), at_str, request_id],
        )?;
        if changed == 0 {
          let current: Option<String> = tx
            .query_row(
              "SELECT status FROM friend_requests WHERE id = ?1",
              rusqlite::params![request_id],
              |r| r.get(0),
            )
            .optional()?;
          return Ok(Err(current));
        }

        // An edge may already exist when both users had requested each other;
        // the pair is still guaranteed to be present after commit.
        for edge in &edges {
          tx.execute(
            "INSERT OR IGNORE INTO friendships (user_id, friend_id, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![edge.user_id.to_i64(), edge.friend_id.to_i64(), at_str],
          )?;
        }

        let raw = tx.query_row(
          &format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = ?1"),
          rusqlite::params![request_id],
          RawFriendRequest::from_row,
        )?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    match outcome {
      Ok(raw) => raw.into_request(),
      Err(None) => Err(arcura_core::Error::not_found("friend request").into()),
      Err(Some(current)) => {
        let from = decode_status(&current)?;
        tracing::debug!(request_id, %from, to = %status, "friend request already answered");
        Err(arcura_core::Error::InvalidTransition { from, to: status }.into())
      }
    }
  }

  async fn list_friendships(&self, user_id: UserId) -> Result<Vec<Friendship>> {
    self
      .select_all(
        "SELECT id, user_id, friend_id, created_at FROM friendships
         WHERE user_id = ?1 ORDER BY id"
          .to_owned(),
        vec![uid(user_id)],
        RawFriendship::from_row,
      )
      .await?
      .into_iter()
      .map(RawFriendship::into_friendship)
      .collect()
  }

  async fn remove_friendship(&self, user_id: UserId, friend_id: UserId) -> Result<bool> {
    let changed = self
      .execute(
        "DELETE FROM friendships WHERE user_id = ?1 AND friend_id = ?2",
        vec![uid(user_id), uid(friend_id)],
      )
      .await?;
    Ok(changed > 0)
  }
}
