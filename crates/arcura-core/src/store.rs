//! The `ChatStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `arcura-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  Error, UserId,
  account::{NewUser, StoredSession, User, UserUpdate},
  friendship::{FriendRequest, FriendRequestId, Friendship, Resolution},
  group::{Group, GroupId, GroupMember},
  message::{ConversationId, Message, MessageId, NewMessage, ReadReceipt},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for the `search_*` methods.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
  /// Substring to look for. Matched literally: `%` and `_` carry no meaning.
  pub text:   String,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl SearchQuery {
  pub fn new(text: impl Into<String>) -> Self {
    Self { text: text.into(), ..Default::default() }
  }
}

// ─── Error classification ────────────────────────────────────────────────────

/// Lets callers tell a domain failure (duplicate row, vanished record) from
/// an infrastructure failure without knowing the backend's error type.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The domain error carried by this failure, if any. `None` means the
  /// failure is internal.
  fn domain(&self) -> Option<&Error>;

  /// Take the domain error out, or hand the failure back unchanged.
  fn into_domain(self) -> Result<Error, Self>
  where
    Self: Sized;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Arcura persistence backend.
///
/// Uniqueness of usernames, emails, phone numbers, friendship edges, group
/// memberships and pending friend requests per ordered pair must be enforced
/// by the backend itself; violations surface as [`Error::Conflict`].
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ChatStore: Send + Sync {
  type Error: StoreError;

  // ── Accounts ──────────────────────────────────────────────────────────

  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Apply a partial update. Returns `None` if the user does not exist.
  fn update_user(
    &self,
    id: UserId,
    update: UserUpdate,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn set_password_hash(
    &self,
    id: UserId,
    password_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` if the user did not exist.
  fn delete_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Overwrite the account's current token; `None` clears it (logout).
  fn set_session(
    &self,
    id: UserId,
    session: Option<StoredSession>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Users whose username or email contains the query text.
  fn search_users<'a>(
    &'a self,
    query: &'a SearchQuery,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + 'a;

  // ── Messages ──────────────────────────────────────────────────────────

  fn create_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  fn get_message(
    &self,
    id: MessageId,
  ) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send + '_;

  /// All messages of a conversation, oldest first.
  fn list_conversation(
    &self,
    conversation_id: ConversationId,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  fn edit_message(
    &self,
    id: MessageId,
    content: String,
  ) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send + '_;

  fn delete_message(
    &self,
    id: MessageId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Mark a message read at `at` if it is still unread. A message that is
  /// already read keeps its original `read_at`. `None` if it does not exist.
  fn mark_read(
    &self,
    id: MessageId,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<ReadReceipt>, Self::Error>> + Send + '_;

  fn search_messages<'a>(
    &'a self,
    query: &'a SearchQuery,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + 'a;

  // ── Groups ────────────────────────────────────────────────────────────

  fn create_group(
    &self,
    name: String,
    owner_id: UserId,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  fn get_group(
    &self,
    id: GroupId,
  ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send + '_;

  fn list_members(
    &self,
    group_id: GroupId,
  ) -> impl Future<Output = Result<Vec<GroupMember>, Self::Error>> + Send + '_;

  fn rename_group(
    &self,
    id: GroupId,
    name: String,
  ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send + '_;

  /// Delete the group and all of its memberships.
  fn delete_group(
    &self,
    id: GroupId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Fails with [`Error::Conflict`] if the user is already a member.
  fn add_member(
    &self,
    group_id: GroupId,
    user_id: UserId,
  ) -> impl Future<Output = Result<GroupMember, Self::Error>> + Send + '_;

  fn remove_member(
    &self,
    group_id: GroupId,
    user_id: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn search_groups<'a>(
    &'a self,
    query: &'a SearchQuery,
  ) -> impl Future<Output = Result<Vec<Group>, Self::Error>> + Send + 'a;

  // ── Friend requests and friendships ───────────────────────────────────

  /// Create a pending request after running
  /// [`crate::friendship::admit_request`] against the current rows.
  fn create_friend_request(
    &self,
    sender_id: UserId,
    receiver_id: UserId,
  ) -> impl Future<Output = Result<FriendRequest, Self::Error>> + Send + '_;

  fn get_friend_request(
    &self,
    id: FriendRequestId,
  ) -> impl Future<Output = Result<Option<FriendRequest>, Self::Error>> + Send + '_;

  /// Pending requests addressed to `receiver_id`.
  fn pending_requests_for(
    &self,
    receiver_id: UserId,
  ) -> impl Future<Output = Result<Vec<FriendRequest>, Self::Error>> + Send + '_;

  /// Apply a validated [`Resolution`] all-or-nothing: the status update
  /// (only while the request is still pending) and every edge insert commit
  /// together or not at all.
  fn apply_resolution(
    &self,
    resolution: Resolution,
  ) -> impl Future<Output = Result<FriendRequest, Self::Error>> + Send + '_;

  /// Outgoing edges of `user_id`.
  fn list_friendships(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Vec<Friendship>, Self::Error>> + Send + '_;

  /// Delete the single edge `(user_id, friend_id)`. The reverse edge is left
  /// in place. Returns `false` if the edge did not exist.
  fn remove_friendship(
    &self,
    user_id: UserId,
    friend_id: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
