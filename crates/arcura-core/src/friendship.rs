//! Friend requests and friendship edges.
//!
//! A request starts `pending` and ends either `accepted` or `rejected`; both
//! end states are terminal. Accepting materialises two directed edges, one in
//! each direction, so the relation is symmetric by construction. Removing a
//! friend deletes only the caller's edge, so symmetry can later be broken
//! unilaterally.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, UserId, policy};

pub type FriendRequestId = i64;

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
  Pending,
  Accepted,
  Rejected,
}

impl FriendRequestStatus {
  /// The value stored in the `status` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Accepted => "accepted",
      Self::Rejected => "rejected",
    }
  }

  pub fn is_terminal(self) -> bool { !matches!(self, Self::Pending) }

  /// Validate a move to `to`. Only `pending → accepted` and
  /// `pending → rejected` exist.
  pub fn transition(self, to: Self) -> Result<Self> {
    match (self, to) {
      (Self::Pending, Self::Accepted | Self::Rejected) => Ok(to),
      (from, to) => Err(Error::InvalidTransition { from, to }),
    }
  }
}

impl fmt::Display for FriendRequestStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FriendRequestStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "pending" => Ok(Self::Pending),
      "accepted" => Ok(Self::Accepted),
      "rejected" => Ok(Self::Rejected),
      other => Err(Error::invalid_input(format!(
        "unknown friend request status: {other:?}"
      ))),
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
  pub id:          FriendRequestId,
  pub sender_id:   UserId,
  pub receiver_id: UserId,
  pub status:      FriendRequestStatus,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// One directed edge: `user_id` considers `friend_id` a friend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
  pub id:         i64,
  pub user_id:    UserId,
  pub friend_id:  UserId,
  pub created_at: DateTime<Utc>,
}

/// An edge that a resolution requires to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
  pub user_id:   UserId,
  pub friend_id: UserId,
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// The receiver's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
  Accept,
  Reject,
}

/// A validated transition, ready for the store to apply atomically.
///
/// The store must update the status only if the row is still `pending` and
/// must insert every edge in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  pub request_id: FriendRequestId,
  pub status:     FriendRequestStatus,
  pub edges:      Vec<Edge>,
}

impl FriendRequest {
  /// Authorize `acting` against the receiver, then validate the transition.
  pub fn decide(&self, acting: UserId, answer: Answer) -> Result<Resolution> {
    policy::authorize(acting, self)?;

    let target = match answer {
      Answer::Accept => FriendRequestStatus::Accepted,
      Answer::Reject => FriendRequestStatus::Rejected,
    };
    let status = self.status.transition(target)?;

    let edges = match answer {
      Answer::Accept => vec![
        Edge { user_id: self.sender_id, friend_id: self.receiver_id },
        Edge { user_id: self.receiver_id, friend_id: self.sender_id },
      ],
      Answer::Reject => Vec::new(),
    };

    Ok(Resolution { request_id: self.id, status, edges })
  }
}

/// Admission guard for a new request from `sender` to `receiver`.
///
/// `already_friends` is whether the edge `(sender, receiver)` exists;
/// `pending_exists` is whether a pending request `sender → receiver` exists.
pub fn admit_request(
  sender: UserId,
  receiver: UserId,
  already_friends: bool,
  pending_exists: bool,
) -> Result<()> {
  if sender == receiver {
    return Err(Error::invalid_input(
      "cannot send a friend request to yourself",
    ));
  }
  if already_friends {
    return Err(Error::conflict("already friends with this user"));
  }
  if pending_exists {
    return Err(Error::conflict(
      "a pending friend request to this user already exists",
    ));
  }
  Ok(())
}
