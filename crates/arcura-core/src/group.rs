//! Groups and their membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

pub type GroupId = i64;

/// A named group. `owner_id` is fixed at creation; ownership never transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
  pub id:         GroupId,
  pub name:       String,
  pub owner_id:   UserId,
  pub created_at: DateTime<Utc>,
}

/// One user's membership of one group. A user appears at most once per group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
  pub id:        i64,
  pub group_id:  GroupId,
  pub user_id:   UserId,
  pub joined_at: DateTime<Utc>,
}

/// A group together with its members, as returned by `GET /groups/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
  #[serde(flatten)]
  pub group:   Group,
  pub members: Vec<GroupMember>,
}
