//! Ownership-based authorization.
//!
//! Every mutable entity records exactly one authority identity. A caller may
//! mutate an entity iff the caller *is* that identity: no roles, no
//! delegation, no inheritance. Handlers never compare identities themselves;
//! they load the target and call [`authorize`] before mutating it.

use crate::{
  Error, Result, UserId, account::User, friendship::FriendRequest,
  group::Group, message::Message,
};

/// The verdict for one acting identity against one authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Forbidden,
}

/// The pure decision function: equality of identities.
pub fn decide(acting: UserId, authority: UserId) -> Decision {
  if acting == authority {
    Decision::Allow
  } else {
    Decision::Forbidden
  }
}

/// An entity with a single identity that alone may mutate it.
pub trait Owned {
  /// Human-readable noun used in denial messages.
  const KIND: &'static str;

  fn authority(&self) -> UserId;
}

/// A bare identity is its own authority: the self-record check for
/// `/users/{id}` routes.
impl Owned for UserId {
  const KIND: &'static str = "account";

  fn authority(&self) -> UserId { *self }
}

impl Owned for User {
  const KIND: &'static str = "account";

  fn authority(&self) -> UserId { self.id }
}

impl Owned for Message {
  const KIND: &'static str = "message";

  fn authority(&self) -> UserId { self.sender_id }
}

/// Group edits, deletion and membership changes all authorize against the
/// group itself.
impl Owned for Group {
  const KIND: &'static str = "group";

  fn authority(&self) -> UserId { self.owner_id }
}

/// Only the receiver may accept or reject a friend request.
impl Owned for FriendRequest {
  const KIND: &'static str = "friend request";

  fn authority(&self) -> UserId { self.receiver_id }
}

/// Allow the mutation or fail with [`Error::Forbidden`].
pub fn authorize<R: Owned>(acting: UserId, resource: &R) -> Result<()> {
  match decide(acting, resource.authority()) {
    Decision::Allow => Ok(()),
    Decision::Forbidden => Err(Error::Forbidden(format!(
      "not permitted to modify this {}",
      R::KIND
    ))),
  }
}
