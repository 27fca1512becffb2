//! Error types for `arcura-core`.
//!
//! [`Error`] is the domain failure taxonomy shared by every layer. Storage
//! backends wrap it, and the HTTP layer maps each variant to one status code
//! through [`Error::kind`].

use thiserror::Error;

use crate::friendship::FriendRequestStatus;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing, malformed, invalid, expired or superseded credential. The
  /// message never says which check failed.
  #[error("unauthenticated")]
  Unauthenticated,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("{0} not found")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("friend request is already {from}, cannot become {to}")]
  InvalidTransition {
    from: FriendRequestStatus,
    to:   FriendRequestStatus,
  },
}

/// The deterministic classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Unauthenticated,
  Forbidden,
  NotFound,
  Conflict,
  InvalidInput,
  Internal,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Unauthenticated => ErrorKind::Unauthenticated,
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Conflict(_) | Self::InvalidTransition { .. } => ErrorKind::Conflict,
      Self::InvalidInput(_) => ErrorKind::InvalidInput,
    }
  }

  pub fn not_found(what: impl Into<String>) -> Self { Self::NotFound(what.into()) }

  pub fn conflict(why: impl Into<String>) -> Self { Self::Conflict(why.into()) }

  pub fn invalid_input(why: impl Into<String>) -> Self {
    Self::InvalidInput(why.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
