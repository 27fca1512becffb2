//! Error types for the credential primitives.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The signing secret is too short to be used.
  #[error("token secret must be at least {min} bytes, got {len}")]
  WeakSecret { min: usize, len: usize },

  /// Hashing or signing failed. Always fatal for the request.
  #[error("credential hashing failed: {0}")]
  Hashing(String),

  #[error("stored password digest is malformed: {0}")]
  MalformedDigest(String),

  #[error("token rejected: {0}")]
  Token(#[from] TokenError),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

/// Why a presented token was refused.
///
/// The variants exist for logging and tests only; callers must collapse them
/// into a single "unauthenticated" answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
  #[error("token is not three dot-separated base64url segments")]
  Malformed,

  #[error("token header names an unsupported algorithm")]
  UnsupportedAlgorithm,

  #[error("token signature does not verify")]
  BadSignature,

  #[error("token has expired")]
  Expired,

  #[error("token subject is not a user id")]
  InvalidSubject,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
