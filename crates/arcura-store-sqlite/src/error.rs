//! Error type for `arcura-store-sqlite`.

use arcura_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] arcura_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A row holds a value the domain types cannot represent.
  #[error("corrupt row: {0}")]
  Corrupt(String),
}

impl StoreError for Error {
  fn domain(&self) -> Option<&arcura_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }

  fn into_domain(self) -> Result<arcura_core::Error, Self> {
    match self {
      Error::Core(e) => Ok(e),
      other => Err(other),
    }
  }
}

/// Map a UNIQUE constraint violation to a domain conflict; pass anything
/// else through as a database error.
pub(crate) fn conflict_on_unique(e: tokio_rusqlite::Error, why: &str) -> Error {
  if is_unique_violation(&e) {
    Error::Core(arcura_core::Error::conflict(why))
  } else {
    Error::Database(e)
  }
}

pub(crate) fn is_unique_violation(e: &tokio_rusqlite::Error) -> bool {
  match e {
    tokio_rusqlite::Error::Rusqlite(inner) => is_unique_rusqlite(inner),
    _ => false,
  }
}

pub(crate) fn is_unique_rusqlite(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
