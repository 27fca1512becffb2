//! Identity — the numeric handle every session and authority field carries.

use std::{fmt, num::NonZeroU64, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A positive, immutable account identifier.
///
/// The canonical string form is plain decimal; that is the form embedded as
/// the `sub` claim of a session token.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(NonZeroU64);

impl UserId {
  /// Build an identity from a raw value. Returns `None` for zero.
  pub fn new(raw: u64) -> Option<Self> { NonZeroU64::new(raw).map(Self) }

  pub fn get(self) -> u64 { self.0.get() }

  /// Storage representation. SQLite rowids are signed 64-bit integers.
  pub fn to_i64(self) -> i64 { self.0.get() as i64 }

  pub fn from_i64(raw: i64) -> Option<Self> {
    u64::try_from(raw).ok().and_then(Self::new)
  }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for UserId {
  type Err = Error;

  /// Only canonical decimal is accepted: no sign, no whitespace, no zero.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
      return Err(Error::invalid_input(format!("not a user id: {s:?}")));
    }
    s.parse::<u64>()
      .ok()
      .and_then(Self::new)
      .ok_or_else(|| Error::invalid_input(format!("not a user id: {s:?}")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canonical_string_roundtrip() {
    let id = UserId::new(42).unwrap();
    assert_eq!(id.to_string(), "42");
    assert_eq!("42".parse::<UserId>().unwrap(), id);
  }

  #[test]
  fn rejects_non_canonical_forms() {
    for bad in ["", "0", "-1", "+1", " 1", "1a", "18446744073709551616"] {
      assert!(bad.parse::<UserId>().is_err(), "accepted {bad:?}");
    }
  }

  #[test]
  fn i64_conversion_rejects_non_positive() {
    assert!(UserId::from_i64(0).is_none());
    assert!(UserId::from_i64(-5).is_none());
    assert_eq!(UserId::from_i64(7).map(UserId::get), Some(7));
  }

  #[test]
  fn serialises_as_bare_number() {
    let id = UserId::new(9).unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), "9");
    let back: UserId = serde_json::from_str("9").unwrap();
    assert_eq!(back, id);
    assert!(serde_json::from_str::<UserId>("0").is_err());
  }
}
