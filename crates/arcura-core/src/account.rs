//! Account records and the session state stored against them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, UserId};

/// A registered account.
///
/// The password digest and the current token are server-side state only and
/// are skipped when the record is serialised.
#[derive(Debug, Clone, Serialize)]
pub struct User {
  pub id:            UserId,
  pub first_name:    String,
  pub last_name:     String,
  pub username:      String,
  pub email:         String,
  pub phone_number:  String,
  #[serde(skip)]
  pub password_hash: String,
  #[serde(skip)]
  pub session:       Option<StoredSession>,
  pub created_at:    DateTime<Utc>,
}

/// The most recently issued token for an account.
///
/// Only one token is valid per account: login and refresh overwrite this
/// value, logout clears it. Concurrent writers race and the last one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
}

impl User {
  /// Whether `presented` is the account's current token.
  pub fn holds_token(&self, presented: &str) -> bool {
    self
      .session
      .as_ref()
      .is_some_and(|s| !s.token.is_empty() && s.token == presented)
  }

  pub fn profile(&self) -> Profile {
    Profile {
      id:           self.id,
      username:     self.username.clone(),
      first_name:   self.first_name.clone(),
      last_name:    self.last_name.clone(),
      email:        self.email.clone(),
      phone_number: self.phone_number.clone(),
    }
  }
}

/// The public view of an account returned by profile and search endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub id:           UserId,
  pub username:     String,
  pub first_name:   String,
  pub last_name:    String,
  pub email:        String,
  pub phone_number: String,
}

/// Input to [`crate::store::ChatStore::create_user`]. The password is
/// already hashed by the time it reaches the store.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub first_name:    String,
  pub last_name:     String,
  pub username:      String,
  pub email:         String,
  pub phone_number:  String,
  pub password_hash: String,
}

/// A partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
  pub first_name:   Option<String>,
  pub last_name:    Option<String>,
  pub email:        Option<String>,
  pub phone_number: Option<String>,
}

impl UserUpdate {
  pub fn is_empty(&self) -> bool {
    self.first_name.is_none()
      && self.last_name.is_none()
      && self.email.is_none()
      && self.phone_number.is_none()
  }

  /// Reject fields that are present but blank.
  pub fn validate(&self) -> Result<()> {
    let fields = [
      ("first_name", &self.first_name),
      ("last_name", &self.last_name),
      ("email", &self.email),
      ("phone_number", &self.phone_number),
    ];
    for (name, value) in fields {
      if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
        return Err(Error::invalid_input(format!("{name} must not be empty")));
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(session: Option<StoredSession>) -> User {
    User {
      id: UserId::new(1).unwrap(),
      first_name: "Ada".into(),
      last_name: "Lovelace".into(),
      username: "ada".into(),
      email: "ada@example.com".into(),
      phone_number: "555-0100".into(),
      password_hash: "$argon2id$...".into(),
      session,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn holds_only_the_stored_token() {
    let u = user(Some(StoredSession {
      token:      "abc".into(),
      expires_at: Utc::now(),
    }));
    assert!(u.holds_token("abc"));
    assert!(!u.holds_token("abd"));
    assert!(!user(None).holds_token("abc"));
  }

  #[test]
  fn cleared_token_matches_nothing() {
    let u = user(Some(StoredSession {
      token:      String::new(),
      expires_at: Utc::now(),
    }));
    assert!(!u.holds_token(""));
  }

  #[test]
  fn serialised_user_omits_secrets() {
    let json = serde_json::to_value(user(None)).unwrap();
    assert!(json.get("password_hash").is_none());
    assert!(json.get("session").is_none());
    assert_eq!(json["username"], "ada");
  }

  #[test]
  fn blank_update_fields_are_rejected() {
    let update = UserUpdate {
      email: Some("  ".into()),
      ..Default::default()
    };
    assert!(matches!(update.validate(), Err(Error::InvalidInput(_))));
    assert!(UserUpdate::default().is_empty());
  }
}
