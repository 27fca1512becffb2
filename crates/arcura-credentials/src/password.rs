//! Slow, salted one-way hashing of account passwords (argon2id).

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{self, SaltString},
};
use rand_core::OsRng;

use crate::{Error, Result};

/// Hash `secret` with a fresh random salt and return the PHC string,
/// e.g. `$argon2id$v=19$m=19456,t=2,p=1$…`.
pub fn hash(secret: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(secret.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::Hashing(e.to_string()))
}

/// Check `secret` against a stored PHC `digest`.
///
/// A wrong secret is `Ok(false)`. An unreadable digest or a failure inside
/// the hasher is an error; there is no fallback comparison.
pub fn verify(digest: &str, secret: &str) -> Result<bool> {
  let parsed =
    PasswordHash::new(digest).map_err(|e| Error::MalformedDigest(e.to_string()))?;

  match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(password_hash::Error::Password) => Ok(false),
    Err(e) => Err(Error::Hashing(e.to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify() {
    let digest = hash("correct horse").unwrap();
    assert!(digest.starts_with("$argon2"));
    assert!(!digest.contains("correct horse"));
    assert!(verify(&digest, "correct horse").unwrap());
    assert!(!verify(&digest, "battery staple").unwrap());
  }

  #[test]
  fn salts_differ_per_call() {
    assert_ne!(hash("same").unwrap(), hash("same").unwrap());
  }

  #[test]
  fn malformed_digest_is_an_error_not_a_mismatch() {
    assert!(matches!(
      verify("plaintext-password", "plaintext-password"),
      Err(Error::MalformedDigest(_))
    ));
  }
}
