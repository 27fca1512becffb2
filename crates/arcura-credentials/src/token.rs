//! Signed, time-bounded session tokens.
//!
//! Tokens are compact JWS strings (`header.claims.signature`, each segment
//! unpadded base64url) signed with HMAC-SHA256. The claim set is exactly
//! `{"sub": "<user id>", "exp": <epoch seconds>}`. The header carries a
//! random `nonce` so that two tokens issued in the same second still differ.
//!
//! Verification here is stateless. Whether a token is still the account's
//! *current* token is checked by the request pipeline against the store.

use std::fmt;

use arcura_core::UserId;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{Error, Result, TokenError};

type HmacSha256 = Hmac<Sha256>;

/// Shortest signing secret accepted at startup.
pub const MIN_SECRET_LEN: usize = 32;

/// Lifetime of a freshly issued token, in hours.
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Longest configurable token lifetime, in hours (one leap year).
pub const MAX_TTL_HOURS: i64 = 24 * 366;

const NONCE_LEN: usize = 16;

const ALGORITHM: &str = "HS256";

#[derive(Serialize, Deserialize)]
struct Header {
  alg: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  typ: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  nonce: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Claims {
  sub: String,
  exp: i64,
}

/// A token together with the identity it names and its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
  pub subject:    UserId,
  pub token:      String,
  pub expires_at: DateTime<Utc>,
}

/// Issues and verifies session tokens with one process-wide secret.
#[derive(Clone)]
pub struct TokenService {
  secret: Vec<u8>,
  ttl:    TimeDelta,
}

impl fmt::Debug for TokenService {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TokenService")
      .field("secret", &"<redacted>")
      .field("ttl", &self.ttl)
      .finish()
  }
}

impl TokenService {
  /// Build a service around `secret`. There is no default secret: anything
  /// shorter than [`MIN_SECRET_LEN`] bytes is refused.
  pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
    let secret = secret.into();
    if secret.len() < MIN_SECRET_LEN {
      return Err(Error::WeakSecret { min: MIN_SECRET_LEN, len: secret.len() });
    }
    Ok(Self { secret, ttl: TimeDelta::hours(DEFAULT_TTL_HOURS) })
  }

  pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn ttl(&self) -> TimeDelta { self.ttl }

  // ── Issue ───────────────────────────────────────────────────────────────

  pub fn issue(&self, subject: UserId) -> Result<IssuedToken> {
    self.issue_at(subject, Utc::now())
  }

  /// Issue a token for `subject` expiring `ttl` after `now`.
  pub fn issue_at(&self, subject: UserId, now: DateTime<Utc>) -> Result<IssuedToken> {
    let exp = now
      .checked_add_signed(self.ttl)
      .ok_or_else(|| Error::Hashing(format!("expiry out of range: {now} + {}", self.ttl)))?
      .timestamp();
    let expires_at = DateTime::<Utc>::from_timestamp(exp, 0)
      .ok_or_else(|| Error::Hashing(format!("expiry out of range: {exp}")))?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let header = Header {
      alg:   ALGORITHM.to_owned(),
      typ:   Some("JWT".to_owned()),
      nonce: Some(B64.encode(nonce)),
    };
    let claims = Claims { sub: subject.to_string(), exp };
    let token = self.encode(&header, &claims)?;

    Ok(IssuedToken { subject, token, expires_at })
  }

  fn encode<C: Serialize>(&self, header: &Header, claims: &C) -> Result<String> {
    let signing_input = format!(
      "{}.{}",
      B64.encode(serde_json::to_vec(header)?),
      B64.encode(serde_json::to_vec(claims)?),
    );
    let mut mac = self.mac()?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();
    Ok(format!("{signing_input}.{}", B64.encode(signature)))
  }

  fn mac(&self) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(&self.secret).map_err(|e| Error::Hashing(e.to_string()))
  }

  // ── Verify ──────────────────────────────────────────────────────────────

  pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
    self.verify_at(token, Utc::now())
  }

  /// Check structure, algorithm, signature and expiry, then decode the
  /// subject. A token is expired once `now` reaches its `exp`.
  pub fn verify_at(
    &self,
    token: &str,
    now: DateTime<Utc>,
  ) -> Result<UserId, TokenError> {
    let mut segments = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) = (
      segments.next(),
      segments.next(),
      segments.next(),
      segments.next(),
    ) else {
      return Err(TokenError::Malformed);
    };

    let header: Header = decode_segment(header_b64)?;
    if header.alg != ALGORITHM {
      return Err(TokenError::UnsupportedAlgorithm);
    }

    let signature = B64.decode(sig_b64).map_err(|_| TokenError::Malformed)?;
    let mut mac = self.mac().map_err(|_| TokenError::BadSignature)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac
      .verify_slice(&signature)
      .map_err(|_| TokenError::BadSignature)?;

    let claims: Claims = decode_segment(claims_b64)?;
    if claims.exp <= now.timestamp() {
      return Err(TokenError::Expired);
    }

    claims
      .sub
      .parse::<UserId>()
      .map_err(|_| TokenError::InvalidSubject)
  }

  // ── Refresh ─────────────────────────────────────────────────────────────

  /// Verify `old` and issue a fresh token for the same identity. The caller
  /// must still overwrite the stored current token.
  pub fn refresh(&self, old: &str) -> Result<IssuedToken> {
    self.refresh_at(old, Utc::now())
  }

  pub fn refresh_at(&self, old: &str, now: DateTime<Utc>) -> Result<IssuedToken> {
    let subject = self.verify_at(old, now)?;
    self.issue_at(subject, now)
  }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
  let bytes = B64.decode(segment).map_err(|_| TokenError::Malformed)?;
  serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}
