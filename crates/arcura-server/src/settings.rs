//! Runtime configuration: an optional TOML file layered under `ARCURA_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use arcura_credentials::{TokenService, token::MAX_TTL_HOURS};
use chrono::TimeDelta;
use serde::Deserialize;

/// Runtime server configuration.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  /// HMAC signing secret for session tokens. Required; there is no default.
  pub token_secret:    String,
  #[serde(default = "default_ttl_hours")]
  pub token_ttl_hours: i64,
}

fn default_host() -> String { "0.0.0.0".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("arcura.db") }

fn default_ttl_hours() -> i64 { arcura_credentials::token::DEFAULT_TTL_HOURS }

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ARCURA"))
      .build()
      .context("failed to read config file")?;
    Self::from_settings(settings)
  }

  fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig (is token_secret set?)")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// Build the token service, refusing a weak secret or a TTL outside
  /// `1..=MAX_TTL_HOURS`.
  pub fn token_service(&self) -> anyhow::Result<TokenService> {
    if !(1..=MAX_TTL_HOURS).contains(&self.token_ttl_hours) {
      bail!(
        "token_ttl_hours must be between 1 and {MAX_TTL_HOURS}, got {}",
        self.token_ttl_hours
      );
    }
    let ttl = TimeDelta::try_hours(self.token_ttl_hours)
      .context("token_ttl_hours is out of range")?;
    let tokens = TokenService::new(self.token_secret.as_bytes())
      .context("token_secret is unusable")?;
    Ok(tokens.with_ttl(ttl))
  }

  /// The store path with a leading `~` expanded to the home directory.
  pub fn expanded_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(toml: &str) -> anyhow::Result<ServerConfig> {
    let settings = config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()?;
    ServerConfig::from_settings(settings)
  }

  const SECRET: &str = "an-adequately-long-signing-secret-value";

  #[test]
  fn defaults_apply() {
    let cfg = parse(&format!("token_secret = \"{SECRET}\"")).unwrap();
    assert_eq!(cfg.address(), "0.0.0.0:8080");
    assert_eq!(cfg.store_path, PathBuf::from("arcura.db"));
    assert_eq!(cfg.token_ttl_hours, 24);
    assert_eq!(cfg.token_service().unwrap().ttl(), TimeDelta::hours(24));
  }

  #[test]
  fn secret_is_required() {
    assert!(parse("port = 9000").is_err());
  }

  #[test]
  fn short_secret_is_refused() {
    let cfg = parse("token_secret = \"short\"").unwrap();
    assert!(cfg.token_service().is_err());
  }

  #[test]
  fn ttl_must_be_positive() {
    let cfg = parse(&format!("token_secret = \"{SECRET}\"\ntoken_ttl_hours = 0")).unwrap();
    assert!(cfg.token_service().is_err());
  }

  #[test]
  fn oversized_ttl_is_refused_at_startup() {
    for hours in [MAX_TTL_HOURS + 1, 3_000_000_000, i64::MAX] {
      let cfg = parse(&format!(
        "token_secret = \"{SECRET}\"\ntoken_ttl_hours = {hours}"
      ))
      .unwrap();
      assert!(cfg.token_service().is_err(), "accepted {hours}");
    }
    let cfg = parse(&format!(
      "token_secret = \"{SECRET}\"\ntoken_ttl_hours = {MAX_TTL_HOURS}"
    ))
    .unwrap();
    assert_eq!(cfg.token_service().unwrap().ttl(), TimeDelta::hours(MAX_TTL_HOURS));
  }

  #[test]
  fn tilde_expands_to_home() {
    let cfg = parse(&format!(
      "token_secret = \"{SECRET}\"\nstore_path = \"~/arcura/chat.db\""
    ))
    .unwrap();
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(cfg.expanded_store_path(), PathBuf::from(home).join("arcura/chat.db"));
    }
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
