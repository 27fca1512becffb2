//! arcura-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus
//! `ARCURA_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.
//!
//! # Helpers
//!
//! ```text
//! arcura-server --generate-secret   # print a fresh token_secret
//! arcura-server --hash-password     # argon2 PHC string for a password on stdin
//! ```

mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use arcura_api::AppState;
use arcura_credentials::password;
use arcura_store_sqlite::SqliteStore;
use clap::Parser;
use rand_core::{OsRng, RngCore as _};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Arcura chat server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Print a random token signing secret and exit.
  #[arg(long)]
  generate_secret: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.generate_secret {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    println!("{}", hex::encode(bytes));
    return Ok(());
  }

  if cli.hash_password {
    let secret = read_password()?;
    let digest = password::hash(&secret).context("failed to hash password")?;
    println!("{digest}");
    return Ok(());
  }

  let server_cfg = ServerConfig::load(&cli.config)?;
  let tokens = server_cfg.token_service()?;

  let store_path = server_cfg.expanded_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let app = arcura_api::router(AppState::new(store, tokens))
    .layer(TraceLayer::new_for_http());
  let address = server_cfg.address();

  tracing::info!(
    store = ?store_path,
    token_ttl_hours = server_cfg.token_ttl_hours,
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read one line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
