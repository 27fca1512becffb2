//! JSON REST API for Arcura.
//!
//! Exposes an axum [`Router`] backed by any [`arcura_core::store::ChatStore`]
//! and a [`TokenService`]. Protected routes take a [`auth::Session`]
//! extractor, which enforces the bearer-token checks before the handler
//! runs. TLS and request tracing are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = arcura_api::router(AppState::new(store, tokens))
//!   .layer(TraceLayer::new_for_http());
//! ```

pub mod accounts;
pub mod auth;
pub mod error;
pub mod extract;
pub mod friends;
pub mod groups;
pub mod messages;
pub mod search;

use std::sync::Arc;

use arcura_core::store::ChatStore;
use arcura_credentials::TokenService;
use axum::{
  Router,
  routing::{delete, get, post, put},
};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub tokens: Arc<TokenService>,
}

impl<S> AppState<S> {
  pub fn new(store: S, tokens: TokenService) -> Self {
    Self { store: Arc::new(store), tokens: Arc::new(tokens) }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), tokens: Arc::clone(&self.tokens) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ChatStore + 'static,
{
  Router::new()
    // Sessions
    .route("/auth/register", post(accounts::register::<S>))
    .route("/auth/login", post(accounts::login::<S>))
    .route("/auth/logout", post(accounts::logout::<S>))
    .route("/auth/refresh", post(accounts::refresh::<S>))
    .route("/auth/me", get(accounts::me))
    .route("/profile", get(accounts::me))
    // Accounts
    .route(
      "/users/{id}",
      get(accounts::get_one::<S>)
        .put(accounts::update::<S>)
        .delete(accounts::delete::<S>),
    )
    .route("/users/{id}/password", put(accounts::change_password::<S>))
    // Messages
    .route("/messages/send", post(messages::send::<S>))
    .route(
      "/messages/{id}",
      get(messages::conversation::<S>).delete(messages::delete::<S>),
    )
    .route("/messages/{id}/edit", put(messages::edit::<S>))
    .route("/messages/{id}/read", post(messages::mark_read::<S>))
    // Groups
    .route("/groups/create", post(groups::create::<S>))
    .route(
      "/groups/{id}",
      get(groups::get_one::<S>)
        .put(groups::rename::<S>)
        .delete(groups::delete::<S>),
    )
    .route("/groups/{id}/members", post(groups::add_member::<S>))
    .route(
      "/groups/{id}/members/{user_id}",
      delete(groups::remove_member::<S>),
    )
    // Friends
    .route("/friends", get(friends::list::<S>))
    .route("/friends/request", post(friends::send_request::<S>))
    .route("/friends/requests", get(friends::pending::<S>))
    .route("/friends/accept/{request_id}", post(friends::accept::<S>))
    .route("/friends/reject/{request_id}", delete(friends::reject::<S>))
    .route("/friends/{friend_id}", delete(friends::remove::<S>))
    // Search
    .route("/search/users", get(search::users::<S>))
    .route("/search/groups", get(search::groups::<S>))
    .route("/search/messages", get(search::messages::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
