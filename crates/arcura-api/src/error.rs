//! API error type and [`axum::response::IntoResponse`] implementation.

use arcura_core::{error::ErrorKind, store::StoreError};
use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Domain(#[from] arcura_core::Error),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store failure: domain errors keep their kind, everything
  /// else is internal.
  pub fn store<E: StoreError>(e: E) -> Self {
    match e.into_domain() {
      Ok(domain) => Self::Domain(domain),
      Err(other) => Self::Internal(Box::new(other)),
    }
  }

  pub fn internal(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Internal(Box::new(e))
  }

  pub fn bad_request(why: impl Into<String>) -> Self {
    Self::Domain(arcura_core::Error::invalid_input(why))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Domain(e) => e.kind(),
      Self::Internal(_) => ErrorKind::Internal,
    }
  }
}

fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
    ErrorKind::Forbidden => StatusCode::FORBIDDEN,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Conflict => StatusCode::CONFLICT,
    ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let kind = self.kind();
    let message = match &self {
      Self::Domain(e) => e.to_string(),
      Self::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        "internal server error".to_owned()
      }
    };

    let mut res = (status_for(kind), Json(json!({ "error": message }))).into_response();
    if kind == ErrorKind::Unauthenticated {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"arcura\""),
      );
    }
    res
  }
}
