//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use classbook_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Wrong security code or confirmation phrase.
  #[error("{0}")]
  Forbidden(String),

  /// Locked activity, a course change outside a move, or a course
  /// deletion still cooling down.
  #[error("{0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn not_found(what: impl std::fmt::Display) -> Self { Self::NotFound(what.to_string()) }
}

impl From<CoreError> for ApiError {
  fn from(err: CoreError) -> Self {
    match err {
      CoreError::InvalidGrade(_)
      | CoreError::EmptyAnnotation
      | CoreError::InvalidBackup(_)
      | CoreError::CodeMismatch
      | CoreError::CodeTooShort(_)
      | CoreError::CodeNotNumeric
      | CoreError::Serialization(_) => Self::BadRequest(err.to_string()),
      CoreError::WrongCode | CoreError::WrongPhrase => Self::Forbidden(err.to_string()),
      CoreError::ActivityLocked(_) | CoreError::CourseChange(_) | CoreError::CoolingDown(_) => {
        Self::Conflict(err.to_string())
      }
      CoreError::UnknownToken(_) => Self::NotFound(err.to_string()),
      CoreError::CodeHash(_) | CoreError::Store(_) => Self::Store(Box::new(err)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
