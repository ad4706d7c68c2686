//! Error types for `classbook-core`.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid grade {0:?}: expected a decimal between 0.0 and 5.0")]
  InvalidGrade(String),

  #[error("activity {0} is locked")]
  ActivityLocked(String),

  #[error("student {0} changes course only through a move")]
  CourseChange(String),

  #[error("annotation text is empty")]
  EmptyAnnotation,

  #[error("invalid backup: {0}")]
  InvalidBackup(String),

  // ── Security gate ─────────────────────────────────────────────────────────
  #[error("incorrect security code")]
  WrongCode,

  #[error("new security code and confirmation do not match")]
  CodeMismatch,

  #[error("security code must be at least {0} characters")]
  CodeTooShort(usize),

  #[error("security code must contain digits only")]
  CodeNotNumeric,

  #[error("could not hash security code: {0}")]
  CodeHash(String),

  #[error("no pending confirmation with token {0}")]
  UnknownToken(Uuid),

  #[error("course deletion is still cooling down ({} s left)", .0.as_secs())]
  CoolingDown(Duration),

  #[error("confirmation phrase does not match")]
  WrongPhrase,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
