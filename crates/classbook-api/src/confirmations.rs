//! Handlers for the confirmation flow.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`   | `/confirmations` | Body: a gated action, e.g. `{"action":"delete_student","student_id":"..."}` |
//! | `POST`   | `/confirmations/{token}` | Body: `{"code":"6251"}`; 403 on a wrong code, which keeps the token |
//! | `DELETE` | `/confirmations/{token}` | Drop a pending action |
//! | `POST`   | `/course-deletions/{token}` | Body: `{"phrase":"DELETE COURSE"}`; 409 while cooling down |
//! | `DELETE` | `/course-deletions/{token}` | Abandon a course deletion |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use classbook_core::{
  document::CourseRemoval,
  gate::{Challenge, GatedAction},
  gradebook::{Confirmed, Gradebook},
  store::DocumentStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Park `action` and answer with its challenge.
pub(crate) fn challenge<S>(
  gradebook: &Gradebook<S>,
  action: GatedAction,
) -> (StatusCode, Json<Challenge>)
where
  S: DocumentStore,
{
  let challenge = gradebook.request_confirmation(action);
  tracing::debug!(token = %challenge.token, "confirmation requested");
  (StatusCode::ACCEPTED, Json(challenge))
}

/// `POST /confirmations`
pub async fn request<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Json(action): Json<GatedAction>,
) -> (StatusCode, Json<Challenge>)
where
  S: DocumentStore + 'static,
{
  challenge(&gradebook, action)
}

#[derive(Debug, Deserialize)]
pub struct CodeBody {
  pub code: String,
}

/// `POST /confirmations/{token}`
pub async fn confirm<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(token): Path<Uuid>,
  Json(body): Json<CodeBody>,
) -> Result<Json<Confirmed>, ApiError>
where
  S: DocumentStore + 'static,
{
  let confirmed = gradebook.confirm(token, &body.code).await?;
  tracing::info!(%token, "confirmed action");
  Ok(Json(confirmed))
}

/// `DELETE /confirmations/{token}`
pub async fn cancel<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(token): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  if gradebook.cancel_confirmation(token) {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::not_found(token))
  }
}

#[derive(Debug, Deserialize)]
pub struct PhraseBody {
  pub phrase: String,
}

/// `POST /course-deletions/{token}`
pub async fn confirm_course_deletion<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(token): Path<Uuid>,
  Json(body): Json<PhraseBody>,
) -> Result<Json<CourseRemoval>, ApiError>
where
  S: DocumentStore + 'static,
{
  let removal = gradebook.confirm_course_deletion(token, &body.phrase).await?;
  tracing::info!(students = removal.students_removed, "course deleted");
  Ok(Json(removal))
}

/// `DELETE /course-deletions/{token}`
pub async fn cancel_course_deletion<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(token): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  if gradebook.cancel_course_deletion(token) {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::not_found(token))
  }
}
