//! Handlers for `/students` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/students` | Every student, as stored records |
//! | `POST`   | `/students` | Body: a student record; returns 201 + sanitized record |
//! | `GET`    | `/students/{id}` | 404 if not found |
//! | `PUT`    | `/students/{id}` | Body: a full record; 409 if it changes the course or a locked grade |
//! | `DELETE` | `/students/{id}` | 202 + challenge |
//! | `POST`   | `/students/{id}/move` | Body: `{"course":"6-B"}`; 202 + challenge |
//! | `PUT`    | `/students/{id}/grades/{activity_id}` | Body: `{"value":"4.5"}`; empty clears |
//! | `PUT`    | `/students/{id}/attendance/{date}` | Body: `{"status":"late"}`; `null` clears |
//! | `POST`   | `/students/{id}/attendance/{date}/cycle` | Returns the new status |
//! | `POST`   | `/students/{id}/annotations` | Body: `{"note":"...","date":"2025-03-03"}` |
//! | `DELETE` | `/students/{id}/annotations/{index}` | 202 + challenge |
//! | `PUT`    | `/students/{id}/materials/{column_id}` | Body: `{"value":"yes"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use classbook_core::{
  gate::GatedAction,
  gradebook::Gradebook,
  store::DocumentStore,
  student::{AttendanceStatus, StudentRecord},
};
use serde::{Deserialize, Serialize};

use crate::{confirmations::challenge, error::ApiError};

fn found(applied: bool, id: &str) -> Result<StatusCode, ApiError> {
  if applied { Ok(StatusCode::NO_CONTENT) } else { Err(ApiError::not_found(id)) }
}

// ─── Records ──────────────────────────────────────────────────────────────────

/// `GET /students`
pub async fn list<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
) -> Result<Json<Vec<StudentRecord>>, ApiError>
where
  S: DocumentStore + 'static,
{
  let today = gradebook.today();
  let students = gradebook.get_students().await?;
  Ok(Json(students.iter().map(|s| s.to_record(today)).collect()))
}

/// `POST /students`
pub async fn create<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Json(record): Json<StudentRecord>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + 'static,
{
  let student = gradebook.add_student(record).await?;
  Ok((StatusCode::CREATED, Json(student.to_record(gradebook.today()))))
}

/// `GET /students/{id}`
pub async fn get_one<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(id): Path<String>,
) -> Result<Json<StudentRecord>, ApiError>
where
  S: DocumentStore + 'static,
{
  let student = gradebook
    .get_student(&id)
    .await?
    .ok_or_else(|| ApiError::not_found(&id))?;
  Ok(Json(student.to_record(gradebook.today())))
}

/// `PUT /students/{id}`. The path id wins over any id in the body.
pub async fn update<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(id): Path<String>,
  Json(mut record): Json<StudentRecord>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  record.id = Some(id.clone());
  found(gradebook.update_student(record).await?, &id)
}

/// `DELETE /students/{id}`
pub async fn delete<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(id): Path<String>,
) -> impl IntoResponse
where
  S: DocumentStore + 'static,
{
  challenge(&gradebook, GatedAction::DeleteStudent { student_id: id })
}

#[derive(Debug, Deserialize)]
pub struct MoveBody {
  pub course: String,
}

/// `POST /students/{id}/move`
pub async fn move_to<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(id): Path<String>,
  Json(body): Json<MoveBody>,
) -> impl IntoResponse
where
  S: DocumentStore + 'static,
{
  challenge(&gradebook, GatedAction::MoveStudent {
    student_id: id,
    course:     body.course,
  })
}

// ─── Cells ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ValueBody {
  #[serde(default)]
  pub value: String,
}

/// `PUT /students/{id}/grades/{activity_id}`
pub async fn set_grade<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path((id, activity_id)): Path<(String, String)>,
  Json(body): Json<ValueBody>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  found(gradebook.set_grade(&id, &activity_id, &body.value).await?, &id)
}

/// `PUT /students/{id}/materials/{column_id}`
pub async fn set_material<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path((id, column_id)): Path<(String, String)>,
  Json(body): Json<ValueBody>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  found(gradebook.set_material_value(&id, &column_id, &body.value).await?, &id)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusBody {
  pub status: Option<AttendanceStatus>,
}

/// `PUT /students/{id}/attendance/{date}`
pub async fn set_attendance<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path((id, date)): Path<(String, NaiveDate)>,
  Json(body): Json<StatusBody>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  found(gradebook.set_attendance(&id, date, body.status).await?, &id)
}

/// `POST /students/{id}/attendance/{date}/cycle`
pub async fn cycle_attendance<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path((id, date)): Path<(String, NaiveDate)>,
) -> Result<Json<StatusBody>, ApiError>
where
  S: DocumentStore + 'static,
{
  match gradebook.cycle_attendance(&id, date).await? {
    Some(status) => Ok(Json(StatusBody { status: Some(status) })),
    None => Err(ApiError::not_found(&id)),
  }
}

// ─── Annotations ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnnotationBody {
  pub note: String,
  /// Defaults to today.
  pub date: Option<NaiveDate>,
}

/// `POST /students/{id}/annotations`
pub async fn add_annotation<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(id): Path<String>,
  Json(body): Json<AnnotationBody>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  if gradebook.add_annotation(&id, body.date, &body.note).await? {
    Ok(StatusCode::CREATED)
  } else {
    Err(ApiError::not_found(&id))
  }
}

/// `DELETE /students/{id}/annotations/{index}`
pub async fn delete_annotation<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path((id, index)): Path<(String, usize)>,
) -> impl IntoResponse
where
  S: DocumentStore + 'static,
{
  challenge(&gradebook, GatedAction::DeleteAnnotation { student_id: id, index })
}
