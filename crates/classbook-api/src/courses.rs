//! Handlers for `/courses` and `/overview` endpoints.
//!
//! Course names are path segments; percent-encode names with spaces.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/overview` | Totals and per-course compliance |
//! | `GET`    | `/courses` | Course names in list order |
//! | `POST`   | `/courses` | Body: `{"name":"6-C"}`; 201, or 200 if it already exists |
//! | `GET`    | `/courses/{course}` | Gradebook view; optional `?sort=name\|<activity id>&dir=asc\|desc` |
//! | `PUT`    | `/courses/{course}` | Body: `{"name":"7-A"}`; 409 if a course with that name exists |
//! | `DELETE` | `/courses/{course}` | 202 + challenge; the confirmation opens a cool-down ticket |
//! | `GET`    | `/courses/{course}/students` | Sanitized records of the course |
//! | `DELETE` | `/courses/{course}/attendance/{date}` | Returns `{"removed":n}` |
//!
//! Attendance columns are the dates recorded for the course's students; a
//! column appears with its first cell, set under `/students/{id}/attendance`.
//! | `GET`    | `/courses/{course}/materials` | Material columns |
//! | `POST`   | `/courses/{course}/materials` | Body: `{"name":"Book"}`; 201 + column |
//! | `DELETE` | `/courses/{course}/materials/{id}` | Also clears the students' values |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use classbook_core::{
  aggregate::{Overview, SortDirection, SortKey},
  document::MaterialColumn,
  gate::GatedAction,
  gradebook::{CourseView, Gradebook},
  store::DocumentStore,
  student::StudentRecord,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{confirmations::challenge, error::ApiError};

/// `GET /overview`
pub async fn overview<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
) -> Result<Json<Overview>, ApiError>
where
  S: DocumentStore + 'static,
{
  Ok(Json(gradebook.overview().await?))
}

// ─── Course list ──────────────────────────────────────────────────────────────

/// `GET /courses`
pub async fn list<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: DocumentStore + 'static,
{
  Ok(Json(gradebook.get_courses().await?))
}

#[derive(Debug, Deserialize)]
pub struct NameBody {
  pub name: String,
}

impl NameBody {
  fn trimmed(&self) -> Result<&str, ApiError> {
    match self.name.trim() {
      "" => Err(ApiError::BadRequest("name must not be empty".to_owned())),
      name => Ok(name),
    }
  }
}

/// `POST /courses`
pub async fn create<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Json(body): Json<NameBody>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
  S: DocumentStore + 'static,
{
  let created = gradebook.add_course(body.trimmed()?).await?;
  let status = if created { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, Json(json!({ "created": created }))))
}

// ─── One course ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ViewParams {
  /// `name` (default) or an activity id.
  pub sort: Option<String>,
  #[serde(default)]
  pub dir:  SortDirection,
}

/// `GET /courses/{course}[?sort=...][&dir=...]`
pub async fn view<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(course): Path<String>,
  Query(params): Query<ViewParams>,
) -> Result<Json<CourseView>, ApiError>
where
  S: DocumentStore + 'static,
{
  if !gradebook.get_courses().await?.contains(&course) {
    return Err(ApiError::not_found(&course));
  }
  let key = match params.sort.as_deref() {
    None | Some("name") => SortKey::Name,
    Some(activity) => SortKey::Activity(activity.to_owned()),
  };
  Ok(Json(gradebook.course_view(&course, &key, params.dir).await?))
}

/// `PUT /courses/{course}`
pub async fn rename<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(course): Path<String>,
  Json(body): Json<NameBody>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  let new = body.trimmed()?;
  let courses = gradebook.get_courses().await?;
  if !courses.contains(&course) {
    return Err(ApiError::not_found(&course));
  }
  // Merging two courses moves students, which needs a confirmation.
  if new != course && courses.iter().any(|c| c == new) {
    return Err(ApiError::Conflict(format!("course {new} already exists")));
  }
  gradebook.update_course_name(&course, new).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /courses/{course}`
pub async fn delete<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(course): Path<String>,
) -> impl IntoResponse
where
  S: DocumentStore + 'static,
{
  challenge(&gradebook, GatedAction::DeleteCourse { course })
}

/// `GET /courses/{course}/students`
pub async fn students<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(course): Path<String>,
) -> Result<Json<Vec<StudentRecord>>, ApiError>
where
  S: DocumentStore + 'static,
{
  let today = gradebook.today();
  let students = gradebook.get_students_by_course(&course).await?;
  Ok(Json(students.iter().map(|s| s.to_record(today)).collect()))
}

// ─── Attendance columns ───────────────────────────────────────────────────────

/// `DELETE /courses/{course}/attendance/{date}`
pub async fn delete_attendance_column<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path((course, date)): Path<(String, NaiveDate)>,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore + 'static,
{
  let removed = gradebook.delete_attendance_column(&course, date).await?;
  Ok(Json(json!({ "removed": removed })))
}

// ─── Material columns ─────────────────────────────────────────────────────────

/// `GET /courses/{course}/materials`
pub async fn materials<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(course): Path<String>,
) -> Result<Json<Vec<MaterialColumn>>, ApiError>
where
  S: DocumentStore + 'static,
{
  Ok(Json(gradebook.get_materials(&course).await?))
}

/// `POST /courses/{course}/materials`
pub async fn add_material<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(course): Path<String>,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + 'static,
{
  let column = gradebook.add_material_column(&course, body.trimmed()?).await?;
  Ok((StatusCode::CREATED, Json(column)))
}

/// `DELETE /courses/{course}/materials/{id}`
pub async fn delete_material<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path((course, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  if gradebook.delete_material_column(&course, &id).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::not_found(&id))
  }
}
