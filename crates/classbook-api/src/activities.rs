//! Handlers for `/courses/{course}/activities` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/courses/{course}/activities` | In column order |
//! | `POST`   | `/courses/{course}/activities` | Body: `{"name":"Quiz","date":"2025-03-03"}`; 201 + activity |
//! | `PUT`    | `/courses/{course}/activities/{id}` | Body: `{"name":"...","date":null}`; lock state is kept |
//! | `DELETE` | `/courses/{course}/activities/{id}` | 202 + challenge; grades go with it |
//! | `POST`   | `/courses/{course}/activities/{id}/lock` | Immediate |
//! | `POST`   | `/courses/{course}/activities/{id}/unlock` | 202 + challenge |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use classbook_core::{
  document::Activity, gate::GatedAction, gradebook::Gradebook, store::DocumentStore,
};
use serde::Deserialize;

use crate::{confirmations::challenge, error::ApiError};

/// `GET /courses/{course}/activities`
pub async fn list<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(course): Path<String>,
) -> Result<Json<Vec<Activity>>, ApiError>
where
  S: DocumentStore + 'static,
{
  Ok(Json(gradebook.get_activities(&course).await?))
}

#[derive(Debug, Deserialize)]
pub struct ActivityBody {
  pub name: String,
  #[serde(default)]
  pub date: Option<NaiveDate>,
}

/// `POST /courses/{course}/activities`
pub async fn create<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path(course): Path<String>,
  Json(body): Json<ActivityBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + 'static,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("activity name must not be empty".to_owned()));
  }
  let activity = gradebook.add_activity(&course, &body.name, body.date).await?;
  Ok((StatusCode::CREATED, Json(activity)))
}

/// `PUT /courses/{course}/activities/{id}`
pub async fn update<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path((course, id)): Path<(String, String)>,
  Json(body): Json<ActivityBody>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  let activity = Activity {
    id:     id.clone(),
    name:   body.name,
    date:   body.date,
    locked: false,
  };
  if gradebook.update_activity(&course, activity).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::not_found(&id))
  }
}

/// `DELETE /courses/{course}/activities/{id}`
pub async fn delete<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path((course, activity_id)): Path<(String, String)>,
) -> impl IntoResponse
where
  S: DocumentStore + 'static,
{
  challenge(&gradebook, GatedAction::DeleteActivity { course, activity_id })
}

/// `POST /courses/{course}/activities/{id}/lock`
pub async fn lock<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path((course, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  if gradebook.lock_activity(&course, &id).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::not_found(&id))
  }
}

/// `POST /courses/{course}/activities/{id}/unlock`
pub async fn unlock<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Path((course, activity_id)): Path<(String, String)>,
) -> impl IntoResponse
where
  S: DocumentStore + 'static,
{
  challenge(&gradebook, GatedAction::UnlockActivity { course, activity_id })
}
