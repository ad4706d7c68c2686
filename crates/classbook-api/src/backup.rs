//! Handlers for backup and sample data.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/backup` | Pretty JSON attachment named `backup-YYYY-MM-DD-HHMM.json` |
//! | `POST` | `/backup` | Body: a backup file; replaces everything, 400 if invalid |
//! | `POST` | `/seed` | Loads the sample classes into an empty gradebook |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::header,
  response::IntoResponse,
};
use classbook_core::{
  gradebook::{Gradebook, ImportSummary},
  store::DocumentStore,
};
use serde_json::{Value, json};

use crate::error::ApiError;

/// `GET /backup`
pub async fn export<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + 'static,
{
  let file = gradebook.export_backup().await?;
  Ok((
    [
      (header::CONTENT_TYPE, "application/json".to_owned()),
      (
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", file.file_name),
      ),
    ],
    file.contents,
  ))
}

/// `POST /backup`. The raw body is the file, whatever its content type.
pub async fn import<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  body: String,
) -> Result<Json<ImportSummary>, ApiError>
where
  S: DocumentStore + 'static,
{
  let summary = gradebook.import_backup(&body).await?;
  tracing::info!(
    students = summary.students,
    courses = summary.courses,
    "backup imported"
  );
  Ok(Json(summary))
}

/// `POST /seed`
pub async fn seed<S>(State(gradebook): State<Arc<Gradebook<S>>>) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore + 'static,
{
  let seeded = gradebook.seed_demo().await?;
  Ok(Json(json!({ "seeded": seeded })))
}
