//! Handlers for `/reports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/reports/roster` | Optional `?course=6-A` (default all) and `?fields=name,age,...` |
//! | `GET` | `/reports/gradebook` | Optional `?course=6-A` |
//!
//! Both answer JSON by default. `?format=text` returns the plain-text
//! rendering, served as an attachment named after the report.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use classbook_core::{
  gradebook::Gradebook,
  report::{Report, RosterField, Scope},
  store::DocumentStore,
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Format {
  #[default]
  Json,
  Text,
}

#[derive(Debug, Deserialize)]
pub struct ReportParams {
  pub course: Option<String>,
  /// Comma-separated roster field keys.
  pub fields: Option<String>,
  #[serde(default)]
  pub format: Format,
}

fn respond(report: Report, format: Format) -> Response {
  match format {
    Format::Json => Json(report).into_response(),
    Format::Text => (
      [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_owned()),
        (
          header::CONTENT_DISPOSITION,
          format!("attachment; filename=\"{}.txt\"", report.file_stem),
        ),
      ],
      report.to_text(),
    )
      .into_response(),
  }
}

/// `GET /reports/roster[?course=...][&fields=...][&format=...]`
pub async fn roster<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Query(params): Query<ReportParams>,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
{
  let fields = match params.fields.as_deref() {
    None | Some("") => RosterField::default_selection(),
    Some(list) => list
      .split(',')
      .map(str::parse)
      .collect::<Result<Vec<RosterField>, _>>()
      .map_err(|e| ApiError::BadRequest(e.to_string()))?,
  };
  let scope = Scope::from_param(params.course.as_deref());
  let report = gradebook.roster_report(&scope, &fields).await?;
  Ok(respond(report, params.format))
}

/// `GET /reports/gradebook[?course=...][&format=...]`
pub async fn gradebook<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Query(params): Query<ReportParams>,
) -> Result<Response, ApiError>
where
  S: DocumentStore + 'static,
{
  let scope = Scope::from_param(params.course.as_deref());
  let report = gradebook.gradebook_report(&scope).await?;
  Ok(respond(report, params.format))
}
