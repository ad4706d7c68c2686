//! Handlers for `/settings` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`   | `/settings` | Profile and preferences; the code hash is never returned |
//! | `PATCH` | `/settings` | Body: `{"teacherName":"...","subject":"..."}`, both optional |
//! | `PUT`   | `/settings/code` | Body: `{"current":"6251","new":"8080","confirm":"8080"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
};
use classbook_core::{gradebook::Gradebook, settings::Settings, store::DocumentStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
  pub teacher_name: String,
  pub subject:      String,
  /// `false` while the factory code is still in use.
  pub custom_code:  bool,
  #[serde(flatten)]
  pub preferences:  Map<String, Value>,
}

impl From<Settings> for SettingsView {
  fn from(settings: Settings) -> Self {
    Self {
      custom_code:  !settings.security_code.is_default(),
      teacher_name: settings.teacher_name,
      subject:      settings.subject,
      preferences:  settings.extra,
    }
  }
}

/// `GET /settings`
pub async fn get<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
) -> Result<Json<SettingsView>, ApiError>
where
  S: DocumentStore + 'static,
{
  Ok(Json(gradebook.settings().await?.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBody {
  pub teacher_name: Option<String>,
  pub subject:      Option<String>,
}

/// `PATCH /settings`
pub async fn update<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Json(body): Json<ProfileBody>,
) -> Result<Json<SettingsView>, ApiError>
where
  S: DocumentStore + 'static,
{
  let settings = gradebook
    .update_profile(body.teacher_name, body.subject)
    .await?;
  Ok(Json(settings.into()))
}

#[derive(Debug, Deserialize)]
pub struct CodeChange {
  pub current: String,
  pub new:     String,
  pub confirm: String,
}

/// `PUT /settings/code`
pub async fn change_code<S>(
  State(gradebook): State<Arc<Gradebook<S>>>,
  Json(body): Json<CodeChange>,
) -> Result<StatusCode, ApiError>
where
  S: DocumentStore + 'static,
{
  gradebook
    .change_security_code(&body.current, &body.new, &body.confirm)
    .await?;
  tracing::info!("security code changed");
  Ok(StatusCode::NO_CONTENT)
}
