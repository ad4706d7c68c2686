//! JSON REST API for Classbook.
//!
//! Exposes an axum [`Router`] backed by a [`Gradebook`] over any
//! [`classbook_core::store::DocumentStore`]. Auth and TLS are the caller's
//! responsibility; the security code only guards against accidents.
//!
//! Destructive endpoints do not act directly. They answer `202 Accepted` with
//! a [`classbook_core::gate::Challenge`], and the action runs once the token
//! is confirmed with the security code at `POST /confirmations/{token}`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", classbook_api::api_router(gradebook.clone()))
//! ```

pub mod activities;
pub mod backup;
pub mod confirmations;
pub mod courses;
pub mod error;
pub mod reports;
pub mod settings;
pub mod students;


use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use classbook_core::{
  gate::CourseDeletionGuard, gradebook::Gradebook, store::DocumentStore,
  student::MissingAttendance,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Config ──────────────────────────────────────────────────────────────────

/// Server configuration, read from `classbook.toml` and `CLASSBOOK_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  /// Path of the SQLite file. `~` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  /// How an empty attendance cell is read by tallies and cycling.
  #[serde(default)]
  pub attendance_missing: MissingAttendance,
  /// Seconds a course deletion ticket waits before it can be confirmed.
  #[serde(default = "default_deletion_cooldown")]
  pub deletion_cooldown:  u64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/classbook/classbook.db") }

fn default_deletion_cooldown() -> u64 { CourseDeletionGuard::COOLDOWN.as_secs() }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `gradebook`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(gradebook: Arc<Gradebook<S>>) -> Router<()>
where
  S: DocumentStore + 'static,
{
  Router::new()
    // Students
    .route("/students", get(students::list::<S>).post(students::create::<S>))
    .route(
      "/students/{id}",
      get(students::get_one::<S>)
        .put(students::update::<S>)
        .delete(students::delete::<S>),
    )
    .route("/students/{id}/move", post(students::move_to::<S>))
    .route("/students/{id}/grades/{activity_id}", put(students::set_grade::<S>))
    .route(
      "/students/{id}/attendance/{date}",
      put(students::set_attendance::<S>),
    )
    .route(
      "/students/{id}/attendance/{date}/cycle",
      post(students::cycle_attendance::<S>),
    )
    .route("/students/{id}/annotations", post(students::add_annotation::<S>))
    .route(
      "/students/{id}/annotations/{index}",
      delete(students::delete_annotation::<S>),
    )
    .route(
      "/students/{id}/materials/{column_id}",
      put(students::set_material::<S>),
    )
    // Courses
    .route("/overview", get(courses::overview::<S>))
    .route("/courses", get(courses::list::<S>).post(courses::create::<S>))
    .route(
      "/courses/{course}",
      get(courses::view::<S>)
        .put(courses::rename::<S>)
        .delete(courses::delete::<S>),
    )
    .route("/courses/{course}/students", get(courses::students::<S>))
    .route(
      "/courses/{course}/attendance/{date}",
      delete(courses::delete_attendance_column::<S>),
    )
    .route(
      "/courses/{course}/materials",
      get(courses::materials::<S>).post(courses::add_material::<S>),
    )
    .route(
      "/courses/{course}/materials/{id}",
      delete(courses::delete_material::<S>),
    )
    // Activities
    .route(
      "/courses/{course}/activities",
      get(activities::list::<S>).post(activities::create::<S>),
    )
    .route(
      "/courses/{course}/activities/{id}",
      put(activities::update::<S>).delete(activities::delete::<S>),
    )
    .route("/courses/{course}/activities/{id}/lock", post(activities::lock::<S>))
    .route("/courses/{course}/activities/{id}/unlock", post(activities::unlock::<S>))
    // Confirmations
    .route("/confirmations", post(confirmations::request::<S>))
    .route(
      "/confirmations/{token}",
      post(confirmations::confirm::<S>).delete(confirmations::cancel::<S>),
    )
    .route(
      "/course-deletions/{token}",
      post(confirmations::confirm_course_deletion::<S>)
        .delete(confirmations::cancel_course_deletion::<S>),
    )
    // Reports, backup, settings
    .route("/reports/roster", get(reports::roster::<S>))
    .route("/reports/gradebook", get(reports::gradebook::<S>))
    .route("/backup", get(backup::export::<S>).post(backup::import::<S>))
    .route("/seed", post(backup::seed::<S>))
    .route("/settings", get(settings::get::<S>).patch(settings::update::<S>))
    .route("/settings/code", put(settings::change_code::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(gradebook)
}
