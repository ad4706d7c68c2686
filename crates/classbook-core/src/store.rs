//! The `DocumentStore` trait.
//!
//! Implemented by storage backends (e.g. `classbook-store-sqlite`). The
//! [`Gradebook`](crate::gradebook::Gradebook) service and the outer crates
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{document::Document, settings::Settings};

/// Key of the gradebook document.
pub const DOCUMENT_KEY: &str = "sms_data_v1";
/// Key of the settings document.
pub const SETTINGS_KEY: &str = "sms_settings";

/// Persistence for the gradebook document and the settings.
///
/// The whole document is read and written at once. There is no merge and
/// no conflict detection: the last write wins.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the current document, migrated and sanitized. `today` anchors
  /// the birth dates the sanitizer synthesises.
  ///
  /// An empty store yields an empty document. A stored document that does
  /// not parse is set aside and an empty document is returned in its place.
  fn load(
    &self,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  /// Replace the stored document.
  fn save(
    &self,
    doc: Document,
    today: NaiveDate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Load, apply `f` and save, as one atomic step.
  ///
  /// Nothing is written when `f` leaves the document unchanged.
  fn modify<F, T>(
    &self,
    today: NaiveDate,
    f: F,
  ) -> impl Future<Output = Result<T, Self::Error>> + Send + '_
  where
    F: FnOnce(&mut Document) -> T + Send + 'static,
    T: Send + 'static;

  fn load_settings(&self) -> impl Future<Output = Result<Settings, Self::Error>> + Send + '_;

  fn save_settings(
    &self,
    settings: Settings,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
