//! Backup files.
//!
//! A backup is the whole gradebook document, pretty-printed. Importing one
//! replaces the stored document wholesale; nothing is merged.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::{Error, Result, document::Document};

/// `backup-YYYY-MM-DD-HHmm.json`
pub fn file_name(at: NaiveDateTime) -> String {
  format!("backup-{}.json", at.format("%Y-%m-%d-%H%M"))
}

pub fn export(doc: &Document, today: NaiveDate) -> Result<String> { doc.to_json_pretty(today) }

/// Validate and load a backup file.
///
/// The file must be a JSON object carrying both `students` and
/// `activities`; anything else is rejected before the store is touched.
pub fn parse(input: &str, today: NaiveDate) -> Result<Document> {
  let value: Value = serde_json::from_str(input)
    .map_err(|e| Error::InvalidBackup(format!("not valid JSON: {e}")))?;

  let Some(object) = value.as_object() else {
    return Err(Error::InvalidBackup("expected a JSON object".into()));
  };
  for key in ["students", "activities"] {
    if object.get(key).is_none_or(Value::is_null) {
      return Err(Error::InvalidBackup(format!("missing `{key}`")));
    }
  }

  Document::from_value(value, today).map_err(|e| Error::InvalidBackup(e.to_string()))
}
