//! The record sanitizer.
//!
//! Runs on every student that is read from or written to the document. Any
//! missing field gets its placeholder, loose JSON values are coerced into
//! their domain types, and a birth date is synthesised when none is stored.
//! Sanitizing a sanitized student is a no-op.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use uuid::Uuid;

use crate::student::{
  AttendanceStatus, Jornada, PENDING, PENDING_EMAIL, Student, StudentRecord,
};

/// Age assumed when a record carries neither a birth date nor an age.
pub const DEFAULT_AGE: i32 = 10;

/// Produce a complete [`Student`] from a raw record.
///
/// `today` anchors the birth date synthesised from a legacy `age` (January 1
/// of `today.year - age`) or from [`DEFAULT_AGE`].
pub fn sanitize(record: StudentRecord, today: NaiveDate) -> Student {
  let birth_date = record
    .birth_date
    .as_deref()
    .and_then(parse_date)
    .unwrap_or_else(|| {
      let age = record
        .age
        .as_ref()
        .and_then(legacy_age)
        .unwrap_or(DEFAULT_AGE);
      january_first(today.year() - age)
    });

  let grades = text_map(record.grades);
  let materials = text_map(record.materials);

  let attendance = record
    .attendance
    .unwrap_or_default()
    .into_iter()
    .filter_map(|(date, status)| {
      let date = parse_date(&date)?;
      let status = status.as_str().and_then(AttendanceStatus::parse)?;
      Some((date, status))
    })
    .collect();

  let annotations = record
    .annotations
    .or(record.observations)
    .unwrap_or_default()
    .iter()
    .filter_map(value_text)
    .collect();

  Student {
    id: non_empty(record.id).unwrap_or_else(|| Uuid::new_v4().to_string()),
    name: or_pending(record.name),
    course: or_pending(record.course),
    birth_date,
    jornada: record.jornada.as_deref().and_then(Jornada::parse),
    parent_name: or_pending(record.parent_name),
    parent_phone: or_pending(record.parent_phone),
    parent_phone2: or_pending(record.parent_phone2),
    parent_email: non_empty(record.parent_email)
      .unwrap_or_else(|| PENDING_EMAIL.to_owned()),
    vps_code: or_pending(record.vps_code),
    generic_obs: record.generic_obs.unwrap_or_default(),
    grades,
    attendance,
    materials,
    annotations,
    extra: record.extra,
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn non_empty(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

fn or_pending(value: Option<String>) -> String {
  non_empty(value).unwrap_or_else(|| PENDING.to_owned())
}

fn parse_date(input: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

fn january_first(year: i32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// A positive age from a number or a numeric string.
fn legacy_age(value: &Value) -> Option<i32> {
  let age = match value {
    Value::Number(n) => n.as_f64()?,
    Value::String(s) => s.trim().parse::<f64>().ok()?,
    _ => return None,
  };
  (age.is_finite() && age >= 1.0 && age < 150.0).then_some(age as i32)
}

/// Strings pass through; numbers and booleans are rendered; null drops out.
fn value_text(value: &Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    other => Some(other.to_string()),
  }
}

fn text_map(map: Option<BTreeMap<String, Value>>) -> BTreeMap<String, String> {
  map
    .unwrap_or_default()
    .into_iter()
    .filter_map(|(k, v)| Some((k, value_text(&v)?)))
    .collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 6, 15).unwrap() }

  fn record(value: Value) -> StudentRecord { serde_json::from_value(value).unwrap() }

  #[test]
  fn empty_record_gets_placeholders() {
    let s = sanitize(StudentRecord::default(), today());
    assert_eq!(s.name, PENDING);
    assert_eq!(s.course, PENDING);
    assert_eq!(s.parent_name, PENDING);
    assert_eq!(s.parent_phone, PENDING);
    assert_eq!(s.parent_phone2, PENDING);
    assert_eq!(s.vps_code, PENDING);
    assert_eq!(s.parent_email, PENDING_EMAIL);
    assert!(s.grades.is_empty());
    assert!(s.attendance.is_empty());
    assert!(s.materials.is_empty());
    assert!(s.annotations.is_empty());
    assert!(!s.id.is_empty());
    assert_eq!(s.age_on(today()), 10);
  }

  #[test]
  fn empty_strings_count_as_missing() {
    let s = sanitize(record(json!({ "name": "  ", "parentEmail": "" })), today());
    assert_eq!(s.name, PENDING);
    assert_eq!(s.parent_email, PENDING_EMAIL);
  }

  #[test]
  fn legacy_age_synthesises_birth_date() {
    let s = sanitize(record(json!({ "age": 12 })), today());
    assert_eq!(s.birth_date, NaiveDate::from_ymd_opt(2013, 1, 1).unwrap());
    assert_eq!(s.age_on(today()), 12);

    // Registration forms stored the age as a string.
    let s = sanitize(record(json!({ "age": "9" })), today());
    assert_eq!(s.age_on(today()), 9);
  }

  #[test]
  fn stored_age_is_ignored_when_birth_date_exists() {
    let s = sanitize(
      record(json!({ "birthDate": "2015-09-30", "age": 40 })),
      today(),
    );
    assert_eq!(s.age_on(today()), 10);
  }

  #[test]
  fn age_follows_the_clock_not_the_record() {
    let s = sanitize(record(json!({ "birthDate": "2015-09-30" })), today());
    let next_year = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
    assert_eq!(s.age_on(today()), 10);
    assert_eq!(s.age_on(next_year), 11);
  }

  #[test]
  fn loose_values_are_coerced() {
    let s = sanitize(
      record(json!({
        "grades": { "a1": 4, "a2": "3.5", "a3": null },
        "attendance": { "2025-03-01": "present", "bad-date": "absent", "2025-03-02": "asleep" },
        "observations": ["[2025-01-10] old note"],
        "jornada": "Noche"
      })),
      today(),
    );
    assert_eq!(s.grades.get("a1").map(String::as_str), Some("4"));
    assert_eq!(s.grades.get("a2").map(String::as_str), Some("3.5"));
    assert!(!s.grades.contains_key("a3"));
    assert_eq!(s.attendance.len(), 1);
    assert_eq!(s.annotations, vec!["[2025-01-10] old note".to_string()]);
    assert_eq!(s.jornada, None);
  }

  #[test]
  fn annotations_win_over_legacy_observations() {
    let s = sanitize(
      record(json!({ "annotations": ["[2025-02-01] new"], "observations": [] })),
      today(),
    );
    assert_eq!(s.annotations, vec!["[2025-02-01] new".to_string()]);
  }

  #[test]
  fn sanitize_is_idempotent() {
    let raw = record(json!({
      "id": "s-1",
      "name": "Lucía",
      "age": "11",
      "jornada": "Tarde",
      "grades": { "a1": "4.0", "a2": "" },
      "attendance": { "2025-03-01": "late" },
      "materials": { "m1": "violin" },
      "annotations": ["[2025-03-01] great focus"],
      "custom": { "nested": true }
    }));
    let once = sanitize(raw, today());
    let twice = sanitize(once.to_record(today()), today());
    assert_eq!(once, twice);
  }
}
