//! Student records.
//!
//! Two shapes exist. [`StudentRecord`] is the wire shape found in the stored
//! document and in backups: every field optional, values loosely typed, and
//! unknown keys preserved. [`Student`] is the sanitized domain type produced
//! by [`crate::sanitize::sanitize`]; every field has a concrete value.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Placeholder written into any missing text field.
pub const PENDING: &str = "Pending";
/// Placeholder written into a missing guardian email.
pub const PENDING_EMAIL: &str = "pending@pending.co";

pub const MIN_GRADE: f64 = 0.0;
pub const MAX_GRADE: f64 = 5.0;

// ─── Jornada ─────────────────────────────────────────────────────────────────

/// School shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Jornada {
  #[serde(rename = "Mañana")]
  Morning,
  #[serde(rename = "Tarde")]
  Afternoon,
}

impl Jornada {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Morning => "Mañana",
      Self::Afternoon => "Tarde",
    }
  }

  /// Lenient parse; anything unrecognised is `None`.
  pub fn parse(input: &str) -> Option<Self> {
    match input.trim() {
      "Mañana" | "Manana" | "mañana" | "manana" => Some(Self::Morning),
      "Tarde" | "tarde" => Some(Self::Afternoon),
      _ => None,
    }
  }
}

// ─── Attendance ──────────────────────────────────────────────────────────────

/// One attendance cell. A date with no entry means attendance was not taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
  Present,
  Absent,
  Late,
}

impl AttendanceStatus {
  pub const ALL: [Self; 3] = [Self::Present, Self::Absent, Self::Late];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Present => "present",
      Self::Absent => "absent",
      Self::Late => "late",
    }
  }

  pub fn parse(input: &str) -> Option<Self> {
    match input.trim().to_ascii_lowercase().as_str() {
      "present" => Some(Self::Present),
      "absent" => Some(Self::Absent),
      "late" => Some(Self::Late),
      _ => None,
    }
  }

  /// present → absent → late → present.
  pub fn next(self) -> Self {
    match self {
      Self::Present => Self::Absent,
      Self::Absent => Self::Late,
      Self::Late => Self::Present,
    }
  }

  /// The status a click on a cell moves to.
  ///
  /// An unset cell is first read through `missing`: under
  /// [`MissingAttendance::Present`] it already shows as present and moves on
  /// to absent; under [`MissingAttendance::Excluded`] it becomes present.
  pub fn cycle(current: Option<Self>, missing: MissingAttendance) -> Self {
    match (current, missing) {
      (Some(status), _) => status.next(),
      (None, MissingAttendance::Present) => Self::Present.next(),
      (None, MissingAttendance::Excluded) => Self::Present,
    }
  }
}

/// How a date with no entry for a student is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAttendance {
  /// Not recorded; counted in no tally.
  #[default]
  Excluded,
  /// Treated as present.
  Present,
}

// ─── Grades ──────────────────────────────────────────────────────────────────

/// Numeric value of a stored grade cell, if it has one.
///
/// Accepts a comma as the decimal separator. No range check: values that
/// arrived through an import are averaged as they are.
pub fn grade_value(cell: &str) -> Option<f64> {
  let cell = cell.trim();
  if cell.is_empty() {
    return None;
  }
  cell
    .replace(',', ".")
    .parse::<f64>()
    .ok()
    .filter(|v| v.is_finite())
}

/// Validate and normalise a grade entered by the teacher.
///
/// Returns `Ok(None)` for an empty input (the cell is cleared) and the value
/// formatted with one decimal place otherwise.
pub fn normalize_grade(input: &str) -> Result<Option<String>> {
  if input.trim().is_empty() {
    return Ok(None);
  }
  match grade_value(input) {
    Some(v) if (MIN_GRADE..=MAX_GRADE).contains(&v) => Ok(Some(format!("{v:.1}"))),
    _ => Err(Error::InvalidGrade(input.to_owned())),
  }
}

// ─── Annotations ─────────────────────────────────────────────────────────────

/// `"[YYYY-MM-DD] note"`.
pub fn format_annotation(date: NaiveDate, note: &str) -> String {
  format!("[{}] {}", date.format("%Y-%m-%d"), note.trim())
}

/// Split an annotation into its date and text. `None` when the prefix is
/// missing or malformed.
pub fn parse_annotation(annotation: &str) -> Option<(NaiveDate, &str)> {
  let rest = annotation.strip_prefix('[')?;
  let (date, text) = rest.split_once(']')?;
  let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
  Some((date, text.trim_start()))
}

// ─── Age ─────────────────────────────────────────────────────────────────────

/// Calendar-year difference between `birth` and `today`, floored at zero.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
  u32::try_from(today.year() - birth.year()).unwrap_or(0)
}

// ─── StudentRecord ───────────────────────────────────────────────────────────

/// A student as it appears in the stored JSON document.
///
/// Values are kept as raw JSON where older documents are known to disagree
/// on the type (ages typed into a form arrive as strings, grades may be
/// numbers).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:            Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:          Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub birth_date:    Option<String>,
  /// Derived on write; read only as a fallback when `birth_date` is absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub age:           Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub jornada:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_name:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_phone:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_phone2: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_email:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub vps_code:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub generic_obs:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub grades:        Option<BTreeMap<String, Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub attendance:    Option<BTreeMap<String, Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub materials:     Option<BTreeMap<String, Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub annotations:   Option<Vec<Value>>,
  /// Older documents stored annotations under this key.
  #[serde(default, skip_serializing)]
  pub observations:  Option<Vec<Value>>,
  /// Keys this version does not know about; written back untouched.
  #[serde(flatten)]
  pub extra:         Map<String, Value>,
}

// ─── Student ─────────────────────────────────────────────────────────────────

/// A sanitized student. Build one with [`crate::sanitize::sanitize`].
///
/// There is no stored age: [`Student::age_on`] derives it from
/// `birth_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct Student {
  pub id:            String,
  pub name:          String,
  /// Free-text course label; acts as the foreign key into the course list.
  pub course:        String,
  pub birth_date:    NaiveDate,
  pub jornada:       Option<Jornada>,
  pub parent_name:   String,
  pub parent_phone:  String,
  pub parent_phone2: String,
  pub parent_email:  String,
  /// Externally assigned reference code, opaque here.
  pub vps_code:      String,
  pub generic_obs:   String,
  /// Activity id → grade cell.
  pub grades:        BTreeMap<String, String>,
  pub attendance:    BTreeMap<NaiveDate, AttendanceStatus>,
  /// Material column id → assigned value.
  pub materials:     BTreeMap<String, String>,
  /// `"[YYYY-MM-DD] note"` entries, oldest first.
  pub annotations:   Vec<String>,
  pub extra:         Map<String, Value>,
}

impl Student {
  pub fn age_on(&self, today: NaiveDate) -> u32 { age_on(self.birth_date, today) }

  /// Convert back to the stored shape, writing the age derived for `today`.
  pub fn to_record(&self, today: NaiveDate) -> StudentRecord {
    let text = |v: &String| Value::String(v.clone());
    StudentRecord {
      id:            Some(self.id.clone()),
      name:          Some(self.name.clone()),
      course:        Some(self.course.clone()),
      birth_date:    Some(self.birth_date.format("%Y-%m-%d").to_string()),
      age:           Some(Value::from(self.age_on(today))),
      jornada:       self.jornada.map(|j| j.as_str().to_owned()),
      parent_name:   Some(self.parent_name.clone()),
      parent_phone:  Some(self.parent_phone.clone()),
      parent_phone2: Some(self.parent_phone2.clone()),
      parent_email:  Some(self.parent_email.clone()),
      vps_code:      Some(self.vps_code.clone()),
      generic_obs:   Some(self.generic_obs.clone()),
      grades:        Some(self.grades.iter().map(|(k, v)| (k.clone(), text(v))).collect()),
      attendance:    Some(
        self
          .attendance
          .iter()
          .map(|(d, s)| (d.format("%Y-%m-%d").to_string(), Value::from(s.as_str())))
          .collect(),
      ),
      materials:     Some(self.materials.iter().map(|(k, v)| (k.clone(), text(v))).collect()),
      annotations:   Some(self.annotations.iter().map(text).collect()),
      observations:  None,
      extra:         self.extra.clone(),
    }
  }

  /// Annotations with a parseable date prefix, in stored order.
  pub fn dated_annotations(&self) -> impl Iterator<Item = (NaiveDate, &str)> + '_ {
    self.annotations.iter().filter_map(|a| parse_annotation(a))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn attendance_cycles_through_all_states() {
    let mut s = AttendanceStatus::Present;
    s = s.next();
    assert_eq!(s, AttendanceStatus::Absent);
    s = s.next();
    assert_eq!(s, AttendanceStatus::Late);
    s = s.next();
    assert_eq!(s, AttendanceStatus::Present);
  }

  #[test]
  fn unset_cell_cycle_depends_on_missing_policy() {
    assert_eq!(
      AttendanceStatus::cycle(None, MissingAttendance::Excluded),
      AttendanceStatus::Present
    );
    assert_eq!(
      AttendanceStatus::cycle(None, MissingAttendance::Present),
      AttendanceStatus::Absent
    );
  }

  #[test]
  fn normalize_grade_formats_one_decimal() {
    assert_eq!(normalize_grade("4").unwrap().as_deref(), Some("4.0"));
    assert_eq!(normalize_grade("3,5").unwrap().as_deref(), Some("3.5"));
    assert_eq!(normalize_grade(" ").unwrap(), None);
  }

  #[test]
  fn normalize_grade_rejects_out_of_range_and_garbage() {
    assert!(matches!(normalize_grade("5.1"), Err(Error::InvalidGrade(_))));
    assert!(matches!(normalize_grade("-1"), Err(Error::InvalidGrade(_))));
    assert!(matches!(normalize_grade("abc"), Err(Error::InvalidGrade(_))));
    assert!(matches!(normalize_grade("NaN"), Err(Error::InvalidGrade(_))));
  }

  #[test]
  fn annotation_roundtrip() {
    let a = format_annotation(date(2024, 3, 5), "  talked in class ");
    assert_eq!(a, "[2024-03-05] talked in class");
    assert_eq!(parse_annotation(&a), Some((date(2024, 3, 5), "talked in class")));
    assert_eq!(parse_annotation("no prefix"), None);
    assert_eq!(parse_annotation("[yesterday] x"), None);
  }

  #[test]
  fn age_is_calendar_year_difference() {
    // Birthday later in the year still counts the full year.
    assert_eq!(age_on(date(2014, 12, 31), date(2024, 1, 1)), 10);
    assert_eq!(age_on(date(2030, 1, 1), date(2024, 1, 1)), 0);
  }

  #[test]
  fn jornada_parse_is_lenient() {
    assert_eq!(Jornada::parse("Mañana"), Some(Jornada::Morning));
    assert_eq!(Jornada::parse(" Tarde "), Some(Jornada::Afternoon));
    assert_eq!(Jornada::parse("Noche"), None);
  }

  #[test]
  fn record_keeps_unknown_keys() {
    let json = r#"{"id":"a","name":"Ana","houseTeam":"red"}"#;
    let record: StudentRecord = serde_json::from_str(json).unwrap();
    assert_eq!(record.extra.get("houseTeam"), Some(&Value::from("red")));
    let back = serde_json::to_value(&record).unwrap();
    assert_eq!(back["houseTeam"], "red");
  }
}
