//! Roster and gradebook reports.
//!
//! Reports are plain tables, one per course. Rendering them (text, JSON,
//! PDF) is left to the caller.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  aggregate::{SortDirection, SortKey, course_row_average, format_grade, sort_students},
  document::Document,
  student::{Student, grade_value},
};

// ─── Scope ───────────────────────────────────────────────────────────────────

/// Which courses a report covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
  /// Every course in the course list, in list order.
  #[default]
  All,
  Course(String),
}

impl Scope {
  /// `None` or `"all"` means every course.
  pub fn from_param(param: Option<&str>) -> Self {
    match param.map(str::trim) {
      None | Some("") | Some("all") => Self::All,
      Some(course) => Self::Course(course.to_owned()),
    }
  }

  fn courses(&self, doc: &Document) -> Vec<String> {
    match self {
      Self::All => doc.courses.clone(),
      Self::Course(c) => vec![c.clone()],
    }
  }

  fn file_suffix(&self) -> &str {
    match self {
      Self::All => "all_courses",
      Self::Course(c) => c,
    }
  }
}

// ─── Roster fields ───────────────────────────────────────────────────────────

/// A column the teacher can include in the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RosterField {
  VpsCode,
  Name,
  Age,
  Jornada,
  ParentName,
  ParentPhone,
  ParentEmail,
  GeneralObservations,
}

impl RosterField {
  /// Column order in the rendered table.
  pub const ALL: [Self; 8] = [
    Self::VpsCode,
    Self::Name,
    Self::Age,
    Self::Jornada,
    Self::ParentName,
    Self::ParentPhone,
    Self::ParentEmail,
    Self::GeneralObservations,
  ];

  pub fn default_selection() -> Vec<Self> {
    Self::ALL
      .into_iter()
      .filter(|f| *f != Self::GeneralObservations)
      .collect()
  }

  pub fn header(self) -> &'static str {
    match self {
      Self::VpsCode => "VPS",
      Self::Name => "Name",
      Self::Age => "Age",
      Self::Jornada => "Jornada",
      Self::ParentName => "Parent Name",
      Self::ParentPhone => "Phone",
      Self::ParentEmail => "Email",
      Self::GeneralObservations => "General Observations",
    }
  }

  pub fn key(self) -> &'static str {
    match self {
      Self::VpsCode => "vpsCode",
      Self::Name => "name",
      Self::Age => "age",
      Self::Jornada => "jornada",
      Self::ParentName => "parentName",
      Self::ParentPhone => "parentPhone",
      Self::ParentEmail => "parentEmail",
      Self::GeneralObservations => "generalObservations",
    }
  }

  fn cell(self, student: &Student, today: NaiveDate) -> String {
    match self {
      Self::VpsCode => dash_if_empty(&student.vps_code),
      Self::Name => student.name.clone(),
      Self::Age => student.age_on(today).to_string(),
      Self::Jornada => student.jornada.map(|j| j.as_str().to_owned()).unwrap_or_default(),
      Self::ParentName => student.parent_name.clone(),
      Self::ParentPhone => student.parent_phone.clone(),
      Self::ParentEmail => student.parent_email.clone(),
      Self::GeneralObservations => student.annotations.join("\n"),
    }
  }
}

impl fmt::Display for RosterField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown roster field {0:?}")]
pub struct UnknownField(pub String);

impl FromStr for RosterField {
  type Err = UnknownField;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    Self::ALL
      .into_iter()
      .find(|f| f.key().eq_ignore_ascii_case(s))
      .ok_or_else(|| UnknownField(s.to_owned()))
  }
}

fn dash_if_empty(value: &str) -> String {
  if value.trim().is_empty() { "-".to_owned() } else { value.to_owned() }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
  Roster,
  Gradebook,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
  pub course:  String,
  pub title:   String,
  pub headers: Vec<String>,
  pub rows:    Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
  pub kind:         ReportKind,
  /// File name without extension, e.g. `gradebook_all_courses`.
  pub file_stem:    String,
  pub generated_on: NaiveDate,
  pub tables:       Vec<ReportTable>,
}

fn sorted_students<'a>(doc: &'a Document, course: &'a str) -> Vec<&'a Student> {
  let mut students: Vec<&Student> = doc.students_by_course(course).collect();
  sort_students(&mut students, &SortKey::Name, SortDirection::Asc);
  students
}

/// Student list with the selected columns, in [`RosterField::ALL`] order.
pub fn roster(doc: &Document, scope: &Scope, fields: &[RosterField], today: NaiveDate) -> Report {
  let columns: Vec<RosterField> = RosterField::ALL
    .into_iter()
    .filter(|f| fields.contains(f))
    .collect();

  let tables = scope
    .courses(doc)
    .into_iter()
    .map(|course| {
      let rows = sorted_students(doc, &course)
        .into_iter()
        .map(|s| columns.iter().map(|f| f.cell(s, today)).collect())
        .collect();
      ReportTable {
        title: format!("Student List - {course}"),
        headers: columns.iter().map(|f| f.header().to_owned()).collect(),
        rows,
        course,
      }
    })
    .collect();

  Report {
    kind: ReportKind::Roster,
    file_stem: format!("student_report_{}", scope.file_suffix()),
    generated_on: today,
    tables,
  }
}

/// One column per activity plus the row average, empty cells counting as
/// the minimum grade.
pub fn gradebook(doc: &Document, scope: &Scope, today: NaiveDate) -> Report {
  let tables = scope
    .courses(doc)
    .into_iter()
    .map(|course| {
      let activities = doc.activities_for(&course);

      let mut headers = vec!["VPS".to_owned(), "Name".to_owned()];
      headers.extend(activities.iter().map(|a| a.name.clone()));
      headers.push("Avg.".to_owned());

      let rows = sorted_students(doc, &course)
        .into_iter()
        .map(|s| {
          let mut row = vec![dash_if_empty(&s.vps_code), s.name.clone()];
          row.extend(activities.iter().map(|a| {
            format_grade(s.grades.get(&a.id).and_then(|g| grade_value(g)))
          }));
          row.push(format_grade(course_row_average(s, activities)));
          row
        })
        .collect();

      ReportTable {
        title: format!("Gradebook - {course}"),
        headers,
        rows,
        course,
      }
    })
    .collect();

  Report {
    kind: ReportKind::Gradebook,
    file_stem: format!("gradebook_{}", scope.file_suffix()),
    generated_on: today,
    tables,
  }
}

impl Report {
  /// Plain-text rendering: one block per table, tab-separated cells.
  pub fn to_text(&self) -> String {
    let mut out = String::new();
    for (i, table) in self.tables.iter().enumerate() {
      if i > 0 {
        out.push('\n');
      }
      out.push_str(&table.title);
      out.push('\n');
      out.push_str(&format!("Generated: {}\n", self.generated_on.format("%Y-%m-%d")));
      out.push_str(&table.headers.join("\t"));
      out.push('\n');
      for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|c| c.replace('\n', " / ")).collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
      }
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::student::StudentRecord;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 6, 15).unwrap() }

  fn fixture() -> Document {
    let mut doc = Document::default();
    for (name, course, vps) in [
      ("bruno", "6-A", "V2"),
      ("Ana", "6-A", "V1"),
      ("Carla", "6-B", ""),
    ] {
      let record = StudentRecord {
        name: Some(name.into()),
        course: Some(course.into()),
        vps_code: Some(vps.into()),
        birth_date: Some("2014-03-01".into()),
        ..Default::default()
      };
      doc.add_student(record, today());
    }
    doc
  }

  #[test]
  fn roster_default_columns_and_order() {
    let doc = fixture();
    let report = roster(&doc, &Scope::All, &RosterField::default_selection(), today());
    assert_eq!(report.file_stem, "student_report_all_courses");
    assert_eq!(report.tables.len(), 2);

    let table = &report.tables[0];
    assert_eq!(table.title, "Student List - 6-A");
    assert_eq!(table.headers, [
      "VPS",
      "Name",
      "Age",
      "Jornada",
      "Parent Name",
      "Phone",
      "Email"
    ]);
    assert_eq!(table.rows[0][1], "Ana");
    assert_eq!(table.rows[1][1], "bruno");
    assert_eq!(table.rows[0][2], "11");
    assert_eq!(table.rows[0][3], "Mañana");
  }

  #[test]
  fn roster_observations_column_joins_annotations() {
    let mut doc = fixture();
    let ana = doc.students[1].id.clone();
    doc.add_annotation(&ana, today(), "one").unwrap();
    doc.add_annotation(&ana, today(), "two").unwrap();

    let scope = Scope::Course("6-A".into());
    let report = roster(&doc, &scope, &[RosterField::GeneralObservations, RosterField::Name], today());
    let table = &report.tables[0];
    assert_eq!(table.headers, ["Name", "General Observations"]);
    assert_eq!(table.rows[0][1], "[2025-06-15] one\n[2025-06-15] two");
    assert_eq!(report.file_stem, "student_report_6-A");
  }

  #[test]
  fn gradebook_counts_missing_cells_as_minimum() {
    let mut doc = fixture();
    let a = doc.add_activity("6-A", "Quiz", None);
    doc.add_activity("6-A", "Essay", None);
    let ana = doc.students[1].id.clone();
    doc.set_grade(&ana, &a.id, "4").unwrap();

    let report = gradebook(&doc, &Scope::Course("6-A".into()), today());
    let table = &report.tables[0];
    assert_eq!(table.title, "Gradebook - 6-A");
    assert_eq!(table.headers, ["VPS", "Name", "Quiz", "Essay", "Avg."]);
    assert_eq!(table.rows[0], ["V1", "Ana", "4.0", "-", "2.5"]);
    assert_eq!(table.rows[1], ["V2", "bruno", "-", "-", "1.0"]);
  }

  #[test]
  fn gradebook_without_activities_has_no_average() {
    let doc = fixture();
    let report = gradebook(&doc, &Scope::Course("6-B".into()), today());
    // The sanitizer stores "Pending" for a blank code.
    assert_eq!(report.tables[0].rows[0], ["Pending", "Carla", "-"]);
  }

  #[test]
  fn fields_parse_by_key() {
    assert_eq!("parentEmail".parse::<RosterField>().unwrap(), RosterField::ParentEmail);
    assert_eq!(" vpscode".parse::<RosterField>().unwrap(), RosterField::VpsCode);
    assert!("shoeSize".parse::<RosterField>().is_err());
  }

  #[test]
  fn scope_param() {
    assert_eq!(Scope::from_param(None), Scope::All);
    assert_eq!(Scope::from_param(Some("all")), Scope::All);
    assert_eq!(Scope::from_param(Some("6-A")), Scope::Course("6-A".into()));
  }
}
