//! Derived figures.
//!
//! Everything here is a pure function of the loaded document and is
//! recomputed on every call. Two averaging policies coexist on purpose:
//!
//! - [`student_average`] is the quick per-student figure. Empty or
//!   unparseable cells are left out.
//! - [`course_row_average`] and [`course_compliance`] read every
//!   student × activity cell and count an empty cell as `1.0`.

use std::{cmp::Ordering, collections::BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  document::{Activity, Document},
  student::{AttendanceStatus, MissingAttendance, Student, grade_value},
};

/// Grade assumed for a cell with no value in course-wide averages.
pub const MISSING_GRADE: f64 = 1.0;

// ─── Courses ─────────────────────────────────────────────────────────────────

/// Distinct, sorted course names referenced by students.
pub fn derive_courses(students: &[Student]) -> Vec<String> {
  students
    .iter()
    .map(|s| s.course.clone())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

// ─── Grades ──────────────────────────────────────────────────────────────────

/// Mean of the student's parseable grades, or `None` when there are none.
pub fn student_average(student: &Student) -> Option<f64> {
  mean(student.grades.values().filter_map(|g| grade_value(g)))
}

fn cell_or_missing(student: &Student, activity: &Activity) -> f64 {
  student
    .grades
    .get(&activity.id)
    .and_then(|g| grade_value(g))
    .unwrap_or(MISSING_GRADE)
}

/// Average over every activity of the course, empty cells counting as
/// [`MISSING_GRADE`]. `None` when the course has no activities.
pub fn course_row_average(student: &Student, activities: &[Activity]) -> Option<f64> {
  mean(activities.iter().map(|a| cell_or_missing(student, a)))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
  let (sum, count) = values.fold((0.0, 0u32), |(sum, n), v| (sum + v, n + 1));
  (count > 0).then(|| sum / f64::from(count))
}

/// How much of a course's gradebook has been filled in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Compliance {
  /// Rounded percentage of non-empty cells.
  pub percent:  u32,
  /// Course average with empty cells counted as [`MISSING_GRADE`].
  pub average:  Option<f64>,
  pub filled:   usize,
  pub possible: usize,
}

pub fn course_compliance<'a>(
  students: impl IntoIterator<Item = &'a Student>,
  activities: &[Activity],
) -> Compliance {
  let mut filled = 0;
  let mut possible = 0;
  let mut sum = 0.0;
  for student in students {
    for activity in activities {
      possible += 1;
      if student
        .grades
        .get(&activity.id)
        .is_some_and(|g| !g.trim().is_empty())
      {
        filled += 1;
      }
      sum += cell_or_missing(student, activity);
    }
  }

  if possible == 0 {
    return Compliance { percent: 0, average: None, filled, possible };
  }
  let ratio = filled as f64 / possible as f64;
  Compliance {
    percent: (ratio * 100.0).round() as u32,
    average: Some(sum / possible as f64),
    filled,
    possible,
  }
}

/// `"-"` for no value, otherwise one decimal place.
pub fn format_grade(value: Option<f64>) -> String {
  match value {
    Some(v) => format!("{v:.1}"),
    None => "-".to_owned(),
  }
}

// ─── Attendance ──────────────────────────────────────────────────────────────

/// Sorted union of every attendance date recorded for these students.
pub fn attendance_dates<'a>(
  students: impl IntoIterator<Item = &'a Student>,
) -> Vec<NaiveDate> {
  students
    .into_iter()
    .flat_map(|s| s.attendance.keys().copied())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
  pub present: usize,
  pub absent:  usize,
  pub late:    usize,
}

impl Tally {
  fn add(&mut self, status: AttendanceStatus) {
    match status {
      AttendanceStatus::Present => self.present += 1,
      AttendanceStatus::Absent => self.absent += 1,
      AttendanceStatus::Late => self.late += 1,
    }
  }
}

/// Count a student's statuses over `dates`.
pub fn attendance_tally(
  student: &Student,
  dates: &[NaiveDate],
  missing: MissingAttendance,
) -> Tally {
  let mut tally = Tally::default();
  for date in dates {
    match (student.attendance.get(date), missing) {
      (Some(status), _) => tally.add(*status),
      (None, MissingAttendance::Present) => tally.add(AttendanceStatus::Present),
      (None, MissingAttendance::Excluded) => {}
    }
  }
  tally
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// Column a gradebook listing is ordered by.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
  #[default]
  Name,
  /// By the grade for this activity id; students without one sort lowest.
  Activity(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
  #[default]
  Asc,
  Desc,
}

/// Stable sort of a student listing.
pub fn sort_students(students: &mut [&Student], key: &SortKey, direction: SortDirection) {
  students.sort_by(|a, b| {
    let ord = match key {
      SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
      SortKey::Activity(id) => {
        let grade = |s: &Student| s.grades.get(id).and_then(|g| grade_value(g)).unwrap_or(-1.0);
        grade(a).partial_cmp(&grade(b)).unwrap_or(Ordering::Equal)
      }
    };
    match direction {
      SortDirection::Asc => ord,
      SortDirection::Desc => ord.reverse(),
    }
  });
}

// ─── Overview ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
  pub course:     String,
  pub students:   usize,
  pub activities: usize,
  pub compliance: Compliance,
}

/// Totals across the whole document, one summary per listed course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
  pub total_students: usize,
  pub total_courses:  usize,
  pub courses:        Vec<CourseSummary>,
}

pub fn course_summary(doc: &Document, course: &str) -> CourseSummary {
  let activities = doc.activities_for(course);
  CourseSummary {
    course:     course.to_owned(),
    students:   doc.students_by_course(course).count(),
    activities: activities.len(),
    compliance: course_compliance(doc.students_by_course(course), activities),
  }
}

pub fn overview(doc: &Document) -> Overview {
  Overview {
    total_students: doc.students.len(),
    total_courses:  doc.courses.len(),
    courses:        doc.courses.iter().map(|c| course_summary(doc, c)).collect(),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use chrono::NaiveDate;
  use serde_json::Map;

  use super::*;

  fn student(name: &str, grades: &[(&str, &str)]) -> Student {
    Student {
      id:            name.to_lowercase(),
      name:          name.into(),
      course:        "6-A".into(),
      birth_date:    NaiveDate::from_ymd_opt(2014, 1, 1).unwrap(),
      jornada:       None,
      parent_name:   "Pending".into(),
      parent_phone:  "Pending".into(),
      parent_phone2: "Pending".into(),
      parent_email:  "pending@pending.co".into(),
      vps_code:      "Pending".into(),
      generic_obs:   String::new(),
      grades:        grades.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
      attendance:    BTreeMap::new(),
      materials:     BTreeMap::new(),
      annotations:   Vec::new(),
      extra:         Map::new(),
    }
  }

  fn activity(id: &str) -> Activity {
    Activity { id: id.into(), name: id.into(), date: None, locked: false }
  }

  fn date(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2025, 3, d).unwrap() }

  #[test]
  fn the_two_averages_differ_for_an_empty_cell() {
    let s = student("Ana", &[("a", "4.0"), ("b", "")]);
    let acts = [activity("a"), activity("b")];
    assert_eq!(student_average(&s), Some(4.0));
    assert_eq!(course_row_average(&s, &acts), Some(2.5));
    assert_eq!(course_compliance([&s], &acts).average, Some(2.5));
  }

  #[test]
  fn no_grades_means_no_average() {
    let s = student("Ana", &[("a", ""), ("b", "n/a")]);
    assert_eq!(student_average(&s), None);
    assert_eq!(course_row_average(&s, &[]), None);
    assert_eq!(format_grade(None), "-");
    assert_eq!(format_grade(Some(3.0)), "3.0");
  }

  #[test]
  fn compliance_counts_filled_cells() {
    // 25 students, activity A graded for 20, B for 15.
    let students: Vec<Student> = (0..25)
      .map(|i| {
        let mut grades = Vec::new();
        if i < 20 {
          grades.push(("A", "4.0"));
        }
        if i < 15 {
          grades.push(("B", "3.0"));
        }
        student(&format!("S{i}"), &grades)
      })
      .collect();
    let c = course_compliance(&students, &[activity("A"), activity("B")]);
    assert_eq!(c.filled, 35);
    assert_eq!(c.possible, 50);
    assert_eq!(c.percent, 70);
  }

  #[test]
  fn compliance_with_nothing_to_grade() {
    let c = course_compliance(&[student("Ana", &[])], &[]);
    assert_eq!(c.percent, 0);
    assert_eq!(c.average, None);
    let c = course_compliance(&Vec::<Student>::new(), &[activity("a")]);
    assert_eq!(c.percent, 0);
    assert_eq!(c.average, None);
  }

  #[test]
  fn tally_respects_missing_policy() {
    let mut s = student("Ana", &[]);
    s.attendance.insert(date(1), AttendanceStatus::Late);
    s.attendance.insert(date(2), AttendanceStatus::Absent);
    let other = {
      let mut o = student("Bruno", &[]);
      o.attendance.insert(date(3), AttendanceStatus::Present);
      o
    };
    let dates = attendance_dates([&s, &other]);
    assert_eq!(dates, vec![date(1), date(2), date(3)]);

    assert_eq!(attendance_tally(&s, &dates, MissingAttendance::Excluded), Tally {
      present: 0,
      absent:  1,
      late:    1,
    });
    assert_eq!(attendance_tally(&s, &dates, MissingAttendance::Present), Tally {
      present: 1,
      absent:  1,
      late:    1,
    });
  }

  #[test]
  fn derive_courses_is_sorted_and_distinct() {
    let mut b = student("B", &[]);
    b.course = "6-B".into();
    let courses = derive_courses(&[b, student("A", &[]), student("C", &[])]);
    assert_eq!(courses, vec!["6-A".to_string(), "6-B".to_string()]);
  }

  #[test]
  fn sorting_by_grade_puts_missing_last_descending() {
    let a = student("ana", &[("q", "3.0")]);
    let b = student("Bruno", &[]);
    let c = student("carla", &[("q", "5.0")]);

    let mut list = vec![&c, &b, &a];
    sort_students(&mut list, &SortKey::Name, SortDirection::Asc);
    let names: Vec<_> = list.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["ana", "Bruno", "carla"]);

    sort_students(&mut list, &SortKey::Activity("q".into()), SortDirection::Desc);
    let names: Vec<_> = list.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["carla", "ana", "Bruno"]);
  }
}
