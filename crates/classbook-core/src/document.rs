//! The gradebook document and its mutations.
//!
//! A [`Document`] is the whole of the persisted state: every student, the
//! explicit course list, and the per-course activity and material columns.
//! Parsing applies forward migration so that older documents load cleanly;
//! every mutation here is pure and leaves the document consistent, with the
//! course list kept in step with the courses students reference.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::derive_courses,
  sanitize::sanitize,
  student::{
    AttendanceStatus, Jornada, MissingAttendance, Student, StudentRecord,
    format_annotation, normalize_grade,
  },
};

fn new_id() -> String { Uuid::new_v4().to_string() }

// ─── Columns ─────────────────────────────────────────────────────────────────

/// A graded activity belonging to one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
  pub id:     String,
  pub name:   String,
  #[serde(
    default,
    deserialize_with = "lenient_date",
    skip_serializing_if = "Option::is_none"
  )]
  pub date:   Option<NaiveDate>,
  /// Locked activities reject grade edits until unlocked.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub locked: bool,
}

/// A named material column; values live in each student's `materials` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialColumn {
  pub id:   String,
  pub name: String,
}

/// Dates were written from a form field and may be empty strings.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(
    value
      .as_ref()
      .and_then(Value::as_str)
      .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()),
  )
}

// ─── Wire shape ──────────────────────────────────────────────────────────────

/// The document as found on disk. Every key may be missing.
#[derive(Debug, Default, Deserialize)]
struct RawDocument {
  #[serde(default)]
  students:   Option<Vec<Option<StudentRecord>>>,
  #[serde(default)]
  courses:    Option<Vec<Option<String>>>,
  #[serde(default)]
  activities: Option<BTreeMap<String, Option<Vec<Activity>>>>,
  #[serde(default)]
  materials:  Option<BTreeMap<String, Option<Vec<MaterialColumn>>>>,
}

#[derive(Serialize)]
struct DocumentOut<'a> {
  students:   Vec<StudentRecord>,
  courses:    &'a [String],
  activities: &'a BTreeMap<String, Vec<Activity>>,
  materials:  &'a BTreeMap<String, Vec<MaterialColumn>>,
}

// ─── Document ────────────────────────────────────────────────────────────────

/// Counts reported by [`Document::delete_course`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRemoval {
  pub course_removed:     bool,
  pub students_removed:   usize,
  pub activities_removed: usize,
  pub materials_removed:  usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
  /// Stored order. Registration appends.
  pub students:   Vec<Student>,
  /// The authoritative course list.
  pub courses:    Vec<String>,
  pub activities: BTreeMap<String, Vec<Activity>>,
  pub materials:  BTreeMap<String, Vec<MaterialColumn>>,
}

impl Document {
  // ── Codec ─────────────────────────────────────────────────────────────

  /// Parse a stored document, migrating and sanitizing as it goes.
  pub fn from_json(input: &str, today: NaiveDate) -> Result<Self> {
    Ok(Self::from_stored_json(input, today)?.0)
  }

  /// Like [`Document::from_json`], also counting the students that had no
  /// id and were given a fresh one. Those ids only last once the document
  /// is written back.
  pub fn from_stored_json(input: &str, today: NaiveDate) -> Result<(Self, usize)> {
    let raw: RawDocument = serde_json::from_str(input)?;
    Ok(Self::from_raw(raw, today))
  }

  pub fn from_value(value: Value, today: NaiveDate) -> Result<Self> {
    let raw: RawDocument = serde_json::from_value(value)?;
    Ok(Self::from_raw(raw, today).0)
  }

  fn from_raw(raw: RawDocument, today: NaiveDate) -> (Self, usize) {
    let records: Vec<StudentRecord> =
      raw.students.unwrap_or_default().into_iter().flatten().collect();
    let new_ids = records
      .iter()
      .filter(|r| r.id.as_deref().is_none_or(|id| id.trim().is_empty()))
      .count();
    let students: Vec<Student> = records
      .into_iter()
      .map(|record| sanitize(record, today))
      .collect();

    let courses = match raw.courses {
      Some(list) => list.into_iter().flatten().collect(),
      None => derive_courses(&students),
    };

    let mut doc = Self {
      students,
      courses: Vec::new(),
      activities: raw
        .activities
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.unwrap_or_default()))
        .collect(),
      materials: raw
        .materials
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.unwrap_or_default()))
        .collect(),
    };

    for course in courses {
      doc.ensure_course(&course);
    }
    let referenced: Vec<String> =
      doc.students.iter().map(|s| s.course.clone()).collect();
    for course in referenced {
      doc.ensure_course(&course);
    }
    (doc, new_ids)
  }

  /// The stored form, with each student's age derived for `today`.
  pub fn to_value(&self, today: NaiveDate) -> Result<Value> {
    Ok(serde_json::to_value(self.out(today))?)
  }

  pub fn to_json(&self, today: NaiveDate) -> Result<String> {
    Ok(serde_json::to_string(&self.out(today))?)
  }

  pub fn to_json_pretty(&self, today: NaiveDate) -> Result<String> {
    Ok(serde_json::to_string_pretty(&self.out(today))?)
  }

  fn out(&self, today: NaiveDate) -> DocumentOut<'_> {
    DocumentOut {
      students:   self.students.iter().map(|s| s.to_record(today)).collect(),
      courses:    &self.courses,
      activities: &self.activities,
      materials:  &self.materials,
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub fn student(&self, id: &str) -> Option<&Student> {
    self.students.iter().find(|s| s.id == id)
  }

  fn student_mut(&mut self, id: &str) -> Option<&mut Student> {
    self.students.iter_mut().find(|s| s.id == id)
  }

  pub fn students_by_course<'a>(
    &'a self,
    course: &'a str,
  ) -> impl Iterator<Item = &'a Student> + 'a {
    self.students.iter().filter(move |s| s.course == course)
  }

  pub fn activities_for(&self, course: &str) -> &[Activity] {
    self.activities.get(course).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn materials_for(&self, course: &str) -> &[MaterialColumn] {
    self.materials.get(course).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn activity(&self, course: &str, id: &str) -> Option<&Activity> {
    self.activities_for(course).iter().find(|a| a.id == id)
  }

  fn is_locked(&self, course: &str, activity_id: &str) -> bool {
    self.activity(course, activity_id).is_some_and(|a| a.locked)
  }

  // ── Courses ───────────────────────────────────────────────────────────

  /// Append `course` to the course list unless it is already there.
  /// Returns `true` if it was added.
  pub fn ensure_course(&mut self, course: &str) -> bool {
    if self.courses.iter().any(|c| c == course) {
      return false;
    }
    self.courses.push(course.to_owned());
    true
  }

  pub fn add_course(&mut self, name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && self.ensure_course(name)
  }

  /// Rename a course everywhere it appears.
  ///
  /// Renaming onto a course that already exists merges the two: students
  /// move across and the activity and material columns are appended.
  /// Returns `false` when nothing referenced `old`.
  pub fn rename_course(&mut self, old: &str, new: &str) -> bool {
    let new = new.trim();
    if old == new || new.is_empty() {
      return false;
    }
    let mut changed = false;

    if let Some(pos) = self.courses.iter().position(|c| c == old) {
      if self.courses.iter().any(|c| c == new) {
        self.courses.remove(pos);
      } else {
        self.courses[pos] = new.to_owned();
      }
      changed = true;
    }

    for student in self.students.iter_mut().filter(|s| s.course == old) {
      student.course = new.to_owned();
      changed = true;
    }

    if let Some(activities) = self.activities.remove(old) {
      self.activities.entry(new.to_owned()).or_default().extend(activities);
      changed = true;
    }
    if let Some(materials) = self.materials.remove(old) {
      self.materials.entry(new.to_owned()).or_default().extend(materials);
      changed = true;
    }

    if changed {
      self.ensure_course(new);
    }
    changed
  }

  /// Remove a course together with its students and columns.
  pub fn delete_course(&mut self, course: &str) -> CourseRemoval {
    let before = self.courses.len();
    self.courses.retain(|c| c != course);

    let students_before = self.students.len();
    self.students.retain(|s| s.course != course);

    CourseRemoval {
      course_removed:     self.courses.len() != before,
      students_removed:   students_before - self.students.len(),
      activities_removed: self.activities.remove(course).map_or(0, |a| a.len()),
      materials_removed:  self.materials.remove(course).map_or(0, |m| m.len()),
    }
  }

  // ── Students ──────────────────────────────────────────────────────────

  /// Register a student. Whatever id and gradebook data the record carries
  /// are replaced: the student starts with a fresh id and empty maps.
  pub fn add_student(&mut self, record: StudentRecord, today: NaiveDate) -> Student {
    let mut student = sanitize(record, today);
    student.id = new_id();
    student.jornada.get_or_insert(Jornada::Morning);
    student.grades.clear();
    student.attendance.clear();
    student.materials.clear();
    student.annotations.clear();

    self.ensure_course(&student.course);
    self.students.push(student.clone());
    student
  }

  /// Replace the stored student with the same id.
  ///
  /// Returns `Ok(false)` when the id is unknown. Fails without writing if
  /// the course differs from the stored one (that is a
  /// [`Document::move_student`]) or if a grade for a locked activity of the
  /// course would change.
  pub fn update_student(&mut self, student: Student) -> Result<bool> {
    let Some(pos) = self.students.iter().position(|s| s.id == student.id)
    else {
      return Ok(false);
    };

    let current = &self.students[pos];
    if current.course != student.course {
      return Err(Error::CourseChange(student.id));
    }
    for activity in self.activities_for(&current.course).iter().filter(|a| a.locked) {
      if current.grades.get(&activity.id) != student.grades.get(&activity.id) {
        return Err(Error::ActivityLocked(activity.id.clone()));
      }
    }

    self.students[pos] = student;
    Ok(true)
  }

  pub fn delete_student(&mut self, id: &str) -> bool {
    let before = self.students.len();
    self.students.retain(|s| s.id != id);
    self.students.len() != before
  }

  pub fn move_student(&mut self, id: &str, course: &str) -> bool {
    let course = course.trim();
    if course.is_empty() {
      return false;
    }
    let Some(student) = self.student_mut(id) else {
      return false;
    };
    student.course = course.to_owned();
    self.ensure_course(course);
    true
  }

  // ── Activities ────────────────────────────────────────────────────────

  pub fn add_activity(
    &mut self,
    course: &str,
    name: &str,
    date: Option<NaiveDate>,
  ) -> Activity {
    let activity = Activity {
      id: new_id(),
      name: name.trim().to_owned(),
      date,
      locked: false,
    };
    self.ensure_course(course);
    self
      .activities
      .entry(course.to_owned())
      .or_default()
      .push(activity.clone());
    activity
  }

  /// Change an activity's name and date. The lock state is only changed
  /// through [`Document::set_activity_locked`].
  pub fn update_activity(&mut self, course: &str, activity: &Activity) -> bool {
    let Some(existing) = self
      .activities
      .get_mut(course)
      .and_then(|list| list.iter_mut().find(|a| a.id == activity.id))
    else {
      return false;
    };
    existing.name = activity.name.trim().to_owned();
    existing.date = activity.date;
    true
  }

  /// Remove an activity and every grade recorded for it in the course.
  pub fn delete_activity(&mut self, course: &str, id: &str) -> bool {
    let Some(list) = self.activities.get_mut(course) else {
      return false;
    };
    let before = list.len();
    list.retain(|a| a.id != id);
    if list.len() == before {
      return false;
    }
    for student in self.students.iter_mut().filter(|s| s.course == course) {
      student.grades.remove(id);
    }
    true
  }

  pub fn set_activity_locked(&mut self, course: &str, id: &str, locked: bool) -> bool {
    match self
      .activities
      .get_mut(course)
      .and_then(|list| list.iter_mut().find(|a| a.id == id))
    {
      Some(activity) => {
        activity.locked = locked;
        true
      }
      None => false,
    }
  }

  // ── Grades ────────────────────────────────────────────────────────────

  /// Write one grade cell. An empty value clears it.
  ///
  /// Returns `Ok(false)` when the student is unknown.
  pub fn set_grade(
    &mut self,
    student_id: &str,
    activity_id: &str,
    value: &str,
  ) -> Result<bool> {
    let value = normalize_grade(value)?;
    let Some(course) = self.student(student_id).map(|s| s.course.clone()) else {
      return Ok(false);
    };
    if self.is_locked(&course, activity_id) {
      return Err(Error::ActivityLocked(activity_id.to_owned()));
    }
    let Some(student) = self.student_mut(student_id) else {
      return Ok(false);
    };
    match value {
      Some(v) => student.grades.insert(activity_id.to_owned(), v),
      None => student.grades.remove(activity_id),
    };
    Ok(true)
  }

  // ── Attendance ────────────────────────────────────────────────────────

  /// Set or clear one attendance cell.
  pub fn set_attendance(
    &mut self,
    student_id: &str,
    date: NaiveDate,
    status: Option<AttendanceStatus>,
  ) -> bool {
    let Some(student) = self.student_mut(student_id) else {
      return false;
    };
    match status {
      Some(status) => student.attendance.insert(date, status),
      None => student.attendance.remove(&date),
    };
    true
  }

  /// Advance one attendance cell and return its new status.
  pub fn cycle_attendance(
    &mut self,
    student_id: &str,
    date: NaiveDate,
    missing: MissingAttendance,
  ) -> Option<AttendanceStatus> {
    let student = self.student_mut(student_id)?;
    let next = AttendanceStatus::cycle(student.attendance.get(&date).copied(), missing);
    student.attendance.insert(date, next);
    Some(next)
  }

  /// Remove `date` from every student in the course. Returns how many
  /// entries were removed.
  pub fn delete_attendance_column(&mut self, course: &str, date: NaiveDate) -> usize {
    self
      .students
      .iter_mut()
      .filter(|s| s.course == course)
      .filter_map(|s| s.attendance.remove(&date))
      .count()
  }

  // ── Annotations ───────────────────────────────────────────────────────

  pub fn add_annotation(
    &mut self,
    student_id: &str,
    date: NaiveDate,
    note: &str,
  ) -> Result<bool> {
    if note.trim().is_empty() {
      return Err(Error::EmptyAnnotation);
    }
    let Some(student) = self.student_mut(student_id) else {
      return Ok(false);
    };
    student.annotations.push(format_annotation(date, note));
    Ok(true)
  }

  pub fn delete_annotation(&mut self, student_id: &str, index: usize) -> bool {
    match self.student_mut(student_id) {
      Some(student) if index < student.annotations.len() => {
        student.annotations.remove(index);
        true
      }
      _ => false,
    }
  }

  // ── Materials ─────────────────────────────────────────────────────────

  pub fn add_material_column(&mut self, course: &str, name: &str) -> MaterialColumn {
    let column = MaterialColumn { id: new_id(), name: name.trim().to_owned() };
    self.ensure_course(course);
    self
      .materials
      .entry(course.to_owned())
      .or_default()
      .push(column.clone());
    column
  }

  /// Remove a material column and the values students hold for it.
  pub fn delete_material_column(&mut self, course: &str, id: &str) -> bool {
    let Some(list) = self.materials.get_mut(course) else {
      return false;
    };
    let before = list.len();
    list.retain(|m| m.id != id);
    if list.len() == before {
      return false;
    }
    for student in self.students.iter_mut().filter(|s| s.course == course) {
      student.materials.remove(id);
    }
    true
  }

  /// Assign a material value. An empty value removes the assignment.
  pub fn set_material_value(&mut self, student_id: &str, column_id: &str, value: &str) -> bool {
    let Some(student) = self.student_mut(student_id) else {
      return false;
    };
    let value = value.trim();
    if value.is_empty() {
      student.materials.remove(column_id);
    } else {
      student.materials.insert(column_id.to_owned(), value.to_owned());
    }
    true
  }
}
