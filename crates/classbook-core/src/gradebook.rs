//! The `Gradebook` service.
//!
//! Wraps a [`DocumentStore`] and exposes every operation on the gradebook.
//! Each mutation is one [`DocumentStore::modify`] call, so it is applied
//! atomically or not at all. Validation failures leave the document as it
//! was.
//!
//! Destructive actions can also be routed through the confirmation flow:
//! [`Gradebook::request_confirmation`] parks the action, and
//! [`Gradebook::confirm`] runs it once the security code is supplied.
//! Unlocking an activity is only reachable that way.

use std::{
  sync::{Mutex, MutexGuard, PoisonError},
  time::{Duration, Instant},
};

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::{
    self, Compliance, Overview, SortDirection, SortKey, Tally, attendance_dates,
    attendance_tally, course_compliance, course_row_average, sort_students,
    student_average,
  },
  backup, demo,
  document::{Activity, CourseRemoval, Document, MaterialColumn},
  gate::{Challenge, CourseDeletionGuard, DeletionTicket, GatedAction, SecurityGate},
  report::{self, Report, RosterField, Scope},
  settings::{SecurityCode, Settings, validate_new_code},
  store::DocumentStore,
  student::{AttendanceStatus, MissingAttendance, Student, StudentRecord},
};

fn local_now() -> NaiveDateTime { Local::now().naive_local() }

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── Views ───────────────────────────────────────────────────────────────────

/// One student as shown in a course gradebook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRow {
  pub student:     StudentRecord,
  /// Mean of the filled cells only.
  pub average:     Option<f64>,
  /// Mean over every activity, empty cells counting as the minimum grade.
  pub row_average: Option<f64>,
  pub attendance:  Tally,
}

/// Everything needed to draw one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
  pub course:           String,
  pub activities:       Vec<Activity>,
  pub materials:        Vec<MaterialColumn>,
  pub attendance_dates: Vec<NaiveDate>,
  pub compliance:       Compliance,
  pub rows:             Vec<CourseRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupFile {
  pub file_name: String,
  pub contents:  String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
  pub students: usize,
  pub courses:  usize,
}

/// Result of a confirmed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Confirmed {
  /// The action ran. `applied` is `false` when its target no longer exists.
  Executed { action: GatedAction, applied: bool },
  /// Course deletion needs its own confirmation after a cool-down.
  CourseDeletionOpened { ticket: DeletionTicket },
}

// ─── Gradebook ───────────────────────────────────────────────────────────────

pub struct Gradebook<S> {
  store:     S,
  clock:     fn() -> NaiveDateTime,
  missing:   MissingAttendance,
  gate:      Mutex<SecurityGate>,
  deletions: Mutex<CourseDeletionGuard>,
}

impl<S: DocumentStore> Gradebook<S> {
  pub fn new(store: S) -> Self {
    Self {
      store,
      clock: local_now,
      missing: MissingAttendance::default(),
      gate: Mutex::new(SecurityGate::new()),
      deletions: Mutex::new(CourseDeletionGuard::default()),
    }
  }

  /// Replace the wall clock used for ages, annotation dates and backup
  /// names.
  pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_missing_attendance(mut self, missing: MissingAttendance) -> Self {
    self.missing = missing;
    self
  }

  pub fn with_deletion_cooldown(mut self, cooldown: Duration) -> Self {
    self.deletions = Mutex::new(CourseDeletionGuard::new(cooldown));
    self
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn today(&self) -> NaiveDate { (self.clock)().date() }

  pub fn missing_attendance(&self) -> MissingAttendance { self.missing }

  async fn modify<F, T>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Document) -> T + Send + 'static,
    T: Send + 'static,
  {
    self.store.modify(self.today(), f).await.map_err(Error::store)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn document(&self) -> Result<Document> {
    self.store.load(self.today()).await.map_err(Error::store)
  }

  pub async fn get_students(&self) -> Result<Vec<Student>> {
    Ok(self.document().await?.students)
  }

  pub async fn get_student(&self, id: &str) -> Result<Option<Student>> {
    Ok(self.document().await?.student(id).cloned())
  }

  pub async fn get_students_by_course(&self, course: &str) -> Result<Vec<Student>> {
    let doc = self.document().await?;
    Ok(doc.students_by_course(course).cloned().collect())
  }

  pub async fn get_courses(&self) -> Result<Vec<String>> { Ok(self.document().await?.courses) }

  pub async fn get_activities(&self, course: &str) -> Result<Vec<Activity>> {
    Ok(self.document().await?.activities_for(course).to_vec())
  }

  pub async fn get_materials(&self, course: &str) -> Result<Vec<MaterialColumn>> {
    Ok(self.document().await?.materials_for(course).to_vec())
  }

  // ── Students ──────────────────────────────────────────────────────────

  pub async fn add_student(&self, record: StudentRecord) -> Result<Student> {
    let today = self.today();
    self.modify(move |doc| doc.add_student(record, today)).await
  }

  /// Sanitize `record` and store it over the student with the same id.
  /// `Ok(false)` when there is no such student. The course cannot change
  /// here; use [`Gradebook::move_student`] or [`GatedAction::MoveStudent`].
  pub async fn update_student(&self, record: StudentRecord) -> Result<bool> {
    let today = self.today();
    self
      .modify(move |doc| doc.update_student(crate::sanitize::sanitize(record, today)))
      .await?
  }

  pub async fn delete_student(&self, id: &str) -> Result<bool> {
    let id = id.to_owned();
    self.modify(move |doc| doc.delete_student(&id)).await
  }

  pub async fn move_student(&self, id: &str, course: &str) -> Result<bool> {
    let (id, course) = (id.to_owned(), course.to_owned());
    self.modify(move |doc| doc.move_student(&id, &course)).await
  }

  // ── Courses ───────────────────────────────────────────────────────────

  pub async fn add_course(&self, name: &str) -> Result<bool> {
    let name = name.to_owned();
    self.modify(move |doc| doc.add_course(&name)).await
  }

  pub async fn update_course_name(&self, old: &str, new: &str) -> Result<bool> {
    let (old, new) = (old.to_owned(), new.to_owned());
    self.modify(move |doc| doc.rename_course(&old, &new)).await
  }

  pub async fn delete_course(&self, course: &str) -> Result<CourseRemoval> {
    let course = course.to_owned();
    self.modify(move |doc| doc.delete_course(&course)).await
  }

  // ── Activities ────────────────────────────────────────────────────────

  pub async fn add_activity(
    &self,
    course: &str,
    name: &str,
    date: Option<NaiveDate>,
  ) -> Result<Activity> {
    let (course, name) = (course.to_owned(), name.to_owned());
    self.modify(move |doc| doc.add_activity(&course, &name, date)).await
  }

  pub async fn update_activity(&self, course: &str, activity: Activity) -> Result<bool> {
    let course = course.to_owned();
    self.modify(move |doc| doc.update_activity(&course, &activity)).await
  }

  pub async fn delete_activity(&self, course: &str, id: &str) -> Result<bool> {
    let (course, id) = (course.to_owned(), id.to_owned());
    self.modify(move |doc| doc.delete_activity(&course, &id)).await
  }

  /// Lock an activity. Unlocking goes through [`GatedAction::UnlockActivity`].
  pub async fn lock_activity(&self, course: &str, id: &str) -> Result<bool> {
    let (course, id) = (course.to_owned(), id.to_owned());
    self
      .modify(move |doc| doc.set_activity_locked(&course, &id, true))
      .await
  }

  // ── Grades ────────────────────────────────────────────────────────────

  pub async fn set_grade(&self, student_id: &str, activity_id: &str, value: &str) -> Result<bool> {
    let (student_id, activity_id, value) =
      (student_id.to_owned(), activity_id.to_owned(), value.to_owned());
    self
      .modify(move |doc| doc.set_grade(&student_id, &activity_id, &value))
      .await?
  }

  // ── Attendance ────────────────────────────────────────────────────────

  pub async fn set_attendance(
    &self,
    student_id: &str,
    date: NaiveDate,
    status: Option<AttendanceStatus>,
  ) -> Result<bool> {
    let student_id = student_id.to_owned();
    self
      .modify(move |doc| doc.set_attendance(&student_id, date, status))
      .await
  }

  pub async fn cycle_attendance(
    &self,
    student_id: &str,
    date: NaiveDate,
  ) -> Result<Option<AttendanceStatus>> {
    let student_id = student_id.to_owned();
    let missing = self.missing;
    self
      .modify(move |doc| doc.cycle_attendance(&student_id, date, missing))
      .await
  }

  pub async fn delete_attendance_column(&self, course: &str, date: NaiveDate) -> Result<usize> {
    let course = course.to_owned();
    self
      .modify(move |doc| doc.delete_attendance_column(&course, date))
      .await
  }

  // ── Annotations ───────────────────────────────────────────────────────

  /// Append a dated observation. The date defaults to today.
  pub async fn add_annotation(
    &self,
    student_id: &str,
    date: Option<NaiveDate>,
    note: &str,
  ) -> Result<bool> {
    let date = date.unwrap_or_else(|| self.today());
    let (student_id, note) = (student_id.to_owned(), note.to_owned());
    self
      .modify(move |doc| doc.add_annotation(&student_id, date, &note))
      .await?
  }

  pub async fn delete_annotation(&self, student_id: &str, index: usize) -> Result<bool> {
    let student_id = student_id.to_owned();
    self
      .modify(move |doc| doc.delete_annotation(&student_id, index))
      .await
  }

  // ── Materials ─────────────────────────────────────────────────────────

  pub async fn add_material_column(&self, course: &str, name: &str) -> Result<MaterialColumn> {
    let (course, name) = (course.to_owned(), name.to_owned());
    self.modify(move |doc| doc.add_material_column(&course, &name)).await
  }

  pub async fn delete_material_column(&self, course: &str, id: &str) -> Result<bool> {
    let (course, id) = (course.to_owned(), id.to_owned());
    self
      .modify(move |doc| doc.delete_material_column(&course, &id))
      .await
  }

  pub async fn set_material_value(
    &self,
    student_id: &str,
    column_id: &str,
    value: &str,
  ) -> Result<bool> {
    let (student_id, column_id, value) =
      (student_id.to_owned(), column_id.to_owned(), value.to_owned());
    self
      .modify(move |doc| doc.set_material_value(&student_id, &column_id, &value))
      .await
  }

  // ── Aggregates ────────────────────────────────────────────────────────

  pub async fn overview(&self) -> Result<Overview> {
    Ok(aggregate::overview(&self.document().await?))
  }

  pub async fn course_view(
    &self,
    course: &str,
    sort: &SortKey,
    direction: SortDirection,
  ) -> Result<CourseView> {
    let today = self.today();
    let doc = self.document().await?;
    let activities = doc.activities_for(course);

    let mut students: Vec<&Student> = doc.students_by_course(course).collect();
    sort_students(&mut students, sort, direction);
    let dates = attendance_dates(students.iter().copied());

    let rows = students
      .iter()
      .map(|s| CourseRow {
        student:     s.to_record(today),
        average:     student_average(s),
        row_average: course_row_average(s, activities),
        attendance:  attendance_tally(s, &dates, self.missing),
      })
      .collect();

    Ok(CourseView {
      course:           course.to_owned(),
      activities:       activities.to_vec(),
      materials:        doc.materials_for(course).to_vec(),
      compliance:       course_compliance(students.iter().copied(), activities),
      attendance_dates: dates,
      rows,
    })
  }

  // ── Reports ───────────────────────────────────────────────────────────

  pub async fn roster_report(&self, scope: &Scope, fields: &[RosterField]) -> Result<Report> {
    let doc = self.document().await?;
    Ok(report::roster(&doc, scope, fields, self.today()))
  }

  pub async fn gradebook_report(&self, scope: &Scope) -> Result<Report> {
    let doc = self.document().await?;
    Ok(report::gradebook(&doc, scope, self.today()))
  }

  // ── Backup ────────────────────────────────────────────────────────────

  pub async fn export_backup(&self) -> Result<BackupFile> {
    let now = (self.clock)();
    let doc = self.document().await?;
    Ok(BackupFile {
      file_name: backup::file_name(now),
      contents:  backup::export(&doc, now.date())?,
    })
  }

  /// Replace the whole document with a backup. An invalid file is rejected
  /// before anything is written.
  pub async fn import_backup(&self, input: &str) -> Result<ImportSummary> {
    let imported = backup::parse(input, self.today())?;
    let summary = ImportSummary {
      students: imported.students.len(),
      courses:  imported.courses.len(),
    };
    self.modify(move |doc| *doc = imported).await?;
    Ok(summary)
  }

  /// Load the sample document, but only into a store with no students.
  pub async fn seed_demo(&self) -> Result<bool> {
    let sample = demo::sample_document(self.today());
    self
      .modify(move |doc| {
        if !doc.students.is_empty() {
          return false;
        }
        *doc = sample;
        true
      })
      .await
  }

  // ── Settings ──────────────────────────────────────────────────────────

  pub async fn settings(&self) -> Result<Settings> {
    self.store.load_settings().await.map_err(Error::store)
  }

  pub async fn update_profile(
    &self,
    teacher_name: Option<String>,
    subject: Option<String>,
  ) -> Result<Settings> {
    let mut settings = self.settings().await?;
    if let Some(name) = teacher_name {
      settings.teacher_name = name;
    }
    if let Some(subject) = subject {
      settings.subject = subject;
    }
    self
      .store
      .save_settings(settings.clone())
      .await
      .map_err(Error::store)?;
    Ok(settings)
  }

  /// Replace the security code. The current code must verify and the new
  /// one must match its confirmation.
  pub async fn change_security_code(&self, current: &str, new: &str, confirm: &str) -> Result<()> {
    let mut settings = self.settings().await?;
    if !settings.security_code.verify(current) {
      return Err(Error::WrongCode);
    }
    validate_new_code(new, confirm)?;
    settings.security_code = SecurityCode::hash(new)?;
    self.store.save_settings(settings).await.map_err(Error::store)
  }

  // ── Confirmation flow ─────────────────────────────────────────────────

  pub fn request_confirmation(&self, action: GatedAction) -> Challenge {
    lock(&self.gate).request(action)
  }

  pub fn cancel_confirmation(&self, token: Uuid) -> bool { lock(&self.gate).cancel(token) }

  /// Check `code` for a pending action and run it.
  ///
  /// A wrong code leaves the action pending. A confirmed course deletion
  /// does not run yet: it opens a ticket for
  /// [`Gradebook::confirm_course_deletion`].
  pub async fn confirm(&self, token: Uuid, code: &str) -> Result<Confirmed> {
    let security_code = self.settings().await?.security_code;
    let action = lock(&self.gate).confirm(token, code, &security_code)?;

    if let GatedAction::DeleteCourse { course } = action {
      let ticket = lock(&self.deletions).begin(course, Instant::now());
      return Ok(Confirmed::CourseDeletionOpened { ticket });
    }

    let applied = self.run(action.clone()).await?;
    Ok(Confirmed::Executed { action, applied })
  }

  async fn run(&self, action: GatedAction) -> Result<bool> {
    match action {
      GatedAction::DeleteStudent { student_id } => self.delete_student(&student_id).await,
      GatedAction::DeleteCourse { course } => {
        Ok(self.delete_course(&course).await?.course_removed)
      }
      GatedAction::DeleteAnnotation { student_id, index } => {
        self.delete_annotation(&student_id, index).await
      }
      GatedAction::DeleteActivity { course, activity_id } => {
        self.delete_activity(&course, &activity_id).await
      }
      GatedAction::UnlockActivity { course, activity_id } => {
        self
          .modify(move |doc| doc.set_activity_locked(&course, &activity_id, false))
          .await
      }
      GatedAction::MoveStudent { student_id, course } => {
        self.move_student(&student_id, &course).await
      }
    }
  }

  /// Finish a course deletion once the cool-down has passed.
  pub async fn confirm_course_deletion(&self, token: Uuid, phrase: &str) -> Result<CourseRemoval> {
    let course = lock(&self.deletions).confirm(token, phrase, Instant::now())?;
    self.delete_course(&course).await
  }

  pub fn cancel_course_deletion(&self, token: Uuid) -> bool { lock(&self.deletions).cancel(token) }
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{Arc, Mutex as StdMutex},
  };

  use chrono::NaiveTime;

  use super::*;

  /// Keeps the serialized document in memory, the same way a backend does.
  #[derive(Default, Clone)]
  struct MemoryStore {
    data: Arc<StdMutex<HashMap<&'static str, String>>>,
  }

  impl MemoryStore {
    fn raw(&self) -> Option<String> {
      self.data.lock().unwrap().get(crate::store::DOCUMENT_KEY).cloned()
    }
  }

  impl DocumentStore for MemoryStore {
    type Error = Infallible;

    async fn load(&self, today: NaiveDate) -> Result<Document, Infallible> {
      Ok(
        self
          .raw()
          .map(|raw| Document::from_json(&raw, today).unwrap())
          .unwrap_or_default(),
      )
    }

    async fn save(&self, doc: Document, today: NaiveDate) -> Result<(), Infallible> {
      let json = doc.to_json(today).unwrap();
      self.data.lock().unwrap().insert(crate::store::DOCUMENT_KEY, json);
      Ok(())
    }

    async fn modify<F, T>(&self, today: NaiveDate, f: F) -> Result<T, Infallible>
    where
      F: FnOnce(&mut Document) -> T + Send + 'static,
      T: Send + 'static,
    {
      let mut doc = self.load(today).await?;
      let before = doc.clone();
      let out = f(&mut doc);
      if doc != before {
        self.save(doc, today).await?;
      }
      Ok(out)
    }

    async fn load_settings(&self) -> Result<Settings, Infallible> {
      let data = self.data.lock().unwrap();
      Ok(
        data
          .get(crate::store::SETTINGS_KEY)
          .map(|raw| serde_json::from_str(raw).unwrap())
          .unwrap_or_default(),
      )
    }

    async fn save_settings(&self, settings: Settings) -> Result<(), Infallible> {
      let json = serde_json::to_string(&settings).unwrap();
      self.data.lock().unwrap().insert(crate::store::SETTINGS_KEY, json);
      Ok(())
    }
  }

  fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 15)
      .unwrap()
      .and_time(NaiveTime::from_hms_opt(14, 30, 0).unwrap())
  }

  fn gradebook() -> Gradebook<MemoryStore> {
    Gradebook::new(MemoryStore::default()).with_clock(fixed_now)
  }

  fn named(name: &str, course: &str) -> StudentRecord {
    StudentRecord {
      name: Some(name.into()),
      course: Some(course.into()),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn gated_delete_needs_the_right_code() {
    let gb = gradebook();
    let s = gb.add_student(named("Ana", "6-A")).await.unwrap();

    let challenge =
      gb.request_confirmation(GatedAction::DeleteStudent { student_id: s.id.clone() });
    assert!(matches!(gb.confirm(challenge.token, "1111").await, Err(Error::WrongCode)));
    assert!(gb.get_student(&s.id).await.unwrap().is_some());

    let done = gb.confirm(challenge.token, "6251").await.unwrap();
    assert!(matches!(done, Confirmed::Executed { applied: true, .. }));
    assert!(gb.get_student(&s.id).await.unwrap().is_none());

    assert!(matches!(
      gb.confirm(challenge.token, "6251").await,
      Err(Error::UnknownToken(_))
    ));
  }

  #[tokio::test]
  async fn unlock_only_through_the_gate() {
    let gb = gradebook();
    let s = gb.add_student(named("Ana", "6-A")).await.unwrap();
    let a = gb.add_activity("6-A", "Exam", None).await.unwrap();
    assert!(gb.lock_activity("6-A", &a.id).await.unwrap());

    assert!(matches!(
      gb.set_grade(&s.id, &a.id, "4").await,
      Err(Error::ActivityLocked(_))
    ));

    let challenge = gb.request_confirmation(GatedAction::UnlockActivity {
      course:      "6-A".into(),
      activity_id: a.id.clone(),
    });
    gb.confirm(challenge.token, "6251").await.unwrap();
    assert!(gb.set_grade(&s.id, &a.id, "4").await.unwrap());
  }

  #[tokio::test]
  async fn course_deletion_goes_through_ticket() {
    let gb = gradebook().with_deletion_cooldown(Duration::ZERO);
    gb.add_student(named("Ana", "6-A")).await.unwrap();

    let challenge = gb.request_confirmation(GatedAction::DeleteCourse { course: "6-A".into() });
    let Confirmed::CourseDeletionOpened { ticket } =
      gb.confirm(challenge.token, "6251").await.unwrap()
    else {
      panic!("course deletion should open a ticket");
    };
    assert_eq!(gb.get_courses().await.unwrap(), vec!["6-A".to_string()]);

    assert!(matches!(
      gb.confirm_course_deletion(ticket.token, "DELETE").await,
      Err(Error::WrongPhrase)
    ));
    let removal = gb.confirm_course_deletion(ticket.token, "DELETE COURSE").await.unwrap();
    assert_eq!(removal.students_removed, 1);
    assert!(gb.get_courses().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn course_deletion_refuses_early_confirmation() {
    let gb = gradebook();
    gb.add_course("6-A").await.unwrap();
    let challenge = gb.request_confirmation(GatedAction::DeleteCourse { course: "6-A".into() });
    let Confirmed::CourseDeletionOpened { ticket } =
      gb.confirm(challenge.token, "6251").await.unwrap()
    else {
      panic!("course deletion should open a ticket");
    };
    assert!(matches!(
      gb.confirm_course_deletion(ticket.token, "DELETE COURSE").await,
      Err(Error::CoolingDown(_))
    ));
    assert!(gb.cancel_course_deletion(ticket.token));
  }

  #[tokio::test]
  async fn changed_code_is_required_afterwards() {
    let gb = gradebook();
    assert!(matches!(
      gb.change_security_code("0000", "1234", "1234").await,
      Err(Error::WrongCode)
    ));
    assert!(matches!(
      gb.change_security_code("6251", "1234", "4321").await,
      Err(Error::CodeMismatch)
    ));
    gb.change_security_code("6251", "1234", "1234").await.unwrap();

    let s = gb.add_student(named("Ana", "6-A")).await.unwrap();
    let challenge = gb.request_confirmation(GatedAction::DeleteStudent { student_id: s.id });
    assert!(matches!(gb.confirm(challenge.token, "6251").await, Err(Error::WrongCode)));
    assert!(gb.confirm(challenge.token, "1234").await.is_ok());
  }

  #[tokio::test]
  async fn invalid_import_leaves_document_alone() {
    let gb = gradebook();
    gb.add_student(named("Ana", "6-A")).await.unwrap();
    let before = gb.store().raw();

    let err = gb.import_backup(r#"{"students": []}"#).await.unwrap_err();
    assert!(matches!(err, Error::InvalidBackup(_)));
    assert_eq!(gb.store().raw(), before);
  }

  #[tokio::test]
  async fn export_then_import_replaces_everything() {
    let gb = gradebook();
    gb.add_student(named("Ana", "6-A")).await.unwrap();
    let file = gb.export_backup().await.unwrap();
    assert_eq!(file.file_name, "backup-2025-06-15-1430.json");

    gb.add_student(named("Bruno", "6-B")).await.unwrap();
    let summary = gb.import_backup(&file.contents).await.unwrap();
    assert_eq!(summary, ImportSummary { students: 1, courses: 1 });
    assert_eq!(gb.get_courses().await.unwrap(), vec!["6-A".to_string()]);
  }

  #[tokio::test]
  async fn annotation_defaults_to_today() {
    let gb = gradebook();
    let s = gb.add_student(named("Ana", "6-A")).await.unwrap();
    assert!(gb.add_annotation(&s.id, None, "participated").await.unwrap());
    let stored = gb.get_student(&s.id).await.unwrap().unwrap();
    assert_eq!(stored.annotations, vec!["[2025-06-15] participated".to_string()]);
  }

  #[tokio::test]
  async fn course_view_combines_aggregates() {
    let gb = gradebook().with_missing_attendance(MissingAttendance::Present);
    let ana = gb.add_student(named("Ana", "6-A")).await.unwrap();
    gb.add_student(named("bruno", "6-A")).await.unwrap();
    let a = gb.add_activity("6-A", "Quiz", None).await.unwrap();
    gb.add_activity("6-A", "Essay", None).await.unwrap();
    gb.set_grade(&ana.id, &a.id, "4").await.unwrap();
    let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
    assert!(
      gb.set_attendance(&ana.id, day, Some(AttendanceStatus::Late))
        .await
        .unwrap()
    );

    let view = gb
      .course_view("6-A", &SortKey::Name, SortDirection::Asc)
      .await
      .unwrap();
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.rows[0].average, Some(4.0));
    assert_eq!(view.rows[0].row_average, Some(2.5));
    assert_eq!(view.compliance.percent, 25);
    assert_eq!(view.attendance_dates, vec![day]);
    // bruno has no entry, read as present under this policy.
    assert_eq!(view.rows[1].attendance.present, 1);
  }

  #[tokio::test]
  async fn seed_only_fills_an_empty_store() {
    let gb = gradebook();
    assert!(gb.seed_demo().await.unwrap());
    assert!(!gb.seed_demo().await.unwrap());
    assert_eq!(gb.get_students().await.unwrap().len(), 50);
  }
}
