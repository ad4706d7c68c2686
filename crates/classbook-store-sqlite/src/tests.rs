//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use classbook_core::{
  Error as CoreError,
  document::Document,
  gate::GatedAction,
  gradebook::{Confirmed, Gradebook},
  settings::Settings,
  store::{DOCUMENT_KEY, DocumentStore, SETTINGS_KEY},
  student::StudentRecord,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn fixed_now() -> NaiveDateTime {
  NaiveDate::from_ymd_opt(2025, 6, 15)
    .unwrap()
    .and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap())
}

fn today() -> NaiveDate { fixed_now().date() }

async fn gradebook() -> Gradebook<SqliteStore> {
  Gradebook::new(store().await).with_clock(fixed_now)
}

fn named(name: &str, course: &str) -> StudentRecord {
  StudentRecord {
    name: Some(name.into()),
    course: Some(course.into()),
    ..Default::default()
  }
}

fn ids(students: &[classbook_core::student::Student]) -> Vec<String> {
  let mut ids: Vec<String> = students.iter().map(|s| s.id.clone()).collect();
  ids.sort();
  ids
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_store_loads_empty_document() {
  let s = store().await;
  assert_eq!(s.load(today()).await.unwrap(), Document::default());
  assert_eq!(s.load_settings().await.unwrap(), Settings::default());
}

#[tokio::test]
async fn save_then_load() {
  let s = store().await;
  let mut doc = Document::default();
  doc.add_student(named("Ana", "6-A"), today());
  doc.add_activity("6-A", "Quiz", None);
  s.save(doc.clone(), today()).await.unwrap();
  assert_eq!(s.load(today()).await.unwrap(), doc);
}

#[tokio::test]
async fn modify_without_change_writes_nothing() {
  let s = store().await;
  let out = s.modify(today(), |doc| doc.students.len()).await.unwrap();
  assert_eq!(out, 0);
  assert_eq!(s.raw(DOCUMENT_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn older_document_shape_is_migrated() {
  let s = store().await;
  s.put_raw(
    DOCUMENT_KEY,
    r#"{"students":[{"id":"x","name":"Ana","course":"6-B","age":12,"observations":["[2024-01-01] old"]}],
        "activities":{"6-B":[{"id":"act3","name":"Science Lab"}]}}"#,
  )
  .await
  .unwrap();

  let doc = s.load(today()).await.unwrap();
  assert_eq!(doc.courses, vec!["6-B".to_string()]);
  assert!(doc.materials.is_empty());
  let ana = doc.student("x").unwrap();
  assert_eq!(ana.age_on(today()), 12);
  assert_eq!(ana.annotations, vec!["[2024-01-01] old".to_string()]);
  assert_eq!(ana.parent_email, "pending@pending.co");
}

#[tokio::test]
async fn ids_assigned_on_load_are_kept() {
  let s = store().await;
  s.put_raw(
    DOCUMENT_KEY,
    r#"{"students":[{"name":"Ana","course":"6-A"}],"activities":{}}"#,
  )
  .await
  .unwrap();

  let gb = Gradebook::new(s).with_clock(fixed_now);
  let first = gb.get_students().await.unwrap()[0].id.clone();
  let second = gb.get_students().await.unwrap()[0].id.clone();
  assert_eq!(first, second);

  assert!(gb.delete_student(&first).await.unwrap());
  assert!(gb.get_students().await.unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_document_is_set_aside() {
  let s = store().await;
  s.put_raw(DOCUMENT_KEY, "{not json").await.unwrap();

  let doc = s.load(today()).await.unwrap();
  assert_eq!(doc, Document::default());

  let copies = s.corrupt_copies().await.unwrap();
  assert_eq!(copies.len(), 1);
  assert_eq!(s.raw(&copies[0]).await.unwrap().as_deref(), Some("{not json"));
  assert_eq!(s.raw(DOCUMENT_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn unreadable_settings_fall_back_to_defaults() {
  let s = store().await;
  s.put_raw(SETTINGS_KEY, "[]").await.unwrap();
  assert_eq!(s.load_settings().await.unwrap(), Settings::default());
}

// ─── Gradebook over SQLite ───────────────────────────────────────────────────

#[tokio::test]
async fn sanitize_is_stable_across_saves() {
  let gb = gradebook().await;
  let s = gb.add_student(named("Ana", "6-A")).await.unwrap();
  let first = gb.get_student(&s.id).await.unwrap().unwrap();

  // Rewrite unrelated data a few times; the student must not drift.
  for _ in 0..3 {
    gb.add_course("6-B").await.unwrap();
    gb.add_material_column("6-B", "Book").await.unwrap();
  }
  let again = gb.get_student(&s.id).await.unwrap().unwrap();
  assert_eq!(first, again);
  assert_eq!(again.age_on(today()), 10);
}

#[tokio::test]
async fn rename_course_moves_exactly_its_students() {
  let gb = gradebook().await;
  gb.add_student(named("Ana", "6-A")).await.unwrap();
  gb.add_student(named("Bruno", "6-A")).await.unwrap();
  gb.add_student(named("Carla", "6-B")).await.unwrap();
  gb.add_activity("6-A", "Quiz", None).await.unwrap();

  let before = ids(&gb.get_students_by_course("6-A").await.unwrap());
  assert!(gb.update_course_name("6-A", "7-A").await.unwrap());

  assert_eq!(ids(&gb.get_students_by_course("7-A").await.unwrap()), before);
  assert!(gb.get_students_by_course("6-A").await.unwrap().is_empty());
  assert_eq!(gb.get_activities("7-A").await.unwrap().len(), 1);
  assert!(!gb.get_courses().await.unwrap().contains(&"6-A".to_string()));
}

#[tokio::test]
async fn delete_course_cascades() {
  let gb = gradebook().await;
  gb.add_student(named("Ana", "6-A")).await.unwrap();
  gb.add_student(named("Carla", "6-B")).await.unwrap();
  gb.add_activity("6-A", "Quiz", None).await.unwrap();
  gb.add_material_column("6-A", "Book").await.unwrap();

  let removal = gb.delete_course("6-A").await.unwrap();
  assert!(removal.course_removed);
  assert_eq!(removal.students_removed, 1);

  assert_eq!(gb.get_courses().await.unwrap(), vec!["6-B".to_string()]);
  assert!(gb.get_students_by_course("6-A").await.unwrap().is_empty());
  assert!(gb.get_activities("6-A").await.unwrap().is_empty());
  assert!(gb.get_materials("6-A").await.unwrap().is_empty());
}

#[tokio::test]
async fn update_and_delete_of_missing_ids_are_quiet() {
  let gb = gradebook().await;
  let ghost = StudentRecord { id: Some("ghost".into()), ..named("Nobody", "6-A") };
  assert!(!gb.update_student(ghost).await.unwrap());
  assert!(!gb.delete_student("ghost").await.unwrap());
  assert!(gb.get_students().await.unwrap().is_empty());
}

#[tokio::test]
async fn locked_activity_survives_a_direct_update() {
  let gb = gradebook().await;
  let s = gb.add_student(named("Ana", "6-A")).await.unwrap();
  let a = gb.add_activity("6-A", "Exam", None).await.unwrap();
  gb.set_grade(&s.id, &a.id, "3").await.unwrap();
  gb.lock_activity("6-A", &a.id).await.unwrap();

  let mut record = gb.get_student(&s.id).await.unwrap().unwrap().to_record(today());
  record
    .grades
    .get_or_insert_with(Default::default)
    .insert(a.id.clone(), "5.0".into());
  assert!(matches!(
    gb.update_student(record).await,
    Err(CoreError::ActivityLocked(_))
  ));
  let stored = gb.get_student(&s.id).await.unwrap().unwrap();
  assert_eq!(stored.grades[&a.id], "3.0");
}

#[tokio::test]
async fn update_does_not_move_a_student() {
  let gb = gradebook().await;
  let s = gb.add_student(named("Ana", "6-A")).await.unwrap();
  let record = StudentRecord { course: Some("6-B".into()), ..s.to_record(today()) };

  assert!(matches!(
    gb.update_student(record).await,
    Err(CoreError::CourseChange(_))
  ));
  let stored = gb.get_student(&s.id).await.unwrap().unwrap();
  assert_eq!(stored.course, "6-A");
  assert_eq!(gb.get_courses().await.unwrap(), vec!["6-A".to_string()]);
}

#[tokio::test]
async fn invalid_import_keeps_stored_document() {
  let gb = gradebook().await;
  gb.add_student(named("Ana", "6-A")).await.unwrap();
  let before = gb.store().raw(DOCUMENT_KEY).await.unwrap();

  let missing_activities = r#"{"students":[],"courses":[]}"#;
  assert!(matches!(
    gb.import_backup(missing_activities).await,
    Err(CoreError::InvalidBackup(_))
  ));
  assert_eq!(gb.store().raw(DOCUMENT_KEY).await.unwrap(), before);
}

#[tokio::test]
async fn gated_delete_removes_exactly_once() {
  let gb = gradebook().await;
  let s = gb.add_student(named("Ana", "6-A")).await.unwrap();
  let challenge = gb.request_confirmation(GatedAction::DeleteStudent { student_id: s.id.clone() });

  assert!(gb.confirm(challenge.token, "0000").await.is_err());
  assert_eq!(gb.get_students().await.unwrap().len(), 1);

  let done = gb.confirm(challenge.token, "6251").await.unwrap();
  assert_eq!(done, Confirmed::Executed {
    action:  GatedAction::DeleteStudent { student_id: s.id.clone() },
    applied: true,
  });
  assert!(gb.get_students().await.unwrap().is_empty());
  assert!(gb.confirm(challenge.token, "6251").await.is_err());
}

#[tokio::test]
async fn security_code_persists() {
  let gb = gradebook().await;
  gb.change_security_code("6251", "8080", "8080").await.unwrap();
  let settings = gb.store().load_settings().await.unwrap();
  assert!(settings.security_code.verify("8080"));
  assert!(!settings.security_code.verify("6251"));
}
