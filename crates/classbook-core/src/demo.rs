//! Sample data for trying the application on an empty store.

use chrono::NaiveDate;
use serde_json::json;

use crate::{document::Document, student::StudentRecord};

const STUDENTS: usize = 50;

/// Fifty students split across two courses, with three activities.
pub fn sample_document(today: NaiveDate) -> Document {
  let mut doc = Document::default();
  for course in ["6-A", "6-B"] {
    doc.add_course(course);
  }
  doc.add_activity("6-A", "Math Exam", None);
  doc.add_activity("6-A", "History Essay", None);
  doc.add_activity("6-B", "Science Lab", None);

  for i in 0..STUDENTS {
    let record = StudentRecord {
      name: Some(format!("Student {}", i + 1)),
      course: Some(if i % 2 == 0 { "6-A" } else { "6-B" }.to_owned()),
      age: Some(json!(12 + i % 3)),
      parent_name: Some(format!("Parent {}", i + 1)),
      parent_phone: Some(format!("555-00{i}")),
      parent_phone2: Some(format!("555-01{i}")),
      parent_email: Some(format!("parent{}@example.com", i + 1)),
      vps_code: Some(format!("VPS{}", 1000 + i)),
      ..Default::default()
    };
    doc.add_student(record, today);
  }
  doc
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::aggregate::derive_courses;

  #[test]
  fn sample_is_consistent() {
    let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
    let doc = sample_document(today);
    assert_eq!(doc.students.len(), 50);
    assert_eq!(derive_courses(&doc.students), doc.courses);
    assert_eq!(doc.students[0].age_on(today), 12);
    assert_eq!(doc.activities_for("6-B").len(), 1);
  }
}
