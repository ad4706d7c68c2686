//! Confirmation of destructive actions.
//!
//! A gated action is requested first and parked under a token. It is handed
//! back for execution only when the shared security code is supplied for
//! that token. Course deletion adds a second step on top: a ticket that
//! cannot be confirmed until a cool-down has elapsed, and then only with a
//! typed phrase.
//!
//! This is friction against accidents, not access control. Wrong codes are
//! not counted and never lock anything out.

use std::{
  collections::HashMap,
  time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, settings::SecurityCode};

// ─── Actions ─────────────────────────────────────────────────────────────────

/// An action that needs the security code before it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GatedAction {
  DeleteStudent { student_id: String },
  DeleteCourse { course: String },
  DeleteAnnotation { student_id: String, index: usize },
  DeleteActivity { course: String, activity_id: String },
  UnlockActivity { course: String, activity_id: String },
  MoveStudent { student_id: String, course: String },
}

impl GatedAction {
  /// Text shown next to the code prompt.
  pub fn description(&self) -> String {
    match self {
      Self::DeleteStudent { student_id } => format!("Delete student {student_id}"),
      Self::DeleteCourse { course } => {
        format!("Delete course {course} with all of its students")
      }
      Self::DeleteAnnotation { student_id, index } => {
        format!("Delete observation #{} of student {student_id}", index + 1)
      }
      Self::DeleteActivity { course, activity_id } => {
        format!("Delete activity {activity_id} of {course} and its grades")
      }
      Self::UnlockActivity { course, activity_id } => {
        format!("Unlock activity {activity_id} of {course}")
      }
      Self::MoveStudent { student_id, course } => {
        format!("Move student {student_id} to {course}")
      }
    }
  }
}

/// Returned by [`SecurityGate::request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Challenge {
  pub token:       Uuid,
  pub description: String,
}

// ─── SecurityGate ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SecurityGate {
  pending: HashMap<Uuid, GatedAction>,
}

impl SecurityGate {
  pub fn new() -> Self { Self::default() }

  /// Park `action` until it is confirmed or cancelled.
  pub fn request(&mut self, action: GatedAction) -> Challenge {
    let token = Uuid::new_v4();
    let description = action.description();
    self.pending.insert(token, action);
    Challenge { token, description }
  }

  /// Release the action parked under `token` if `candidate` is the code.
  ///
  /// A wrong code keeps the action pending so the caller can try again.
  /// The action is handed out at most once.
  pub fn confirm(
    &mut self,
    token: Uuid,
    candidate: &str,
    code: &SecurityCode,
  ) -> Result<GatedAction> {
    if !self.pending.contains_key(&token) {
      return Err(Error::UnknownToken(token));
    }
    if !code.verify(candidate) {
      return Err(Error::WrongCode);
    }
    self.pending.remove(&token).ok_or(Error::UnknownToken(token))
  }

  /// Drop a pending action. Returns `true` if there was one.
  pub fn cancel(&mut self, token: Uuid) -> bool { self.pending.remove(&token).is_some() }

  pub fn pending(&self, token: Uuid) -> Option<&GatedAction> { self.pending.get(&token) }
}

// ─── Course deletion ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionTicket {
  pub token:    Uuid,
  pub course:   String,
  /// Time that must pass before the phrase is accepted.
  #[serde(rename = "cooldown_secs", serialize_with = "as_secs")]
  pub cooldown: Duration,
  pub phrase:   &'static str,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_u64(d.as_secs())
}

#[derive(Debug)]
struct OpenTicket {
  course:  String,
  opened:  Instant,
}

/// Second confirmation step for course deletion.
#[derive(Debug)]
pub struct CourseDeletionGuard {
  cooldown: Duration,
  tickets:  HashMap<Uuid, OpenTicket>,
}

impl Default for CourseDeletionGuard {
  fn default() -> Self { Self::new(Self::COOLDOWN) }
}

impl CourseDeletionGuard {
  pub const COOLDOWN: Duration = Duration::from_secs(30);
  pub const PHRASE: &'static str = "DELETE COURSE";

  pub fn new(cooldown: Duration) -> Self {
    Self { cooldown, tickets: HashMap::new() }
  }

  pub fn begin(&mut self, course: String, now: Instant) -> DeletionTicket {
    let token = Uuid::new_v4();
    self.tickets.insert(token, OpenTicket { course: course.clone(), opened: now });
    DeletionTicket {
      token,
      course,
      cooldown: self.cooldown,
      phrase: Self::PHRASE,
    }
  }

  /// Consume the ticket and return its course.
  ///
  /// Too early or a phrase that is not exact leaves the ticket open.
  pub fn confirm(&mut self, token: Uuid, phrase: &str, now: Instant) -> Result<String> {
    let ticket = self.tickets.get(&token).ok_or(Error::UnknownToken(token))?;
    let elapsed = now.saturating_duration_since(ticket.opened);
    if elapsed < self.cooldown {
      return Err(Error::CoolingDown(self.cooldown - elapsed));
    }
    if phrase != Self::PHRASE {
      return Err(Error::WrongPhrase);
    }
    self
      .tickets
      .remove(&token)
      .map(|t| t.course)
      .ok_or(Error::UnknownToken(token))
  }

  pub fn cancel(&mut self, token: Uuid) -> bool { self.tickets.remove(&token).is_some() }
}
