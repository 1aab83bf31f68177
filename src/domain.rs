//! Domain models: user records, their updatable fields, and course enrollments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A course the user finished. `course` is whatever the client sent and is kept verbatim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletedCourse {
  #[serde(rename = "courseId")]
  pub course_id: String,
  #[serde(default)]
  pub course: serde_json::Value,
}

/// Per-user progression document. Field names follow the stored document layout.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct UserData {
  #[serde(rename = "OCId")]
  pub ocid: String,
  #[serde(rename = "ethAddress", default)]
  pub eth_address: String,
  #[serde(default)]
  pub image: String,
  #[serde(rename = "completedCourses", default)]
  pub completed_courses: Vec<CompletedCourse>,
  #[serde(rename = "courseCompleted", default)]
  pub course_completed: u64,
  #[serde(default)]
  pub submissions: u64,
  #[serde(rename = "acceptedSubmissions", default)]
  pub accepted_submissions: u64,
  #[serde(rename = "AI_Scores", default)]
  pub ai_scores: Vec<f64>,
  #[serde(rename = "Level", default)]
  pub level: u32,
  #[serde(rename = "Achievement", default)]
  pub achievements: Vec<String>,
}

impl UserData {
  pub fn counters(&self) -> Counters {
    Counters {
      submissions: self.submissions,
      accepted_submissions: self.accepted_submissions,
      course_completed: self.course_completed,
    }
  }

  pub fn has_completed(&self, course_id: &str) -> bool {
    self.completed_courses.iter().any(|c| c.course_id == course_id)
  }

  pub fn has_achievement(&self, id: &str) -> bool {
    self.achievements.iter().any(|a| a == id)
  }
}

/// The activity counters the level is derived from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
  pub submissions: u64,
  pub accepted_submissions: u64,
  pub course_completed: u64,
}

/// Stored user document: identity, progression data and bookkeeping timestamps.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
  #[serde(rename = "_id")]
  pub id: Uuid,
  #[serde(rename = "OCId")]
  pub ocid: String,
  pub data: UserData,
  #[serde(rename = "createdAt")]
  pub created_at: DateTime<Utc>,
  #[serde(rename = "updatedAt")]
  pub updated_at: DateTime<Utc>,
}

/// Profile fields a caller may supply at registration; everything else starts at defaults.
#[derive(Clone, Debug, Default)]
pub struct InitialData {
  pub eth_address: String,
  pub image: String,
}

/// Overwritable fields, one variant per field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
  EthAddress(String),
  Image(String),
  Level(u32),
  CompletedCourses(Vec<CompletedCourse>),
}

impl FieldValue {
  pub fn name(&self) -> &'static str {
    match self {
      FieldValue::EthAddress(_) => "ethAddress",
      FieldValue::Image(_) => "image",
      FieldValue::Level(_) => "Level",
      FieldValue::CompletedCourses(_) => "completedCourses",
    }
  }

  pub(crate) fn apply(self, data: &mut UserData) {
    match self {
      FieldValue::EthAddress(v) => data.eth_address = v,
      FieldValue::Image(v) => data.image = v,
      FieldValue::Level(v) => data.level = v,
      FieldValue::CompletedCourses(v) => data.completed_courses = v,
    }
  }
}

/// Numeric fields that only move by increments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
  CourseCompleted,
  Submissions,
  AcceptedSubmissions,
}

impl Counter {
  pub fn name(self) -> &'static str {
    match self {
      Counter::CourseCompleted => "courseCompleted",
      Counter::Submissions => "submissions",
      Counter::AcceptedSubmissions => "acceptedSubmissions",
    }
  }

  pub(crate) fn slot(self, data: &mut UserData) -> &mut u64 {
    match self {
      Counter::CourseCompleted => &mut data.course_completed,
      Counter::Submissions => &mut data.submissions,
      Counter::AcceptedSubmissions => &mut data.accepted_submissions,
    }
  }
}

/// Items appended to one of the array fields.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayItem {
  CompletedCourse(CompletedCourse),
  AiScore(f64),
}

impl ArrayItem {
  pub fn name(&self) -> &'static str {
    match self {
      ArrayItem::CompletedCourse(_) => "completedCourses",
      ArrayItem::AiScore(_) => "AI_Scores",
    }
  }

  pub(crate) fn push_into(self, data: &mut UserData) {
    match self {
      ArrayItem::CompletedCourse(c) => data.completed_courses.push(c),
      ArrayItem::AiScore(s) => data.ai_scores.push(s),
    }
  }
}

/// A user's registration for one course (the `userCourses` ledger).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
  #[serde(rename = "OCId")]
  pub ocid: String,
  #[serde(rename = "courseId")]
  pub course_id: String,
  pub completed: bool,
  #[serde(rename = "nftMinted")]
  pub nft_minted: bool,
  #[serde(rename = "enrolledAt")]
  pub enrolled_at: DateTime<Utc>,
}
