//! Core behaviors behind the HTTP handlers.
//!
//! Every activity event follows the same sequence, each step its own atomic store
//! operation:
//!   1. mutate counters / arrays
//!   2. recompute the level from the persisted counters (`progression::update_level`)
//!   3. evaluate and grant achievements against the snapshot step 2 returned
//!
//! Step 3 cannot start without the `Levelled` snapshot of step 2, so "Rising Star"
//! always sees the level of the current event. Nothing is rolled back when a later
//! step fails: the activity stays recorded and the next event re-derives the rest.

use tracing::{info, instrument, warn};

use crate::achievements::{grant, progress_report};
use crate::domain::{ArrayItem, CompletedCourse, Counter, FieldValue, InitialData, UserRecord};
use crate::error::ApiError;
use crate::metrics::{acceptance_rate, average_ai_score, score_stats, ScoreStats};
use crate::progression::{update_level, Levelled};
use crate::protocol::{AchievementSummary, ProfileView, ProgressOut};
use crate::state::AppState;

pub fn require_ocid(ocid: Option<String>) -> Result<String, ApiError> {
  match ocid.map(|s| s.trim().to_string()) {
    Some(s) if !s.is_empty() => Ok(s),
    _ => Err(ApiError::Validation("OCId is required".into())),
  }
}

/// What one settle pass produced.
pub struct Settled {
  pub progress: ProgressOut,
  pub snapshot: Levelled,
  /// Achievement set size as stored after the grant.
  pub achievements_total: usize,
}

/// Level then achievements for one user, in that order.
#[instrument(level = "info", skip(state))]
pub async fn settle(state: &AppState, ocid: &str) -> Result<Settled, ApiError> {
  let (change, snapshot) = update_level(&state.users, &state.levels, ocid).await?;
  let granted = grant(&state.users, &state.criteria, &snapshot).await?;
  let progress = ProgressOut {
    level_updated: change.changed(),
    new_level: change.current,
    new_achievements: granted.added,
  };
  Ok(Settled { progress, snapshot, achievements_total: granted.total })
}

#[instrument(level = "info", skip(state))]
pub async fn record_submission(state: &AppState, ocid: &str, accepted: bool) -> Result<ProgressOut, ApiError> {
  state.users.increment(ocid, Counter::Submissions, 1).await?;
  if accepted {
    state.users.increment(ocid, Counter::AcceptedSubmissions, 1).await?;
  }
  let out = settle(state, ocid).await?.progress;
  info!(target: "progression", %ocid, accepted, level = out.new_level, granted = out.new_achievements.len(), "Submission recorded");
  Ok(out)
}

pub fn validate_score(score: Option<f64>) -> Result<f64, ApiError> {
  let score = score.ok_or_else(|| ApiError::Validation("score is required".into()))?;
  if !score.is_finite() || !(0.0..=100.0).contains(&score) {
    return Err(ApiError::Validation("score must be a number between 0 and 100".into()));
  }
  Ok(score)
}

/// Returns `(averageScore, totalScores, progress)` computed after the append.
#[instrument(level = "info", skip(state))]
pub async fn record_ai_score(state: &AppState, ocid: &str, score: f64) -> Result<(f64, usize, ProgressOut), ApiError> {
  state.users.append(ocid, ArrayItem::AiScore(score)).await?;
  let Settled { progress: out, snapshot, .. } = settle(state, ocid).await?;
  let scores = &snapshot.data().ai_scores;
  let average = average_ai_score(scores);
  info!(target: "progression", %ocid, score, average, total = scores.len(), "AI score recorded");
  Ok((average, scores.len(), out))
}

#[derive(Debug, PartialEq)]
pub enum CourseOutcome {
  AlreadyCompleted,
  Recorded(ProgressOut),
}

#[instrument(level = "info", skip(state, course))]
pub async fn complete_course(
  state: &AppState,
  ocid: &str,
  course_id: &str,
  course: serde_json::Value,
) -> Result<CourseOutcome, ApiError> {
  let user = state.users.get(ocid).await.ok_or_else(|| ApiError::NotFound("User not found".into()))?;
  if user.data.has_completed(course_id) {
    info!(target: "progression", %ocid, %course_id, "Course already completed; nothing recorded");
    return Ok(CourseOutcome::AlreadyCompleted);
  }

  let entry = CompletedCourse { course_id: course_id.to_string(), course };
  state.users.append(ocid, ArrayItem::CompletedCourse(entry)).await?;
  state.users.increment(ocid, Counter::CourseCompleted, 1).await?;

  // The enrollment ledger is secondary; its failure never fails the completion.
  if let Err(e) = state.enrollments.mark_completed(ocid, course_id).await {
    warn!(target: "enrollment", %ocid, %course_id, error = %e, "Failed to mark enrollment completed");
  }

  let out = settle(state, ocid).await?.progress;
  info!(target: "progression", %ocid, %course_id, level = out.new_level, "Course completion recorded");
  Ok(CourseOutcome::Recorded(out))
}

/// On-demand re-evaluation for users whose triggering event never arrived.
/// Returns the newly granted ids and the user's total achievement count.
#[instrument(level = "info", skip(state))]
pub async fn reconcile_achievements(state: &AppState, ocid: &str) -> Result<(Vec<String>, usize), ApiError> {
  let settled = settle(state, ocid).await?;
  Ok((settled.progress.new_achievements, settled.achievements_total))
}

pub async fn load_user(state: &AppState, ocid: &str) -> Result<UserRecord, ApiError> {
  state.users.get(ocid).await.ok_or_else(|| ApiError::NotFound("User not found".into()))
}

pub async fn create_user(state: &AppState, ocid: &str, initial: InitialData) -> Result<UserRecord, ApiError> {
  Ok(state.users.create(ocid, initial).await?)
}

pub fn profile_view(user: UserRecord) -> ProfileView {
  ProfileView {
    average_ai_score: average_ai_score(&user.data.ai_scores),
    acceptance_rate: acceptance_rate(&user.data),
    member_since: user.created_at,
    last_active: user.updated_at,
    data: user.data,
  }
}

/// Apply the supplied profile fields; returns the names of the fields written.
#[instrument(level = "info", skip(state, eth_address, image))]
pub async fn update_profile(
  state: &AppState,
  ocid: &str,
  eth_address: Option<String>,
  image: Option<String>,
) -> Result<Vec<&'static str>, ApiError> {
  let mut changes = Vec::new();
  if let Some(v) = eth_address {
    changes.push(FieldValue::EthAddress(v));
  }
  if let Some(v) = image {
    changes.push(FieldValue::Image(v));
  }
  if changes.is_empty() {
    return Err(ApiError::Validation("No fields to update provided".into()));
  }

  let mut updated = Vec::with_capacity(changes.len());
  for change in changes {
    let name = change.name();
    state.users.set_field(ocid, change).await?;
    updated.push(name);
  }
  Ok(updated)
}

pub async fn ai_stats(state: &AppState, ocid: &str) -> Result<ScoreStats, ApiError> {
  let user = load_user(state, ocid).await?;
  Ok(score_stats(&user.data.ai_scores))
}

pub async fn achievement_summary(state: &AppState, ocid: &str) -> Result<AchievementSummary, ApiError> {
  let user = load_user(state, ocid).await?;
  let progress = progress_report(&state.criteria, &user.data);
  Ok(AchievementSummary {
    earned: user.data.achievements,
    total: progress.len(),
    progress,
  })
}
