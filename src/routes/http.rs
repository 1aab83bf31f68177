//! HTTP endpoint handlers. These are thin wrappers that validate input and forward to core logic.
//! Validation happens before any store access; failures render through `ApiError`.

use std::sync::Arc;
use axum::{extract::{FromRequest, State, Query}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::domain::InitialData;
use crate::error::ApiError;
use crate::logic::{self, CourseOutcome};
use crate::protocol::*;
use crate::state::AppState;

type Shared = State<Arc<AppState>>;

/// JSON body whose rejections render as `{success:false,error}` with status 400.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true, version: env!("CARGO_PKG_VERSION") })
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_create_user(State(state): Shared, ApiJson(body): ApiJson<CreateUserIn>) -> Result<Json<CreateUserOut>, ApiError> {
  let ocid = logic::require_ocid(body.ocid)?;
  let initial = InitialData {
    eth_address: body.eth_address.unwrap_or_default(),
    image: body.image.unwrap_or_default(),
  };
  let user = logic::create_user(&state, &ocid, initial).await?;
  Ok(Json(CreateUserOut { success: true, message: "User created successfully", user_id: user.id }))
}

#[instrument(level = "info", skip(state), fields(ocid = ?q.ocid))]
pub async fn http_get_user(State(state): Shared, Query(q): Query<OcidQuery>) -> Result<Json<UserOut>, ApiError> {
  let ocid = logic::require_ocid(q.ocid)?;
  let user = logic::load_user(&state, &ocid).await?;
  Ok(Json(UserOut { success: true, user }))
}

#[instrument(level = "info", skip(state), fields(ocid = ?q.ocid))]
pub async fn http_get_profile(State(state): Shared, Query(q): Query<OcidQuery>) -> Result<Json<ProfileOut>, ApiError> {
  let ocid = logic::require_ocid(q.ocid)?;
  let user = logic::load_user(&state, &ocid).await?;
  Ok(Json(ProfileOut { success: true, profile: logic::profile_view(user) }))
}

#[instrument(level = "info", skip(state, body), fields(ocid = ?body.ocid))]
pub async fn http_patch_profile(State(state): Shared, ApiJson(body): ApiJson<ProfilePatchIn>) -> Result<Json<ProfilePatchOut>, ApiError> {
  let ocid = logic::require_ocid(body.ocid)?;
  let updated_fields = logic::update_profile(&state, &ocid, body.eth_address, body.image).await?;
  Ok(Json(ProfilePatchOut { success: true, message: "Profile updated successfully", updated_fields }))
}

#[instrument(level = "info", skip(state, body), fields(ocid = ?body.ocid, accepted = body.is_accepted))]
pub async fn http_post_submission(State(state): Shared, ApiJson(body): ApiJson<SubmissionIn>) -> Result<Json<SubmissionOut>, ApiError> {
  let ocid = logic::require_ocid(body.ocid)?;
  let progress = logic::record_submission(&state, &ocid, body.is_accepted).await?;
  Ok(Json(SubmissionOut { success: true, message: "Submission recorded successfully", progress }))
}

#[instrument(level = "info", skip(state, body), fields(ocid = ?body.ocid, score = ?body.score))]
pub async fn http_post_ai_score(State(state): Shared, ApiJson(body): ApiJson<AiScoreIn>) -> Result<Json<AiScoreOut>, ApiError> {
  let ocid = logic::require_ocid(body.ocid)?;
  let score = logic::validate_score(body.score)?;
  let (average_score, total_scores, progress) = logic::record_ai_score(&state, &ocid, score).await?;
  Ok(Json(AiScoreOut { success: true, message: "AI score recorded successfully", average_score, total_scores, progress }))
}

#[instrument(level = "info", skip(state), fields(ocid = ?q.ocid))]
pub async fn http_get_ai_score(State(state): Shared, Query(q): Query<OcidQuery>) -> Result<Json<AiStatsOut>, ApiError> {
  let ocid = logic::require_ocid(q.ocid)?;
  let data = logic::ai_stats(&state, &ocid).await?;
  Ok(Json(AiStatsOut { success: true, data }))
}

#[instrument(level = "info", skip(state, body), fields(ocid = ?body.ocid, course_id = ?body.course_id))]
pub async fn http_post_course(State(state): Shared, ApiJson(body): ApiJson<CourseCompletionIn>) -> Result<Json<CourseCompletionOut>, ApiError> {
  let ocid = logic::require_ocid(body.ocid)?;
  let course_id = body
    .course_id
    .filter(|c| !c.trim().is_empty())
    .ok_or_else(|| ApiError::Validation("Course ID is required".into()))?;

  let out = match logic::complete_course(&state, &ocid, &course_id, body.course).await? {
    CourseOutcome::AlreadyCompleted => CourseCompletionOut {
      success: true,
      message: "Course already completed",
      already_completed: true,
      progress: None,
    },
    CourseOutcome::Recorded(p) => CourseCompletionOut {
      success: true,
      message: "Course completion recorded successfully",
      already_completed: false,
      progress: Some(p),
    },
  };
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(ocid = ?q.ocid))]
pub async fn http_get_achievements(State(state): Shared, Query(q): Query<OcidQuery>) -> Result<Json<AchievementsOut>, ApiError> {
  let ocid = logic::require_ocid(q.ocid)?;
  let achievements = logic::achievement_summary(&state, &ocid).await?;
  Ok(Json(AchievementsOut { success: true, achievements }))
}

#[instrument(level = "info", skip(state, body), fields(ocid = ?body.ocid))]
pub async fn http_post_achievements(State(state): Shared, ApiJson(body): ApiJson<OcidIn>) -> Result<Json<AchievementCheckOut>, ApiError> {
  let ocid = logic::require_ocid(body.ocid)?;
  let (new_achievements, total_achievements) = logic::reconcile_achievements(&state, &ocid).await?;
  info!(target: "achievements", %ocid, granted = new_achievements.len(), total = total_achievements, "Manual achievement check");
  Ok(Json(AchievementCheckOut {
    success: true,
    message: "Achievement check completed",
    new_achievements,
    total_achievements,
  }))
}

#[instrument(level = "info", skip(state), fields(ocid = ?q.ocid))]
pub async fn http_get_courses(State(state): Shared, Query(q): Query<OcidQuery>) -> Result<Json<EnrollmentsOut>, ApiError> {
  let ocid = logic::require_ocid(q.ocid)?;
  let courses = state.enrollments.list(&ocid).await;
  Ok(Json(EnrollmentsOut { success: true, courses }))
}

fn require_enrollment_keys(ocid: Option<String>, course_id: Option<String>) -> Result<(String, String), ApiError> {
  let missing = || ApiError::Validation("OCId and Course ID are required".into());
  let ocid = logic::require_ocid(ocid).map_err(|_| missing())?;
  let course_id = course_id.filter(|c| !c.trim().is_empty()).ok_or_else(missing)?;
  Ok((ocid, course_id))
}

#[instrument(level = "info", skip(state, body), fields(ocid = ?body.ocid, course_id = ?body.course_id))]
pub async fn http_post_courses(State(state): Shared, ApiJson(body): ApiJson<EnrollmentIn>) -> Result<Json<MessageOut>, ApiError> {
  let (ocid, course_id) = require_enrollment_keys(body.ocid, body.course_id)?;
  let outcome = state.enrollments.upsert(&ocid, &course_id, body.completed, body.nft_minted).await?;
  let message = match outcome {
    crate::enrollment::EnrollOutcome::Updated => "Course status updated successfully",
    crate::enrollment::EnrollOutcome::Enrolled => "Course enrolled and status updated successfully",
  };
  Ok(Json(MessageOut { success: true, message }))
}

#[instrument(level = "info", skip(state, body), fields(ocid = ?body.ocid, course_id = ?body.course_id))]
pub async fn http_patch_courses(State(state): Shared, ApiJson(body): ApiJson<EnrollmentIn>) -> Result<Json<MessageOut>, ApiError> {
  let (ocid, course_id) = require_enrollment_keys(body.ocid, body.course_id)?;
  state.enrollments.mark_nft_minted(&ocid, &course_id).await?;
  Ok(Json(MessageOut { success: true, message: "NFT status updated successfully" }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_active_students(State(state): Shared) -> Result<Json<ActiveStudentsOut>, ApiError> {
  let active_students = state.users.count().await;
  if active_students == 0 {
    return Err(ApiError::NotFound("No active students found".into()));
  }
  Ok(Json(ActiveStudentsOut { success: true, active_students }))
}
