//! Public request/response structs for the HTTP endpoints (serde ready).
//! Field names follow the JSON the web client already speaks (camelCase, `OCId`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::achievements::AchievementProgress;
use crate::domain::{Enrollment, UserData, UserRecord};
use crate::metrics::ScoreStats;

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub success: bool,
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub version: &'static str,
}

/// `?OCId=` on every read endpoint.
#[derive(Debug, Deserialize)]
pub struct OcidQuery {
    #[serde(rename = "OCId")]
    pub ocid: Option<String>,
}

//
// Users
//

#[derive(Debug, Deserialize)]
pub struct CreateUserIn {
    #[serde(rename = "OCId")]
    pub ocid: Option<String>,
    #[serde(rename = "ethAddress")]
    pub eth_address: Option<String>,
    pub image: Option<String>,
}

#[derive(Serialize)]
pub struct CreateUserOut {
    pub success: bool,
    pub message: &'static str,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct UserOut {
    pub success: bool,
    pub user: UserRecord,
}

#[derive(Serialize)]
pub struct ActiveStudentsOut {
    pub success: bool,
    #[serde(rename = "activeStudents")]
    pub active_students: u64,
}

//
// Profile
//

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub data: UserData,
    #[serde(rename = "averageAIScore")]
    pub average_ai_score: f64,
    pub acceptance_rate: u64,
    pub member_since: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ProfileOut {
    pub success: bool,
    pub profile: ProfileView,
}

#[derive(Debug, Deserialize)]
pub struct ProfilePatchIn {
    #[serde(rename = "OCId")]
    pub ocid: Option<String>,
    #[serde(rename = "ethAddress")]
    pub eth_address: Option<String>,
    pub image: Option<String>,
}

#[derive(Serialize)]
pub struct ProfilePatchOut {
    pub success: bool,
    pub message: &'static str,
    #[serde(rename = "updatedFields")]
    pub updated_fields: Vec<&'static str>,
}

//
// Activity events
//

#[derive(Debug, Deserialize)]
pub struct SubmissionIn {
    #[serde(rename = "OCId")]
    pub ocid: Option<String>,
    #[serde(rename = "isAccepted", default)]
    pub is_accepted: bool,
}

/// Level and achievement outcome shared by every activity event.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOut {
    pub level_updated: bool,
    pub new_level: u32,
    pub new_achievements: Vec<String>,
}

#[derive(Serialize)]
pub struct SubmissionOut {
    pub success: bool,
    pub message: &'static str,
    #[serde(flatten)]
    pub progress: ProgressOut,
}

#[derive(Debug, Deserialize)]
pub struct AiScoreIn {
    #[serde(rename = "OCId")]
    pub ocid: Option<String>,
    pub score: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiScoreOut {
    pub success: bool,
    pub message: &'static str,
    pub average_score: f64,
    pub total_scores: usize,
    #[serde(flatten)]
    pub progress: ProgressOut,
}

#[derive(Serialize)]
pub struct AiStatsOut {
    pub success: bool,
    pub data: ScoreStats,
}

#[derive(Debug, Deserialize)]
pub struct CourseCompletionIn {
    #[serde(rename = "OCId")]
    pub ocid: Option<String>,
    #[serde(rename = "courseId")]
    pub course_id: Option<String>,
    #[serde(default)]
    pub course: serde_json::Value,
}

#[derive(Serialize)]
pub struct CourseCompletionOut {
    pub success: bool,
    pub message: &'static str,
    #[serde(rename = "alreadyCompleted", skip_serializing_if = "std::ops::Not::not")]
    pub already_completed: bool,
    #[serde(flatten)]
    pub progress: Option<ProgressOut>,
}

//
// Achievements
//

#[derive(Serialize)]
pub struct AchievementSummary {
    pub earned: Vec<String>,
    pub total: usize,
    pub progress: Vec<AchievementProgress>,
}

#[derive(Serialize)]
pub struct AchievementsOut {
    pub success: bool,
    pub achievements: AchievementSummary,
}

#[derive(Debug, Deserialize)]
pub struct OcidIn {
    #[serde(rename = "OCId")]
    pub ocid: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementCheckOut {
    pub success: bool,
    pub message: &'static str,
    pub new_achievements: Vec<String>,
    pub total_achievements: usize,
}

//
// Enrollments
//

#[derive(Serialize)]
pub struct EnrollmentsOut {
    pub success: bool,
    pub courses: Vec<Enrollment>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentIn {
    #[serde(rename = "OCId")]
    pub ocid: Option<String>,
    #[serde(rename = "courseId")]
    pub course_id: Option<String>,
    pub completed: Option<bool>,
    #[serde(rename = "nftMinted")]
    pub nft_minted: Option<bool>,
}

#[derive(Serialize)]
pub struct MessageOut {
    pub success: bool,
    pub message: &'static str,
}
