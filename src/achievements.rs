//! Achievement criteria, idempotent granting, and the read-only progress report.
//!
//! A criterion is a threshold over one metric of the user record. The table is
//! data: extra rows can come from config without touching the evaluator.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::domain::UserData;
use crate::error::{StoreError, StoreResult};
use crate::metrics::mean;
use crate::progression::Levelled;
use crate::store::{Granted, UserStore};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CourseCompleted,
    Submissions,
    AcceptedSubmissions,
    Level,
    AverageAiScore,
}

impl Metric {
    /// Current value, or `None` when there is nothing to measure yet (no AI scores).
    pub fn value(self, data: &UserData) -> Option<f64> {
        match self {
            Metric::CourseCompleted => Some(data.course_completed as f64),
            Metric::Submissions => Some(data.submissions as f64),
            Metric::AcceptedSubmissions => Some(data.accepted_submissions as f64),
            Metric::Level => Some(data.level as f64),
            Metric::AverageAiScore => mean(&data.ai_scores),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Metric::CourseCompleted => "courseCompleted",
            Metric::Submissions => "submissions",
            Metric::AcceptedSubmissions => "acceptedSubmissions",
            Metric::Level => "Level",
            Metric::AverageAiScore => "Average AI_Scores",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Criterion {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub metric: Metric,
    pub threshold: f64,
}

impl Criterion {
    fn new(id: &str, description: &str, metric: Metric, threshold: f64) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            description: description.to_string(),
            metric,
            threshold,
        }
    }

    pub fn holds(&self, data: &UserData) -> bool {
        self.metric.value(data).map_or(false, |v| v >= self.threshold)
    }

    /// `min(value / threshold, 1)`, and 0 when the metric has no value.
    pub fn progress(&self, data: &UserData) -> f64 {
        self.metric
            .value(data)
            .map_or(0.0, |v| (v / self.threshold).min(1.0))
    }

    pub fn criteria_text(&self) -> String {
        format!("{} >= {}", self.metric.label(), self.threshold)
    }
}

pub fn default_criteria() -> Vec<Criterion> {
    vec![
        Criterion::new("Course Master", "Complete 5 or more courses", Metric::CourseCompleted, 5.0),
        Criterion::new("Submission Warrior", "Submit 50 or more tasks", Metric::Submissions, 50.0),
        Criterion::new("Quality Coder", "Get 25 or more submissions accepted", Metric::AcceptedSubmissions, 25.0),
        Criterion::new("Rising Star", "Reach level 5 or higher", Metric::Level, 5.0),
        Criterion::new("AI Prodigy", "Get an average AI score of 90 or higher", Metric::AverageAiScore, 90.0),
    ]
}

/// Ids whose criterion holds for the snapshot and that the user does not hold yet, in table order.
pub fn qualifying(criteria: &[Criterion], snapshot: &Levelled) -> Vec<String> {
    let data = snapshot.data();
    let mut out: Vec<String> = Vec::new();
    for c in criteria {
        if data.has_achievement(&c.id) || out.contains(&c.id) {
            continue;
        }
        if c.holds(data) {
            out.push(c.id.clone());
        }
    }
    out
}

/// Evaluate and persist. `added` holds only the ids this call put in the user's set;
/// `total` is the set size as stored, including grants from concurrent evaluations.
#[instrument(level = "info", skip_all, fields(ocid = %snapshot.ocid()))]
pub async fn grant(
    store: &UserStore,
    criteria: &[Criterion],
    snapshot: &Levelled,
) -> StoreResult<Granted> {
    let candidates = qualifying(criteria, snapshot);
    if candidates.is_empty() {
        debug!(target: "achievements", "No new achievements");
        let user = store
            .get(snapshot.ocid())
            .await
            .ok_or_else(|| StoreError::NotFound(snapshot.ocid().to_string()))?;
        return Ok(Granted { added: candidates, total: user.data.achievements.len() });
    }
    let granted = store.add_achievements(snapshot.ocid(), &candidates).await?;
    if !granted.added.is_empty() {
        info!(target: "achievements", ocid = %snapshot.ocid(), granted = ?granted.added, "Achievements granted");
    }
    Ok(granted)
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AchievementProgress {
    pub id: String,
    pub name: String,
    pub description: String,
    pub criteria: String,
    pub earned: bool,
    pub progress: f64,
}

/// Per-criterion status for display. Built fresh from the caller's record.
pub fn progress_report(criteria: &[Criterion], data: &UserData) -> Vec<AchievementProgress> {
    criteria
        .iter()
        .map(|c| AchievementProgress {
            id: c.id.clone(),
            name: c.name.clone(),
            description: c.description.clone(),
            criteria: c.criteria_text(),
            earned: data.has_achievement(&c.id),
            progress: c.progress(data),
        })
        .collect()
}
