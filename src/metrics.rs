//! Derived values over a user record (averages, rates, score statistics).

use serde::Serialize;

use crate::domain::UserData;

const RECENT_SCORES: usize = 5;

pub fn mean(values: &[f64]) -> Option<f64> {
  if values.is_empty() {
    return None;
  }
  Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean AI score rounded to a whole number; 0 with no scores.
pub fn average_ai_score(scores: &[f64]) -> f64 {
  mean(scores).map_or(0.0, f64::round)
}

/// Accepted share of submissions as a rounded percentage; 0 with no submissions.
pub fn acceptance_rate(data: &UserData) -> u64 {
  if data.submissions == 0 {
    return 0;
  }
  (data.accepted_submissions as f64 / data.submissions as f64 * 100.0).round() as u64
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreStats {
  pub total_scores: usize,
  pub average_score: f64,
  pub highest_score: f64,
  pub lowest_score: f64,
  pub recent_scores: Vec<f64>,
  pub all_scores: Vec<f64>,
}

pub fn score_stats(scores: &[f64]) -> ScoreStats {
  let highest = scores.iter().copied().fold(0.0, f64::max);
  let lowest = scores.iter().copied().reduce(f64::min).unwrap_or(0.0);
  let recent_from = scores.len().saturating_sub(RECENT_SCORES);
  ScoreStats {
    total_scores: scores.len(),
    average_score: average_ai_score(scores),
    highest_score: highest,
    lowest_score: lowest,
    recent_scores: scores[recent_from..].to_vec(),
    all_scores: scores.to_vec(),
  }
}
