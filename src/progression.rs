//! Level calculation from activity counters.
//!
//! The level is a step function of a weighted activity score over an ascending
//! threshold table. It is a cache on the record: always recomputed from the
//! persisted counters, never incremented.

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::domain::{Counters, FieldValue, UserData, UserRecord};
use crate::error::{StoreError, StoreResult};
use crate::store::UserStore;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LevelTable {
    /// Minimum score for each level; index = level. Strictly ascending.
    pub thresholds: Vec<u64>,
    pub submission_weight: u64,
    pub accepted_weight: u64,
    pub course_weight: u64,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            thresholds: vec![0, 5, 15, 30, 50, 75, 100, 150, 200, 300],
            submission_weight: 1,
            accepted_weight: 2,
            course_weight: 5,
        }
    }
}

impl LevelTable {
    pub fn score(&self, c: Counters) -> u64 {
        c.submissions
            .saturating_mul(self.submission_weight)
            .saturating_add(c.accepted_submissions.saturating_mul(self.accepted_weight))
            .saturating_add(c.course_completed.saturating_mul(self.course_weight))
    }

    /// Largest index whose threshold the score reaches; 0 below the first threshold.
    pub fn level(&self, c: Counters) -> u32 {
        let score = self.score(c);
        self.thresholds
            .iter()
            .rposition(|&t| score >= t)
            .unwrap_or(0) as u32
    }

    pub fn max_level(&self) -> u32 {
        self.thresholds.len().saturating_sub(1) as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelChange {
    pub previous: u32,
    pub current: u32,
}

impl LevelChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// A record whose `Level` matches its counters.
///
/// Only [`Levelled::recompute`] builds one, so anything that takes a `Levelled`
/// (achievement evaluation) runs after the level step for the same snapshot.
#[derive(Clone, Debug)]
pub struct Levelled {
    record: UserRecord,
}

impl Levelled {
    pub fn recompute(table: &LevelTable, mut record: UserRecord) -> (LevelChange, Levelled) {
        let previous = record.data.level;
        let current = table.level(record.data.counters());
        record.data.level = current;
        (LevelChange { previous, current }, Levelled { record })
    }

    pub fn data(&self) -> &UserData {
        &self.record.data
    }

    pub fn ocid(&self) -> &str {
        &self.record.ocid
    }
}

/// Re-derive the stored level from the stored counters; writes only on change.
#[instrument(level = "info", skip(store, table))]
pub async fn update_level(
    store: &UserStore,
    table: &LevelTable,
    ocid: &str,
) -> StoreResult<(LevelChange, Levelled)> {
    let record = store
        .get(ocid)
        .await
        .ok_or_else(|| StoreError::NotFound(ocid.to_string()))?;

    let (change, levelled) = Levelled::recompute(table, record);
    if change.changed() {
        store.set_field(ocid, FieldValue::Level(change.current)).await?;
        info!(target: "progression", %ocid, previous = change.previous, current = change.current, "User level updated");
    } else {
        debug!(target: "progression", %ocid, level = change.current, "User level unchanged");
    }
    Ok((change, levelled))
}
