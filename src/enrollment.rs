//! Course enrollment ledger: one entry per (user, course) with completion and
//! certificate-minted flags.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::domain::Enrollment;
use crate::error::{StoreError, StoreResult};
use crate::snapshot;

/// ocid -> course id -> enrollment
type Ledger = BTreeMap<String, BTreeMap<String, Enrollment>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled,
    Updated,
}

#[derive(Clone, Default)]
pub struct EnrollmentStore {
    ledger: Arc<RwLock<Ledger>>,
    snapshot: Option<PathBuf>,
}

impl EnrollmentStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub async fn open(path: PathBuf) -> StoreResult<Self> {
        let ledger: Ledger = snapshot::load(&path).await?;
        info!(target: "enrollment", users = ledger.len(), path = %path.display(), "Enrollment ledger opened");
        Ok(Self { ledger: Arc::new(RwLock::new(ledger)), snapshot: Some(path) })
    }

    pub async fn list(&self, ocid: &str) -> Vec<Enrollment> {
        self.ledger
            .read()
            .await
            .get(ocid)
            .map(|courses| courses.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Update the given flags of an existing enrollment, or enroll with
    /// `completed` defaulting to true and `nft_minted` to false.
    #[instrument(level = "info", skip(self))]
    pub async fn upsert(
        &self,
        ocid: &str,
        course_id: &str,
        completed: Option<bool>,
        nft_minted: Option<bool>,
    ) -> StoreResult<EnrollOutcome> {
        let mut ledger = self.ledger.write().await;
        let courses = ledger.entry(ocid.to_string()).or_default();
        let outcome = match courses.get_mut(course_id) {
            Some(e) => {
                if let Some(c) = completed {
                    e.completed = c;
                }
                if let Some(m) = nft_minted {
                    e.nft_minted = m;
                }
                EnrollOutcome::Updated
            }
            None => {
                courses.insert(
                    course_id.to_string(),
                    Enrollment {
                        ocid: ocid.to_string(),
                        course_id: course_id.to_string(),
                        completed: completed.unwrap_or(true),
                        nft_minted: nft_minted.unwrap_or(false),
                        enrolled_at: Utc::now(),
                    },
                );
                EnrollOutcome::Enrolled
            }
        };
        self.persist(&ledger).await?;
        info!(target: "enrollment", %ocid, %course_id, ?outcome, "Enrollment saved");
        Ok(outcome)
    }

    pub async fn mark_completed(&self, ocid: &str, course_id: &str) -> StoreResult<EnrollOutcome> {
        self.upsert(ocid, course_id, Some(true), None).await
    }

    /// Flip the minted flag once; minting twice is refused.
    #[instrument(level = "info", skip(self))]
    pub async fn mark_nft_minted(&self, ocid: &str, course_id: &str) -> StoreResult<()> {
        let mut ledger = self.ledger.write().await;
        let entry = ledger
            .get_mut(ocid)
            .and_then(|courses| courses.get_mut(course_id))
            .ok_or_else(|| StoreError::EnrollmentNotFound {
                ocid: ocid.to_string(),
                course_id: course_id.to_string(),
            })?;
        if entry.nft_minted {
            return Err(StoreError::AlreadyMinted(course_id.to_string()));
        }
        entry.nft_minted = true;
        self.persist(&ledger).await?;
        info!(target: "enrollment", %ocid, %course_id, "NFT minted flag set");
        Ok(())
    }

    async fn persist(&self, ledger: &Ledger) -> StoreResult<()> {
        match &self.snapshot {
            Some(path) => snapshot::save(path, ledger).await,
            None => Ok(()),
        }
    }
}
