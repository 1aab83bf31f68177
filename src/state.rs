//! Application state: the user store, the enrollment ledger, and the progression rules.
//!
//! Built once at startup from `ServiceConfig` and shared behind an `Arc` by every
//! handler. The stores are cheap clones over the same locked collections.

use tracing::{info, instrument};

use crate::achievements::Criterion;
use crate::config::ServiceConfig;
use crate::enrollment::EnrollmentStore;
use crate::error::StoreResult;
use crate::progression::LevelTable;
use crate::store::UserStore;

#[derive(Clone)]
pub struct AppState {
    pub users: UserStore,
    pub enrollments: EnrollmentStore,
    pub levels: LevelTable,
    pub criteria: Vec<Criterion>,
}

impl AppState {
    /// Open the stores (snapshot-backed where configured) and install the rules.
    #[instrument(level = "info", skip_all)]
    pub async fn from_config(cfg: ServiceConfig) -> StoreResult<Self> {
        let users = match cfg.store.users_snapshot {
            Some(path) => UserStore::open(path).await?,
            None => {
                info!(target: "sensaylabs", "No users snapshot configured; user store is memory only");
                UserStore::in_memory()
            }
        };
        let enrollments = match cfg.store.enrollments_snapshot {
            Some(path) => EnrollmentStore::open(path).await?,
            None => EnrollmentStore::in_memory(),
        };

        info!(
            target: "sensaylabs",
            max_level = cfg.progression.max_level(),
            achievements = cfg.achievements.len(),
            "Progression rules installed"
        );
        Ok(Self {
            users,
            enrollments,
            levels: cfg.progression,
            criteria: cfg.achievements,
        })
    }

    #[cfg(test)]
    pub fn in_memory(cfg: ServiceConfig) -> Self {
        Self {
            users: UserStore::in_memory(),
            enrollments: EnrollmentStore::in_memory(),
            levels: cfg.progression,
            criteria: cfg.achievements,
        }
    }
}
