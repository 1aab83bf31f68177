//! Loading service configuration (level table, achievement criteria, snapshot paths) from TOML.
//!
//! Example:
//!
//! ```toml
//! [progression]
//! thresholds = [0, 5, 15, 30, 50, 75, 100, 150, 200, 300]
//! submission_weight = 1
//! accepted_weight = 2
//! course_weight = 5
//!
//! [[achievements]]
//! id = "Course Master"
//! description = "Complete 5 or more courses"
//! metric = "course_completed"
//! threshold = 5
//!
//! [store]
//! users_snapshot = "data/users.json"
//! enrollments_snapshot = "data/user_courses.json"
//! ```
//!
//! Leaving out `[[achievements]]` keeps the built-in table.

use std::{collections::HashSet, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::achievements::{default_criteria, Criterion};
use crate::progression::LevelTable;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Level thresholds must be non-empty and strictly ascending")]
    Thresholds,

    #[error("Duplicate achievement id: {0}")]
    DuplicateAchievement(String),

    #[error("Achievement {0} needs a positive threshold")]
    AchievementThreshold(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub progression: LevelTable,
    #[serde(default = "default_criteria")]
    pub achievements: Vec<Criterion>,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            progression: LevelTable::default(),
            achievements: default_criteria(),
            store: StoreConfig::default(),
        }
    }
}

/// Where the stores keep their snapshots. Unset means memory only.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub users_snapshot: Option<PathBuf>,
    #[serde(default)]
    pub enrollments_snapshot: Option<PathBuf>,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.progression.thresholds;
        if t.is_empty() || t.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::Thresholds);
        }

        let mut seen = HashSet::new();
        for c in &self.achievements {
            if !seen.insert(c.id.as_str()) {
                return Err(ConfigError::DuplicateAchievement(c.id.clone()));
            }
            if c.threshold.is_nan() || c.threshold <= 0.0 {
                return Err(ConfigError::AchievementThreshold(c.id.clone()));
            }
        }
        Ok(())
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let mut cfg: ServiceConfig = toml::from_str(s)?;
        for c in &mut cfg.achievements {
            if c.name.is_empty() {
                c.name = c.id.clone();
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Load from PROGRESSION_CONFIG_PATH. Missing variable, unreadable file or invalid
/// content all fall back to the built-in defaults.
pub fn load_service_config_from_env() -> ServiceConfig {
    let path = match std::env::var("PROGRESSION_CONFIG_PATH") {
        Ok(p) => p,
        Err(_) => return ServiceConfig::default(),
    };
    match std::fs::read_to_string(&path) {
        Ok(s) => match ServiceConfig::from_toml(&s) {
            Ok(cfg) => {
                info!(target: "sensaylabs", %path, levels = cfg.progression.thresholds.len(), achievements = cfg.achievements.len(), "Loaded service config (TOML)");
                cfg
            }
            Err(e) => {
                error!(target: "sensaylabs", %path, error = %e, "Invalid TOML config; using defaults");
                ServiceConfig::default()
            }
        },
        Err(e) => {
            error!(target: "sensaylabs", %path, error = %e, "Failed to read TOML config file; using defaults");
            ServiceConfig::default()
        }
    }
}
