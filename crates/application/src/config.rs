//! Guide configuration, persisted alongside the pins.

use crate::constants::{CONFIG_KEY, DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_POSITION};
use geoguide_geo::Position;
use geoguide_proximity::RadiusPolicy;
use geoguide_storage::Database;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    /// Substituted when the position source reports an error.
    pub default_position: Position,
    pub radius_policy: RadiusPolicy,
    pub event_queue_capacity: usize,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            default_position: DEFAULT_POSITION,
            radius_policy: RadiusPolicy::PerPin,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

impl GuideConfig {
    /// Load the stored config. Missing or unreadable entries yield defaults.
    pub fn load(db: &Database) -> Self {
        match db.load_json::<GuideConfig>(CONFIG_KEY) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load guide config, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, db: &Database) -> geoguide_storage::Result<()> {
        db.save_json(CONFIG_KEY, self)
    }
}
