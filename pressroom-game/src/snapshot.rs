//! Serializable save state.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock::SimTime;
use crate::generator::GeneratorState;
use crate::ledger::ResourceState;
use crate::notify::NotificationLog;
use crate::pipeline::PipelineEngine;
use crate::rng::RngPositions;
use crate::workforce::WorkforceManager;

/// Current layout version written into every save.
pub const SAVE_FORMAT_VERSION: u32 = 1;

/// Everything needed to resume a session where it stopped, including the
/// RNG stream positions so the continuation is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    pub saved_at: SimTime,
    pub resources: ResourceState,
    pub pipeline: PipelineEngine,
    pub workforce: WorkforceManager,
    pub generator: GeneratorState,
    pub rng: RngPositions,
    #[serde(default)]
    pub notifications: NotificationLog,
    #[serde(default)]
    pub closed_day: Option<NaiveDate>,
}

impl SaveState {
    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the layout version is
    /// newer than this build understands.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let save: Self = serde_json::from_str(json)?;
        anyhow::ensure!(
            save.version <= SAVE_FORMAT_VERSION,
            "save format {} is newer than supported {}",
            save.version,
            SAVE_FORMAT_VERSION
        );
        Ok(save)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::session::GameSession;

    #[test]
    fn json_roundtrip_preserves_counters() {
        let mut session = GameSession::new(GameConfig::default(), 77).unwrap();
        let id = session.available_orders()[0].id;
        session.accept_order(id).unwrap();
        let json = session.snapshot().to_json().unwrap();
        let restored = SaveState::from_json(&json).unwrap();
        assert_eq!(restored.version, SAVE_FORMAT_VERSION);
        assert_eq!(restored.pipeline.active().len(), 1);
        assert_eq!(restored.resources, *session.resources());
        assert_eq!(restored.saved_at, session.now());
    }

    #[test]
    fn future_versions_are_rejected() {
        let session = GameSession::new(GameConfig::default(), 1).unwrap();
        let mut value = serde_json::to_value(session.snapshot()).unwrap();
        value["version"] = serde_json::json!(SAVE_FORMAT_VERSION + 1);
        let err = SaveState::from_json(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }
}
