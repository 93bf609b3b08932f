//! Pressroom Game Engine
//!
//! Platform-agnostic simulation core for a print-shop management game: a
//! virtual work calendar, daily order quotas, a seven-department pipeline, a
//! drive (stamina) economy and worker/manager staffing. This crate has no UI
//! or platform-specific dependencies.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod generator;
pub mod ledger;
pub mod notify;
pub mod numbers;
pub mod orders;
pub mod pipeline;
pub mod rng;
pub mod session;
pub mod snapshot;
pub mod workforce;

// Re-export commonly used types
pub use clock::{SimClock, SimTime};
pub use config::{
    DailyPlanConfig, DriveConfig, FeatureFlags, GameConfig, GenerationConfig, OrderValueConfig,
    RarityWeights, Span, StaffingConfig, WorkCalendar,
};
pub use constants::SAVE_KEY;
pub use error::{CommandError, ConfigError, InvalidDepartmentId, RestoreError};
pub use generator::{DailyOrderPlan, GeneratorState, OrderGenerator};
pub use ledger::{ResourceLedger, ResourceState};
pub use notify::{Category, HistoryFilter, Notification, NotificationLog, NotificationSink, Polarity};
pub use orders::{ORDER_KINDS, Order, OrderId, Rarity, RarityCounts, RarityProfile};
pub use pipeline::{Advance, DepartmentId, PipelineEngine, Settlement};
pub use rng::{RngBundle, RngPositions};
pub use session::{DepartmentView, GameSession, TickReport};
pub use snapshot::{SAVE_FORMAT_VERSION, SaveState};
pub use workforce::WorkforceManager;

/// Name passed to [`DataLoader::load_config`] for the session tuning.
pub const GAME_CONFIG_NAME: &str = "game";

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save session state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    fn save_game(&self, save_name: &str, save: &SaveState) -> Result<(), Self::Error>;

    /// Load session state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded.
    fn load_game(&self, save_name: &str) -> Result<Option<SaveState>, Self::Error>;

    /// Delete saved state
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Main game engine binding a configuration source to a save slot
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    /// Load and validate the session configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub fn load_config(&self) -> anyhow::Result<GameConfig>
    where
        L::Error: Into<anyhow::Error>,
    {
        let cfg: GameConfig = self
            .data_loader
            .load_config(GAME_CONFIG_NAME)
            .map_err(Into::into)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Start a new session with the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub fn create_session(&self, seed: u64) -> anyhow::Result<GameSession>
    where
        L::Error: Into<anyhow::Error>,
    {
        let cfg = self.load_config()?;
        Ok(GameSession::new(cfg, seed)?)
    }

    /// Save a session under [`SAVE_KEY`].
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    pub fn save_session(&self, session: &GameSession) -> Result<(), S::Error> {
        self.storage.save_game(SAVE_KEY, &session.snapshot())
    }

    /// Resume the session saved under [`SAVE_KEY`], if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the save or configuration cannot be loaded.
    pub fn load_session(&self) -> anyhow::Result<Option<GameSession>>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(save) = self.storage.load_game(SAVE_KEY).map_err(Into::into)? else {
            return Ok(None);
        };
        let cfg = self.load_config()?;
        Ok(Some(GameSession::from_save(cfg, save)?))
    }

    /// Remove the saved session.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_session(&self) -> Result<(), S::Error> {
        self.storage.delete_save(SAVE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DataLoader for FixtureLoader {
        type Error = Infallible;

        fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
        where
            T: DeserializeOwned,
        {
            let parsed = serde_json::from_str(r#"{ "starting_money": 2000 }"#).unwrap();
            Ok(parsed)
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStorage {
        saves: Rc<RefCell<HashMap<String, String>>>,
    }

    impl GameStorage for MemoryStorage {
        type Error = Infallible;

        fn save_game(&self, save_name: &str, save: &SaveState) -> Result<(), Self::Error> {
            self.saves
                .borrow_mut()
                .insert(save_name.to_string(), save.to_json().unwrap());
            Ok(())
        }

        fn load_game(&self, save_name: &str) -> Result<Option<SaveState>, Self::Error> {
            Ok(self
                .saves
                .borrow()
                .get(save_name)
                .map(|json| SaveState::from_json(json).unwrap()))
        }

        fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
            self.saves.borrow_mut().remove(save_name);
            Ok(())
        }
    }

    #[test]
    fn engine_creates_and_roundtrips_session() {
        let storage = MemoryStorage::default();
        let engine = GameEngine::new(FixtureLoader, storage.clone());
        let mut session = engine.create_session(0xABCD).unwrap();
        assert_eq!(session.resources().money, 2_000);
        session.hire_worker().unwrap();
        engine.save_session(&session).unwrap();
        assert!(storage.saves.borrow().contains_key(SAVE_KEY));

        let loaded = engine.load_session().unwrap().expect("save exists");
        assert_eq!(loaded.resources(), session.resources());
        assert_eq!(loaded.workforce().free_workers(), 1);
        assert_eq!(loaded.now(), session.now());

        engine.delete_session().unwrap();
        assert!(engine.load_session().unwrap().is_none());
    }
}
