use pressroom_game::{
    DataLoader, DepartmentId, GameConfig, GameEngine, GameSession, GameStorage, HistoryFilter,
    RestoreError, SAVE_KEY, SaveState,
};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
enum FixtureError {
    #[error("fixture json: {0}")]
    Json(#[from] serde_json::Error),
}

struct JsonLoader(&'static str);

impl DataLoader for JsonLoader {
    type Error = FixtureError;

    fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
    where
        T: DeserializeOwned,
    {
        Ok(serde_json::from_str(self.0)?)
    }
}

#[derive(Clone, Default)]
struct MemoryStorage {
    slots: Rc<RefCell<HashMap<String, String>>>,
}

impl GameStorage for MemoryStorage {
    type Error = FixtureError;

    fn save_game(&self, save_name: &str, save: &SaveState) -> Result<(), Self::Error> {
        self.slots
            .borrow_mut()
            .insert(save_name.to_string(), save.to_json()?);
        Ok(())
    }

    fn load_game(&self, save_name: &str) -> Result<Option<SaveState>, Self::Error> {
        self.slots
            .borrow()
            .get(save_name)
            .map(|json| serde_json::from_str(json).map_err(FixtureError::from))
            .transpose()
    }

    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
        self.slots.borrow_mut().remove(save_name);
        Ok(())
    }
}

fn play(session: &mut GameSession, ticks: usize) {
    for _ in 0..ticks {
        session.tick(0.5);
        if let Some(id) = session.available_orders().first().map(|o| o.id) {
            let _ = session.accept_order(id);
        }
    }
}

fn assert_same(a: &GameSession, b: &GameSession) {
    assert_eq!(a.now(), b.now());
    assert_eq!(a.resources().money, b.resources().money);
    assert_eq!(a.resources().reputation, b.resources().reputation);
    assert_eq!(a.resources().exp, b.resources().exp);
    assert!((a.resources().drive - b.resources().drive).abs() < 1e-6);
    assert_eq!(a.completed_count(), b.completed_count());
    let ids = |s: &GameSession| s.available_orders().iter().map(|o| o.id).collect::<Vec<_>>();
    assert_eq!(ids(a), ids(b));
    assert_eq!(a.daily_plan(), b.daily_plan());
}

#[test]
fn restored_session_continues_identically() {
    let storage = MemoryStorage::default();
    let engine = GameEngine::new(JsonLoader(r#"{ "starting_money": 3000 }"#), storage.clone());
    let mut original = engine.create_session(1234).unwrap();
    original.hire_worker().unwrap();
    original.hire_manager().unwrap();
    original
        .assign_employee(DepartmentId::try_from(1).unwrap())
        .unwrap();
    play(&mut original, 120);

    engine.save_session(&original).unwrap();
    assert!(storage.slots.borrow().contains_key(SAVE_KEY));
    let mut restored = engine.load_session().unwrap().expect("saved");
    assert_same(&original, &restored);
    assert_eq!(
        original.history(HistoryFilter::default()).len(),
        restored.history(HistoryFilter::default()).len()
    );

    play(&mut original, 400);
    play(&mut restored, 400);
    assert_same(&original, &restored);
}

#[test]
fn missing_save_loads_as_none() {
    let engine = GameEngine::new(JsonLoader("{}"), MemoryStorage::default());
    assert!(engine.load_session().unwrap().is_none());
}

#[test]
fn invalid_loaded_config_is_an_error() {
    let engine = GameEngine::new(
        JsonLoader(r#"{ "calendar": { "work_days": [] } }"#),
        MemoryStorage::default(),
    );
    assert!(engine.create_session(1).is_err());
}

#[test]
fn session_can_be_rebuilt_from_json_directly() {
    let mut session = GameSession::new(GameConfig::default(), 55).unwrap();
    play(&mut session, 30);
    let json = session.snapshot().to_json().unwrap();
    let save = SaveState::from_json(&json).unwrap();
    let restored = GameSession::from_save(GameConfig::default(), save).unwrap();
    assert_same(&session, &restored);
    assert_eq!(restored.seed(), 55);
}

#[test]
fn save_with_missing_department_queues_is_rejected() {
    let session = GameSession::new(GameConfig::default(), 9).unwrap();
    let mut value = serde_json::to_value(session.snapshot()).unwrap();
    value["pipeline"]["queues"] = serde_json::json!([]);
    assert!(SaveState::from_json(&value.to_string()).is_err());

    let queues = value["pipeline"]["queues"].as_array_mut().unwrap();
    queues.extend(std::iter::repeat_n(serde_json::json!({ "heap": [] }), 8));
    assert!(SaveState::from_json(&value.to_string()).is_err());
}

#[test]
fn queued_order_without_active_record_is_rejected() {
    let mut session = GameSession::new(GameConfig::default(), 9).unwrap();
    let id = session.available_orders()[0].id;
    session.accept_order(id).unwrap();
    let mut value = serde_json::to_value(session.snapshot()).unwrap();
    value["pipeline"]["active"] = serde_json::json!([]);
    let save = SaveState::from_json(&value.to_string()).unwrap();

    let err = GameSession::from_save(GameConfig::default(), save).unwrap_err();
    assert_eq!(
        err,
        RestoreError::StaleQueueEntry {
            department: DepartmentId::DESIGN,
            id,
        }
    );
}
