//! Persistence - Key-value storage for the selection and the last result
//!
//! Only two keys are ever written. Callers treat every `StoreError` as
//! recoverable and fall back to in-memory defaults.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::race_engine::error::StoreError;
use crate::race_engine::race::{RaceConfig, RaceResult};

pub const RACE_CONFIG_KEY: &str = "raceConfig";
pub const RACE_RESULT_KEY: &str = "raceResults";

/// Minimal string key-value collaborator
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Process-local store, also the fallback when nothing else is configured
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::Unavailable(format!("invalid key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        // readers never observe a partially written record
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

fn write_json<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, raw)
}

/// Keeps the single "last result" record, plus the saved selection
pub struct ResultRecorder {
    store: Box<dyn KeyValueStore>,
}

impl ResultRecorder {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Overwrite the last result
    pub fn record(&mut self, result: &RaceResult) -> Result<(), StoreError> {
        write_json(&mut *self.store, RACE_RESULT_KEY, result)
    }

    pub fn load(&self) -> Result<Option<RaceResult>, StoreError> {
        read_json(&*self.store, RACE_RESULT_KEY)
    }

    pub fn save_config(&mut self, config: &RaceConfig) -> Result<(), StoreError> {
        write_json(&mut *self.store, RACE_CONFIG_KEY, config)
    }

    pub fn load_config(&self) -> Result<Option<RaceConfig>, StoreError> {
        read_json(&*self.store, RACE_CONFIG_KEY)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store whose backend is always down
    pub(crate) struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("disk on fire".into()))
        }

        fn set(&mut self, _key: &str, _value: String) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk on fire".into()))
        }
    }

    fn sample_result(time: f32) -> RaceResult {
        RaceResult {
            vehicle_name: "Neon Viper".into(),
            track_name: "Mountain Pass".into(),
            elapsed_time: time,
            laps_completed: 5,
            position: 1,
            best_lap_time: Some(10.2),
        }
    }

    fn scratch_dir() -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("arcade-racer-store-{}-{}", std::process::id(), n))
    }

    #[test]
    fn recorder_keeps_only_the_last_result() {
        let mut recorder = ResultRecorder::in_memory();
        assert_eq!(recorder.load().unwrap(), None);

        recorder.record(&sample_result(80.0)).unwrap();
        recorder.record(&sample_result(75.5)).unwrap();
        assert_eq!(recorder.load().unwrap(), Some(sample_result(75.5)));
    }

    #[test]
    fn config_round_trips_through_store() {
        let mut recorder = ResultRecorder::in_memory();
        let config = RaceConfig {
            vehicle_id: "viper".into(),
            track_id: "mountain-pass".into(),
        };
        recorder.save_config(&config).unwrap();
        assert_eq!(recorder.load_config().unwrap(), Some(config));
    }

    #[test]
    fn corrupt_record_is_an_error() {
        let mut store = MemoryStore::new();
        store.set(RACE_RESULT_KEY, "{not json".into()).unwrap();
        let recorder = ResultRecorder::new(Box::new(store));
        assert!(matches!(recorder.load(), Err(StoreError::Serde(_))));
    }

    #[test]
    fn broken_store_surfaces_errors() {
        let mut recorder = ResultRecorder::new(Box::new(BrokenStore));
        assert!(recorder.load().is_err());
        assert!(recorder.record(&sample_result(1.0)).is_err());
    }

    #[test]
    fn file_store_persists_between_instances() {
        let dir = scratch_dir();
        let mut store = JsonFileStore::new(&dir);
        assert_eq!(store.get(RACE_RESULT_KEY).unwrap(), None);
        store.set(RACE_RESULT_KEY, "{\"a\":1}".into()).unwrap();

        let reopened = JsonFileStore::new(&dir);
        assert_eq!(reopened.get(RACE_RESULT_KEY).unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.join("raceResults.json").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let mut store = JsonFileStore::new(scratch_dir());
        assert!(matches!(
            store.set("../escape", "x".into()),
            Err(StoreError::Unavailable(_))
        ));
    }
}
