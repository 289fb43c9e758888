// src/persist.rs
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{BandPowers, PredictionResult};

const PREDICTION_KEY: &str = "prediction";
const FEATURES_KEY: &str = "eegFeatures";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cache encoding: {0}")]
    Serde(#[from] serde_json::Error),
}

/// String key-value storage surviving restarts.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// All entries in one JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Opens `path`. A missing file is an empty store; a file that is not a
    /// JSON string map is logged and ignored.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                log::warn!("ignoring unreadable cache {}: {e}", path.display());
                BTreeMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self { path, entries })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, text).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Remembers the last prediction so it can be shown again after a restart.
pub struct PredictionCache<S> {
    store: S,
}

impl<S: KeyValueStore> PredictionCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn save(&mut self, result: &PredictionResult) -> Result<(), StoreError> {
        let features = serde_json::to_string(&result.bands)?;
        self.store.set(PREDICTION_KEY, result.prediction.clone())?;
        self.store.set(FEATURES_KEY, features)?;
        log::debug!("cached prediction {}", result.prediction);
        Ok(())
    }

    /// `None` when nothing usable is cached.
    pub fn load(&self) -> Option<PredictionResult> {
        let prediction = self.store.get(PREDICTION_KEY)?;
        let raw = self.store.get(FEATURES_KEY)?;
        match serde_json::from_str::<BandPowers>(&raw) {
            Ok(bands) => Some(PredictionResult { prediction, bands }),
            Err(e) => {
                log::warn!("discarding cached {FEATURES_KEY}: {e}");
                None
            }
        }
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.remove(PREDICTION_KEY)?;
        self.store.remove(FEATURES_KEY)
    }
}
