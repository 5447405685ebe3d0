use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use serde_json::Value;
use thiserror::Error;

/// Errors raised by settings stores
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path:?}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Failed to write settings file {path:?}: {source}")]
    Write { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse settings: {0}")]
    Parse(String),

    #[error("Failed to protect credential: {0}")]
    Credential(String),
}

/// Key/value store the connectors persist their settings through
pub trait SettingsStore: Send + Sync {
    /// Get a raw JSON value
    fn get_value(&self, key: &str) -> Option<Value>;

    /// Store a raw JSON value
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;

    /// Get a string value; JSON null and non-string values count as absent
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get_value(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Store a string value, or JSON null for `None`
    fn set_string(&mut self, key: &str, value: Option<&str>) -> Result<(), SettingsError> {
        let value = match value {
            Some(s) => Value::String(s.to_string()),
            None => Value::Null,
        };
        self.set_value(key, value)
    }
}

/// Settings kept only in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    values: HashMap<String, Value>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Settings persisted as a single JSON object on disk.
/// The file is rewritten on every change.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: serde_json::Map<String, Value>,
}

impl JsonFileSettingsStore {
    /// Open a settings file; a missing file starts out empty
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
                path: path.clone(),
                source,
            })?;
            if content.trim().is_empty() {
                serde_json::Map::new()
            } else {
                match serde_json::from_str::<Value>(&content) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) => return Err(SettingsError::Parse("settings file must contain a JSON object".to_string())),
                    Err(e) => return Err(SettingsError::Parse(e.to_string())),
                }
            }
        } else {
            debug!("Settings file {:?} does not exist yet, starting empty", path);
            serde_json::Map::new()
        };

        info!("Loaded {} settings from {:?}", values.len(), path);
        Ok(Self { path, values })
    }

    fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!("Failed to create settings directory {:?}: {}", parent, e);
                }
            }
        }

        let json = serde_json::to_string_pretty(&self.values)
            .map_err(|e| SettingsError::Parse(e.to_string()))?;
        fs::write(&self.path, json).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value);
        self.save()
    }
}
