//! Configuration storage abstraction.
//!
//! Device configuration is kept per named section ("wifi", "mqtt", ...)
//! as JSON. Hosts back this with files, flash or a database; the
//! in-memory implementation here is used by tests and tools.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Errors that can occur during configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested configuration was not found.
    NotFound(String),
    /// Failed to read configuration.
    ReadError(String),
    /// Failed to write configuration.
    WriteError(String),
    /// Configuration data is invalid.
    InvalidData(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(name) => write!(f, "Configuration not found: {}", name),
            ConfigError::ReadError(msg) => write!(f, "Read error: {}", msg),
            ConfigError::WriteError(msg) => write!(f, "Write error: {}", msg),
            ConfigError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Abstract configuration storage.
///
/// All methods are synchronous so the trait can be implemented on top of
/// flash storage without a runtime.
pub trait ConfigStorage: Send + Sync {
    /// Load a configuration section.
    fn load(&self, name: &str) -> Result<Value, ConfigError>;

    /// Save a configuration section, replacing any previous value.
    fn save(&self, name: &str, value: &Value) -> Result<(), ConfigError>;

    /// Names of all stored sections, sorted.
    fn list(&self) -> Result<Vec<String>, ConfigError>;

    fn has(&self, name: &str) -> bool;

    /// Delete a section. Deleting a missing section is not an error.
    fn delete(&self, name: &str) -> Result<(), ConfigError>;

    /// Load a section into a typed value.
    fn load_value<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigError>
    where
        Self: Sized,
    {
        let value = self.load(name)?;
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidData(e.to_string()))
    }

    /// Save a typed value as a section.
    fn save_value<T: Serialize>(&self, name: &str, value: &T) -> Result<(), ConfigError>
    where
        Self: Sized,
    {
        let value =
            serde_json::to_value(value).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        self.save(name, &value)
    }
}

/// In-memory storage holding serialized JSON text per section.
#[derive(Debug, Default)]
pub struct MemoryConfigStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryConfigStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStorage for MemoryConfigStorage {
    fn load(&self, name: &str) -> Result<Value, ConfigError> {
        let data = self
            .data
            .read()
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;
        let json = data
            .get(name)
            .ok_or_else(|| ConfigError::NotFound(name.to_string()))?;
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidData(e.to_string()))
    }

    fn save(&self, name: &str, value: &Value) -> Result<(), ConfigError> {
        let json =
            serde_json::to_string(value).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        self.data
            .write()
            .map_err(|e| ConfigError::WriteError(e.to_string()))?
            .insert(name.to_string(), json);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, ConfigError> {
        let data = self
            .data
            .read()
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;
        let mut names: Vec<String> = data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn has(&self, name: &str) -> bool {
        self.data
            .read()
            .map(|data| data.contains_key(name))
            .unwrap_or(false)
    }

    fn delete(&self, name: &str) -> Result<(), ConfigError> {
        self.data
            .write()
            .map_err(|e| ConfigError::WriteError(e.to_string()))?
            .remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct WifiSettings {
        ssid: String,
        tx_power: u8,
    }

    #[test]
    fn test_section_round_trip() {
        let storage = MemoryConfigStorage::new();

        let wifi = json!({ "ssid": "home", "txPower": 20 });
        storage.save("wifi", &wifi).unwrap();

        assert!(storage.has("wifi"));
        assert_eq!(storage.load("wifi").unwrap(), wifi);
    }

    #[test]
    fn test_typed_round_trip() {
        let storage = MemoryConfigStorage::new();

        let settings = WifiSettings {
            ssid: "home".to_string(),
            tx_power: 20,
        };
        storage.save_value("wifi", &settings).unwrap();

        let loaded: WifiSettings = storage.load_value("wifi").unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(storage.load("wifi").unwrap()["txPower"], 20);
    }

    #[test]
    fn test_missing_and_invalid() {
        let storage = MemoryConfigStorage::new();
        assert!(matches!(storage.load("mqtt"), Err(ConfigError::NotFound(_))));

        storage.save("wifi", &json!({ "ssid": 5 })).unwrap();
        let result: Result<WifiSettings, _> = storage.load_value("wifi");
        assert!(matches!(result, Err(ConfigError::InvalidData(_))));
    }

    #[test]
    fn test_list_and_delete() {
        let storage = MemoryConfigStorage::new();
        storage.save("wifi", &json!({})).unwrap();
        storage.save("mqtt", &json!({})).unwrap();

        assert_eq!(storage.list().unwrap(), vec!["mqtt", "wifi"]);

        storage.delete("wifi").unwrap();
        storage.delete("wifi").unwrap();
        assert!(!storage.has("wifi"));
        assert_eq!(storage.list().unwrap(), vec!["mqtt"]);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ConfigError::NotFound("wifi".into()).to_string(),
            "Configuration not found: wifi"
        );
    }
}
