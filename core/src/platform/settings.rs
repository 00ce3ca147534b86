//! Persisted service preferences
//!
//! Two values survive process restarts: whether the service believes it is
//! running, and which location backend to use on the next start. The store
//! also holds the callback handle registered by the application layer.
//!
//! - `MemoryPreferences` keeps everything in process (tests, embedding hosts
//!   that persist elsewhere)
//! - `SledPreferences` persists to an on-disk sled tree

use crate::keys;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt preference value for key {0}")]
    Corrupt(String),

    #[error("Unknown location client: {0}")]
    UnknownClient(String),
}

// ============================================================================
// LOCATION CLIENT
// ============================================================================

/// Which backend serves location updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationClient {
    /// The operating system's own location manager
    Platform,
    /// The vendor fused-location client
    #[default]
    ThirdParty,
}

impl std::fmt::Display for LocationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Platform => write!(f, "Platform"),
            Self::ThirdParty => write!(f, "ThirdParty"),
        }
    }
}

impl FromStr for LocationClient {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "platform" | "android" => Ok(Self::Platform),
            "third-party" | "third_party" | "thirdparty" | "google" => Ok(Self::ThirdParty),
            other => Err(SettingsError::UnknownClient(other.to_string())),
        }
    }
}

// ============================================================================
// PREFERENCE STORE
// ============================================================================

/// Key-value preferences the service reads and writes
///
/// Getters never fail: a store that cannot be read reports the default value
/// and logs the problem.
#[cfg_attr(test, mockall::automock)]
pub trait PreferenceStore: Send + Sync {
    fn is_service_running(&self) -> bool;
    fn set_service_running(&self, running: bool) -> Result<(), SettingsError>;

    fn location_client(&self) -> LocationClient;
    fn set_location_client(&self, client: LocationClient) -> Result<(), SettingsError>;

    fn callback_handle(&self, key: &str) -> Option<i64>;
    fn set_callback_handle(&self, key: &str, handle: i64) -> Result<(), SettingsError>;
}

/// In-process preference store
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    running: RwLock<bool>,
    client: RwLock<LocationClient>,
    handles: RwLock<HashMap<String, i64>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a given backend selection
    pub fn with_client(client: LocationClient) -> Self {
        Self {
            client: RwLock::new(client),
            ..Default::default()
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn is_service_running(&self) -> bool {
        *self.running.read()
    }

    fn set_service_running(&self, running: bool) -> Result<(), SettingsError> {
        *self.running.write() = running;
        Ok(())
    }

    fn location_client(&self) -> LocationClient {
        *self.client.read()
    }

    fn set_location_client(&self, client: LocationClient) -> Result<(), SettingsError> {
        *self.client.write() = client;
        Ok(())
    }

    fn callback_handle(&self, key: &str) -> Option<i64> {
        self.handles.read().get(key).copied()
    }

    fn set_callback_handle(&self, key: &str, handle: i64) -> Result<(), SettingsError> {
        self.handles.write().insert(key.to_string(), handle);
        Ok(())
    }
}

/// Preference store persisted in a sled database
pub struct SledPreferences {
    db: sled::Db,
}

impl SledPreferences {
    /// Open (or create) the preference database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn write(&self, key: &str, value: Vec<u8>) -> Result<(), SettingsError> {
        self.db.insert(key.as_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }

    fn read(&self, key: &str) -> Option<sled::IVec> {
        match self.db.get(key.as_bytes()) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to read preference {}: {}", key, e);
                None
            }
        }
    }

    fn decode_client(bytes: &[u8]) -> Result<LocationClient, SettingsError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn decode_handle(key: &str, bytes: &[u8]) -> Result<i64, SettingsError> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| SettingsError::Corrupt(key.to_string()))?;
        Ok(i64::from_be_bytes(raw))
    }
}

impl PreferenceStore for SledPreferences {
    fn is_service_running(&self) -> bool {
        self.read(keys::PREF_SERVICE_RUNNING)
            .map(|v| v.as_ref() == [1u8])
            .unwrap_or(false)
    }

    fn set_service_running(&self, running: bool) -> Result<(), SettingsError> {
        self.write(keys::PREF_SERVICE_RUNNING, vec![u8::from(running)])
    }

    fn location_client(&self) -> LocationClient {
        let Some(bytes) = self.read(keys::PREF_LOCATION_CLIENT) else {
            return LocationClient::default();
        };

        Self::decode_client(&bytes).unwrap_or_else(|e| {
            tracing::warn!("Ignoring stored location client: {}", e);
            LocationClient::default()
        })
    }

    fn set_location_client(&self, client: LocationClient) -> Result<(), SettingsError> {
        self.write(keys::PREF_LOCATION_CLIENT, serde_json::to_vec(&client)?)
    }

    fn callback_handle(&self, key: &str) -> Option<i64> {
        let bytes = self.read(key)?;
        match Self::decode_handle(key, &bytes) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }

    fn set_callback_handle(&self, key: &str, handle: i64) -> Result<(), SettingsError> {
        self.write(key, handle.to_be_bytes().to_vec())
    }
}
