//! Key/value persistence.
//!
//! Subsystems store their own state under stable string keys. Values are
//! bincode-encoded individually, so a subsystem whose layout changed only
//! breaks its own key. The whole store is written to disk as one versioned
//! file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Current save file format version.
pub const SAVE_VERSION: u32 = 1;

/// Well-known save keys. These strings must stay stable across versions.
pub mod keys {
    /// Unlocked crafting formula ids.
    pub const UNLOCKED_FORMULAS: &str = "Crafting/UnlockedFormulaIDs";
    /// Account balance.
    pub const ECONOMY: &str = "EconomyData";
    /// Prefix of per-site construction state.
    pub const CONSTRUCTION_SITE_PREFIX: &str = "ConstructionSite_";

    /// Key of one construction site.
    #[must_use]
    pub fn construction_site(id: &str) -> String {
        format!("{CONSTRUCTION_SITE_PREFIX}{id}")
    }
}

#[derive(Serialize, Deserialize)]
struct SaveFile {
    version: u32,
    entries: BTreeMap<String, Vec<u8>>,
}

/// In-memory save slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl SaveStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SaveEncode`] if the value cannot be encoded.
    pub fn save<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let bytes = bincode::serialize(value).map_err(|e| GameError::SaveEncode {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.entries.insert(key.to_string(), bytes);
        Ok(())
    }

    /// Read the value under `key`; `Ok(None)` if it was never saved.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SaveDecode`] if the stored bytes do not decode
    /// as `T`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.entries.get(key) else {
            return Ok(None);
        };
        bincode::deserialize(bytes)
            .map(Some)
            .map_err(|e| GameError::SaveDecode {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    /// Whether a key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Delete a key. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Encoded size of a value, for inspection tools.
    #[must_use]
    pub fn value_len(&self, key: &str) -> Option<usize> {
        self.entries.get(key).map(Vec::len)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode the whole store with a version header.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SaveEncode`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let file = SaveFile {
            version: SAVE_VERSION,
            entries: self.entries.clone(),
        };
        bincode::serialize(&file).map_err(|e| GameError::SaveEncode {
            key: "<file>".to_string(),
            message: e.to_string(),
        })
    }

    /// Decode a store produced by [`Self::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SaveVersionMismatch`] for other versions and
    /// [`GameError::SaveDecode`] for corrupt data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decode_error = |e: bincode::Error| GameError::SaveDecode {
            key: "<file>".to_string(),
            message: e.to_string(),
        };

        // The version leads the file, so it can be checked before the body.
        let version: u32 = bincode::deserialize(bytes).map_err(decode_error)?;
        if version != SAVE_VERSION {
            return Err(GameError::SaveVersionMismatch {
                expected: SAVE_VERSION,
                found: version,
            });
        }

        let file: SaveFile = bincode::deserialize(bytes).map_err(decode_error)?;
        Ok(Self {
            entries: file.entries,
        })
    }

    /// Write the store to a file.
    ///
    /// # Errors
    ///
    /// Fails on encoding or IO errors.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), keys = self.entries.len(), "Saved game");
        Ok(())
    }

    /// Read a store from a file.
    ///
    /// # Errors
    ///
    /// Fails on IO errors, version mismatch or corrupt data.
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::from_bytes(&bytes)?;
        tracing::info!(path = %path.display(), keys = store.entries.len(), "Loaded save");
        Ok(store)
    }
}
