//! Save file inspection.

use std::path::Path;

use duckov_core::economy::EconomyData;
use duckov_core::error::Result;
use duckov_core::saves::{keys, SaveStore};

/// One stored key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEntry {
    /// Save key.
    pub key: String,
    /// Encoded size in bytes.
    pub bytes: usize,
    /// Decoded value for keys the engine knows about.
    pub summary: Option<String>,
}

fn summarize(store: &SaveStore, key: &str) -> Option<String> {
    if key == keys::ECONOMY {
        return store
            .load::<EconomyData>(key)
            .ok()
            .flatten()
            .map(|data| format!("money = {}", data.money));
    }
    if key == keys::UNLOCKED_FORMULAS {
        return store
            .load::<Vec<String>>(key)
            .ok()
            .flatten()
            .map(|ids| format!("unlocked = [{}]", ids.join(", ")));
    }
    if key.starts_with(keys::CONSTRUCTION_SITE_PREFIX) {
        return store
            .load::<bool>(key)
            .ok()
            .flatten()
            .map(|built| format!("built = {built}"));
    }
    None
}

/// List every key in a save store.
#[must_use]
pub fn entries(store: &SaveStore) -> Vec<SaveEntry> {
    store
        .keys()
        .map(|key| SaveEntry {
            key: key.to_string(),
            bytes: store.value_len(key).unwrap_or(0),
            summary: summarize(store, key),
        })
        .collect()
}

/// Read a save file and list its keys.
///
/// # Errors
///
/// Fails if the file cannot be read, has the wrong version or is corrupt.
pub fn inspect_save(path: &Path) -> Result<Vec<SaveEntry>> {
    let store = SaveStore::read_from(path)?;
    Ok(entries(&store))
}
