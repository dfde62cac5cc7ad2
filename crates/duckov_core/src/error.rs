//! Error types for the item engine.
//!
//! [`GameError`] covers configuration, data and persistence failures.
//! Gameplay validation failures (slot occupied, cost not covered, ...) are
//! reported through the small per-module enums instead, because callers are
//! expected to branch on them and fall back.

use thiserror::Error;

use crate::catalog::ItemTypeId;
use crate::item::ItemId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the item engine.
#[derive(Debug, Error)]
pub enum GameError {
    /// No definition is registered for an item type.
    #[error("Unknown item type: {0}")]
    UnknownItemType(ItemTypeId),

    /// An item handle does not refer to a live item.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// Two formulas share the same identifier.
    #[error("Duplicate crafting formula ID: {0}")]
    DuplicateFormula(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{path}': {message}")]
    DataParseError {
        /// Path or label of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// A value could not be encoded for the save store.
    #[error("Failed to encode save key '{key}': {message}")]
    SaveEncode {
        /// Save key being written.
        key: String,
        /// Error message.
        message: String,
    },

    /// A stored value could not be decoded.
    #[error("Failed to decode save key '{key}': {message}")]
    SaveDecode {
        /// Save key being read.
        key: String,
        /// Error message.
        message: String,
    },

    /// Save file was written by an incompatible version.
    #[error("Save version mismatch: expected {expected}, got {found}")]
    SaveVersionMismatch {
        /// Version this build understands.
        expected: u32,
        /// Version found in the file.
        found: u32,
    },

    /// Filesystem error while reading or writing a save.
    #[error("IO error on '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
