//! Data structures for content and game configuration.
//!
//! Everything here is plain serde data designed to be written by hand in RON
//! files. Parsing helpers take the text, not a path; reading files is left to
//! the binaries.

mod config;
mod content;

pub use config::GameConfig;
pub use content::ContentPack;

use serde::de::DeserializeOwned;

use crate::error::{GameError, Result};

/// Parse RON text, labelling errors with `label` (usually the file path).
///
/// # Errors
///
/// Returns [`GameError::DataParseError`] if the text is not valid for `T`.
pub fn parse_ron<T: DeserializeOwned>(text: &str, label: &str) -> Result<T> {
    ron::from_str(text).map_err(|e| GameError::DataParseError {
        path: label.to_string(),
        message: e.to_string(),
    })
}
