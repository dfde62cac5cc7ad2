//! Data validation utilities.

use std::path::{Path, PathBuf};

use duckov_core::data::ContentPack;
use duckov_core::error::{GameError, Result};

/// Read one content pack file.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a valid pack.
pub fn read_pack(path: &Path) -> Result<ContentPack> {
    let label = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| GameError::Io {
        path: label.clone(),
        source,
    })?;
    ContentPack::from_ron_str(&text, &label)
}

/// `.ron` files directly inside `dir`, sorted by name.
fn ron_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| GameError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();
    Ok(files)
}

/// Load a pack file, or every `.ron` file in a directory merged into one
/// pack so that ids are checked across files.
///
/// # Errors
///
/// Fails on the first unreadable or unparsable file.
pub fn load_content(path: &Path) -> Result<ContentPack> {
    if !path.is_dir() {
        return read_pack(path);
    }
    let mut merged = ContentPack::default();
    for file in ron_files(path)? {
        tracing::debug!(file = %file.display(), "Reading content file");
        let pack = read_pack(&file)?;
        merged.items.extend(pack.items);
        merged.formulas.extend(pack.formulas);
    }
    Ok(merged)
}

/// Validate content at `path` (a pack file or a directory of them).
///
/// Returns the authoring problems found; an empty list means the content is
/// valid.
///
/// # Errors
///
/// Returns an error if the content cannot be read or parsed at all.
pub fn validate_content(path: &Path) -> Result<Vec<String>> {
    let pack = load_content(path)?;
    let problems = pack.validate();
    tracing::info!(
        items = pack.items.len(),
        formulas = pack.formulas.len(),
        problems = problems.len(),
        "Validated content"
    );
    Ok(problems)
}
