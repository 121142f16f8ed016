//! Built-in dataset registry and dataset file loading.
//!
//! Built-in fixtures live under `datasets/` at the crate root and are embedded
//! at compile time. User datasets can be loaded from `.toml` or `.json` files
//! with the same shape.

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::Dataset;

const BUILTIN: &[(&str, &str)] = &[
    (
        "swiftui-button",
        include_str!("../datasets/swiftui-button.toml"),
    ),
    (
        "compose-button",
        include_str!("../datasets/compose-button.toml"),
    ),
];

/// Errors that can occur while resolving or loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("unknown dataset: {0} (try `decomp list`)")]
    Unknown(String),

    #[error("unsupported dataset format: {} (expected .toml or .json)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML dataset: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON dataset: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, DatasetError>;

/// Ids of the built-in datasets, in registry order.
pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(id, _)| *id)
}

/// Parses a built-in dataset by id.
pub fn builtin(id: &str) -> Result<Dataset> {
    let (_, source) = BUILTIN
        .iter()
        .find(|(known, _)| *known == id)
        .ok_or_else(|| DatasetError::Unknown(id.to_string()))?;
    Ok(toml::from_str(source)?)
}

/// All built-in datasets.
pub fn builtins() -> Result<Vec<Dataset>> {
    builtin_ids().map(builtin).collect()
}

/// Loads a dataset file, choosing the parser by extension.
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let is_toml = match ext.as_deref() {
        Some("toml") => true,
        Some("json") => false,
        _ => return Err(DatasetError::UnsupportedFormat(path.to_path_buf())),
    };

    let contents = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset: Dataset = if is_toml {
        toml::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };
    tracing::info!(path = %path.display(), id = %dataset.id, "loaded dataset file");
    Ok(dataset)
}

/// Resolves a built-in id, or falls back to treating the name as a file path.
pub fn resolve(name: &str) -> Result<Dataset> {
    match builtin(name) {
        Err(DatasetError::Unknown(_)) if Path::new(name).is_file() => load_file(Path::new(name)),
        other => other,
    }
}
