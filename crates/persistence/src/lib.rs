#![deny(warnings)]

//! Persistence layer: versioned save files for simulation state.
//!
//! Saves are wrapped in a [`SaveFile`] header carrying a schema version so
//! that incompatible files are rejected instead of half-loaded. JSON is used
//! for files on disk; bincode for compact in-memory snapshots.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Current save schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Returns the default path used for local saves.
pub fn default_save_path() -> &'static str {
    "./saves/hatchery.json"
}

/// A saved state with its schema header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFile<T> {
    pub schema_version: u32,
    /// Free-form label, e.g. the quarter the save was taken in.
    pub label: String,
    pub state: T,
}

impl<T> SaveFile<T> {
    pub fn new(label: impl Into<String>, state: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            label: label.into(),
            state,
        }
    }

    fn check_version(self) -> Result<Self> {
        if self.schema_version != SCHEMA_VERSION {
            bail!(
                "unsupported save schema version {} (expected {})",
                self.schema_version,
                SCHEMA_VERSION
            );
        }
        Ok(self)
    }
}

/// Write `state` as pretty JSON, creating parent directories as needed.
pub fn save_json<T: Serialize>(path: impl AsRef<Path>, label: &str, state: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating save directory {}", parent.display()))?;
        }
    }
    let text = serde_json::to_string_pretty(&SaveFile::new(label, state))?;
    fs::write(path, text).with_context(|| format!("writing save {}", path.display()))?;
    info!(path = %path.display(), label, "saved");
    Ok(())
}

/// Read a JSON save written by [`save_json`].
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<SaveFile<T>> {
    let path = path.as_ref();
    let text =
        fs::read_to_string(path).with_context(|| format!("reading save {}", path.display()))?;
    let save: SaveFile<T> = serde_json::from_str(&text)
        .with_context(|| format!("parsing save {}", path.display()))?;
    let save = save.check_version()?;
    info!(path = %path.display(), label = %save.label, "loaded");
    Ok(save)
}

/// Encode `state` with bincode.
pub fn to_bytes<T: Serialize>(label: &str, state: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(&SaveFile::new(label, state))?)
}

/// Decode bytes produced by [`to_bytes`].
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<SaveFile<T>> {
    let save: SaveFile<T> = bincode::deserialize(bytes).context("decoding snapshot")?;
    save.check_version()
}
