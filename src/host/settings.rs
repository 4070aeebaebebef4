use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::SkinError;
use crate::model::skin::value_to_string;

pub type SharedSettings = Arc<Mutex<SettingsStore>>;

/// Sectioned key/value store shared by every skin, persisted as TOML.
#[derive(Debug, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    sections: BTreeMap<String, BTreeMap<String, String>>,
    dirty: bool,
}

impl SettingsStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`. A missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SkinError> {
        let path = path.into();
        let sections = if path.is_file() {
            let raw = fs::read_to_string(&path).map_err(|source| SkinError::Io {
                path: path.clone(),
                source,
            })?;
            let parsed: BTreeMap<String, toml::Table> =
                toml::from_str(&raw).map_err(|source| SkinError::Parse {
                    path: path.clone(),
                    source,
                })?;
            stringify_sections(parsed)
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path),
            sections,
            dirty: false,
        })
    }

    pub fn into_shared(self) -> SharedSettings {
        Arc::new(Mutex::new(self))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let entries = self.sections.entry(section.to_string()).or_default();
        if entries.get(key).map(String::as_str) != Some(value) {
            entries.insert(key.to_string(), value.to_string());
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write pending changes. No-op for in-memory or unchanged stores.
    pub fn flush(&mut self) -> Result<(), SkinError> {
        let Some(path) = self.path.as_ref() else {
            self.dirty = false;
            return Ok(());
        };

        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SkinError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let raw = toml::to_string(&self.sections).map_err(|source| SkinError::Serialize {
            path: path.clone(),
            source,
        })?;
        fs::write(path, raw).map_err(|source| SkinError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("settings flushed to {}", path.display());
        self.dirty = false;
        Ok(())
    }
}

/// Hand-edited files may hold numbers or booleans; the store keeps strings.
fn stringify_sections(
    parsed: BTreeMap<String, toml::Table>,
) -> BTreeMap<String, BTreeMap<String, String>> {
    parsed
        .into_iter()
        .map(|(section, entries)| {
            let entries = entries
                .iter()
                .map(|(key, value)| (key.clone(), value_to_string(value)))
                .collect();
            (section, entries)
        })
        .collect()
}
