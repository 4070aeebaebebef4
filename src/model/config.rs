use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    #[serde(default)]
    pub skins: Vec<SkinConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    pub update_ms: u64,
    pub max_ticks: u64,
    pub log_filter: String,
    pub settings_file: String,
    pub watch: bool,
}

#[derive(Debug, Deserialize)]
pub struct SkinConfig {
    pub path: PathBuf,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let user = match directories::ProjectDirs::from("", "", "skinmeasures") {
            Some(proj_dirs) => {
                let config_path = proj_dirs.config_dir().join("config.toml");
                if config_path.exists() {
                    Some(fs::read_to_string(&config_path)?)
                } else {
                    None
                }
            }
            None => None,
        };

        Self::from_layers(DEFAULTS, user.as_deref())
    }

    /// Merge `user` over `defaults` table by table, so a user file only has
    /// to name the keys it changes.
    pub fn from_layers(defaults: &str, user: Option<&str>) -> Result<Self> {
        let mut merged: toml::Table = toml::from_str(defaults)?;
        if let Some(user) = user {
            let overrides: toml::Table = toml::from_str(user)?;
            merge_tables(&mut merged, overrides);
        }

        Ok(toml::Value::Table(merged).try_into()?)
    }

    pub fn update_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.general.update_ms.max(1))
    }

    pub fn settings_path(&self) -> PathBuf {
        if self.general.settings_file.trim().is_empty() {
            return data_dir().join("settings.toml");
        }
        expand_tilde(Path::new(&self.general.settings_file))
    }

    pub fn skin_paths(&self) -> Vec<PathBuf> {
        self.skins
            .iter()
            .filter(|skin| skin.enabled)
            .map(|skin| expand_tilde(&skin.path))
            .collect()
    }
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        let incoming = match value {
            toml::Value::Table(incoming) => incoming,
            other => {
                base.insert(key, other);
                continue;
            }
        };

        if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
            merge_tables(existing, incoming);
            continue;
        }
        base.insert(key, toml::Value::Table(incoming));
    }
}

/// Directory for logs and the default settings store.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "skinmeasures")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".skinmeasures"))
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if !text.starts_with('~') {
        return path.to_path_buf();
    }

    if let Some(base_dirs) = directories::BaseDirs::new() {
        let home = base_dirs.home_dir().to_string_lossy();
        return PathBuf::from(text.replacen('~', &home, 1));
    }

    path.to_path_buf()
}
