use std::path::{Path, PathBuf};
use std::sync::PoisonError;

use crate::error::SkinError;
use crate::host::ScopeToken;
use crate::host::settings::{SettingsStore, SharedSettings};
use crate::plugin::registry::{ParentRegistry, SharedRegistry};
use crate::plugin::runtime::SkinRuntime;

/// Owns the state shared by every loaded skin: the parent registry and the
/// settings store. Each skin gets a fresh scope token.
///
/// The registry is created with the manager and handed to runtimes by
/// reference; it is dropped once the manager and every runtime are gone.
#[derive(Debug)]
pub struct PluginManager {
    registry: SharedRegistry,
    settings: SharedSettings,
    next_scope: u64,
    failures: Vec<(PathBuf, String)>,
}

impl PluginManager {
    pub fn new(settings: SettingsStore) -> Self {
        Self {
            registry: ParentRegistry::shared(),
            settings: settings.into_shared(),
            next_scope: 0,
            failures: Vec::new(),
        }
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn settings(&self) -> SharedSettings {
        self.settings.clone()
    }

    pub fn next_scope(&mut self) -> ScopeToken {
        self.next_scope += 1;
        ScopeToken::new(self.next_scope)
    }

    pub fn load_skin(&mut self, path: &Path) -> Result<SkinRuntime, SkinError> {
        let scope = self.next_scope();
        let runtime = SkinRuntime::load(path, scope, self.registry(), self.settings())?;
        tracing::info!(%scope, measures = runtime.len(), "loaded skin {}", path.display());
        Ok(runtime)
    }

    /// Load every skin, remembering failures for [`Self::error_notifications`].
    pub fn load_all(&mut self, paths: &[PathBuf]) -> Vec<SkinRuntime> {
        let mut runtimes = Vec::new();
        for path in paths {
            match self.load_skin(path) {
                Ok(runtime) => runtimes.push(runtime),
                Err(err) => {
                    tracing::error!("failed to load skin: {err}");
                    self.failures.push((path.clone(), err.to_string()));
                }
            }
        }
        runtimes
    }

    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    pub fn parent_count(&self) -> usize {
        ParentRegistry::lock(&self.registry).len()
    }

    pub fn startup_notifications(&self, loaded: &[SkinRuntime]) -> Vec<String> {
        if loaded.is_empty() && self.failures.is_empty() {
            return vec!["skins: none configured".to_string()];
        }

        let mut notices = vec![self.summary_notification(loaded.len())];
        notices.extend(self.error_notifications());
        notices.extend(Self::list_notifications(loaded));
        notices
    }

    pub fn summary_notification(&self, loaded: usize) -> String {
        format!(
            "skins: {loaded} loaded, {} errors, {} parents registered",
            self.error_count(),
            self.parent_count()
        )
    }

    pub fn error_notifications(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|(path, err)| format!("skin {}: {err}", path.display()))
            .collect()
    }

    pub fn list_notifications(runtimes: &[SkinRuntime]) -> Vec<String> {
        let mut rows: Vec<String> = runtimes
            .iter()
            .flat_map(|runtime| {
                runtime
                    .measure_names()
                    .into_iter()
                    .map(move |(name, kind)| {
                        format!(
                            "measure {name} [{}] ({}, {})",
                            kind.name(),
                            runtime.path.display(),
                            runtime.scope()
                        )
                    })
            })
            .collect();

        rows.sort();
        rows
    }

    pub fn flush_settings(&self) -> Result<(), SkinError> {
        let mut settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        settings.flush()?;
        if let Some(path) = settings.path() {
            tracing::info!("settings stored in {}", path.display());
        }
        Ok(())
    }
}
