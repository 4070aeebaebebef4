use std::fs;
use std::path::{Path, PathBuf};

use crate::model::skin::SkinFile;
use crate::msg::Msg;
use crate::plugin::SkinRuntime;

/// Drives one skin: reacts to ticks, file changes and quit requests.
pub struct App {
    pub runtime: SkinRuntime,
    pub should_quit: bool,
    watched: PathBuf,
    ticks: u64,
    max_ticks: u64,
}

impl App {
    /// `max_ticks == 0` runs until a [`Msg::Quit`] arrives.
    pub fn new(runtime: SkinRuntime, max_ticks: u64) -> Self {
        let watched = canonical(&runtime.path);
        Self {
            runtime,
            should_quit: false,
            watched,
            ticks: 0,
            max_ticks,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn update(&mut self, msg: Msg) {
        match msg {
            Msg::Tick => {
                self.runtime.update_all();
                self.ticks += 1;
                if self.max_ticks > 0 && self.ticks >= self.max_ticks {
                    self.should_quit = true;
                }
            }
            Msg::SkinChanged(path) => {
                if canonical(&path) == self.watched {
                    self.reload();
                }
            }
            Msg::Quit => self.should_quit = true,
        }
    }

    /// Lines to print after a tick: the skin's texts, or every measure's
    /// value when the skin defines none.
    pub fn view(&mut self) -> Vec<String> {
        let label = self
            .runtime
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.runtime.scope().to_string());

        let texts = self.runtime.rendered_texts();
        if !texts.is_empty() {
            return texts
                .into_iter()
                .map(|(name, text)| format!("[{label}] {name}: {text}"))
                .collect();
        }

        self.runtime
            .measure_names()
            .into_iter()
            .filter_map(|(name, _)| {
                let handle = self.runtime.find(&name)?;
                let shown = self
                    .runtime
                    .string_value(handle)
                    .or_else(|| self.runtime.value(handle).map(|v| v.to_string()))?;
                Some(format!("[{label}] {name} = {shown}"))
            })
            .collect()
    }

    fn reload(&mut self) {
        match SkinFile::load(&self.runtime.path) {
            Ok(skin) => match self.runtime.reload(skin) {
                Ok(()) => tracing::info!("reloaded skin {}", self.runtime.path.display()),
                Err(err) => tracing::warn!("skin reload failed: {err}"),
            },
            // Keep the running measures when an edit leaves the file broken.
            Err(err) => tracing::warn!("skin reload failed: {err}"),
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
