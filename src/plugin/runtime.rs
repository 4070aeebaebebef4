use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, PoisonError};

use regex::{Captures, Regex};
use slotmap::{SlotMap, new_key_type};

use crate::error::SkinError;
use crate::host::settings::SharedSettings;
use crate::host::skin_host::detect_os_version;
use crate::host::{OsVersion, ScopeToken, SkinHost};
use crate::model::bang::{Bang, parse_bangs};
use crate::model::skin::{MeasureSection, SkinFile, TextSection, Variables};
use crate::plugin::registry::{ParentRegistry, SharedRegistry};
use crate::plugin::{Measure, PluginKind};

new_key_type! {
    /// Handle returned by [`SkinRuntime::create`].
    pub struct MeasureHandle;
}

static SECTION_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[&([^:\[\]]+):([A-Za-z_]+)\(([^)]*)\)\]").expect("valid section call regex")
});
static MEASURE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]&#]+)\]").expect("valid measure reference regex"));

struct MeasureSlot {
    section: MeasureSection,
    kind: PluginKind,
    measure: Box<dyn Measure>,
    value: f64,
    string: Option<String>,
}

/// All measures of one skin, sharing one scope.
pub struct SkinRuntime {
    pub path: PathBuf,
    scope: ScopeToken,
    registry: SharedRegistry,
    settings: SharedSettings,
    variables: Variables,
    texts: Vec<TextSection>,
    measures: SlotMap<MeasureHandle, MeasureSlot>,
    order: Vec<MeasureHandle>,
    commands: RefCell<Vec<String>>,
    os_version: Option<OsVersion>,
}

macro_rules! host {
    ($self:ident, $section:expr) => {
        SkinHost {
            scope: $self.scope,
            section: $section,
            variables: &$self.variables,
            settings: &$self.settings,
            commands: &$self.commands,
            os_version: $self.os_version,
        }
    };
}

impl SkinRuntime {
    pub fn new(
        path: impl Into<PathBuf>,
        scope: ScopeToken,
        registry: SharedRegistry,
        settings: SharedSettings,
    ) -> Self {
        Self {
            path: path.into(),
            scope,
            registry,
            settings,
            variables: Variables::default(),
            texts: Vec::new(),
            measures: SlotMap::with_key(),
            order: Vec::new(),
            commands: RefCell::new(Vec::new()),
            os_version: detect_os_version(),
        }
    }

    /// Read a skin file and create its measures in declaration order.
    pub fn load(
        path: &Path,
        scope: ScopeToken,
        registry: SharedRegistry,
        settings: SharedSettings,
    ) -> Result<Self, SkinError> {
        let skin = SkinFile::load(path)?;
        let mut runtime = Self::new(path, scope, registry, settings);
        runtime.apply(skin)?;
        Ok(runtime)
    }

    pub fn scope(&self) -> ScopeToken {
        self.scope
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn find(&self, name: &str) -> Option<MeasureHandle> {
        let folded = name.to_lowercase();
        self.order.iter().copied().find(|handle| {
            self.measures
                .get(*handle)
                .is_some_and(|slot| slot.section.name.to_lowercase() == folded)
        })
    }

    /// Measure names with their plugin, in creation order.
    pub fn measure_names(&self) -> Vec<(String, PluginKind)> {
        self.order
            .iter()
            .filter_map(|handle| self.measures.get(*handle))
            .map(|slot| (slot.section.name.clone(), slot.kind))
            .collect()
    }

    /// Create a measure and run its first reload.
    pub fn create(&mut self, section: MeasureSection) -> Result<MeasureHandle, SkinError> {
        let kind = PluginKind::parse(&section.plugin).ok_or_else(|| SkinError::UnknownPlugin {
            measure: section.name.clone(),
            plugin: section.plugin.clone(),
        })?;

        if self.find(&section.name).is_some() {
            return Err(SkinError::DuplicateMeasure { name: section.name });
        }

        let measure = {
            let host = host!(self, &section);
            let mut measure = kind.create(&self.registry, &host);
            measure.reload(&host);
            measure
        };
        let string = measure.string_value(&host!(self, &section));

        tracing::debug!(
            scope = %self.scope,
            measure = %section.name,
            plugin = kind.name(),
            "measure created"
        );
        let handle = self.measures.insert(MeasureSlot {
            section,
            kind,
            measure,
            value: 0.0,
            string,
        });
        self.order.push(handle);
        self.run_commands();
        Ok(handle)
    }

    /// Re-read options of one measure. Returns false for stale handles.
    pub fn configure(&mut self, handle: MeasureHandle) -> bool {
        let Some(slot) = self.measures.get_mut(handle) else {
            return false;
        };

        let MeasureSlot {
            section, measure, ..
        } = slot;
        measure.reload(&host!(self, section));
        self.run_commands();
        true
    }

    pub fn update(&mut self, handle: MeasureHandle) -> Option<f64> {
        let slot = self.measures.get_mut(handle)?;
        let MeasureSlot {
            section,
            measure,
            value,
            string,
            ..
        } = slot;

        let host = host!(self, section);
        if section
            .option("DynamicVariables")
            .is_some_and(|flag| flag.trim() == "1")
        {
            measure.reload(&host);
        }
        *value = measure.update(&host);
        *string = measure.string_value(&host);
        let result = *value;

        self.run_commands();
        Some(result)
    }

    /// Finalize and drop a measure. Returns false for stale handles.
    pub fn destroy(&mut self, handle: MeasureHandle) -> bool {
        let Some(mut slot) = self.measures.remove(handle) else {
            return false;
        };
        self.order.retain(|h| *h != handle);

        slot.measure.finalize(&host!(self, &slot.section));
        tracing::debug!(scope = %self.scope, measure = %slot.section.name, "measure destroyed");
        drop(slot);
        self.run_commands();
        true
    }

    /// Update every measure once, in creation order.
    pub fn update_all(&mut self) {
        for handle in self.order.clone() {
            self.update(handle);
        }
    }

    pub fn value(&self, handle: MeasureHandle) -> Option<f64> {
        self.measures.get(handle).map(|slot| slot.value)
    }

    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.find(name).and_then(|handle| self.value(handle))
    }

    pub fn string_value(&self, handle: MeasureHandle) -> Option<String> {
        self.measures.get(handle).and_then(|slot| slot.string.clone())
    }

    pub fn section_call(
        &mut self,
        handle: MeasureHandle,
        function: &str,
        args: &[String],
    ) -> Option<String> {
        self.measures
            .get_mut(handle)
            .and_then(|slot| slot.measure.section_call(function, args))
    }

    /// Replace variables, section calls and `[measure]` references in `text`.
    pub fn render(&mut self, text: &str) -> String {
        let text = self.variables.substitute(text);

        let calls: Vec<(String, String, String, Vec<String>)> = SECTION_CALL_RE
            .captures_iter(&text)
            .map(|caps| {
                (
                    caps[0].to_string(),
                    caps[1].to_string(),
                    caps[2].to_string(),
                    split_call_args(&caps[3]),
                )
            })
            .collect();

        let mut resolved = HashMap::new();
        for (whole, measure, function, args) in calls {
            let output = self
                .find(&measure)
                .and_then(|handle| self.section_call(handle, &function, &args));
            if let Some(output) = output {
                resolved.insert(whole, output);
            }
        }

        let text = SECTION_CALL_RE.replace_all(&text, |caps: &Captures| {
            resolved
                .get(&caps[0])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        });

        MEASURE_REF_RE
            .replace_all(&text, |caps: &Captures| match self.find(&caps[1]) {
                Some(handle) => self
                    .string_value(handle)
                    .unwrap_or_else(|| format_number(self.value(handle).unwrap_or(0.0))),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Rendered `[[text]]` lines of the skin, as `(name, text)`.
    pub fn rendered_texts(&mut self) -> Vec<(String, String)> {
        let texts = self.texts.clone();
        texts
            .into_iter()
            .map(|text| {
                let rendered = self.render(&text.text);
                (text.name, rendered)
            })
            .collect()
    }

    /// Apply a re-read skin file. Existing measures keep their instance and
    /// any parent binding; only their options change. Measures no longer
    /// present are destroyed, new ones created.
    pub fn reload(&mut self, skin: SkinFile) -> Result<(), SkinError> {
        let keep: Vec<String> = skin.measures.iter().map(|m| m.name.to_lowercase()).collect();
        let removed: Vec<MeasureHandle> = self
            .measure_names()
            .into_iter()
            .filter(|(name, _)| !keep.contains(&name.to_lowercase()))
            .filter_map(|(name, _)| self.find(&name))
            .collect();
        for handle in removed {
            self.destroy(handle);
        }

        self.apply(skin)
    }

    fn apply(&mut self, skin: SkinFile) -> Result<(), SkinError> {
        self.variables = Variables::from_table(&skin.variables);
        self.texts = skin.texts;

        let mut first_error = None;
        for section in skin.measures {
            let result = match self.find(&section.name) {
                Some(handle) => {
                    if let Some(slot) = self.measures.get_mut(handle) {
                        slot.section = section;
                    }
                    self.configure(handle);
                    Ok(())
                }
                None => self.create(section).map(|_| ()),
            };

            if let Err(err) = result {
                tracing::warn!(scope = %self.scope, "{err}");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) if self.measures.is_empty() => Err(err),
            _ => Ok(()),
        }
    }

    fn run_commands(&mut self) {
        let pending = std::mem::take(&mut *self.commands.borrow_mut());
        for command in pending {
            for bang in parse_bangs(&command) {
                match bang {
                    Bang::SetVariable { name, value } => {
                        let value = self.variables.substitute(&value);
                        self.variables.set(&name, &value);
                    }
                    Bang::Log { message } => {
                        tracing::info!(scope = %self.scope, "{message}");
                    }
                    Bang::Unsupported { name, .. } => {
                        tracing::warn!(scope = %self.scope, "unsupported bang: !{name}");
                    }
                }
            }
        }
    }
}

impl Drop for SkinRuntime {
    fn drop(&mut self) {
        for handle in self.order.clone() {
            self.destroy(handle);
        }

        let leaked = ParentRegistry::lock(&self.registry).clear_scope(self.scope);
        if leaked > 0 {
            tracing::warn!(scope = %self.scope, leaked, "parents left behind at skin teardown");
        }

        let mut settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = settings.flush() {
            tracing::error!("settings flush failed: {err}");
        }
    }
}

fn split_call_args(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    raw.split(',')
        .map(|arg| arg.trim().trim_matches('"').to_string())
        .collect()
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}
