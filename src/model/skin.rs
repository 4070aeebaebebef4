use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;

use crate::error::SkinError;

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z0-9_]+)#").expect("valid variable regex"));

/// One skin file: a scope's variables, measures and text lines.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkinFile {
    #[serde(default)]
    pub variables: BTreeMap<String, toml::Value>,
    #[serde(default, rename = "measure")]
    pub measures: Vec<MeasureSection>,
    #[serde(default, rename = "text")]
    pub texts: Vec<TextSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeasureSection {
    pub name: String,
    pub plugin: String,
    #[serde(flatten)]
    pub options: BTreeMap<String, toml::Value>,
}

/// Line rendered after every update, e.g. `"mChild1: [mChild1]"`.
#[derive(Debug, Clone, Deserialize)]
pub struct TextSection {
    pub name: String,
    pub text: String,
}

impl SkinFile {
    pub fn load(path: &Path) -> Result<Self, SkinError> {
        let raw = fs::read_to_string(path).map_err(|source| SkinError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &raw)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self, SkinError> {
        let skin: SkinFile = toml::from_str(raw).map_err(|source| SkinError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut seen = HashSet::new();
        for measure in &skin.measures {
            if !seen.insert(measure.name.to_lowercase()) {
                return Err(SkinError::DuplicateMeasure {
                    name: measure.name.clone(),
                });
            }
        }

        Ok(skin)
    }
}

impl MeasureSection {
    pub fn new(name: impl Into<String>, plugin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plugin: plugin.into(),
            options: BTreeMap::new(),
        }
    }

    pub fn with(mut self, option: &str, value: impl Into<toml::Value>) -> Self {
        self.options.insert(option.to_string(), value.into());
        self
    }

    /// Raw option text. Option names are case-insensitive.
    pub fn option(&self, option: &str) -> Option<String> {
        self.options
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(option))
            .map(|(_, value)| value_to_string(value))
    }
}

pub fn value_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(text) => text.clone(),
        toml::Value::Integer(number) => number.to_string(),
        toml::Value::Float(number) => number.to_string(),
        toml::Value::Boolean(flag) => String::from(if *flag { "1" } else { "0" }),
        other => other.to_string(),
    }
}

/// Skin variables, referenced as `#Name#` in option values.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    pub fn from_table(table: &BTreeMap<String, toml::Value>) -> Self {
        let mut variables = Self::default();
        for (name, value) in table {
            variables.set(name, &value_to_string(value));
        }
        variables
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_lowercase(), value.to_string());
    }

    /// Replace known `#Name#` references; unknown ones are left untouched.
    pub fn substitute(&self, text: &str) -> String {
        VARIABLE_RE
            .replace_all(text, |caps: &Captures| match self.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}
