use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::host::{LogLevel, MeasureHost, OsVersion, ScopeToken};

/// In-memory host recording everything measures send back.
#[derive(Debug, Clone)]
pub struct FakeHost {
    scope: ScopeToken,
    name: String,
    options: BTreeMap<String, String>,
    pub os: Option<OsVersion>,
    logs: RefCell<Vec<(LogLevel, String)>>,
    commands: RefCell<Vec<String>>,
    settings: RefCell<BTreeMap<(String, String), String>>,
}

impl FakeHost {
    pub fn new(scope: ScopeToken, name: &str) -> Self {
        Self {
            scope,
            name: name.to_string(),
            options: BTreeMap::new(),
            os: None,
            logs: RefCell::new(Vec::new()),
            commands: RefCell::new(Vec::new()),
            settings: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn with(mut self, option: &str, value: &str) -> Self {
        self.options.insert(option.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_setting(self, section: &str, key: &str, value: &str) -> Self {
        self.settings
            .borrow_mut()
            .insert((section.to_string(), key.to_string()), value.to_string());
        self
    }

    pub fn setting(&self, section: &str, key: &str) -> Option<String> {
        self.settings
            .borrow()
            .get(&(section.to_string(), key.to_string()))
            .cloned()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.logged(LogLevel::Error)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.logged(LogLevel::Warning)
    }

    fn logged(&self, level: LogLevel) -> Vec<String> {
        self.logs
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl MeasureHost for FakeHost {
    fn read_string(&self, option: &str, default: &str) -> String {
        self.options
            .get(&option.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn read_int(&self, option: &str, default: i32) -> i32 {
        self.options
            .get(&option.to_ascii_lowercase())
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }

    fn scope(&self) -> ScopeToken {
        self.scope
    }

    fn measure_name(&self) -> String {
        self.name.clone()
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.logs.borrow_mut().push((level, message.to_string()));
    }

    fn execute(&self, command: &str) {
        self.commands.borrow_mut().push(command.to_string());
    }

    fn read_setting(&self, section: &str, key: &str) -> Option<String> {
        self.setting(section, key)
    }

    fn write_setting(&self, section: &str, key: &str, value: &str) {
        self.settings
            .borrow_mut()
            .insert((section.to_string(), key.to_string()), value.to_string());
    }

    fn os_version(&self) -> Option<OsVersion> {
        self.os
    }
}
