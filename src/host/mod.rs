//! Boundary between measures and the application hosting them.
//!
//! Measures never touch skin files, the settings store or the log sink
//! directly; everything goes through a [`MeasureHost`] handed to them for
//! the duration of a single lifecycle call.

pub mod settings;
pub mod skin_host;

pub use settings::SettingsStore;
pub use skin_host::SkinHost;

use std::fmt;

/// Identifies the enclosing context (one loaded skin) a measure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeToken(u64);

impl ScopeToken {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ScopeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Severity accepted by [`MeasureHost::log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Notice,
    Debug,
}

/// Operating system version as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

/// Services a host exposes to a measure during create/reload/update/teardown.
pub trait MeasureHost {
    /// Option value as a string, or `default` when the option is absent.
    fn read_string(&self, option: &str, default: &str) -> String;

    /// Option value as an integer. Absent or unparsable values yield `default`.
    fn read_int(&self, option: &str, default: i32) -> i32;

    fn scope(&self) -> ScopeToken;

    fn measure_name(&self) -> String;

    fn log(&self, level: LogLevel, message: &str);

    /// Queue a host command (bang) for execution.
    fn execute(&self, command: &str);

    fn read_setting(&self, section: &str, key: &str) -> Option<String>;

    fn write_setting(&self, section: &str, key: &str, value: &str);

    fn os_version(&self) -> Option<OsVersion>;
}
