use std::cell::RefCell;
use std::sync::PoisonError;

use crate::host::settings::SharedSettings;
use crate::host::{LogLevel, MeasureHost, OsVersion, ScopeToken};
use crate::model::skin::{MeasureSection, Variables};

/// [`MeasureHost`] backed by one measure section of a loaded skin.
///
/// Borrowed for a single lifecycle call; commands are queued and applied by
/// the runtime once the call returns.
pub struct SkinHost<'a> {
    pub(crate) scope: ScopeToken,
    pub(crate) section: &'a MeasureSection,
    pub(crate) variables: &'a Variables,
    pub(crate) settings: &'a SharedSettings,
    pub(crate) commands: &'a RefCell<Vec<String>>,
    pub(crate) os_version: Option<OsVersion>,
}

impl MeasureHost for SkinHost<'_> {
    fn read_string(&self, option: &str, default: &str) -> String {
        match self.section.option(option) {
            Some(raw) => self.variables.substitute(&raw),
            None => default.to_string(),
        }
    }

    fn read_int(&self, option: &str, default: i32) -> i32 {
        let Some(raw) = self.section.option(option) else {
            return default;
        };
        parse_int(&self.variables.substitute(&raw)).unwrap_or(default)
    }

    fn scope(&self) -> ScopeToken {
        self.scope
    }

    fn measure_name(&self) -> String {
        self.section.name.clone()
    }

    fn log(&self, level: LogLevel, message: &str) {
        let measure = self.section.name.as_str();
        let scope = self.scope;
        match level {
            LogLevel::Error => tracing::error!(%scope, measure, "{message}"),
            LogLevel::Warning => tracing::warn!(%scope, measure, "{message}"),
            LogLevel::Notice => tracing::info!(%scope, measure, "{message}"),
            LogLevel::Debug => tracing::debug!(%scope, measure, "{message}"),
        }
    }

    fn execute(&self, command: &str) {
        self.commands.borrow_mut().push(command.to_string());
    }

    fn read_setting(&self, section: &str, key: &str) -> Option<String> {
        let settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        settings.get(section, key).map(str::to_string)
    }

    fn write_setting(&self, section: &str, key: &str, value: &str) {
        let mut settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        settings.set(section, key, value);
    }

    fn os_version(&self) -> Option<OsVersion> {
        self.os_version
    }
}

/// Integer option parsing: plain integers, or decimals truncated toward zero.
fn parse_int(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i32>() {
        return Some(value);
    }

    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value.trunc().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32)
}

/// Version of the running kernel, e.g. `6.8.12-arch1` → 6.8 build 12.
#[cfg(target_os = "linux")]
pub fn detect_os_version() -> Option<OsVersion> {
    let release = std::fs::read_to_string("/proc/sys/kernel/osrelease").ok()?;
    parse_release(&release)
}

#[cfg(not(target_os = "linux"))]
pub fn detect_os_version() -> Option<OsVersion> {
    None
}

pub fn parse_release(release: &str) -> Option<OsVersion> {
    let mut parts = release.trim().split('.').map(|part| {
        let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u32>().ok()
    });

    let major = parts.next().flatten()?;
    let minor = parts.next().flatten().unwrap_or(0);
    let build = parts.next().flatten().unwrap_or(0);
    Some(OsVersion {
        major,
        minor,
        build,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SettingsStore;

    fn with_host<R>(section: &MeasureSection, f: impl FnOnce(&SkinHost<'_>) -> R) -> R {
        let mut variables = Variables::default();
        variables.set("Timer", "5");
        let settings = SettingsStore::in_memory().into_shared();
        let commands = RefCell::new(Vec::new());
        let host = SkinHost {
            scope: ScopeToken::new(3),
            section,
            variables: &variables,
            settings: &settings,
            commands: &commands,
            os_version: None,
        };
        f(&host)
    }

    #[test]
    fn reads_options_with_variables() {
        let section = MeasureSection::new("mTimer", "RmExecute")
            .with("Timer", "#Timer#")
            .with("OnTimer", "[!Log every #Timer# s]")
            .with("Ratio", 2.9)
            .with("Garbage", "abc");

        with_host(&section, |host| {
            assert_eq!(host.read_int("timer", 1), 5);
            assert_eq!(host.read_string("OnTimer", ""), "[!Log every 5 s]");
            assert_eq!(host.read_int("Ratio", 0), 2);
            assert_eq!(host.read_int("Garbage", 7), 7);
            assert_eq!(host.read_int("Missing", -1), -1);
            assert_eq!(host.read_string("Missing", "dflt"), "dflt");
            assert_eq!(host.measure_name(), "mTimer");
            assert_eq!(host.scope(), ScopeToken::new(3));
        });
    }

    #[test]
    fn settings_and_commands_round_trip() {
        let section = MeasureSection::new("m", "Empty");
        with_host(&section, |host| {
            assert!(host.read_setting("S", "k").is_none());
            host.write_setting("S", "k", "v");
            assert_eq!(host.read_setting("S", "k").as_deref(), Some("v"));

            host.execute("[!Log hi]");
            assert_eq!(host.commands.borrow().as_slice(), ["[!Log hi]"]);
        });
    }

    #[test]
    fn release_parsing() {
        assert_eq!(
            parse_release("6.8.12-arch1-1\n"),
            Some(OsVersion {
                major: 6,
                minor: 8,
                build: 12
            })
        );
        assert_eq!(
            parse_release("10"),
            Some(OsVersion {
                major: 10,
                minor: 0,
                build: 0
            })
        );
        assert_eq!(parse_release("unknown"), None);
    }
}
