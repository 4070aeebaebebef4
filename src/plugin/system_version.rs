//! Reports the operating system version from the host.
//!
//! `Type=Major|Minor|Number` are numeric; `Type=String` yields
//! `"major.minor (Build n)"` as a string value and 0 as number.

use crate::host::{LogLevel, MeasureHost};
use crate::plugin::Measure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionField {
    #[default]
    Major,
    Minor,
    Number,
    String,
}

impl VersionField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "major" => Some(VersionField::Major),
            "minor" => Some(VersionField::Minor),
            "number" => Some(VersionField::Number),
            "string" => Some(VersionField::String),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SystemVersionMeasure {
    field: VersionField,
}

impl SystemVersionMeasure {
    pub fn field(&self) -> VersionField {
        self.field
    }
}

impl Measure for SystemVersionMeasure {
    fn reload(&mut self, host: &dyn MeasureHost) {
        let raw = host.read_string("Type", "");
        match VersionField::parse(&raw) {
            Some(field) => self.field = field,
            None => host.log(LogLevel::Error, &format!("Type={raw} not valid")),
        }
    }

    fn update(&mut self, host: &dyn MeasureHost) -> f64 {
        let Some(version) = host.os_version() else {
            return 0.0;
        };

        match self.field {
            VersionField::Major => f64::from(version.major),
            VersionField::Minor => f64::from(version.minor),
            VersionField::Number => f64::from(version.major) + f64::from(version.minor) / 10.0,
            VersionField::String => 0.0,
        }
    }

    fn string_value(&self, host: &dyn MeasureHost) -> Option<String> {
        if self.field != VersionField::String {
            return None;
        }

        host.os_version().map(|version| {
            format!(
                "{}.{} (Build {})",
                version.major, version.minor, version.build
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{OsVersion, ScopeToken};
    use crate::plugin::testing::FakeHost;

    fn host(kind: &str) -> FakeHost {
        let mut host = FakeHost::new(ScopeToken::new(1), "mVersion").with("Type", kind);
        host.os = Some(OsVersion {
            major: 6,
            minor: 1,
            build: 7601,
        });
        host
    }

    #[test]
    fn numeric_fields() {
        let mut measure = SystemVersionMeasure::default();
        for (kind, expected) in [("Major", 6.0), ("minor", 1.0), ("NUMBER", 6.1)] {
            let host = host(kind);
            measure.reload(&host);
            assert!((measure.update(&host) - expected).abs() < 1e-9, "{kind}");
            assert!(measure.string_value(&host).is_none());
        }
    }

    #[test]
    fn string_field() {
        let host = host("String");
        let mut measure = SystemVersionMeasure::default();
        measure.reload(&host);

        assert_eq!(measure.update(&host), 0.0);
        assert_eq!(
            measure.string_value(&host).as_deref(),
            Some("6.1 (Build 7601)")
        );
    }

    #[test]
    fn invalid_type_keeps_previous() {
        let mut measure = SystemVersionMeasure::default();
        measure.reload(&host("Minor"));

        let bad = host("Patch");
        measure.reload(&bad);
        assert_eq!(measure.field(), VersionField::Minor);
        assert_eq!(bad.errors(), vec!["Type=Patch not valid"]);
    }

    #[test]
    fn missing_os_info_reads_zero() {
        let mut host = host("Major");
        host.os = None;
        let mut measure = SystemVersionMeasure::default();
        measure.reload(&host);
        assert_eq!(measure.update(&host), 0.0);
    }
}
