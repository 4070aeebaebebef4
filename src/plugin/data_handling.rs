//! Update counter whose value can survive skin reloads through the host's
//! settings store.
//!
//! `StartingValue` seeds the counter; when absent (or `-1`) the last stored
//! count is used. With `StoreData=1` the count is written back on teardown.
//! Several measures with `StoreData=1` overwrite each other; the last one
//! torn down wins.

use crate::host::MeasureHost;
use crate::plugin::Measure;

pub const SETTINGS_SECTION: &str = "DataHandling";
pub const SETTINGS_KEY: &str = "StoredCount";

#[derive(Debug, Default)]
pub struct CounterMeasure {
    counter: i32,
    store_data: bool,
}

impl Measure for CounterMeasure {
    fn reload(&mut self, host: &dyn MeasureHost) {
        let start = host.read_int("StartingValue", -1);
        self.counter = if start == -1 {
            host.read_setting(SETTINGS_SECTION, SETTINGS_KEY)
                .and_then(|stored| stored.trim().parse().ok())
                .unwrap_or(0)
        } else {
            start
        };

        self.store_data = host.read_int("StoreData", 0) == 1;
    }

    fn update(&mut self, _host: &dyn MeasureHost) -> f64 {
        self.counter = self.counter.wrapping_add(1);
        f64::from(self.counter)
    }

    fn finalize(&mut self, host: &dyn MeasureHost) {
        if self.store_data {
            host.write_setting(SETTINGS_SECTION, SETTINGS_KEY, &self.counter.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ScopeToken;
    use crate::plugin::testing::FakeHost;

    fn host() -> FakeHost {
        FakeHost::new(ScopeToken::new(1), "mCount")
    }

    #[test]
    fn starting_value_wins_over_store() {
        let host = host()
            .with("StartingValue", "10")
            .with_setting(SETTINGS_SECTION, SETTINGS_KEY, "99");
        let mut measure = CounterMeasure::default();
        measure.reload(&host);

        assert_eq!(measure.update(&host), 11.0);
        assert_eq!(measure.update(&host), 12.0);
    }

    #[test]
    fn resumes_from_stored_count() {
        let host = host().with_setting(SETTINGS_SECTION, SETTINGS_KEY, "41");
        let mut measure = CounterMeasure::default();
        measure.reload(&host);

        assert_eq!(measure.update(&host), 42.0);
    }

    #[test]
    fn garbage_in_store_starts_at_zero() {
        let host = host().with_setting(SETTINGS_SECTION, SETTINGS_KEY, "lots");
        let mut measure = CounterMeasure::default();
        measure.reload(&host);

        assert_eq!(measure.update(&host), 1.0);
    }

    #[test]
    fn store_data_persists_on_finalize() {
        let host = host().with("StoreData", "1");
        let mut measure = CounterMeasure::default();
        measure.reload(&host);
        measure.update(&host);
        measure.update(&host);
        measure.finalize(&host);

        assert_eq!(host.setting(SETTINGS_SECTION, SETTINGS_KEY).as_deref(), Some("2"));
    }

    #[test]
    fn without_store_data_nothing_is_written() {
        let host = host().with("StartingValue", "3");
        let mut measure = CounterMeasure::default();
        measure.reload(&host);
        measure.update(&host);
        measure.finalize(&host);

        assert!(host.setting(SETTINGS_SECTION, SETTINGS_KEY).is_none());
    }
}
