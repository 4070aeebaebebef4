//! Runs the `OnTimer` command every `Timer` seconds.
//!
//! The timer starts when the measure is created, so reloads (and dynamic
//! option changes) do not restart the countdown.

use std::time::Instant;

use crate::host::MeasureHost;
use crate::plugin::Measure;

#[derive(Debug)]
pub struct TimerMeasure {
    command: String,
    interval_secs: i64,
    started: Instant,
}

impl TimerMeasure {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started: Instant) -> Self {
        Self {
            command: String::new(),
            interval_secs: 1,
            started,
        }
    }
}

impl Default for TimerMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl Measure for TimerMeasure {
    fn reload(&mut self, host: &dyn MeasureHost) {
        self.interval_secs = i64::from(host.read_int("Timer", 1));
        self.command = host.read_string("OnTimer", "");
    }

    /// Seconds left until the next run; zero or negative once due.
    fn update(&mut self, host: &dyn MeasureHost) -> f64 {
        let elapsed = i64::try_from(self.started.elapsed().as_secs()).unwrap_or(i64::MAX);

        if elapsed >= self.interval_secs {
            if self.command.is_empty() {
                tracing::debug!(measure = %host.measure_name(), "timer fired without OnTimer");
            } else {
                host.execute(&self.command);
            }
            self.started = Instant::now();
        }

        (self.interval_secs.saturating_sub(elapsed)) as f64
    }
}
