//! Build-time station configuration threaded through one wake cycle.

use crate::{backoff::BackoffPolicy, sleep::SleepPlan, wake::PinId};

/// Wake button used when the platform cannot name the pin that woke us.
pub const DEFAULT_WAKE_PIN: PinId = PinId(14);

/// Tunables for one lifecycle run.
///
/// Everything here is fixed when the firmware is built; the controller takes
/// a copy in its constructor instead of reading globals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StationConfig {
    /// Diagnostic mode: one sample, no uploads, particle table in the log.
    pub debug: bool,
    pub refresh_interval_secs: u32,
    pub network_retry_sleep_secs: u32,
    pub backoff: BackoffPolicy,
    pub low_battery_volts: f32,
    pub samples: u8,
    pub debug_samples: u8,
    pub max_consecutive_failures: u8,
    pub sample_settle_ms: u32,
    pub sensor_warmup_secs: u32,
    pub environment_attempts: u8,
    pub connect_attempts: u8,
    pub connect_retry_delay_ms: u32,
    pub upload_attempts: u8,
    pub upload_retry_delay_ms: u32,
    pub feed_group: &'static str,
    pub wake_pin: PinId,
}

impl StationConfig {
    pub const fn new() -> Self {
        Self {
            debug: false,
            refresh_interval_secs: 3 * 60,
            network_retry_sleep_secs: 5 * 60,
            backoff: BackoffPolicy::new(),
            low_battery_volts: 3.5,
            samples: 10,
            debug_samples: 1,
            max_consecutive_failures: 3,
            sample_settle_ms: 250,
            sensor_warmup_secs: 30,
            environment_attempts: 3,
            connect_attempts: 6,
            connect_retry_delay_ms: 3_000,
            upload_attempts: 3,
            upload_retry_delay_ms: 1_000,
            feed_group: "air-quality-office",
            wake_pin: DEFAULT_WAKE_PIN,
        }
    }

    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub const fn with_feed_group(mut self, feed_group: &'static str) -> Self {
        self.feed_group = feed_group;
        self
    }

    pub const fn with_wake_pin(mut self, wake_pin: PinId) -> Self {
        self.wake_pin = wake_pin;
        self
    }

    pub const fn with_sensor_warmup_secs(mut self, sensor_warmup_secs: u32) -> Self {
        self.sensor_warmup_secs = sensor_warmup_secs;
        self
    }

    /// Fixed-timer sleep used when the network or the platform itself cannot
    /// be brought up. Leaves the backoff record alone.
    pub const fn network_retry_plan(&self) -> SleepPlan {
        SleepPlan::NetworkRetry {
            after_secs: self.network_retry_sleep_secs,
        }
    }

    /// Reads to attempt per cycle, depending on diagnostic mode.
    pub const fn sample_count(&self) -> u8 {
        if self.debug {
            self.debug_samples
        } else {
            self.samples
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_mode_takes_a_single_sample() {
        assert_eq!(StationConfig::new().sample_count(), 10);
        assert_eq!(StationConfig::new().with_debug(true).sample_count(), 1);
    }

    #[test]
    fn network_retry_plan_wakes_on_the_retry_timer_only() {
        let plan = StationConfig::new().network_retry_plan();
        assert_eq!(plan, SleepPlan::NetworkRetry { after_secs: 300 });
        assert_eq!(plan.timer_secs(), Some(300));
        assert_eq!(plan.wake_pin(), None);
    }
}
