//! Cloud feed uplink: network association and bounded-retry value pushes.

use core::{fmt::Write as _, future::Future};

use embedded_hal_async::delay::DelayNs;
use heapless::String;
use log::{debug, info, warn};

use crate::observer::AttemptObserver;

pub const FEED_KEY_CAPACITY: usize = 64;
pub const FEED_VALUE_CAPACITY: usize = 24;

pub type FeedKey = String<FEED_KEY_CAPACITY>;
pub type FeedValue = String<FEED_VALUE_CAPACITY>;

/// Auxiliary feeds pushed next to the particle fields.
pub const TEMPERATURE_FEED: &str = "temperature-c";
pub const HUMIDITY_FEED: &str = "relative-humidity";
pub const BATTERY_FEED: &str = "battery-voltage";

pub const PARTICLE_PRECISION: u8 = 2;
pub const ENVIRONMENT_PRECISION: u8 = 1;
pub const BATTERY_PRECISION: u8 = 2;

/// Network collaborator.
///
/// `connect` must be idempotent. A failed `push` leaves the link usable for
/// another attempt.
pub trait Uplink {
    type Error: core::fmt::Debug;

    fn connect(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    fn push(
        &mut self,
        feed_key: &str,
        value: f32,
        precision: u8,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Builds `<group>.<name>`. Returns `None` if the key does not fit.
pub fn feed_key(group: &str, name: &str) -> Option<FeedKey> {
    let mut key = FeedKey::new();
    write!(key, "{group}.{name}").ok()?;
    Some(key)
}

/// Formats `value` with `precision` decimals, the way feeds store it.
pub fn format_value(value: f32, precision: u8) -> Option<FeedValue> {
    let mut text = FeedValue::new();
    write!(text, "{:.*}", precision as usize, value).ok()?;
    Some(text)
}

/// Pushes single values with per-value retry.
pub struct UplinkPusher<'a, N, D> {
    uplink: &'a mut N,
    delay: &'a mut D,
    offline: bool,
    settle_ms: u32,
    retry_delay_ms: u32,
}

impl<'a, N, D> UplinkPusher<'a, N, D>
where
    N: Uplink,
    D: DelayNs,
{
    pub fn new(uplink: &'a mut N, delay: &'a mut D, offline: bool) -> Self {
        Self {
            uplink,
            delay,
            offline,
            settle_ms: 250,
            retry_delay_ms: 1_000,
        }
    }

    pub fn with_settle_ms(mut self, settle_ms: u32) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u32) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// Returns `true` once the value is delivered, `false` after
    /// `max_attempts` failed attempts. In offline mode nothing is sent and the
    /// push counts as delivered.
    pub async fn push<O: AttemptObserver>(
        &mut self,
        feed_key: &str,
        value: f32,
        precision: u8,
        max_attempts: u8,
        observer: &mut O,
    ) -> bool {
        if self.offline {
            debug!("offline: not pushing {} = {:.*}", feed_key, precision as usize, value);
            return true;
        }

        info!("push {} to feed", feed_key);
        for attempt in 1..=max_attempts {
            observer.attempt_started(attempt);
            self.delay.delay_ms(self.settle_ms).await;
            observer.attempt_ready(attempt);

            match self.uplink.push(feed_key, value, precision).await {
                Ok(()) => {
                    observer.attempt_finished(attempt, true);
                    return true;
                }
                Err(err) => {
                    observer.attempt_finished(attempt, false);
                    warn!(
                        "push {} attempt {}/{} failed: {:?}",
                        feed_key, attempt, max_attempts, err
                    );
                    self.delay.delay_ms(self.retry_delay_ms).await;
                }
            }
        }

        warn!("giving up on {} after {} attempts", feed_key, max_attempts);
        false
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::{observer::NoopObserver, test_support::InstantDelay};

    struct FlakyUplink {
        failures_left: u8,
        pushes: u8,
    }

    impl FlakyUplink {
        const fn failing(failures: u8) -> Self {
            Self {
                failures_left: failures,
                pushes: 0,
            }
        }
    }

    impl Uplink for FlakyUplink {
        type Error = &'static str;

        async fn connect(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn push(&mut self, _key: &str, _value: f32, _precision: u8) -> Result<(), Self::Error> {
            self.pushes += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                Err("http 503")
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn third_attempt_delivers() {
        let mut uplink = FlakyUplink::failing(2);
        let mut delay = InstantDelay::default();
        let mut pusher = UplinkPusher::new(&mut uplink, &mut delay, false);

        assert!(block_on(pusher.push("g.pm10-standard", 7.0, 2, 3, &mut NoopObserver)));
        assert_eq!(uplink.pushes, 3);
    }

    #[test]
    fn persistent_failure_stops_after_max_attempts() {
        let mut uplink = FlakyUplink::failing(u8::MAX);
        let mut delay = InstantDelay::default();
        let mut pusher = UplinkPusher::new(&mut uplink, &mut delay, false);

        assert!(!block_on(pusher.push("g.pm10-standard", 7.0, 2, 3, &mut NoopObserver)));
        assert_eq!(uplink.pushes, 3);
        assert_eq!(delay.total_ms, 3 * (250 + 1_000));
    }

    #[test]
    fn offline_mode_skips_the_network() {
        let mut uplink = FlakyUplink::failing(u8::MAX);
        let mut delay = InstantDelay::default();
        let mut pusher = UplinkPusher::new(&mut uplink, &mut delay, true);

        assert!(block_on(pusher.push("g.pm10-standard", 7.0, 2, 3, &mut NoopObserver)));
        assert_eq!(uplink.pushes, 0);
    }

    #[test]
    fn keys_and_values_are_formatted_for_feeds() {
        assert_eq!(
            feed_key("air-quality-office", "pm25-env").as_deref(),
            Some("air-quality-office.pm25-env")
        );
        assert_eq!(format_value(1.23456, 2).as_deref(), Some("1.23"));
        assert_eq!(format_value(21.27, 1).as_deref(), Some("21.3"));
        assert_eq!(format_value(5.5, 0).as_deref(), Some("6"));
    }
}
