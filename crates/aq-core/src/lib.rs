#![cfg_attr(not(test), no_std)]

//! Hardware-independent core of the air-quality station: backoff state kept
//! across deep sleep, wake resolution, sampling, aggregation, uplink retries
//! and the lifecycle state machine that ties them together.

pub mod aggregate;
pub mod backoff;
pub mod board;
pub mod config;
pub mod lifecycle;
pub mod observer;
pub mod particles;
pub mod render;
pub mod sampler;
pub mod sensor;
pub mod sleep;
pub mod store;
pub mod uplink;
pub mod wake;

#[cfg(test)]
pub(crate) mod test_support {
    use embedded_hal_async::delay::DelayNs;

    /// Delay that returns immediately and keeps a running total.
    #[derive(Debug, Default)]
    pub struct InstantDelay {
        pub total_ms: u64,
    }

    impl DelayNs for InstantDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.total_ms += u64::from(ns / 1_000_000);
        }

        async fn delay_us(&mut self, us: u32) {
            self.total_ms += u64::from(us / 1_000);
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.total_ms += u64::from(ms);
        }
    }
}
