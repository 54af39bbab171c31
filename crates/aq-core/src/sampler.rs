//! Repeated particulate reads with a consecutive-failure ceiling.

use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use log::{info, warn};

use crate::{observer::AttemptObserver, particles::ParticleReading, sensor::ParticulateSensor};

/// Largest batch a single cycle can collect.
pub const MAX_SAMPLES: usize = 16;

pub type SampleBatch = Vec<ParticleReading, MAX_SAMPLES>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SamplerFault {
    /// More consecutive reads failed than the threshold allows.
    Exhausted { consecutive_failures: u8, collected: u8 },
}

/// Drives `n` sequential reads from a particulate sensor.
pub struct Sampler<'a, S, D> {
    sensor: &'a mut S,
    delay: &'a mut D,
    settle_ms: u32,
}

impl<'a, S, D> Sampler<'a, S, D>
where
    S: ParticulateSensor,
    D: DelayNs,
{
    pub fn new(sensor: &'a mut S, delay: &'a mut D, settle_ms: u32) -> Self {
        Self {
            sensor,
            delay,
            settle_ms,
        }
    }

    /// Takes up to `n` readings. Requests above [`MAX_SAMPLES`] are clamped.
    ///
    /// A failed read drops that sample and counts towards the consecutive
    /// failure counter, which any successful read resets. The batch is
    /// abandoned as soon as the counter exceeds `max_consecutive_failures`.
    pub async fn sample<O: AttemptObserver>(
        &mut self,
        n: u8,
        max_consecutive_failures: u8,
        observer: &mut O,
    ) -> Result<SampleBatch, SamplerFault> {
        if n as usize > MAX_SAMPLES {
            warn!(
                "{} samples requested, batch holds {}; clamping",
                n, MAX_SAMPLES
            );
        }
        let attempts = (n as usize).min(MAX_SAMPLES) as u8;
        let mut batch = SampleBatch::new();
        let mut consecutive_failures = 0u8;

        info!("taking {} samples from particulate sensor", attempts);
        for attempt in 1..=attempts {
            observer.attempt_started(attempt);
            self.delay.delay_ms(self.settle_ms).await;
            observer.attempt_ready(attempt);

            match self.sensor.read().await {
                Ok(reading) => {
                    consecutive_failures = 0;
                    // Capacity is bounded by `attempts`.
                    let _ = batch.push(reading);
                    observer.attempt_finished(attempt, true);
                    self.delay.delay_ms(self.settle_ms).await;
                }
                Err(err) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    observer.attempt_finished(attempt, false);
                    warn!(
                        "particulate read {}/{} failed ({} in a row): {:?}",
                        attempt, attempts, consecutive_failures, err
                    );
                    if consecutive_failures > max_consecutive_failures {
                        return Err(SamplerFault::Exhausted {
                            consecutive_failures,
                            collected: batch.len() as u8,
                        });
                    }
                }
            }
        }

        info!("collected {}/{} particulate samples", batch.len(), attempts);
        Ok(batch)
    }
}
