//! Sensor read contracts. Errors from both sensors are transient and retry-safe.

use core::future::Future;

use crate::particles::{EnvironmentReading, ParticleReading};

pub trait ParticulateSensor {
    type Error: core::fmt::Debug;

    fn read(&mut self) -> impl Future<Output = Result<ParticleReading, Self::Error>>;
}

/// Temperature (degC) and relative humidity (%) sensor.
pub trait EnvironmentSensor {
    type Error: core::fmt::Debug;

    fn read(&mut self) -> impl Future<Output = Result<EnvironmentReading, Self::Error>>;
}
