use aq_core::{particles::EnvironmentReading, sensor::EnvironmentSensor};
use embedded_hal_async::i2c::I2c;
use sht4x::{Precision, Sht4xAsync};

use super::SenseError;

/// SHT40 temperature and humidity sensor.
pub struct Sht40<I> {
    sensor: Sht4xAsync<I, embassy_time::Delay>,
}

impl<I: I2c> Sht40<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            sensor: Sht4xAsync::new(i2c),
        }
    }
}

impl<I: I2c> EnvironmentSensor for Sht40<I> {
    type Error = SenseError<I::Error>;

    async fn read(&mut self) -> Result<EnvironmentReading, Self::Error> {
        let measurement = self
            .sensor
            .measure(Precision::High, &mut embassy_time::Delay)
            .await
            .map_err(|err| match err {
                sht4x::Error::I2c(err) => SenseError::I2c(err),
                _ => SenseError::Measurement,
            })?;

        Ok(EnvironmentReading {
            temperature_c: measurement.temperature_celsius().to_num::<f32>(),
            relative_humidity: measurement.humidity_percent().to_num::<f32>(),
        })
    }
}
