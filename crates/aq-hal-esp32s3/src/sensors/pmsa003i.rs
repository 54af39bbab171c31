use aq_core::{
    particles::{FRAME_LEN, PM_SENSOR_I2C_ADDR, ParticleReading, parse_frame},
    sensor::ParticulateSensor,
};
use embedded_hal_async::i2c::I2c;

use super::SenseError;

/// PMSA003I particulate sensor on I2C.
///
/// Standby is driven by the board's SET line, not by this driver.
pub struct Pmsa003i<I> {
    i2c: I,
}

impl<I: I2c> Pmsa003i<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> ParticulateSensor for Pmsa003i<I> {
    type Error = SenseError<I::Error>;

    async fn read(&mut self) -> Result<ParticleReading, Self::Error> {
        let mut frame = [0u8; FRAME_LEN];
        self.i2c
            .read(PM_SENSOR_I2C_ADDR, &mut frame)
            .await
            .map_err(SenseError::I2c)?;
        parse_frame(&frame).map_err(SenseError::Frame)
    }
}
