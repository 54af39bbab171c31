#![cfg_attr(not(test), no_std)]

//! IL0373 (2.9" 296x128 e-paper) driver primitives.

mod framebuffer;
pub mod protocol;

#[cfg(feature = "embedded-graphics")]
mod graphics;

pub use framebuffer::{FrameBuffer, Rotation};

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use protocol::{Step, command};

/// Driver configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Expected SPI clock in Hz (documented for board glue).
    pub spi_hz: u32,
    /// How long RST is held low during a hardware reset.
    pub reset_pulse_ms: u32,
    /// Upper bound on a single BUSY wait. A full refresh takes a few seconds.
    pub busy_timeout_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spi_hz: 1_000_000,
            reset_pulse_ms: 10,
            busy_timeout_ms: 15_000,
        }
    }
}

/// Driver errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error<SpiErr, PinErr> {
    /// SPI transaction failed.
    Spi(SpiErr),
    /// DC, RST or BUSY pin operation failed.
    Pin(PinErr),
    /// BUSY stayed asserted past `Config::busy_timeout_ms`.
    BusyTimeout,
}

pub type DriverResult<SpiErr, PinErr> = Result<(), Error<SpiErr, PinErr>>;

/// IL0373 driver over a 4-wire SPI bus with DC, RST and BUSY lines.
#[derive(Debug)]
pub struct Il0373<SPI, DC, RST, BUSY> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
    config: Config,
}

impl<SPI, DC, RST, BUSY> Il0373<SPI, DC, RST, BUSY>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin<Error = DC::Error>,
    BUSY: InputPin<Error = DC::Error>,
{
    pub fn new(spi: SPI, dc: DC, rst: RST, busy: BUSY, config: Config) -> Self {
        Self {
            spi,
            dc,
            rst,
            busy,
            config,
        }
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Releases owned bus and pins.
    pub fn release(self) -> (SPI, DC, RST, BUSY) {
        (self.spi, self.dc, self.rst, self.busy)
    }

    /// Pulses RST and runs the power-up sequence.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> DriverResult<SPI::Error, DC::Error> {
        self.rst.set_low().map_err(Error::Pin)?;
        delay.delay_ms(self.config.reset_pulse_ms);
        self.rst.set_high().map_err(Error::Pin)?;
        delay.delay_ms(self.config.reset_pulse_ms);

        self.run_sequence(&protocol::INIT_SEQUENCE, delay)
    }

    /// Streams a full frame into both controller buffers.
    pub fn write_frame(&mut self, frame: &FrameBuffer) -> DriverResult<SPI::Error, DC::Error> {
        let mut row = [0u8; protocol::ROW_BYTES];
        for cmd in [command::DATA_START_OLD, command::DATA_START_NEW] {
            self.command(cmd)?;
            self.dc.set_high().map_err(Error::Pin)?;
            for chunk in frame.bytes().chunks_exact(protocol::ROW_BYTES) {
                for (dst, src) in row.iter_mut().zip(chunk) {
                    *dst = protocol::encode_byte(*src);
                }
                self.spi.write(&row).map_err(Error::Spi)?;
            }
        }
        Ok(())
    }

    /// Starts a full refresh and blocks until the panel is idle again.
    pub fn refresh<D: DelayNs>(&mut self, delay: &mut D) -> DriverResult<SPI::Error, DC::Error> {
        self.command(command::DISPLAY_REFRESH)?;
        // BUSY is not asserted immediately after the command.
        delay.delay_ms(100);
        self.wait_idle(delay)
    }

    /// Powers the panel down. The image stays on screen; `init` wakes it.
    pub fn sleep<D: DelayNs>(&mut self, delay: &mut D) -> DriverResult<SPI::Error, DC::Error> {
        self.run_sequence(&protocol::SLEEP_SEQUENCE, delay)
    }

    /// Convenience: init, write, refresh and sleep.
    pub fn show<D: DelayNs>(
        &mut self,
        frame: &FrameBuffer,
        delay: &mut D,
    ) -> DriverResult<SPI::Error, DC::Error> {
        self.init(delay)?;
        self.write_frame(frame)?;
        self.refresh(delay)?;
        self.sleep(delay)
    }

    fn run_sequence<D: DelayNs>(
        &mut self,
        steps: &[Step],
        delay: &mut D,
    ) -> DriverResult<SPI::Error, DC::Error> {
        for step in steps {
            self.command(step.command)?;
            if !step.data.is_empty() {
                self.data(step.data)?;
            }
            if step.wait_busy {
                self.wait_idle(delay)?;
            }
        }
        Ok(())
    }

    fn command(&mut self, cmd: u8) -> DriverResult<SPI::Error, DC::Error> {
        self.dc.set_low().map_err(Error::Pin)?;
        self.spi.write(&[cmd]).map_err(Error::Spi)
    }

    fn data(&mut self, data: &[u8]) -> DriverResult<SPI::Error, DC::Error> {
        self.dc.set_high().map_err(Error::Pin)?;
        self.spi.write(data).map_err(Error::Spi)
    }

    /// BUSY is active low on this controller.
    fn wait_idle<D: DelayNs>(&mut self, delay: &mut D) -> DriverResult<SPI::Error, DC::Error> {
        for _ in 0..self.config.busy_timeout_ms {
            if self.busy.is_high().map_err(Error::Pin)? {
                return Ok(());
            }
            delay.delay_ms(1);
        }
        Err(Error::BusyTimeout)
    }
}
