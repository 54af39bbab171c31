use aq_core::render::Screen;
use embedded_hal::{
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};
use esp_hal::delay::Delay;
use il0373::{FrameBuffer, Il0373, Rotation};

use crate::render::{FrameRenderer, ReadingsRenderer};

pub type DisplayError<SpiErr, PinErr> = il0373::Error<SpiErr, PinErr>;

/// E-paper panel with its framebuffer and renderer.
///
/// Every `show` is a full refresh followed by panel deep sleep, so the
/// image survives the board's own deep sleep.
pub struct EpaperDisplay<SPI, DC, RST, BUSY> {
    panel: Il0373<SPI, DC, RST, BUSY>,
    frame: FrameBuffer,
    renderer: ReadingsRenderer,
    delay: Delay,
}

impl<SPI, DC, RST, BUSY> EpaperDisplay<SPI, DC, RST, BUSY>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin<Error = DC::Error>,
    BUSY: InputPin<Error = DC::Error>,
{
    pub fn new(panel: Il0373<SPI, DC, RST, BUSY>) -> Self {
        Self {
            panel,
            frame: FrameBuffer::new(Rotation::Landscape),
            renderer: ReadingsRenderer,
            delay: Delay::new(),
        }
    }

    pub fn show(&mut self, screen: &Screen) -> Result<(), DisplayError<SPI::Error, DC::Error>> {
        self.renderer.render(screen, &mut self.frame);
        self.panel.show(&self.frame, &mut self.delay)
    }
}
