use aq_core::board::Rgb;
use log::warn;
use smart_leds::{RGB8, SmartLedsWrite};

/// NeoPixels along the top edge of the board.
pub const PIXEL_COUNT: usize = 4;

/// Pixel strip that keeps the last written colors and pushes the whole
/// strip on every change.
pub struct StatusPixels<W> {
    writer: W,
    colors: [RGB8; PIXEL_COUNT],
}

impl<W> StatusPixels<W>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: core::fmt::Debug,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            colors: [RGB8::default(); PIXEL_COUNT],
        }
    }

    pub fn set(&mut self, index: usize, color: Rgb) {
        let Some(slot) = self.colors.get_mut(index) else {
            warn!("pixel {} out of range", index);
            return;
        };
        *slot = rgb8(color);
        self.flush();
    }

    pub fn fill(&mut self, color: Rgb) {
        self.colors.fill(rgb8(color));
        self.flush();
    }

    pub fn off(&mut self) {
        self.fill(Rgb::OFF);
    }

    fn flush(&mut self) {
        if let Err(err) = self.writer.write(self.colors.iter().copied()) {
            warn!("pixel write failed: {:?}", err);
        }
    }
}

fn rgb8(color: Rgb) -> RGB8 {
    RGB8::new(color.r, color.g, color.b)
}
