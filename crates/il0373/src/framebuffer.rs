//! In-memory framebuffer for the IL0373 panel.

use crate::protocol::{BUFFER_SIZE, NATIVE_HEIGHT, NATIVE_WIDTH, ROW_BYTES};

/// How logical coordinates map onto the native panel.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Rotation {
    /// 128 wide, 296 tall, native orientation.
    Portrait,
    /// 296 wide, 128 tall; the panel is turned clockwise.
    #[default]
    Landscape,
}

/// 1bpp framebuffer in native row order.
///
/// A set bit is an inked (black) pixel; bit 7 is the leftmost pixel of the
/// byte.
#[derive(Clone)]
pub struct FrameBuffer {
    bytes: [u8; BUFFER_SIZE],
    rotation: Rotation,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(Rotation::default())
    }
}

/// 4x4 ordered dither thresholds, scaled to 0..=255.
const BAYER_4X4: [[u8; 4]; 4] = [
    [0, 128, 32, 160],
    [192, 64, 224, 96],
    [48, 176, 16, 144],
    [240, 112, 208, 80],
];

impl FrameBuffer {
    /// Creates a blank (white) framebuffer.
    pub const fn new(rotation: Rotation) -> Self {
        Self {
            bytes: [0u8; BUFFER_SIZE],
            rotation,
        }
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Logical width for the current rotation.
    pub fn width(&self) -> usize {
        match self.rotation {
            Rotation::Portrait => NATIVE_WIDTH,
            Rotation::Landscape => NATIVE_HEIGHT,
        }
    }

    /// Logical height for the current rotation.
    pub fn height(&self) -> usize {
        match self.rotation {
            Rotation::Portrait => NATIVE_HEIGHT,
            Rotation::Landscape => NATIVE_WIDTH,
        }
    }

    pub fn bytes(&self) -> &[u8; BUFFER_SIZE] {
        &self.bytes
    }

    /// Clears to white (`ink = false`) or black (`ink = true`).
    pub fn clear(&mut self, ink: bool) {
        self.bytes.fill(if ink { 0xFF } else { 0x00 });
    }

    /// Fills with an ordered dither of `shade` (0 = black, 255 = white).
    pub fn fill_shade(&mut self, shade: u8) {
        for y in 0..self.height() {
            for x in 0..self.width() {
                let ink = shade <= BAYER_4X4[y % 4][x % 4];
                let _ = self.set_pixel(x, y, ink);
            }
        }
    }

    fn native_index(&self, x: usize, y: usize) -> Option<(usize, u8)> {
        if x >= self.width() || y >= self.height() {
            return None;
        }

        let (col, row) = match self.rotation {
            Rotation::Portrait => (x, y),
            Rotation::Landscape => (NATIVE_WIDTH - 1 - y, x),
        };
        Some((row * ROW_BYTES + col / 8, 1u8 << (7 - (col % 8))))
    }

    /// Sets a pixel in logical coordinates.
    ///
    /// Returns `false` when the pixel is out of bounds.
    pub fn set_pixel(&mut self, x: usize, y: usize, ink: bool) -> bool {
        let Some((index, mask)) = self.native_index(x, y) else {
            return false;
        };

        if ink {
            self.bytes[index] |= mask;
        } else {
            self.bytes[index] &= !mask;
        }
        true
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<bool> {
        let (index, mask) = self.native_index(x, y)?;
        Some(self.bytes[index] & mask != 0)
    }
}
