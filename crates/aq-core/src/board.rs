//! Fire-and-forget board peripherals and the indicator patterns built on them.

use crate::{observer::AttemptObserver, render::Screen};

/// Pixel that reports setup, connection and sampling progress.
pub const STATUS_PIXEL: usize = 0;
/// Pixel that reports upload progress.
pub const UPLOAD_PIXEL: usize = 1;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const OFF: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const RED: Self = Self::new(255, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const YELLOW: Self = Self::new(255, 255, 0);
    pub const MAGENTA: Self = Self::new(255, 0, 255);
    pub const CYAN: Self = Self::new(0, 255, 255);
    /// Board is up.
    pub const SETUP: Self = Self::new(0, 40, 0);
    pub const CONNECTING: Self = Self::new(70, 70, 10);
    pub const UPLOADED: Self = Self::new(0, 80, 0);

    /// Scales each channel by `brightness` in `0.0..=1.0`.
    pub fn scaled(self, brightness: f32) -> Self {
        let brightness = brightness.clamp(0.0, 1.0);
        let scale = |c: u8| (c as f32 * brightness + 0.5) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

/// Peripherals the station drives without needing feedback.
pub trait Board {
    fn set_pixel(&mut self, index: usize, color: Rgb);
    /// Lights every pixel with `color` at `brightness` in `0.0..=1.0`.
    fn fill_pixels(&mut self, color: Rgb, brightness: f32);
    fn pixels_off(&mut self);
    /// Blocks for `duration_ms` while the tone plays.
    fn play_tone(&mut self, freq_hz: u32, duration_ms: u32);
    /// Raw ambient light level, higher is brighter.
    fn ambient_light(&mut self) -> u16;
    fn battery_voltage(&mut self) -> f32;
    /// Whether the board is powered from USB or another external supply.
    fn external_power(&mut self) -> bool;
    /// Wakes the particulate sensor from standby, or puts it back.
    fn set_sensor_power(&mut self, on: bool);
    fn show(&mut self, screen: &Screen);
    /// Disables pixels and speaker ahead of deep sleep.
    fn power_down(&mut self);
}

const BRIGHTNESS_STEPS: [(u16, f32); 3] = [(700, 0.25), (1500, 0.5), (2000, 0.75)];

/// Pixel brightness for a pin wake at the given ambient light.
///
/// Cutoffs are checked in ascending order and the last one that matches wins,
/// so every level below 2000 lands on 0.75.
pub fn brightness_for_light(light: u16) -> f32 {
    let mut brightness = 1.0;
    for (cutoff, level) in BRIGHTNESS_STEPS {
        if light < cutoff {
            brightness = level;
        }
    }
    brightness
}

/// Status pixel pattern for sensor reads: yellow while reading, green on
/// success, red on failure.
pub struct SampleIndicator<'a, B>(pub &'a mut B);

impl<B: Board> AttemptObserver for SampleIndicator<'_, B> {
    fn attempt_started(&mut self, _attempt: u8) {
        self.0.set_pixel(STATUS_PIXEL, Rgb::YELLOW);
    }

    fn attempt_finished(&mut self, _attempt: u8, ok: bool) {
        self.0
            .set_pixel(STATUS_PIXEL, if ok { Rgb::GREEN } else { Rgb::RED });
    }
}

/// Upload pixel pattern: magenta while settling, cyan while the request is in
/// flight.
pub struct UploadIndicator<'a, B>(pub &'a mut B);

impl<B: Board> AttemptObserver for UploadIndicator<'_, B> {
    fn attempt_started(&mut self, _attempt: u8) {
        self.0.set_pixel(UPLOAD_PIXEL, Rgb::MAGENTA);
    }

    fn attempt_ready(&mut self, _attempt: u8) {
        self.0.set_pixel(UPLOAD_PIXEL, Rgb::CYAN);
    }

    fn attempt_finished(&mut self, _attempt: u8, _ok: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_table_last_match_wins() {
        assert_eq!(brightness_for_light(100), 0.75);
        assert_eq!(brightness_for_light(1000), 0.75);
        assert_eq!(brightness_for_light(1999), 0.75);
        assert_eq!(brightness_for_light(2000), 1.0);
        assert_eq!(brightness_for_light(u16::MAX), 1.0);
    }

    #[test]
    fn scaling_rounds_each_channel() {
        assert_eq!(Rgb::WHITE.scaled(0.75), Rgb::new(191, 191, 191));
        assert_eq!(Rgb::CONNECTING.scaled(0.0), Rgb::OFF);
        assert_eq!(Rgb::GREEN.scaled(2.0), Rgb::GREEN);
    }
}
