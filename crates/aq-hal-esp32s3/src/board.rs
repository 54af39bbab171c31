//! The station board: pixels, speaker, sense lines, PM sensor SET line and
//! e-paper panel behind `aq_core::board::Board`.

use aq_core::{
    board::{Board, Rgb},
    render::Screen,
};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::{
    Blocking,
    analog::adc::AdcChannel,
    delay::Delay,
    gpio::{AnalogPin, Input, Level, Output},
    spi::master::Spi,
};
use log::{debug, warn};
use smart_leds::{RGB8, SmartLedsWrite};

use crate::platform::{
    display::EpaperDisplay, pixels::StatusPixels, sense::SenseLines, speaker::Speaker,
};

pub type EpaperSpi<'d> = ExclusiveDevice<Spi<'d, Blocking>, Output<'d>, Delay>;
pub type StationDisplay<'d> = EpaperDisplay<EpaperSpi<'d>, Output<'d>, Output<'d>, Input<'d>>;

pub struct StationBoard<'d, W, L, B> {
    pixels: StatusPixels<W>,
    speaker: Speaker<'d>,
    sense: SenseLines<'d, L, B>,
    /// PMSA003I SET line: high runs the fan and laser, low is standby.
    sensor_set: Output<'d>,
    display: StationDisplay<'d>,
}

impl<'d, W, L, B> StationBoard<'d, W, L, B>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: core::fmt::Debug,
    L: AdcChannel + AnalogPin,
    B: AdcChannel + AnalogPin,
{
    pub fn new(
        pixels: StatusPixels<W>,
        speaker: Speaker<'d>,
        sense: SenseLines<'d, L, B>,
        sensor_set: Output<'d>,
        display: StationDisplay<'d>,
    ) -> Self {
        Self {
            pixels,
            speaker,
            sense,
            sensor_set,
            display,
        }
    }
}

impl<W, L, B> Board for StationBoard<'_, W, L, B>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: core::fmt::Debug,
    L: AdcChannel + AnalogPin,
    B: AdcChannel + AnalogPin,
{
    fn set_pixel(&mut self, index: usize, color: Rgb) {
        self.pixels.set(index, color);
    }

    fn fill_pixels(&mut self, color: Rgb, brightness: f32) {
        self.pixels.fill(color.scaled(brightness));
    }

    fn pixels_off(&mut self) {
        self.pixels.off();
    }

    fn play_tone(&mut self, freq_hz: u32, duration_ms: u32) {
        self.speaker.play(freq_hz, duration_ms);
    }

    fn ambient_light(&mut self) -> u16 {
        self.sense.ambient_light()
    }

    fn battery_voltage(&mut self) -> f32 {
        self.sense.battery_voltage()
    }

    fn external_power(&mut self) -> bool {
        self.sense.external_power()
    }

    fn set_sensor_power(&mut self, on: bool) {
        debug!("pm sensor {}", if on { "active" } else { "standby" });
        self.sensor_set.set_level(Level::from(on));
    }

    fn show(&mut self, screen: &Screen) {
        if let Err(err) = self.display.show(screen) {
            warn!("display refresh failed: {:?}", err);
        }
    }

    fn power_down(&mut self) {
        self.pixels.off();
        self.speaker.disable();
    }
}
