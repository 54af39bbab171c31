use esp_hal::{
    Blocking,
    analog::adc::{Adc, AdcChannel, AdcConfig, AdcPin, Attenuation},
    gpio::{AnalogPin, Input},
    peripherals::ADC1,
};
use log::warn;

/// ADC full-scale input at 11 dB attenuation, in millivolts.
const ADC_FULL_SCALE_MV: f32 = 3_100.0;
const ADC_MAX_RAW: f32 = 4_095.0;
/// The battery sense line sits behind a 1:2 divider.
const BATTERY_DIVIDER: f32 = 2.0;

/// Analog and digital sense lines: light sensor, battery divider and VBUS
/// detect.
pub struct SenseLines<'d, L, B> {
    adc: Adc<'d, ADC1<'d>, Blocking>,
    light: AdcPin<L, ADC1<'d>>,
    battery: AdcPin<B, ADC1<'d>>,
    vbus: Input<'d>,
}

impl<'d, L, B> SenseLines<'d, L, B>
where
    L: AdcChannel + AnalogPin,
    B: AdcChannel + AnalogPin,
{
    pub fn new(adc1: ADC1<'d>, light: L, battery: B, vbus: Input<'d>) -> Self {
        let mut config = AdcConfig::new();
        let light = config.enable_pin(light, Attenuation::_11dB);
        let battery = config.enable_pin(battery, Attenuation::_11dB);
        Self {
            adc: Adc::new(adc1, config),
            light,
            battery,
            vbus,
        }
    }

    /// Light level widened from 12 to 16 bits.
    pub fn ambient_light(&mut self) -> u16 {
        match nb::block!(self.adc.read_oneshot(&mut self.light)) {
            Ok(raw) => raw << 4,
            Err(()) => {
                warn!("light sensor read failed");
                0
            }
        }
    }

    pub fn battery_voltage(&mut self) -> f32 {
        match nb::block!(self.adc.read_oneshot(&mut self.battery)) {
            Ok(raw) => f32::from(raw) / ADC_MAX_RAW * ADC_FULL_SCALE_MV * BATTERY_DIVIDER / 1_000.0,
            Err(()) => {
                warn!("battery sense read failed");
                0.0
            }
        }
    }

    pub fn external_power(&self) -> bool {
        self.vbus.is_high()
    }
}
