use esp_hal::{delay::Delay, gpio::Output};

/// Piezo speaker driven by toggling a GPIO, gated by the amplifier enable
/// line.
pub struct Speaker<'d> {
    tone: Output<'d>,
    enable: Output<'d>,
    delay: Delay,
}

impl<'d> Speaker<'d> {
    pub fn new(tone: Output<'d>, enable: Output<'d>) -> Self {
        Self {
            tone,
            enable,
            delay: Delay::new(),
        }
    }

    /// Square wave at `freq_hz`; blocks for `duration_ms`.
    pub fn play(&mut self, freq_hz: u32, duration_ms: u32) {
        if freq_hz == 0 {
            self.delay.delay_millis(duration_ms);
            return;
        }

        let half_period_us = (500_000 / freq_hz).max(1);
        let cycles = u64::from(freq_hz) * u64::from(duration_ms) / 1_000;

        self.enable.set_high();
        for _ in 0..cycles {
            self.tone.set_high();
            self.delay.delay_micros(half_period_us);
            self.tone.set_low();
            self.delay.delay_micros(half_period_us);
        }
        self.enable.set_low();
    }

    pub fn disable(&mut self) {
        self.tone.set_low();
        self.enable.set_low();
    }
}
