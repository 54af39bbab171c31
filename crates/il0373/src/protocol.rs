//! Command set and wire encoding for the IL0373 e-paper controller.

/// Source lines of the 2.9" panel (native width).
pub const NATIVE_WIDTH: usize = 128;
/// Gate lines of the 2.9" panel (native height).
pub const NATIVE_HEIGHT: usize = 296;
/// Bytes per native row.
pub const ROW_BYTES: usize = NATIVE_WIDTH / 8;
/// Bytes in one full frame.
pub const BUFFER_SIZE: usize = ROW_BYTES * NATIVE_HEIGHT;

pub mod command {
    pub const PANEL_SETTING: u8 = 0x00;
    pub const POWER_SETTING: u8 = 0x01;
    pub const POWER_OFF: u8 = 0x02;
    pub const POWER_ON: u8 = 0x04;
    pub const BOOSTER_SOFT_START: u8 = 0x06;
    pub const DEEP_SLEEP: u8 = 0x07;
    pub const DATA_START_OLD: u8 = 0x10;
    pub const DISPLAY_REFRESH: u8 = 0x12;
    pub const DATA_START_NEW: u8 = 0x13;
    pub const PLL_CONTROL: u8 = 0x30;
    pub const VCOM_DATA_INTERVAL: u8 = 0x50;
    pub const RESOLUTION: u8 = 0x61;
}

/// Check code that must follow `DEEP_SLEEP`.
pub const DEEP_SLEEP_CHECK: u8 = 0xA5;

/// One command with its parameter bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Step {
    pub command: u8,
    pub data: &'static [u8],
    /// Whether BUSY must be released before the next step.
    pub wait_busy: bool,
}

const fn step(command: u8, data: &'static [u8]) -> Step {
    Step {
        command,
        data,
        wait_busy: false,
    }
}

/// Panel setting: black/white mode, LUT from OTP, scan up, shift right,
/// booster on, no soft reset.
pub const PANEL_SETTING_BW: u8 = 0x1F;

const RESOLUTION_DATA: [u8; 3] = [
    NATIVE_WIDTH as u8,
    (NATIVE_HEIGHT >> 8) as u8,
    (NATIVE_HEIGHT & 0xFF) as u8,
];

/// Power-up sequence for monochrome refreshes.
pub const INIT_SEQUENCE: [Step; 7] = [
    step(command::POWER_SETTING, &[0x03, 0x00, 0x2B, 0x2B, 0x09]),
    step(command::BOOSTER_SOFT_START, &[0x17, 0x17, 0x17]),
    Step {
        command: command::POWER_ON,
        data: &[],
        wait_busy: true,
    },
    step(command::PANEL_SETTING, &[PANEL_SETTING_BW]),
    step(command::VCOM_DATA_INTERVAL, &[0x97]),
    step(command::PLL_CONTROL, &[0x29]),
    step(command::RESOLUTION, &RESOLUTION_DATA),
];

/// Power-down sequence: floating border, power off, deep sleep.
pub const SLEEP_SEQUENCE: [Step; 3] = [
    step(command::VCOM_DATA_INTERVAL, &[0xF7]),
    Step {
        command: command::POWER_OFF,
        data: &[],
        wait_busy: true,
    },
    step(command::DEEP_SLEEP, &[DEEP_SLEEP_CHECK]),
];

/// Converts a framebuffer byte (bit set = ink) to the controller's polarity
/// (bit set = white).
#[inline]
pub const fn encode_byte(ink: u8) -> u8 {
    !ink
}
