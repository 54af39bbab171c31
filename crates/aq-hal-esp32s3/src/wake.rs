//! Wake cause snapshot taken at boot.

use aq_core::wake::{PinId, WakeSignal, WakeSource};
use esp_hal::{
    peripherals::LPWR,
    rtc_cntl::{SleepSource, wakeup_cause},
};
use log::debug;

/// Wake cause registers latched before anything else touches the RTC block.
#[derive(Clone, Copy, Debug)]
pub struct BootWake {
    cause: SleepSource,
    ext1_mask: u32,
}

impl BootWake {
    pub fn capture() -> Self {
        let cause = wakeup_cause();
        let ext1_mask = LPWR::regs()
            .ext_wakeup1_status()
            .read()
            .ext_wakeup1_status()
            .bits();
        debug!("wake cause={:?} ext1_mask={:#x}", cause, ext1_mask);
        Self { cause, ext1_mask }
    }

    pub fn cause(&self) -> SleepSource {
        self.cause
    }
}

impl WakeSource for BootWake {
    fn wake_signal(&mut self) -> WakeSignal {
        match self.cause {
            SleepSource::Undefined => WakeSignal::None,
            SleepSource::Timer => WakeSignal::Timer,
            // EXT1 reports which RTC pad fired; the lowest set bit wins.
            SleepSource::Ext1 if self.ext1_mask != 0 => {
                WakeSignal::Pin(Some(PinId(self.ext1_mask.trailing_zeros() as u8)))
            }
            SleepSource::Ext0 | SleepSource::Ext1 | SleepSource::Gpio => WakeSignal::Pin(None),
            _ => WakeSignal::Other,
        }
    }
}
