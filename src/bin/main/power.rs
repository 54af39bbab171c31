use core::time::Duration;

use aq_core::sleep::SleepPlan;
use esp_hal::{
    gpio::RtcPin,
    peripherals::{GPIO6, GPIO14, LPWR},
    rtc_cntl::{
        Rtc,
        sleep::{Ext1WakeupSource, TimerWakeupSource, WakeSource, WakeupLevel},
    },
};
use heapless::Vec;
use log::info;

pub(super) fn enter_deep_sleep(plan: SleepPlan) -> ! {
    // Latch the PM sensor SET line low so the fan stays off through deep sleep.
    let sensor_set = unsafe { GPIO6::steal() };
    sensor_set.rtcio_pad_hold(true);

    let mut rtc = Rtc::new(unsafe { LPWR::steal() });

    let timer = plan
        .timer_secs()
        .map(|secs| TimerWakeupSource::new(Duration::from_secs(u64::from(secs))));

    // The button is wired to GPIO14 whatever pin the plan names.
    let mut button = unsafe { GPIO14::steal() };
    let mut wake_pins: [&mut dyn RtcPin; 1] = [&mut button];
    let ext1 = Ext1WakeupSource::new(&mut wake_pins, WakeupLevel::Low);

    let mut sources: Vec<&dyn WakeSource, 2> = Vec::new();
    if let Some(timer) = &timer {
        let _ = sources.push(timer);
    }
    if plan.wake_pin().is_some() {
        let _ = sources.push(&ext1);
    }

    info!("entering deep sleep: {:?}", plan);
    rtc.sleep_deep(&sources);
}
