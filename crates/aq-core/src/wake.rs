//! Why the station started this cycle.

use log::info;

/// GPIO number of a wake-capable pin.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PinId(pub u8);

/// Raw wake cause as reported by the platform at process start.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WakeSignal {
    /// No wake cause recorded: power-on or reset.
    None,
    Timer,
    /// Level wake on a pin. `None` when the platform cannot tell which one.
    Pin(Option<PinId>),
    /// Any other wake source (touch, ULP, UART...).
    Other,
}

/// Platform wake-cause signal.
///
/// Implementations must capture the cause before any peripheral setup claims
/// the wake pins.
pub trait WakeSource {
    fn wake_signal(&mut self) -> WakeSignal;
}

/// Discriminated reason for this cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WakeReason {
    ColdBoot,
    TimerAlarm,
    PinAlarm(PinId),
}

/// Resolves the wake reason. Missing information falls back to a cold boot,
/// and a pin wake without pin identity is attributed to `default_pin`.
pub fn resolve<W: WakeSource>(source: &mut W, default_pin: PinId) -> WakeReason {
    let reason = match source.wake_signal() {
        WakeSignal::Timer => WakeReason::TimerAlarm,
        WakeSignal::Pin(pin) => WakeReason::PinAlarm(pin.unwrap_or(default_pin)),
        WakeSignal::None | WakeSignal::Other => WakeReason::ColdBoot,
    };
    info!("wake reason: {:?}", reason);
    reason
}

/// Fixed wake signal, for boards that resolved the cause up front.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CapturedWake(pub WakeSignal);

impl WakeSource for CapturedWake {
    fn wake_signal(&mut self) -> WakeSignal {
        self.0
    }
}
