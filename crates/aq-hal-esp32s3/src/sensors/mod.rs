//! I2C sensor drivers behind the `aq-core` sensor traits.

mod pmsa003i;
mod sht40;

pub use pmsa003i::Pmsa003i;
pub use sht40::Sht40;

use aq_core::particles::FrameError;

/// Failure of one sensor read.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SenseError<E> {
    /// Bus transaction failed.
    I2c(E),
    /// Particulate frame arrived but did not decode.
    Frame(FrameError),
    /// Environment sensor answered with a bad CRC or an unexpected state.
    Measurement,
}
