use embedded_storage::{ReadStorage, Storage};

/// Bytes reserved in RTC fast memory for state kept across deep sleep.
pub const SLEEP_MEMORY_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RtcMemoryError {
    OutOfBounds { offset: u32, len: usize },
}

/// Byte-addressable view over a region placed in RTC fast memory.
///
/// The region is not initialised by the bootloader, so after a power-on
/// reset it holds whatever the SRAM powered up with. Callers wipe it on
/// cold boot; readers validate what they find.
#[derive(Debug)]
pub struct RtcMemory {
    region: &'static mut [u8; SLEEP_MEMORY_LEN],
}

impl RtcMemory {
    pub fn new(region: &'static mut [u8; SLEEP_MEMORY_LEN]) -> Self {
        Self { region }
    }

    /// Zeroes the whole region.
    pub fn wipe(&mut self) {
        self.region.fill(0);
    }

    fn span(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, RtcMemoryError> {
        let start = offset as usize;
        match start.checked_add(len) {
            Some(end) if end <= SLEEP_MEMORY_LEN => Ok(start..end),
            _ => Err(RtcMemoryError::OutOfBounds { offset, len }),
        }
    }
}

impl ReadStorage for RtcMemory {
    type Error = RtcMemoryError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let span = self.span(offset, bytes.len())?;
        bytes.copy_from_slice(&self.region[span]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        SLEEP_MEMORY_LEN
    }
}

impl Storage for RtcMemory {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let span = self.span(offset, bytes.len())?;
        self.region[span].copy_from_slice(bytes);
        Ok(())
    }
}
