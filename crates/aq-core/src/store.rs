//! Backoff record persisted in memory that survives deep sleep.

use embedded_storage::{ReadStorage, Storage};
use log::warn;

use crate::backoff::{BackoffPolicy, BackoffState};

/// Byte offset of the backoff delay slot (u16, little endian).
pub const SLOT_BACKOFF_DELAY: u32 = 0;
/// Byte offset of the backoff cycle counter slot (u8).
pub const SLOT_BACKOFF_CYCLES: u32 = 2;
/// Bytes of sleep memory the record occupies.
pub const BACKOFF_RECORD_LEN: usize = 3;

/// Two-slot backoff record on top of a byte-addressable sleep memory region.
///
/// Reads are bounds checked against the policy; anything outside of it is
/// treated as the inactive record.
#[derive(Debug)]
pub struct BackoffStore<M> {
    memory: M,
    policy: BackoffPolicy,
}

impl<M> BackoffStore<M>
where
    M: ReadStorage + Storage,
    M::Error: core::fmt::Debug,
{
    pub fn new(memory: M, policy: BackoffPolicy) -> Self {
        Self { memory, policy }
    }

    pub fn release(self) -> M {
        self.memory
    }

    pub fn read(&mut self) -> BackoffState {
        if self.memory.capacity() < BACKOFF_RECORD_LEN {
            warn!(
                "sleep memory too small for backoff record ({} bytes)",
                self.memory.capacity()
            );
            return BackoffState::INACTIVE;
        }

        let mut buf = [0u8; BACKOFF_RECORD_LEN];
        if let Err(err) = self.memory.read(SLOT_BACKOFF_DELAY, &mut buf) {
            warn!("sleep memory read failed: {:?}", err);
            return BackoffState::INACTIVE;
        }

        let state = BackoffState::new(
            u16::from_le_bytes([buf[0], buf[1]]),
            buf[SLOT_BACKOFF_CYCLES as usize],
        );
        if state.is_within(&self.policy) {
            state
        } else {
            warn!(
                "discarding out-of-range backoff record delay={} cycles={}",
                state.delay_secs, state.cycle_count
            );
            BackoffState::INACTIVE
        }
    }

    pub fn write(&mut self, state: BackoffState) {
        let mut buf = [0u8; BACKOFF_RECORD_LEN];
        buf[0..2].copy_from_slice(&state.delay_secs.to_le_bytes());
        buf[SLOT_BACKOFF_CYCLES as usize] = state.cycle_count;

        if let Err(err) = self.memory.write(SLOT_BACKOFF_DELAY, &buf) {
            warn!("sleep memory write failed: {:?}", err);
        }
    }

    pub fn clear(&mut self) {
        self.write(BackoffState::INACTIVE);
    }
}

/// Plain RAM region, used by tests and by boards that keep sleep memory in a
/// static array.
#[derive(Debug, Clone)]
pub struct ByteRegion<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> ByteRegion<N> {
    pub const fn new() -> Self {
        Self { bytes: [0u8; N] }
    }

    pub const fn from_bytes(bytes: [u8; N]) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8; N] {
        &self.bytes
    }
}

impl<const N: usize> Default for ByteRegion<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Access outside of a [`ByteRegion`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OutOfBounds;

impl<const N: usize> ByteRegion<N> {
    fn span(offset: u32, len: usize) -> Result<core::ops::Range<usize>, OutOfBounds> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(OutOfBounds)?;
        if end > N {
            return Err(OutOfBounds);
        }
        Ok(start..end)
    }
}

impl<const N: usize> ReadStorage for ByteRegion<N> {
    type Error = OutOfBounds;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let span = Self::span(offset, bytes.len())?;
        bytes.copy_from_slice(&self.bytes[span]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Storage for ByteRegion<N> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let span = Self::span(offset, bytes.len())?;
        self.bytes[span].copy_from_slice(bytes);
        Ok(())
    }
}
