//! Exponential backoff applied when sampling keeps failing across wake cycles.

use log::error;

/// Shortest backoff sleep, in seconds.
pub const MINIMUM_BACKOFF_SECS: u16 = 15;
/// Longest backoff sleep, in seconds.
pub const MAXIMUM_BACKOFF_SECS: u16 = 5 * 60;
/// Consecutive backoff cycles allowed before the station gives up.
pub const MAX_BACKOFF_COUNT: u8 = 12;

/// Backoff bounds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BackoffPolicy {
    pub minimum_secs: u16,
    pub maximum_secs: u16,
    pub max_cycles: u8,
}

impl BackoffPolicy {
    pub const fn new() -> Self {
        Self {
            minimum_secs: MINIMUM_BACKOFF_SECS,
            maximum_secs: MAXIMUM_BACKOFF_SECS,
            max_cycles: MAX_BACKOFF_COUNT,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Backoff record kept in sleep memory. `{0, 0}` means inactive.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BackoffState {
    pub delay_secs: u16,
    pub cycle_count: u8,
}

/// Outcome of one escalation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackoffStep {
    /// Sleep for `state.delay_secs` and try again.
    Sleep(BackoffState),
    /// The cycle budget is spent; the station must not schedule another retry.
    Exhausted(BackoffState),
}

impl BackoffStep {
    pub const fn state(self) -> BackoffState {
        match self {
            Self::Sleep(state) | Self::Exhausted(state) => state,
        }
    }
}

impl BackoffState {
    pub const INACTIVE: Self = Self {
        delay_secs: 0,
        cycle_count: 0,
    };

    pub const fn new(delay_secs: u16, cycle_count: u8) -> Self {
        Self {
            delay_secs,
            cycle_count,
        }
    }

    pub const fn is_active(&self) -> bool {
        self.delay_secs != 0
    }

    /// Whether the record satisfies the policy bounds.
    pub const fn is_within(&self, policy: &BackoffPolicy) -> bool {
        self.delay_secs <= policy.maximum_secs && self.cycle_count <= policy.max_cycles
    }

    /// Computes the next backoff step from the current record.
    ///
    /// An inactive record starts at the policy minimum. An active delay
    /// strictly between the minimum and the maximum doubles, clamped to the
    /// maximum. Any other active delay is kept as is.
    pub fn escalate(self, policy: &BackoffPolicy) -> BackoffStep {
        let (delay_secs, cycle_count) = if !self.is_active() {
            (policy.minimum_secs, 0)
        } else if self.delay_secs > policy.minimum_secs && self.delay_secs < policy.maximum_secs {
            (
                self.delay_secs
                    .saturating_mul(2)
                    .min(policy.maximum_secs),
                self.cycle_count,
            )
        } else {
            (self.delay_secs.min(policy.maximum_secs), self.cycle_count)
        };

        let next = Self::new(delay_secs, cycle_count.saturating_add(1));
        if next.cycle_count >= policy.max_cycles {
            error!(
                "backoff exhausted after {} cycles (last delay {}s)",
                next.cycle_count, next.delay_secs
            );
            BackoffStep::Exhausted(next)
        } else {
            BackoffStep::Sleep(next)
        }
    }
}
