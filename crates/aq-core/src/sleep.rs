//! Deep sleep requests handed back to the platform at the end of a cycle.

use crate::wake::PinId;

/// How the station wants to sleep. Every cycle ends in exactly one plan.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SleepPlan {
    /// Normal refresh: timer or button, whichever comes first.
    Refresh { after_secs: u32, wake_pin: PinId },
    /// Sensor trouble: one-shot timer at the current backoff delay.
    Backoff { after_secs: u32 },
    /// Network association failed: fixed timer, backoff untouched.
    NetworkRetry { after_secs: u32 },
    /// Backoff budget spent: only the button wakes the station.
    Dormant { wake_pin: PinId },
}

impl SleepPlan {
    pub const fn timer_secs(&self) -> Option<u32> {
        match *self {
            Self::Refresh { after_secs, .. }
            | Self::Backoff { after_secs }
            | Self::NetworkRetry { after_secs } => Some(after_secs),
            Self::Dormant { .. } => None,
        }
    }

    pub const fn wake_pin(&self) -> Option<PinId> {
        match *self {
            Self::Refresh { wake_pin, .. } | Self::Dormant { wake_pin } => Some(wake_pin),
            Self::Backoff { .. } | Self::NetworkRetry { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_plan_has_a_way_to_wake() {
        let plans = [
            SleepPlan::Refresh {
                after_secs: 180,
                wake_pin: PinId(14),
            },
            SleepPlan::Backoff { after_secs: 15 },
            SleepPlan::NetworkRetry { after_secs: 300 },
            SleepPlan::Dormant {
                wake_pin: PinId(14),
            },
        ];
        for plan in plans {
            assert!(plan.timer_secs().is_some() || plan.wake_pin().is_some());
        }
    }
}
