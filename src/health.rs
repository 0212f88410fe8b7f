//! Driver health bookkeeping.
//!
//! Every tracked bus operation reports its outcome here. The driver state is
//! derived from the consecutive failure count and never set independently.

use crate::error::{Error, Result};

/// Coarse driver state derived from recent bus outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    /// `begin()` not called, failed, or `end()` called.
    #[default]
    Uninitialized,
    /// Last tracked operation succeeded.
    Ready,
    /// At least one, but fewer than the offline threshold, consecutive failures.
    Degraded,
    /// Consecutive failures reached the offline threshold.
    Offline,
}

impl DriverState {
    /// Short identifier for diagnostics output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINIT",
            Self::Ready => "READY",
            Self::Degraded => "DEGRADED",
            Self::Offline => "OFFLINE",
        }
    }
}

/// Saturating success/failure counters and timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Health {
    /// Timestamp (ms) of the last successful tracked operation.
    pub last_ok_ms: u32,
    /// Timestamp (ms) of the last failed tracked operation.
    pub last_error_ms: u32,
    /// Most recent failure, if any.
    pub last_error: Option<Error>,
    /// Failures since the last success.
    pub consecutive_failures: u8,
    /// Lifetime failure count.
    pub total_failures: u32,
    /// Lifetime success count.
    pub total_success: u32,
}

impl Health {
    /// Records the outcome of a tracked operation at `now_ms`.
    pub fn record<T>(&mut self, result: &Result<T>, now_ms: u32) {
        match result {
            Ok(_) => {
                self.last_ok_ms = now_ms;
                self.consecutive_failures = 0;
                self.total_success = self.total_success.saturating_add(1);
            }
            Err(err) => {
                self.last_error_ms = now_ms;
                self.last_error = Some(*err);
                self.total_failures = self.total_failures.saturating_add(1);
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            }
        }
    }

    /// Derives the driver state for an initialized driver.
    pub fn state(&self, offline_threshold: u8) -> DriverState {
        if self.consecutive_failures == 0 {
            DriverState::Ready
        } else if self.consecutive_failures >= offline_threshold {
            DriverState::Offline
        } else {
            DriverState::Degraded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const NACK: Error = Error::new(ErrorKind::Nack, "Control byte NACK");

    #[test]
    fn failures_degrade_then_go_offline() {
        let mut health = Health::default();
        for k in 1..5u8 {
            health.record::<()>(&Err(NACK), u32::from(k));
            assert_eq!(health.state(5), DriverState::Degraded);
        }
        health.record::<()>(&Err(NACK), 5);
        assert_eq!(health.state(5), DriverState::Offline);
        assert_eq!(health.total_failures, 5);
        assert_eq!(health.last_error_ms, 5);
        assert_eq!(health.last_error, Some(NACK));
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let mut health = Health::default();
        health.record::<()>(&Err(NACK), 10);
        health.record(&Ok(0u8), 20);
        assert_eq!(health.consecutive_failures, 0);
        assert_eq!(health.total_success, 1);
        assert_eq!(health.total_failures, 1);
        assert_eq!(health.last_ok_ms, 20);
        assert_eq!(health.state(1), DriverState::Ready);
    }

    #[test]
    fn counters_saturate() {
        let mut health = Health {
            consecutive_failures: u8::MAX,
            total_failures: u32::MAX,
            total_success: u32::MAX,
            ..Health::default()
        };
        health.record::<()>(&Err(NACK), 0);
        assert_eq!(health.consecutive_failures, u8::MAX);
        assert_eq!(health.total_failures, u32::MAX);
        health.record(&Ok(()), 0);
        assert_eq!(health.total_success, u32::MAX);
    }

    #[test]
    fn threshold_of_one_goes_offline_immediately() {
        let mut health = Health::default();
        health.record::<()>(&Err(NACK), 0);
        assert_eq!(health.state(1), DriverState::Offline);
    }
}
