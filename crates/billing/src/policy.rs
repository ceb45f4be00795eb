use std::time::Duration;

use serde::Serialize;

use crate::error::BillingError;

/// Validated sweep parameters: how many rounds and how long to pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepPolicy {
    max_tries: u32,
    retry_delay: Duration,
}

impl SweepPolicy {
    /// Validate caller-supplied parameters.
    ///
    /// `retry_delay` is signed so that a negative interval coming from
    /// configuration is reported instead of silently clamped.
    pub fn new(max_tries: u32, retry_delay: chrono::Duration) -> Result<Self, BillingError> {
        if max_tries < 1 {
            return Err(BillingError::InvalidMaxTries(max_tries));
        }
        let retry_delay = retry_delay
            .to_std()
            .map_err(|_| BillingError::InvalidRetryInterval(retry_delay))?;

        Ok(Self {
            max_tries,
            retry_delay,
        })
    }

    /// Single round, no retries.
    pub fn once() -> Self {
        Self {
            max_tries: 1,
            retry_delay: Duration::ZERO,
        }
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Pause before `round` (1-indexed). Round 1 starts immediately.
    pub fn delay_before_round(&self, round: u32) -> Duration {
        if round <= 1 {
            Duration::ZERO
        } else {
            self.retry_delay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_max_tries_is_rejected() {
        let err = SweepPolicy::new(0, chrono::Duration::seconds(1)).unwrap_err();
        assert!(matches!(err, BillingError::InvalidMaxTries(0)));
    }

    #[test]
    fn negative_retry_delay_is_rejected() {
        let err = SweepPolicy::new(3, chrono::Duration::seconds(-1)).unwrap_err();
        assert!(matches!(err, BillingError::InvalidRetryInterval(_)));
    }

    #[test]
    fn zero_retry_delay_is_allowed() {
        let policy = SweepPolicy::new(1, chrono::Duration::zero()).unwrap();
        assert_eq!(policy.retry_delay(), Duration::ZERO);
    }

    #[test]
    fn first_round_never_waits() {
        let policy = SweepPolicy::new(3, chrono::Duration::milliseconds(250)).unwrap();
        assert_eq!(policy.delay_before_round(1), Duration::ZERO);
        assert_eq!(policy.delay_before_round(2), Duration::from_millis(250));
        assert_eq!(policy.delay_before_round(3), Duration::from_millis(250));
    }
}
