//! Charge outcome classification.
//!
//! Pure mapping from a gateway result to an outcome, and from an outcome to a
//! retry disposition. Nothing here performs IO.

use serde::{Deserialize, Serialize};

use crate::gateway::PaymentError;

/// Why an invoice did not get paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InsufficientBalance,
    CustomerNotFound,
    CurrencyMismatch,
    NetworkFailure,
    Unknown,
}

impl FailureReason {
    pub const ALL: [FailureReason; 5] = [
        FailureReason::InsufficientBalance,
        FailureReason::CustomerNotFound,
        FailureReason::CurrencyMismatch,
        FailureReason::NetworkFailure,
        FailureReason::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InsufficientBalance => "insufficient_balance",
            FailureReason::CustomerNotFound => "customer_not_found",
            FailureReason::CurrencyMismatch => "currency_mismatch",
            FailureReason::NetworkFailure => "network_failure",
            FailureReason::Unknown => "unknown",
        }
    }

    pub fn disposition(&self) -> RetryDisposition {
        match self {
            // Properties of the invoice or customer; they will not change within a run.
            FailureReason::InsufficientBalance
            | FailureReason::CustomerNotFound
            | FailureReason::CurrencyMismatch => RetryDisposition::Terminal,
            FailureReason::NetworkFailure | FailureReason::Unknown => RetryDisposition::Retryable,
        }
    }
}

impl core::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a single charge attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeOutcome {
    Success,
    Failed(FailureReason),
}

/// Whether an invoice stays in the sweep after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryDisposition {
    /// Stop attempting this invoice for the rest of the run.
    Terminal,
    /// Attempt again in the next round, if one remains.
    Retryable,
}

impl ChargeOutcome {
    /// Classify the result of `PaymentGateway::charge`.
    pub fn from_charge(result: &Result<bool, PaymentError>) -> Self {
        match result {
            Ok(true) => ChargeOutcome::Success,
            Ok(false) => ChargeOutcome::Failed(FailureReason::InsufficientBalance),
            Err(err) => ChargeOutcome::Failed(FailureReason::from(err)),
        }
    }

    pub fn disposition(&self) -> RetryDisposition {
        match self {
            ChargeOutcome::Success => RetryDisposition::Terminal,
            ChargeOutcome::Failed(reason) => reason.disposition(),
        }
    }
}

impl From<&PaymentError> for FailureReason {
    fn from(err: &PaymentError) -> Self {
        match err {
            PaymentError::CustomerNotFound => FailureReason::CustomerNotFound,
            PaymentError::CurrencyMismatch => FailureReason::CurrencyMismatch,
            PaymentError::Network(_) => FailureReason::NetworkFailure,
            PaymentError::Other(_) => FailureReason::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn boolean_results_classify_as_success_or_insufficient_balance() {
        assert_eq!(ChargeOutcome::from_charge(&Ok(true)), ChargeOutcome::Success);
        assert_eq!(
            ChargeOutcome::from_charge(&Ok(false)),
            ChargeOutcome::Failed(FailureReason::InsufficientBalance)
        );
    }

    #[test]
    fn gateway_errors_map_to_reasons() {
        let cases = [
            (PaymentError::CustomerNotFound, FailureReason::CustomerNotFound),
            (PaymentError::CurrencyMismatch, FailureReason::CurrencyMismatch),
            (PaymentError::Network("reset".into()), FailureReason::NetworkFailure),
            (PaymentError::Other("boom".into()), FailureReason::Unknown),
        ];

        for (err, reason) in cases {
            assert_eq!(
                ChargeOutcome::from_charge(&Err(err)),
                ChargeOutcome::Failed(reason)
            );
        }
    }

    #[test]
    fn only_transport_and_unclassified_failures_are_retryable() {
        assert_eq!(ChargeOutcome::Success.disposition(), RetryDisposition::Terminal);

        let retryable: Vec<_> = FailureReason::ALL
            .iter()
            .filter(|r| r.disposition() == RetryDisposition::Retryable)
            .copied()
            .collect();
        assert_eq!(
            retryable,
            vec![FailureReason::NetworkFailure, FailureReason::Unknown]
        );
    }

    #[test]
    fn reasons_serialize_as_snake_case() {
        let json = serde_json::to_string(&FailureReason::CurrencyMismatch).unwrap();
        assert_eq!(json, "\"currency_mismatch\"");
    }

    fn arb_charge_result() -> impl Strategy<Value = Result<bool, PaymentError>> {
        prop_oneof![
            any::<bool>().prop_map(Ok),
            Just(Err(PaymentError::CustomerNotFound)),
            Just(Err(PaymentError::CurrencyMismatch)),
            ".*".prop_map(|m| Err(PaymentError::Network(m))),
            ".*".prop_map(|m| Err(PaymentError::Other(m))),
        ]
    }

    proptest! {
        /// Property: classifying the same gateway result twice always agrees.
        #[test]
        fn classification_is_stable(result in arb_charge_result()) {
            let first = ChargeOutcome::from_charge(&result);
            let second = ChargeOutcome::from_charge(&result.clone());
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.disposition(), second.disposition());
        }
    }
}
