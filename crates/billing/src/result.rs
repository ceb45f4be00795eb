//! Billing run result and its loggable summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use billsweep_core::InvoiceId;

use crate::outcome::FailureReason;

/// Final reconciled state of one billing sweep.
///
/// Every invoice from the run's snapshot appears in exactly one of
/// `succeeded` and `failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BillingRunResult {
    succeeded: Vec<InvoiceId>,
    failed: BTreeMap<InvoiceId, FailureReason>,
}

impl BillingRunResult {
    pub(crate) fn new(
        succeeded: Vec<InvoiceId>,
        failed: BTreeMap<InvoiceId, FailureReason>,
    ) -> Self {
        debug_assert!(succeeded.iter().all(|id| !failed.contains_key(id)));
        Self { succeeded, failed }
    }

    /// Paid invoices, in the order their charges succeeded.
    pub fn succeeded(&self) -> &[InvoiceId] {
        &self.succeeded
    }

    /// Unpaid invoices and the reason observed on their last attempt.
    pub fn failed(&self) -> &BTreeMap<InvoiceId, FailureReason> {
        &self.failed
    }

    pub fn failure_reason(&self, id: InvoiceId) -> Option<FailureReason> {
        self.failed.get(&id).copied()
    }

    pub fn is_paid(&self, id: InvoiceId) -> bool {
        self.succeeded.contains(&id)
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Counters describing how a sweep went, for structured logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BillingRunReport {
    pub snapshot_size: usize,
    pub rounds: u32,
    pub charge_attempts: u64,
    pub paid: usize,
    pub failed: usize,
    pub failures_by_reason: BTreeMap<FailureReason, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl BillingRunReport {
    pub(crate) fn summarize(
        result: &BillingRunResult,
        snapshot_size: usize,
        rounds: u32,
        charge_attempts: u64,
        paid_at: Option<DateTime<Utc>>,
    ) -> Self {
        let mut failures_by_reason = BTreeMap::new();
        for reason in result.failed().values() {
            *failures_by_reason.entry(*reason).or_insert(0) += 1;
        }

        Self {
            snapshot_size,
            rounds,
            charge_attempts,
            paid: result.succeeded().len(),
            failed: result.failed().len(),
            failures_by_reason,
            paid_at,
        }
    }
}

/// A result together with the summary of how it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingRun {
    pub result: BillingRunResult,
    pub report: BillingRunReport,
}
