//! The billing sweep: bounded rounds of charge attempts over a pending snapshot.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use billsweep_invoicing::Invoice;

use crate::clock::{Clock, SystemClock};
use crate::error::BillingError;
use crate::gateway::PaymentGateway;
use crate::outcome::{ChargeOutcome, RetryDisposition};
use crate::policy::SweepPolicy;
use crate::repository::InvoiceRepository;
use crate::result::{BillingRun, BillingRunReport, BillingRunResult};

/// Collects payment for pending invoices.
///
/// Stateless between runs: every sweep reads its own snapshot and returns a
/// fresh result. Runs are sequential; callers must not start overlapping sweeps.
pub struct BillingService<R, G, C = SystemClock> {
    repository: R,
    gateway: G,
    clock: C,
}

impl<R, G> BillingService<R, G, SystemClock>
where
    R: InvoiceRepository,
    G: PaymentGateway,
{
    pub fn new(repository: R, gateway: G) -> Self {
        Self::with_clock(repository, gateway, SystemClock)
    }
}

impl<R, G, C> BillingService<R, G, C>
where
    R: InvoiceRepository,
    G: PaymentGateway,
    C: Clock,
{
    pub fn with_clock(repository: R, gateway: G, clock: C) -> Self {
        Self {
            repository,
            gateway,
            clock,
        }
    }

    /// Charge every pending invoice, retrying transient failures.
    ///
    /// Fails only for invalid parameters or repository errors; payment
    /// problems are reported in the returned result.
    pub fn run_billing_sweep(
        &self,
        max_tries: u32,
        retry_delay: chrono::Duration,
    ) -> Result<BillingRunResult, BillingError> {
        let policy = SweepPolicy::new(max_tries, retry_delay)?;
        self.run(&policy).map(|run| run.result)
    }

    /// Same as [`run_billing_sweep`](Self::run_billing_sweep) with a validated
    /// policy, also returning the run summary.
    pub fn run(&self, policy: &SweepPolicy) -> Result<BillingRun, BillingError> {
        let mut pending = self
            .repository
            .fetch_pending()
            .map_err(BillingError::Repository)?;

        // Charge order within a round is ascending invoice id.
        pending.sort_by_key(Invoice::id);
        pending.dedup_by_key(|invoice| invoice.id());
        let snapshot_size = pending.len();

        info!(
            pending = snapshot_size,
            max_tries = policy.max_tries(),
            retry_delay_ms = u64::try_from(policy.retry_delay().as_millis()).unwrap_or(u64::MAX),
            "billing sweep started"
        );

        let mut succeeded = Vec::new();
        let mut failed = BTreeMap::new();
        let mut rounds = 0;
        let mut charge_attempts: u64 = 0;

        for round in 1..=policy.max_tries() {
            if pending.is_empty() {
                break;
            }

            let delay = policy.delay_before_round(round);
            if !delay.is_zero() {
                self.clock.sleep(delay);
            }
            rounds = round;

            debug!(round, invoices = pending.len(), "billing round started");

            let mut carried = Vec::new();
            for invoice in pending {
                charge_attempts += 1;
                let outcome = ChargeOutcome::from_charge(&self.gateway.charge(&invoice));

                match outcome {
                    ChargeOutcome::Success => {
                        failed.remove(&invoice.id());
                        succeeded.push(invoice.id());
                    }
                    ChargeOutcome::Failed(reason) => {
                        debug!(
                            round,
                            invoice_id = %invoice.id(),
                            customer_id = %invoice.customer_id(),
                            reason = %reason,
                            "charge attempt failed"
                        );
                        failed.insert(invoice.id(), reason);
                        if reason.disposition() == RetryDisposition::Retryable {
                            carried.push(invoice);
                        }
                    }
                }
            }

            pending = carried;
        }

        let result = BillingRunResult::new(succeeded, failed);

        let paid_at = if result.succeeded().is_empty() {
            None
        } else {
            // One timestamp for the whole run, whichever round each charge landed in.
            let paid_at = self.clock.now();
            if let Err(source) = self.repository.bulk_mark_paid(result.succeeded(), paid_at) {
                warn!(
                    paid = result.succeeded().len(),
                    error = %source,
                    "charged invoices could not be marked paid"
                );
                return Err(BillingError::MarkPaid { result, source });
            }
            Some(paid_at)
        };

        let report =
            BillingRunReport::summarize(&result, snapshot_size, rounds, charge_attempts, paid_at);

        info!(
            rounds = report.rounds,
            charge_attempts = report.charge_attempts,
            paid = report.paid,
            failed = report.failed,
            "billing sweep finished"
        );

        Ok(BillingRun { result, report })
    }
}
