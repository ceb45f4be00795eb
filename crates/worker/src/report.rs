use tracing::{error, info, warn};

use billsweep_billing::{BillingError, BillingRun, BillingRunResult};

/// Log a finished sweep: one summary line, then one line per unpaid invoice.
pub fn log_billing_run(run: &BillingRun) {
    let failures_by_reason = serde_json::to_string(&run.report.failures_by_reason)
        .unwrap_or_else(|_| "{}".to_string());

    info!(
        snapshot_size = run.report.snapshot_size,
        rounds = run.report.rounds,
        charge_attempts = run.report.charge_attempts,
        paid = run.report.paid,
        failed = run.report.failed,
        failures_by_reason = %failures_by_reason,
        paid_at = ?run.report.paid_at,
        "Billing cycle complete"
    );

    log_unpaid(&run.result);
}

/// Log a sweep that did not produce a report.
pub fn log_billing_error(err: &BillingError) {
    match err {
        BillingError::MarkPaid { result, source } => {
            // Money was collected but the store does not know yet.
            error!(
                charged = result.succeeded().len(),
                invoice_ids = ?result.succeeded(),
                error = %source,
                "Charged invoices could not be marked paid"
            );
            log_unpaid(result);
        }
        other => error!(error = %other, "Billing cycle failed"),
    }
}

fn log_unpaid(result: &BillingRunResult) {
    for (invoice_id, reason) in result.failed() {
        warn!(invoice_id = %invoice_id, reason = %reason, "Invoice left unpaid");
    }
}
