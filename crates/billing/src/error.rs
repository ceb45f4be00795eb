use thiserror::Error;

use crate::repository::RepositoryError;
use crate::result::BillingRunResult;

/// Errors surfaced by a billing sweep.
///
/// Payment problems are never errors: they end up in `BillingRunResult::failed`.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("invalid max tries: {0} (must be at least 1)")]
    InvalidMaxTries(u32),

    #[error("invalid retry interval: {0} (must not be negative)")]
    InvalidRetryInterval(chrono::Duration),

    /// The pending snapshot could not be read; nothing was charged.
    #[error("failed to read pending invoices: {0}")]
    Repository(#[source] RepositoryError),

    /// Charges went through but the paid status could not be recorded.
    #[error("failed to mark {} invoices as paid: {source}", .result.succeeded().len())]
    MarkPaid {
        result: BillingRunResult,
        #[source]
        source: RepositoryError,
    },
}
