//! Invoice persistence boundary used by the sweep.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use billsweep_core::InvoiceId;
use billsweep_invoicing::Invoice;

/// Invoice repository error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),
    #[error("invoice {0} is not pending")]
    NotPending(InvoiceId),
    #[error("invoice already exists: {0}")]
    AlreadyExists(InvoiceId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Snapshot reads and bulk status writes for invoices.
pub trait InvoiceRepository: Send + Sync {
    /// All invoices currently in `Pending` status.
    fn fetch_pending(&self) -> Result<Vec<Invoice>, RepositoryError>;

    /// Mark every id as paid at `paid_at`.
    ///
    /// Atomic from the caller's point of view: if any id is unknown or not
    /// pending, nothing is written.
    fn bulk_mark_paid(
        &self,
        ids: &[InvoiceId],
        paid_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

impl<R> InvoiceRepository for Arc<R>
where
    R: InvoiceRepository + ?Sized,
{
    fn fetch_pending(&self) -> Result<Vec<Invoice>, RepositoryError> {
        (**self).fetch_pending()
    }

    fn bulk_mark_paid(
        &self,
        ids: &[InvoiceId],
        paid_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        (**self).bulk_mark_paid(ids, paid_at)
    }
}
