use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use billsweep_billing::{InvoiceRepository, RepositoryError};
use billsweep_core::InvoiceId;
use billsweep_invoicing::{Invoice, InvoiceStatus};

/// In-memory invoice store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceRepository {
    invoices: RwLock<HashMap<InvoiceId, Invoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<InvoiceId, Invoice>>, RepositoryError> {
        self.invoices
            .read()
            .map_err(|_| RepositoryError::Storage("invoice store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<InvoiceId, Invoice>>, RepositoryError> {
        self.invoices
            .write()
            .map_err(|_| RepositoryError::Storage("invoice store lock poisoned".into()))
    }

    pub fn insert(&self, invoice: Invoice) -> Result<InvoiceId, RepositoryError> {
        let mut invoices = self.write()?;
        let id = invoice.id();
        if invoices.contains_key(&id) {
            return Err(RepositoryError::AlreadyExists(id));
        }
        invoices.insert(id, invoice);
        Ok(id)
    }

    pub fn get(&self, id: InvoiceId) -> Result<Invoice, RepositoryError> {
        self.read()?
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::InvoiceNotFound(id))
    }

    /// All invoices, ordered by id.
    pub fn list(&self) -> Result<Vec<Invoice>, RepositoryError> {
        let mut all: Vec<_> = self.read()?.values().cloned().collect();
        all.sort_by_key(Invoice::id);
        Ok(all)
    }

    /// Invoices in `status`, ordered by id.
    pub fn fetch_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>, RepositoryError> {
        let mut matching: Vec<_> = self
            .read()?
            .values()
            .filter(|i| i.status() == status)
            .cloned()
            .collect();
        matching.sort_by_key(Invoice::id);
        Ok(matching)
    }
}

impl InvoiceRepository for InMemoryInvoiceRepository {
    fn fetch_pending(&self) -> Result<Vec<Invoice>, RepositoryError> {
        self.fetch_by_status(InvoiceStatus::Pending)
    }

    fn bulk_mark_paid(
        &self,
        ids: &[InvoiceId],
        paid_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut invoices = self.write()?;

        // Validate everything before touching anything.
        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            let invoice = invoices
                .get(id)
                .ok_or(RepositoryError::InvoiceNotFound(*id))?;
            let paid = invoice
                .mark_paid(paid_at)
                .map_err(|_| RepositoryError::NotPending(*id))?;
            updated.push(paid);
        }

        for invoice in updated {
            invoices.insert(invoice.id(), invoice);
        }

        debug!(count = ids.len(), paid_at = %paid_at, "invoices marked paid");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use billsweep_core::{Currency, CustomerId, Money};

    fn invoice(n: u128) -> Invoice {
        Invoice::pending(
            InvoiceId::from_u128(n),
            CustomerId::from_u128(1),
            Money::new(Decimal::ONE, Currency::Eur).unwrap(),
        )
    }

    fn paid_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 10, 14, 0, 0).unwrap()
    }

    #[test]
    fn fetch_pending_skips_paid_invoices() {
        let repo = InMemoryInvoiceRepository::new();
        repo.insert(invoice(1)).unwrap();
        repo.insert(invoice(2)).unwrap();
        repo.insert(invoice(3).mark_paid(paid_time()).unwrap()).unwrap();

        let pending = repo.fetch_pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(Invoice::is_pending));

        let paid = repo.fetch_by_status(InvoiceStatus::Paid).unwrap();
        assert_eq!(paid.len(), 1);
    }

    #[test]
    fn empty_store_has_nothing_pending() {
        let repo = InMemoryInvoiceRepository::new();
        assert!(repo.fetch_pending().unwrap().is_empty());
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let repo = InMemoryInvoiceRepository::new();
        repo.insert(invoice(1)).unwrap();
        assert!(matches!(
            repo.insert(invoice(1)),
            Err(RepositoryError::AlreadyExists(_))
        ));
    }

    #[test]
    fn get_unknown_invoice_is_not_found() {
        let repo = InMemoryInvoiceRepository::new();
        assert!(matches!(
            repo.get(InvoiceId::from_u128(9)),
            Err(RepositoryError::InvoiceNotFound(_))
        ));
    }

    #[test]
    fn bulk_mark_paid_updates_only_the_given_invoices() {
        let repo = InMemoryInvoiceRepository::new();
        for n in 1..=3 {
            repo.insert(invoice(n)).unwrap();
        }

        repo.bulk_mark_paid(&[InvoiceId::from_u128(1), InvoiceId::from_u128(2)], paid_time())
            .unwrap();

        let all = repo.list().unwrap();
        assert_eq!(all.len(), 3);
        for n in [1, 2] {
            let inv = repo.get(InvoiceId::from_u128(n)).unwrap();
            assert_eq!(inv.status(), InvoiceStatus::Paid);
            assert_eq!(inv.paid_at(), Some(paid_time()));
        }
        let untouched = repo.get(InvoiceId::from_u128(3)).unwrap();
        assert_eq!(untouched.status(), InvoiceStatus::Pending);
        assert!(untouched.paid_at().is_none());
    }

    #[test]
    fn bulk_mark_paid_is_all_or_nothing() {
        let repo = InMemoryInvoiceRepository::new();
        repo.insert(invoice(1)).unwrap();

        let err = repo
            .bulk_mark_paid(&[InvoiceId::from_u128(1), InvoiceId::from_u128(2)], paid_time())
            .unwrap_err();

        assert!(matches!(err, RepositoryError::InvoiceNotFound(_)));
        assert!(repo.get(InvoiceId::from_u128(1)).unwrap().is_pending());
    }

    #[test]
    fn bulk_mark_paid_rejects_already_paid_invoices() {
        let repo = InMemoryInvoiceRepository::new();
        repo.insert(invoice(1)).unwrap();
        repo.insert(invoice(2).mark_paid(paid_time()).unwrap()).unwrap();

        let err = repo
            .bulk_mark_paid(&[InvoiceId::from_u128(1), InvoiceId::from_u128(2)], paid_time())
            .unwrap_err();

        assert!(matches!(err, RepositoryError::NotPending(_)));
        assert!(repo.get(InvoiceId::from_u128(1)).unwrap().is_pending());
    }
}
