use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billsweep_core::{CustomerId, DomainError, DomainResult, InvoiceId, Money};

/// Invoice status lifecycle.
///
/// Invoices start `Pending` and move to `Paid` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }
}

impl core::str::FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            other => Err(DomainError::validation(format!(
                "unknown invoice status: {other}"
            ))),
        }
    }
}

/// A subscription invoice.
///
/// Immutable once read: a state change produces a new value. `paid_at` is set
/// if and only if the status is `Paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    customer_id: CustomerId,
    amount: Money,
    status: InvoiceStatus,
    paid_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// A new invoice awaiting payment.
    pub fn pending(id: InvoiceId, customer_id: CustomerId, amount: Money) -> Self {
        Self {
            id,
            customer_id,
            amount,
            status: InvoiceStatus::Pending,
            paid_at: None,
        }
    }

    /// Rebuild an invoice from stored columns, enforcing the status/timestamp pairing.
    pub fn restore(
        id: InvoiceId,
        customer_id: CustomerId,
        amount: Money,
        status: InvoiceStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> DomainResult<Self> {
        match (status, paid_at) {
            (InvoiceStatus::Pending, Some(_)) => Err(DomainError::invariant(
                "pending invoice cannot carry a paid timestamp",
            )),
            (InvoiceStatus::Paid, None) => Err(DomainError::invariant(
                "paid invoice must carry a paid timestamp",
            )),
            _ => Ok(Self {
                id,
                customer_id,
                amount,
                status,
                paid_at,
            }),
        }
    }

    pub fn id(&self) -> InvoiceId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvoiceStatus::Pending
    }

    /// Invariant: an invoice is paid at most once.
    pub fn mark_paid(&self, at: DateTime<Utc>) -> DomainResult<Invoice> {
        if self.status == InvoiceStatus::Paid {
            return Err(DomainError::invariant(format!(
                "invoice {} is already paid",
                self.id
            )));
        }

        Ok(Invoice {
            status: InvoiceStatus::Paid,
            paid_at: Some(at),
            ..self.clone()
        })
    }
}
