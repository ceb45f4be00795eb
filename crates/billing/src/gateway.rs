//! Payment gateway boundary.

use std::sync::Arc;

use billsweep_invoicing::Invoice;

/// Classified failure reported by a payment gateway for one charge attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// The gateway has no customer matching the invoice.
    #[error("customer not found")]
    CustomerNotFound,
    /// Invoice currency differs from the customer's account currency.
    #[error("currency mismatch between invoice and customer")]
    CurrencyMismatch,
    /// Transport-level failure talking to the gateway.
    #[error("network failure: {0}")]
    Network(String),
    /// Anything the gateway could not classify.
    #[error("unclassified gateway error: {0}")]
    Other(String),
}

/// Performs a single charge attempt for a single invoice.
///
/// `Ok(true)`: the invoice was charged. `Ok(false)`: declined for insufficient
/// balance. `Err(_)`: the attempt failed for the classified reason.
pub trait PaymentGateway: Send + Sync {
    fn charge(&self, invoice: &Invoice) -> Result<bool, PaymentError>;
}

impl<G> PaymentGateway for Arc<G>
where
    G: PaymentGateway + ?Sized,
{
    fn charge(&self, invoice: &Invoice) -> Result<bool, PaymentError> {
        (**self).charge(invoice)
    }
}
