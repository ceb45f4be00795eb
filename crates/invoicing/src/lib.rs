//! Invoicing domain module.
//!
//! Invoices and the customers they are billed to, as plain values. No IO, no
//! storage: repositories live in `billsweep-infra`.

pub mod customer;
pub mod invoice;

pub use customer::Customer;
pub use invoice::{Invoice, InvoiceStatus};
