//! Monthly payment collection for pending invoices.
//!
//! ## Design
//!
//! - One snapshot read of pending invoices per run
//! - Bounded rounds of charge attempts with a fixed pause between rounds
//! - Gateway results classified into terminal and retryable outcomes
//! - One bulk "paid" write per run, sharing a single timestamp
//!
//! ## Components
//!
//! - `BillingService`: runs a sweep and reconciles its result
//! - `PaymentGateway` / `InvoiceRepository`: collaborator boundaries
//! - `ChargeOutcome`: pure classification of a charge attempt
//! - `Clock`: wall time and pauses, swappable in tests

pub mod clock;
pub mod error;
pub mod gateway;
pub mod outcome;
pub mod policy;
pub mod repository;
pub mod result;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::BillingError;
pub use gateway::{PaymentError, PaymentGateway};
pub use outcome::{ChargeOutcome, FailureReason, RetryDisposition};
pub use policy::SweepPolicy;
pub use repository::{InvoiceRepository, RepositoryError};
pub use result::{BillingRun, BillingRunReport, BillingRunResult};
pub use service::BillingService;
