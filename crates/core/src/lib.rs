//! `billsweep-core` — shared domain primitives.
//!
//! Identifiers, money and the domain error model. This crate has **no IO**:
//! nothing here talks to a database, a gateway or a clock.

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, InvoiceId};
pub use value_object::{Currency, Money, ValueObject};
