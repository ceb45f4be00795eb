//! Invoice storage implementations.
//!
//! - `InMemoryInvoiceRepository`: tests, local runs and demos
//! - `PostgresInvoiceRepository` (feature `postgres`): durable storage

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryInvoiceRepository;
#[cfg(feature = "postgres")]
pub use postgres::PostgresInvoiceRepository;
