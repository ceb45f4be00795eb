//! Infrastructure layer: invoice stores, payment gateway, scheduling, config.

pub mod config;
pub mod gateway;
pub mod store;
pub mod trigger;


pub use config::{ConfigError, WorkerConfig};
pub use gateway::{InMemoryPaymentGateway, InjectedFault};
pub use store::InMemoryInvoiceRepository;
#[cfg(feature = "postgres")]
pub use store::PostgresInvoiceRepository;
pub use trigger::{BillingTrigger, TriggerConfig, TriggerHandle};
