use serde::{Deserialize, Serialize};

use billsweep_core::{Currency, CustomerId};

/// A billed customer. Every invoice for a customer is expected in the customer's currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub currency: Currency,
}

impl Customer {
    pub fn new(id: CustomerId, currency: Currency) -> Self {
        Self { id, currency }
    }
}
