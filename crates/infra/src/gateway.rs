//! In-process payment gateway.
//!
//! Holds customer accounts (currency + balance) and settles charges against
//! them. Transient faults can be injected per invoice to rehearse retry
//! behaviour without a real payment provider.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use tracing::debug;

use billsweep_billing::{PaymentError, PaymentGateway};
use billsweep_core::{CustomerId, InvoiceId, Money};
use billsweep_invoicing::{Customer, Invoice};

/// Fault injected in place of a real charge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFault {
    Network,
    Unclassified,
}

#[derive(Debug)]
struct Account {
    customer: Customer,
    balance: Decimal,
}

#[derive(Debug, Default)]
struct GatewayState {
    accounts: HashMap<CustomerId, Account>,
    faults: HashMap<InvoiceId, VecDeque<InjectedFault>>,
    attempts: HashMap<InvoiceId, u32>,
}

/// In-memory gateway for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPaymentGateway {
    state: Mutex<GatewayState>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Open (or replace) an account for `customer` holding `balance`.
    pub fn open_account(&self, customer: Customer, balance: Decimal) {
        let mut state = self.state.lock().unwrap();
        state
            .accounts
            .insert(customer.id, Account { customer, balance });
    }

    /// Current balance, in the customer's currency.
    pub fn balance(&self, customer_id: CustomerId) -> Option<Money> {
        let state = self.state.lock().unwrap();
        state.accounts.get(&customer_id).map(|a| Money {
            value: a.balance,
            currency: a.customer.currency,
        })
    }

    /// Fail the next `times` attempts for `invoice_id` with `fault`.
    pub fn inject_faults(&self, invoice_id: InvoiceId, fault: InjectedFault, times: usize) {
        let mut state = self.state.lock().unwrap();
        state
            .faults
            .entry(invoice_id)
            .or_default()
            .extend(std::iter::repeat(fault).take(times));
    }

    /// Number of charge attempts seen for `invoice_id`.
    pub fn attempts(&self, invoice_id: InvoiceId) -> u32 {
        let state = self.state.lock().unwrap();
        state.attempts.get(&invoice_id).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u32 {
        let state = self.state.lock().unwrap();
        state.attempts.values().sum()
    }
}

impl PaymentGateway for InMemoryPaymentGateway {
    fn charge(&self, invoice: &Invoice) -> Result<bool, PaymentError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| PaymentError::Other("gateway state poisoned".into()))?;

        *state.attempts.entry(invoice.id()).or_insert(0) += 1;

        if let Some(fault) = state
            .faults
            .get_mut(&invoice.id())
            .and_then(VecDeque::pop_front)
        {
            debug!(invoice_id = %invoice.id(), fault = ?fault, "injected gateway fault");
            return Err(match fault {
                InjectedFault::Network => PaymentError::Network("connection reset by peer".into()),
                InjectedFault::Unclassified => PaymentError::Other("unexpected gateway response".into()),
            });
        }

        let account = state
            .accounts
            .get_mut(&invoice.customer_id())
            .ok_or(PaymentError::CustomerNotFound)?;

        let balance = Money {
            value: account.balance,
            currency: account.customer.currency,
        };
        if !balance.is_same_currency(invoice.amount()) {
            return Err(PaymentError::CurrencyMismatch);
        }

        // Currencies match, so the only refusal left is a short balance.
        match balance.checked_sub(invoice.amount()) {
            Ok(rest) => {
                account.balance = rest.value;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}
