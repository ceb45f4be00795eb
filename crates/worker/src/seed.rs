//! Demo data for local runs against the in-memory store.
//!
//! Every customer gets three invoices, the first one pending. A handful of
//! customers are set up so that each failure class shows up in the first
//! sweep.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use billsweep_billing::InvoiceRepository;
use billsweep_core::{Currency, CustomerId, InvoiceId, Money};
use billsweep_infra::{InMemoryInvoiceRepository, InMemoryPaymentGateway, InjectedFault};
use billsweep_invoicing::{Customer, Invoice};

const CURRENCIES: [Currency; 5] = [
    Currency::Eur,
    Currency::Usd,
    Currency::Dkk,
    Currency::Sek,
    Currency::Gbp,
];

const INVOICES_PER_CUSTOMER: u128 = 3;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub customers: usize,
    pub pending: usize,
    pub paid: usize,
}

/// Populate `repo` and `gateway` with `customers` customers.
pub fn seed_demo_data(
    repo: &InMemoryInvoiceRepository,
    gateway: &InMemoryPaymentGateway,
    customers: u128,
    now: DateTime<Utc>,
) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for n in 1..=customers {
        let customer_id = CustomerId::from_u128(n);
        let currency = CURRENCIES[(n as usize) % CURRENCIES.len()];

        match n % 10 {
            // No account at the gateway.
            7 => {}
            // Account held in another currency.
            8 => {
                let other = CURRENCIES[(n as usize + 1) % CURRENCIES.len()];
                gateway.open_account(Customer::new(customer_id, other), Decimal::new(10_000, 0));
            }
            // Empty account.
            0 => gateway.open_account(Customer::new(customer_id, currency), Decimal::ZERO),
            _ => gateway.open_account(Customer::new(customer_id, currency), Decimal::new(10_000, 0)),
        }

        for k in 0..INVOICES_PER_CUSTOMER {
            let id = InvoiceId::from_u128(n * 100 + k);
            let cents = ((n * 7_919 + k * 104_729) % 50_000 + 1_000) as i64;
            let amount = Money::new(Decimal::new(cents, 2), currency)?;
            let invoice = Invoice::pending(id, customer_id, amount);

            if k == 0 {
                if n % 10 == 9 {
                    // Flaky network on the first attempt.
                    gateway.inject_faults(id, InjectedFault::Network, 1);
                }
                repo.insert(invoice)?;
                summary.pending += 1;
            } else {
                repo.insert(invoice.mark_paid(now)?)?;
                summary.paid += 1;
            }
        }

        summary.customers += 1;
    }

    Ok(summary)
}

/// Open a funded account for every customer with a pending invoice, in that
/// invoice's currency. Returns the number of accounts opened.
#[cfg_attr(not(feature = "postgres"), allow(dead_code))]
pub fn fund_pending_customers(
    repo: &dyn InvoiceRepository,
    gateway: &InMemoryPaymentGateway,
) -> anyhow::Result<usize> {
    let mut customers: BTreeMap<CustomerId, Currency> = BTreeMap::new();
    for invoice in repo.fetch_pending()? {
        customers
            .entry(invoice.customer_id())
            .or_insert(invoice.amount().currency);
    }

    warn!(
        customers = customers.len(),
        "Charging through the in-memory reference gateway"
    );
    for (id, currency) in &customers {
        gateway.open_account(Customer::new(*id, *currency), Decimal::new(10_000, 0));
    }

    Ok(customers.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;

    use billsweep_billing::{BillingService, FailureReason, ManualClock, SweepPolicy};
    use billsweep_invoicing::InvoiceStatus;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn seeds_one_pending_invoice_per_customer() {
        let repo = InMemoryInvoiceRepository::new();
        let gateway = InMemoryPaymentGateway::new();

        let summary = seed_demo_data(&repo, &gateway, 20, now()).unwrap();

        assert_eq!(summary.customers, 20);
        assert_eq!(summary.pending, 20);
        assert_eq!(summary.paid, 40);
        assert_eq!(repo.fetch_by_status(InvoiceStatus::Pending).unwrap().len(), 20);
        assert_eq!(repo.list().unwrap().len(), 60);
    }

    #[test]
    fn funding_opens_one_account_per_pending_customer() {
        let repo = InMemoryInvoiceRepository::new();
        let seeded = InMemoryPaymentGateway::new();
        seed_demo_data(&repo, &seeded, 5, now()).unwrap();

        let gateway = InMemoryPaymentGateway::new();
        let funded = fund_pending_customers(&repo, &gateway).unwrap();

        assert_eq!(funded, 5);
        for n in 1..=5 {
            let balance = gateway.balance(CustomerId::from_u128(n)).unwrap();
            assert_eq!(balance.value, Decimal::new(10_000, 0));
        }
    }

    #[test]
    fn first_sweep_over_seed_data_hits_every_outcome_class() {
        let repo = InMemoryInvoiceRepository::arc();
        let gateway = InMemoryPaymentGateway::arc();
        seed_demo_data(&repo, &gateway, 10, now()).unwrap();

        let service =
            BillingService::with_clock(repo.clone(), gateway.clone(), Arc::new(ManualClock::new(now())));
        let policy = SweepPolicy::new(3, chrono::Duration::seconds(1)).unwrap();
        let run = service.run(&policy).unwrap();

        assert_eq!(run.result.total(), 10);
        let reasons: Vec<FailureReason> = run.result.failed().values().copied().collect();
        assert!(reasons.contains(&FailureReason::CustomerNotFound));
        assert!(reasons.contains(&FailureReason::CurrencyMismatch));
        assert!(reasons.contains(&FailureReason::InsufficientBalance));
        assert_eq!(run.result.failed().len(), 3);

        // The flaky customer is paid on its second attempt.
        let flaky = InvoiceId::from_u128(900);
        assert!(run.result.is_paid(flaky));
        assert_eq!(gateway.attempts(flaky), 2);
        assert_eq!(repo.get(flaky).unwrap().status(), InvoiceStatus::Paid);
    }
}
