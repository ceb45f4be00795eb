//! Postgres-backed invoice repository.
//!
//! The repository trait is synchronous (the billing sweep is a blocking loop),
//! so this store owns a small Tokio runtime and drives `sqlx` on it. Do not
//! call it from inside another Tokio runtime.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tokio::runtime::Runtime;
use tracing::{info, warn};
use uuid::Uuid;

use billsweep_billing::{InvoiceRepository, RepositoryError};
use billsweep_core::{Currency, CustomerId, InvoiceId, Money};
use billsweep_invoicing::{Invoice, InvoiceStatus};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS invoices (
    id              UUID PRIMARY KEY,
    customer_id     UUID NOT NULL,
    amount_value    NUMERIC(20, 4) NOT NULL,
    amount_currency TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'pending',
    paid_at         TIMESTAMPTZ NULL
)
"#;

fn storage(err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(err.to_string())
}

/// Invoice repository over an `invoices` table.
pub struct PostgresInvoiceRepository {
    runtime: Runtime,
    pool: PgPool,
}

impl PostgresInvoiceRepository {
    /// Connect and make sure the `invoices` table exists.
    pub fn connect(database_url: &str) -> Result<Self, RepositoryError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(storage)?;

        let pool = runtime.block_on(async {
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(Duration::from_secs(5))
                .connect(database_url)
                .await?;
            sqlx::query(SCHEMA).execute(&pool).await?;
            Ok::<_, sqlx::Error>(pool)
        });
        let pool = pool.map_err(storage)?;

        info!("postgres invoice repository connected");
        Ok(Self { runtime, pool })
    }

    pub fn insert(&self, invoice: &Invoice) -> Result<InvoiceId, RepositoryError> {
        let result = self.runtime.block_on(
            sqlx::query(
                r#"
                INSERT INTO invoices (id, customer_id, amount_value, amount_currency, status, paid_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(Uuid::from(invoice.id()))
            .bind(Uuid::from(invoice.customer_id()))
            .bind(invoice.amount().value)
            .bind(invoice.amount().currency.code())
            .bind(invoice.status().as_str())
            .bind(invoice.paid_at())
            .execute(&self.pool),
        );

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(RepositoryError::AlreadyExists(invoice.id())),
            Ok(_) => Ok(invoice.id()),
            Err(e) => Err(storage(e)),
        }
    }

    pub fn fetch_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>, RepositoryError> {
        let rows = self
            .runtime
            .block_on(
                sqlx::query(
                    r#"
                    SELECT id, customer_id, amount_value, amount_currency, status, paid_at
                    FROM invoices
                    WHERE status = $1
                    ORDER BY id
                    "#,
                )
                .bind(status.as_str())
                .fetch_all(&self.pool),
            )
            .map_err(storage)?;

        rows.iter().map(invoice_from_row).collect()
    }

    pub fn get(&self, id: InvoiceId) -> Result<Invoice, RepositoryError> {
        let row = self
            .runtime
            .block_on(
                sqlx::query(
                    r#"
                    SELECT id, customer_id, amount_value, amount_currency, status, paid_at
                    FROM invoices
                    WHERE id = $1
                    "#,
                )
                .bind(Uuid::from(id))
                .fetch_optional(&self.pool),
            )
            .map_err(storage)?;

        match row {
            Some(row) => invoice_from_row(&row),
            None => Err(RepositoryError::InvoiceNotFound(id)),
        }
    }
}

fn invoice_from_row(row: &PgRow) -> Result<Invoice, RepositoryError> {
    let id: Uuid = row.try_get("id").map_err(storage)?;
    let customer_id: Uuid = row.try_get("customer_id").map_err(storage)?;
    let value: Decimal = row.try_get("amount_value").map_err(storage)?;
    let currency: String = row.try_get("amount_currency").map_err(storage)?;
    let status: String = row.try_get("status").map_err(storage)?;
    let paid_at: Option<DateTime<Utc>> = row.try_get("paid_at").map_err(storage)?;

    let currency: Currency = currency.parse().map_err(storage)?;
    let status: InvoiceStatus = status.parse().map_err(storage)?;
    let amount = Money::new(value, currency).map_err(storage)?;

    Invoice::restore(
        InvoiceId::from_uuid(id),
        CustomerId::from_uuid(customer_id),
        amount,
        status,
        paid_at,
    )
    .map_err(storage)
}

impl InvoiceRepository for PostgresInvoiceRepository {
    fn fetch_pending(&self) -> Result<Vec<Invoice>, RepositoryError> {
        self.fetch_by_status(InvoiceStatus::Pending)
    }

    fn bulk_mark_paid(
        &self,
        ids: &[InvoiceId],
        paid_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let unique: BTreeSet<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let uuids: Vec<Uuid> = unique.into_iter().collect();
        let expected = uuids.len() as u64;

        self.runtime.block_on(async {
            let mut tx = self.pool.begin().await.map_err(storage)?;

            let done = sqlx::query(
                r#"
                UPDATE invoices
                SET status = 'paid', paid_at = $2
                WHERE id = ANY($1) AND status = 'pending'
                "#,
            )
            .bind(&uuids)
            .bind(paid_at)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

            if done.rows_affected() != expected {
                warn!(
                    expected,
                    updated = done.rows_affected(),
                    "bulk mark-paid touched an unexpected number of rows; rolling back"
                );
                tx.rollback().await.map_err(storage)?;
                return Err(RepositoryError::Storage(format!(
                    "expected to mark {expected} invoices paid, matched {}",
                    done.rows_affected()
                )));
            }

            tx.commit().await.map_err(storage)
        })
    }
}
