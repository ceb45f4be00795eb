//! Billing worker: runs the monthly payment sweep on schedule.

mod report;
mod seed;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use billsweep_billing::{BillingService, InvoiceRepository, SweepPolicy};
use billsweep_infra::{BillingTrigger, InMemoryInvoiceRepository, InMemoryPaymentGateway, WorkerConfig};

const DEMO_CUSTOMERS: u128 = 100;

type Service = BillingService<Arc<dyn InvoiceRepository>, Arc<InMemoryPaymentGateway>>;

fn run_sweep(service: &Service, policy: &SweepPolicy) {
    match service.run(policy) {
        Ok(run) => report::log_billing_run(&run),
        Err(err) => report::log_billing_error(&err),
    }
}

fn open_repository(
    config: &WorkerConfig,
    gateway: &InMemoryPaymentGateway,
) -> anyhow::Result<Arc<dyn InvoiceRepository>> {
    if let Some(url) = config.database_url.as_deref() {
        #[cfg(feature = "postgres")]
        {
            let repo: Arc<dyn InvoiceRepository> = Arc::new(
                billsweep_infra::PostgresInvoiceRepository::connect(url)
                    .context("connecting to the invoice database")?,
            );
            let funded = seed::fund_pending_customers(repo.as_ref(), gateway)
                .context("opening gateway accounts")?;
            info!(customers = funded, "Using Postgres invoice store");
            return Ok(repo);
        }

        #[cfg(not(feature = "postgres"))]
        {
            let _ = url;
            tracing::warn!("DATABASE_URL is set but this build has no postgres support; using in-memory store");
        }
    }

    let store = InMemoryInvoiceRepository::arc();
    let summary = seed::seed_demo_data(&store, gateway, DEMO_CUSTOMERS, chrono::Utc::now())
        .context("seeding demo invoices")?;
    info!(
        customers = summary.customers,
        pending = summary.pending,
        paid = summary.paid,
        "Using in-memory invoice store with demo data"
    );
    let repo: Arc<dyn InvoiceRepository> = store;
    Ok(repo)
}

/// Block until Ctrl-C or SIGTERM.
fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;

    runtime.block_on(async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .context("installing Ctrl+C handler")
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("installing SIGTERM handler")?
                .recv()
                .await;
            Ok::<(), anyhow::Error>(())
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<anyhow::Result<()>>();

        tokio::select! {
            res = ctrl_c => res,
            res = terminate => res,
        }
    })?;

    info!("Shutdown signal received");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env().context("loading worker configuration")?;
    billsweep_observability::init(&config.log_level);

    let policy = config.sweep_policy().context("invalid sweep parameters")?;
    info!(
        max_tries = policy.max_tries(),
        retry_delay_secs = policy.retry_delay().as_secs(),
        recheck_interval_secs = config.recheck_interval.as_secs(),
        fire_window_secs = config.fire_window.as_secs(),
        "Starting billing worker"
    );

    let gateway = InMemoryPaymentGateway::arc();
    let repository = open_repository(&config, &gateway)?;
    let service: Arc<Service> = Arc::new(BillingService::new(repository, gateway));

    if config.run_on_start {
        info!("Running on-demand billing cycle");
        run_sweep(&service, &policy);
    }

    let trigger = {
        let service = service.clone();
        BillingTrigger::spawn(config.trigger_config(), move || run_sweep(&service, &policy))
    };

    wait_for_shutdown_signal()?;

    // Waits for a sweep in progress to finish.
    trigger.shutdown();
    info!("Billing worker stopped");
    Ok(())
}
