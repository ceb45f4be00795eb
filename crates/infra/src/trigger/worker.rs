use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::{debug, info};

use super::schedule::{next_billing_instant, plan_next_step, TriggerStep};

/// Source of the current instant. Swappable so tests can pin the calendar.
pub type NowFn = Box<dyn Fn() -> DateTime<Utc> + Send>;

/// Trigger timing configuration.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// How often to recompute the target while it is still far away.
    pub recheck_interval: Duration,
    /// Once the target is this close, arm a single sleep and fire.
    pub fire_window: Duration,
    /// Thread name, also used in logs.
    pub name: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        let day = Duration::from_secs(24 * 60 * 60);
        Self {
            recheck_interval: day,
            fire_window: day,
            name: "billing-trigger".to_string(),
        }
    }
}

impl TriggerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_recheck_interval(mut self, interval: Duration) -> Self {
        self.recheck_interval = interval;
        self
    }

    pub fn with_fire_window(mut self, window: Duration) -> Self {
        self.fire_window = window;
        self
    }
}

/// Handle to a running trigger. Dropping it also stops the trigger at its
/// next wake-up.
#[derive(Debug)]
pub struct TriggerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl TriggerHandle {
    /// Request shutdown and wait for the trigger thread to exit.
    ///
    /// A sweep already in progress runs to completion first.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Fires a job at local midnight on the first of every month.
///
/// Holds no billing logic: the job is an opaque closure, typically one that
/// runs a sweep and logs the outcome.
#[derive(Debug)]
pub struct BillingTrigger;

impl BillingTrigger {
    /// Spawn using the system clock and local timezone.
    pub fn spawn<J>(config: TriggerConfig, job: J) -> TriggerHandle
    where
        J: FnMut() + Send + 'static,
    {
        Self::spawn_with(Local, Box::new(Utc::now), config, job)
    }

    /// Spawn with an explicit timezone and clock.
    pub fn spawn_with<Tz, J>(tz: Tz, now: NowFn, config: TriggerConfig, mut job: J) -> TriggerHandle
    where
        Tz: TimeZone + Send + 'static,
        Tz::Offset: core::fmt::Display + Send,
        J: FnMut() + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || trigger_loop(&config, &tz, &now, &shutdown_rx, &mut job))
            .expect("failed to spawn billing trigger thread");

        TriggerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

fn trigger_loop<Tz, J>(
    config: &TriggerConfig,
    tz: &Tz,
    now: &NowFn,
    shutdown_rx: &mpsc::Receiver<()>,
    job: &mut J,
) where
    Tz: TimeZone,
    Tz::Offset: core::fmt::Display,
    J: FnMut(),
{
    let name = config.name.as_str();
    let mut last_fired: Option<DateTime<Tz>> = None;

    info!(trigger = name, "billing trigger started");

    loop {
        let current = now().with_timezone(tz);
        // Never re-target a month that already fired, even if the clock reads
        // slightly behind the instant we woke for.
        let reference = match &last_fired {
            Some(fired) if *fired >= current => fired.clone(),
            _ => current.clone(),
        };
        let target = next_billing_instant(&reference);
        let remaining = target.clone().signed_duration_since(current);

        match plan_next_step(remaining, config.fire_window, config.recheck_interval) {
            TriggerStep::Fire { wait } => {
                info!(
                    trigger = name,
                    target = %target,
                    wait_secs = wait.as_secs(),
                    "billing sweep armed"
                );
                if wait_for_shutdown(shutdown_rx, wait) {
                    break;
                }
                info!(trigger = name, target = %target, "billing sweep firing");
                job();
                last_fired = Some(target);
            }
            TriggerStep::Recheck { wait } => {
                debug!(
                    trigger = name,
                    target = %target,
                    recheck_secs = wait.as_secs(),
                    "billing target not yet in window"
                );
                if wait_for_shutdown(shutdown_rx, wait) {
                    break;
                }
            }
        }
    }

    info!(trigger = name, "billing trigger stopped");
}

/// Sleep up to `wait`; true when shutdown was requested (or the handle dropped).
fn wait_for_shutdown(shutdown_rx: &mpsc::Receiver<()>, wait: Duration) -> bool {
    match shutdown_rx.recv_timeout(wait) {
        Ok(()) => true,
        Err(RecvTimeoutError::Timeout) => false,
        Err(RecvTimeoutError::Disconnected) => true,
    }
}
