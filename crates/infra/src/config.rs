//! Worker configuration loaded from the environment.

use std::env;
use std::time::Duration;

use billsweep_billing::SweepPolicy;

use crate::trigger::TriggerConfig;

/// Configuration error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Everything the billing worker needs to start.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub max_tries: u32,
    pub retry_delay: Duration,
    pub recheck_interval: Duration,
    pub fire_window: Duration,
    /// Run one sweep immediately at startup, in addition to the schedule.
    pub run_on_start: bool,
    pub database_url: Option<String>,
    pub log_level: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_tries: 3,
            retry_delay: Duration::from_secs(1),
            recheck_interval: Duration::from_secs(86_400),
            fire_window: Duration::from_secs(86_400),
            run_on_start: false,
            database_url: None,
            log_level: "info".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Load from process env, after reading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_tries = match lookup("BILLING_MAX_TRIES") {
            Some(raw) => {
                let n: u32 = parse(&raw, "BILLING_MAX_TRIES")?;
                if n == 0 {
                    return Err(ConfigError::invalid("BILLING_MAX_TRIES", &raw, "must be at least 1"));
                }
                n
            }
            None => defaults.max_tries,
        };

        let retry_delay = secs(&lookup, "BILLING_RETRY_DELAY_SECS", defaults.retry_delay)?;
        let recheck_interval = secs(&lookup, "BILLING_RECHECK_INTERVAL_SECS", defaults.recheck_interval)?;
        let fire_window = secs(&lookup, "BILLING_FIRE_WINDOW_SECS", defaults.fire_window)?;
        if recheck_interval.is_zero() {
            return Err(ConfigError::invalid(
                "BILLING_RECHECK_INTERVAL_SECS",
                "0",
                "must be positive",
            ));
        }

        let run_on_start = match lookup("BILLING_RUN_ON_START") {
            Some(raw) => parse_bool(&raw, "BILLING_RUN_ON_START")?,
            None => defaults.run_on_start,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let log_level = lookup("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            max_tries,
            retry_delay,
            recheck_interval,
            fire_window,
            run_on_start,
            database_url,
            log_level,
        })
    }

    /// Sweep parameters derived from this config.
    pub fn sweep_policy(&self) -> Result<SweepPolicy, billsweep_billing::BillingError> {
        let delay = chrono::Duration::from_std(self.retry_delay).unwrap_or(chrono::Duration::MAX);
        SweepPolicy::new(self.max_tries, delay)
    }

    pub fn trigger_config(&self) -> TriggerConfig {
        TriggerConfig::default()
            .with_recheck_interval(self.recheck_interval)
            .with_fire_window(self.fire_window)
    }
}

fn parse<T: std::str::FromStr>(raw: &str, key: &'static str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, raw, e.to_string()))
}

fn secs<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse::<u64>(&raw, key).map(Duration::from_secs),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str, key: &'static str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw, "expected a boolean")),
    }
}
