//! Server configuration
//!
//! Defines all configurable parameters for the server including the
//! database and NATS connections and the notification dispatch tuning.

use std::time::Duration;

use crate::notify::backoff::{Backoff, DEFAULT_MAX_ATTEMPTS};
use crate::notify::dispatcher::{DEFAULT_MAX_IN_FLIGHT, DispatcherConfig};

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// NATS server URL
    pub nats_url: String,

    /// Subject the pollers listen on
    pub poller_subject: String,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Payloads the notification channel holds before sends start failing
    pub notify_capacity: usize,

    /// Send attempts per notification
    pub dispatch_attempts: u32,

    /// Notifications allowed to be retrying at the same time
    pub max_in_flight: usize,

    /// How long to wait for the forwarder to drain on shutdown
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(database_url: String) -> Self {
        Self {
            database_url,
            nats_url: "nats://127.0.0.1:4222".to_string(),
            poller_subject: "pollers".to_string(),
            bind_addr: "0.0.0.0:9001".to_string(),
            notify_capacity: 1,
            dispatch_attempts: DEFAULT_MAX_ATTEMPTS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            shutdown_timeout: Duration::from_secs(10),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - DATABASE_URL, or all of RUN_POSTGRES_USER, RUN_POSTGRES_PASS,
    ///   RUN_POSTGRES_HREF and RUN_POSTGRES_DB (RUN_POSTGRES_SSL optional,
    ///   default: verify-full)
    /// - RUN_NATS_URL (optional, default: nats://127.0.0.1:4222)
    /// - RUN_POLLER_SUBJECT (optional, default: pollers)
    /// - RUN_BIND_ADDR (optional, default: 0.0.0.0:9001)
    /// - RUN_NOTIFY_CAPACITY (optional, default: 1)
    /// - RUN_DISPATCH_ATTEMPTS (optional, default: 5)
    /// - RUN_DISPATCH_MAX_IN_FLIGHT (optional, default: 256)
    /// - RUN_SHUTDOWN_TIMEOUT (optional, seconds, default: 10)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let database_url = match var("DATABASE_URL") {
            Some(url) => url,
            None => postgres_url(&var)?,
        };

        let mut config = Self::new(database_url);

        match var("RUN_NATS_URL") {
            Some(url) => config.nats_url = url,
            None => tracing::warn!("RUN_NATS_URL not set - defaulting to {}", config.nats_url),
        }

        if let Some(subject) = var("RUN_POLLER_SUBJECT") {
            config.poller_subject = subject;
        }

        if let Some(addr) = var("RUN_BIND_ADDR") {
            config.bind_addr = addr;
        }

        config.notify_capacity = parse_or(&var, "RUN_NOTIFY_CAPACITY", config.notify_capacity)?;
        config.dispatch_attempts =
            parse_or(&var, "RUN_DISPATCH_ATTEMPTS", config.dispatch_attempts)?;
        config.max_in_flight =
            parse_or(&var, "RUN_DISPATCH_MAX_IN_FLIGHT", config.max_in_flight)?;
        config.shutdown_timeout = Duration::from_secs(parse_or(
            &var,
            "RUN_SHUTDOWN_TIMEOUT",
            config.shutdown_timeout.as_secs(),
        )?);

        Ok(config)
    }

    /// Dispatcher settings derived from this configuration
    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            backoff: Backoff::new(self.dispatch_attempts),
            max_in_flight: self.max_in_flight,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            anyhow::bail!("database_url must start with postgres:// or postgresql://");
        }

        if !self.nats_url.contains("://") {
            anyhow::bail!("nats_url must include a scheme (e.g. nats://)");
        }

        if self.poller_subject.trim().is_empty() {
            anyhow::bail!("poller_subject cannot be empty");
        }

        if self.notify_capacity == 0 {
            anyhow::bail!("notify_capacity must be greater than 0");
        }

        if self.dispatch_attempts == 0 {
            anyhow::bail!("dispatch_attempts must be greater than 0");
        }

        if self.max_in_flight == 0 {
            anyhow::bail!("max_in_flight must be greater than 0");
        }

        Ok(())
    }
}

/// Default tracing filter, used when RUST_LOG is unset
///
/// Read straight from RUN_LOG_LEVEL so logging can be set up before the
/// rest of the configuration is loaded.
pub fn log_filter(log_level: Option<&str>) -> String {
    match log_level.map(str::trim).filter(|level| !level.is_empty()) {
        Some(level) => format!("run_server={},tower_http=debug", level),
        None => "run_server=info,tower_http=debug".to_string(),
    }
}

fn postgres_url<F>(var: &F) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let require = |key: &str| var(key).ok_or_else(|| anyhow::anyhow!("need {}", key));

    let user = require("RUN_POSTGRES_USER")?;
    let pass = require("RUN_POSTGRES_PASS")?;
    let href = require("RUN_POSTGRES_HREF")?;
    let db = require("RUN_POSTGRES_DB")?;

    let ssl = var("RUN_POSTGRES_SSL").unwrap_or_else(|| {
        tracing::info!("RUN_POSTGRES_SSL not set - defaulting to verify-full");
        "verify-full".to_string()
    });

    Ok(format!(
        "postgres://{}:{}@{}/{}?sslmode={}",
        user, pass, href, db, ssl
    ))
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {} {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://run@localhost/run")]))
                .unwrap();

        assert_eq!(config.nats_url, "nats://127.0.0.1:4222");
        assert_eq!(config.poller_subject, "pollers");
        assert_eq!(config.bind_addr, "0.0.0.0:9001");
        assert_eq!(config.notify_capacity, 1);
        assert_eq!(config.dispatch_attempts, 5);
        assert_eq!(config.dispatcher().backoff.max_attempts(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_postgres_url_from_parts() {
        let config = Config::from_lookup(lookup(&[
            ("RUN_POSTGRES_USER", "run"),
            ("RUN_POSTGRES_PASS", "secret"),
            ("RUN_POSTGRES_HREF", "db:5432"),
            ("RUN_POSTGRES_DB", "runci"),
        ]))
        .unwrap();

        assert_eq!(
            config.database_url,
            "postgres://run:secret@db:5432/runci?sslmode=verify-full"
        );
    }

    #[test]
    fn test_missing_postgres_part_fails() {
        let result = Config::from_lookup(lookup(&[
            ("RUN_POSTGRES_USER", "run"),
            ("RUN_POSTGRES_HREF", "db:5432"),
            ("RUN_POSTGRES_DB", "runci"),
        ]));

        let err = result.unwrap_err().to_string();
        assert!(err.contains("RUN_POSTGRES_PASS"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://run@localhost/run"),
            ("RUN_NATS_URL", "nats://bus:4222"),
            ("RUN_POLLER_SUBJECT", "pollers.git"),
            ("RUN_DISPATCH_ATTEMPTS", "3"),
            ("RUN_NOTIFY_CAPACITY", "4"),
        ]))
        .unwrap();

        assert_eq!(config.nats_url, "nats://bus:4222");
        assert_eq!(config.poller_subject, "pollers.git");
        assert_eq!(config.dispatch_attempts, 3);
        assert_eq!(config.notify_capacity, 4);
    }

    #[test]
    fn test_invalid_number_fails() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://run@localhost/run"),
            ("RUN_DISPATCH_ATTEMPTS", "many"),
        ]));

        assert!(result.is_err());
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(None), "run_server=info,tower_http=debug");
        assert_eq!(log_filter(Some("")), "run_server=info,tower_http=debug");
        assert_eq!(
            log_filter(Some("debug")),
            "run_server=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::new("postgres://run@localhost/run".to_string());
        assert!(config.validate().is_ok());

        config.notify_capacity = 0;
        assert!(config.validate().is_err());
        config.notify_capacity = 1;

        config.dispatch_attempts = 0;
        assert!(config.validate().is_err());
        config.dispatch_attempts = 5;

        config.database_url = "mysql://localhost".to_string();
        assert!(config.validate().is_err());
    }
}
