//! Runtime configuration for the lifecycle services.

use std::time::Duration;

use thiserror::Error;

use pharmacy_core::UserId;

use crate::retry::RetryPolicy;

pub const ENV_LOW_STOCK_THRESHOLD: &str = "PHARMACY_LOW_STOCK_THRESHOLD";
pub const ENV_ADMIN_USER_ID: &str = "PHARMACY_ADMIN_USER_ID";
pub const ENV_COMPENSATION_MAX_ATTEMPTS: &str = "PHARMACY_COMPENSATION_MAX_ATTEMPTS";
pub const ENV_COMPENSATION_BACKOFF_MS: &str = "PHARMACY_COMPENSATION_BACKOFF_MS";
pub const ENV_ENFORCE_STATUS_TRANSITIONS: &str = "PHARMACY_ENFORCE_STATUS_TRANSITIONS";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Products with `stock` strictly below this trigger a low-stock notification
    pub low_stock_threshold: i64,
    /// Recipient of low-stock notifications
    pub admin_user_id: UserId,
    /// Retry policy for PlaceOrder's compensating deletion
    pub compensation_retry: RetryPolicy,
    /// Reject status moves outside the lifecycle graph
    pub enforce_status_transitions: bool,
    /// Postgres connection string (maintenance binary only)
    pub database_url: Option<String>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 5,
            admin_user_id: UserId::new(1),
            compensation_retry: RetryPolicy::default(),
            enforce_status_transitions: true,
            database_url: None,
        }
    }
}

impl LifecycleConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`; absent keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_LOW_STOCK_THRESHOLD) {
            config.low_stock_threshold = parse(ENV_LOW_STOCK_THRESHOLD, &v)?;
        }
        if let Some(v) = lookup(ENV_ADMIN_USER_ID) {
            config.admin_user_id = v
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_ADMIN_USER_ID, &v))?;
        }
        if let Some(v) = lookup(ENV_COMPENSATION_MAX_ATTEMPTS) {
            let attempts: u32 = parse(ENV_COMPENSATION_MAX_ATTEMPTS, &v)?;
            if attempts == 0 {
                return Err(invalid(ENV_COMPENSATION_MAX_ATTEMPTS, &v));
            }
            config.compensation_retry.max_attempts = attempts;
        }
        if let Some(v) = lookup(ENV_COMPENSATION_BACKOFF_MS) {
            let ms: u64 = parse(ENV_COMPENSATION_BACKOFF_MS, &v)?;
            config.compensation_retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(v) = lookup(ENV_ENFORCE_STATUS_TRANSITIONS) {
            config.enforce_status_transitions = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(invalid(ENV_ENFORCE_STATUS_TRANSITIONS, &v)),
            };
        }
        config.database_url = lookup(ENV_DATABASE_URL).filter(|url| !url.trim().is_empty());

        Ok(config)
    }

    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn with_admin_user(mut self, admin: UserId) -> Self {
        self.admin_user_id = admin;
        self
    }

    pub fn with_compensation_retry(mut self, policy: RetryPolicy) -> Self {
        self.compensation_retry = policy;
        self
    }

    pub fn with_status_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_status_transitions = enforce;
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}
