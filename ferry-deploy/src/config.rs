//! Deployment configuration
//!
//! Defines the tunables of a deployment run: request time-to-live, retry
//! behaviour for uploads, the optional script callback timeout and how often
//! callbacks are polled.

use ferry_client::connection::DEFAULT_CALLBACK_POLL_INTERVAL;
use std::time::Duration;

use crate::error::{DeployError, Result};
use crate::retry::RetryPolicy;

/// Time-to-live of every remote call unless configured otherwise
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Deployment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    /// Time a node may spend on a single request
    pub ttl: Duration,

    /// Retry policy for module and blueprint uploads
    pub retry: RetryPolicy,

    /// How long to wait for a script to call back; `None` waits forever
    pub script_timeout: Option<Duration>,

    /// Delay between two callback polls
    pub callback_poll_interval: Duration,
}

impl DeployConfig {
    /// Creates a configuration with defaults
    pub fn new() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            retry: RetryPolicy::default(),
            script_timeout: None,
            callback_poll_interval: DEFAULT_CALLBACK_POLL_INTERVAL,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognised environment variables, all optional:
    /// - FERRY_TTL_MS (milliseconds, default: 60000)
    /// - FERRY_RETRY_ATTEMPTS (default: 3)
    /// - FERRY_RETRY_DELAY_MS (initial backoff, default: 500)
    /// - FERRY_SCRIPT_TIMEOUT_SECS (default: unset, wait forever)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();

        if let Some(ms) = env_number("FERRY_TTL_MS")? {
            config.ttl = Duration::from_millis(ms);
        }

        if let Some(attempts) = env_number("FERRY_RETRY_ATTEMPTS")? {
            config.retry.max_attempts = u32::try_from(attempts)
                .map_err(|_| DeployError::Config("FERRY_RETRY_ATTEMPTS is too large".into()))?;
        }

        if let Some(ms) = env_number("FERRY_RETRY_DELAY_MS")? {
            config.retry.initial_delay = Duration::from_millis(ms);
        }

        config.script_timeout = env_number("FERRY_SCRIPT_TIMEOUT_SECS")?.map(Duration::from_secs);

        Ok(config)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_script_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.script_timeout = timeout;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(DeployError::Config("ttl must be greater than 0".into()));
        }

        if self.retry.max_attempts == 0 {
            return Err(DeployError::Config(
                "retry attempts must be greater than 0".into(),
            ));
        }

        if self.retry.initial_delay > self.retry.max_delay {
            return Err(DeployError::Config(
                "initial retry delay cannot exceed the maximum delay".into(),
            ));
        }

        if self.script_timeout.is_some_and(|t| t.is_zero()) {
            return Err(DeployError::Config(
                "script timeout must be greater than 0".into(),
            ));
        }

        if self.callback_poll_interval.is_zero() {
            return Err(DeployError::Config(
                "callback poll interval must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_number(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse::<u64>().map(Some).map_err(|_| {
            DeployError::Config(format!("{} must be a whole number, got '{}'", name, value))
        }),
        Err(_) => Ok(None),
    }
}
