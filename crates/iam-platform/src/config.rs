//! Platform Configuration

use std::time::Duration;

use crate::error::{PlatformError, Result};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// Command execution settings
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Extra attempts after a sequence conflict before giving up
    pub max_retries: u32,
    /// Upper bound for a single store call
    pub store_timeout: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}

impl PlatformConfig {
    /// Load from `IAM_MAX_RETRIES` and `IAM_STORE_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = env_var("IAM_MAX_RETRIES") {
            config.max_retries = raw.parse().map_err(|_| {
                PlatformError::invalid_argument("Errors.Config.Invalid", "IAM_MAX_RETRIES must be an integer")
            })?;
        }
        if let Some(raw) = env_var("IAM_STORE_TIMEOUT_MS") {
            let millis: u64 = raw.parse().map_err(|_| {
                PlatformError::invalid_argument("Errors.Config.Invalid", "IAM_STORE_TIMEOUT_MS must be an integer")
            })?;
            config.store_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty()).map(|v| v.trim().to_string())
}
