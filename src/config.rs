//! Verification engine configuration
//! Loads the verification endpoint and polling cadence from the environment

use std::env;
use std::time::Duration;

pub const DEFAULT_VERIFY_PATH: &str = "/payments/verify";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 6;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 6;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 6;

/// Verification endpoint and polling settings
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub base_url: String,
    pub verify_path: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

/// Cadence of one polling session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Upper bound on a single verification call. When it exceeds `interval`
    /// a slow call delays the next one instead of overlapping it.
    pub request_timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl VerificationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        let base_url = env::var("PAYMENT_VERIFY_BASE_URL")
            .map_err(|_| ConfigError::MissingVariable("PAYMENT_VERIFY_BASE_URL".to_string()))?;

        let config = VerificationConfig {
            base_url,
            verify_path: env::var("PAYMENT_VERIFY_PATH")
                .unwrap_or_else(|_| DEFAULT_VERIFY_PATH.to_string()),
            api_token: env::var("PAYMENT_VERIFY_API_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            request_timeout: Duration::from_secs(parse_var(
                "PAYMENT_VERIFY_TIMEOUT_SECONDS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            poll_interval: Duration::from_secs(parse_var(
                "PAYMENT_POLL_INTERVAL_SECONDS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            max_poll_attempts: parse_var("PAYMENT_POLL_MAX_ATTEMPTS", DEFAULT_MAX_POLL_ATTEMPTS)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "PAYMENT_VERIFY_BASE_URL cannot be empty".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "PAYMENT_VERIFY_BASE_URL must be a valid URL".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "PAYMENT_VERIFY_TIMEOUT_SECONDS".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "PAYMENT_POLL_INTERVAL_SECONDS".to_string(),
            ));
        }

        if self.request_timeout > self.poll_interval {
            return Err(ConfigError::ValidationFailed(
                "PAYMENT_VERIFY_TIMEOUT_SECONDS must not exceed PAYMENT_POLL_INTERVAL_SECONDS"
                    .to_string(),
            ));
        }

        if self.max_poll_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "PAYMENT_POLL_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Full URL of the verify-transaction endpoint
    pub fn verify_endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.verify_path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    pub fn polling(&self) -> PollingConfig {
        PollingConfig {
            interval: self.poll_interval,
            max_attempts: self.max_poll_attempts,
            request_timeout: self.request_timeout,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VerificationConfig {
        VerificationConfig {
            base_url: "https://api.example.com".to_string(),
            verify_path: DEFAULT_VERIFY_PATH.to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_base_url_validation() {
        let mut cfg = config();
        cfg.base_url = "ftp://api.example.com".to_string();
        assert!(cfg.validate().is_err());

        cfg.base_url = "".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let mut cfg = config();
        cfg.max_poll_attempts = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));

        let mut cfg = config();
        cfg.poll_interval = Duration::ZERO;
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.request_timeout = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_timeout_longer_than_interval_is_rejected() {
        let mut cfg = config();
        cfg.request_timeout = Duration::from_secs(15);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));

        cfg.request_timeout = cfg.poll_interval;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_verify_endpoint_joins_slashes() {
        let mut cfg = config();
        cfg.base_url = "https://api.example.com/v1/".to_string();
        cfg.verify_path = "/payments/verify".to_string();
        assert_eq!(cfg.verify_endpoint(), "https://api.example.com/v1/payments/verify");
    }

    #[test]
    fn test_polling_defaults() {
        let polling = config().polling();
        assert_eq!(polling, PollingConfig::default());
        assert_eq!(polling.max_attempts, 6);
        assert_eq!(polling.interval, Duration::from_secs(6));
        assert!(polling.request_timeout <= polling.interval);
    }
}
