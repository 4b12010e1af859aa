//! API server configuration.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILL_HTTP_PORT=9000                                                │
//! │     TILL_JWT_SECRET=...                                                │
//! │                                                                         │
//! │  2. TOML Config File (optional)                                        │
//! │     ./till.toml                                                        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # till.toml
//! http_port = 8080
//! database_path = "./till.db"
//! jwt_secret = "long random string"
//! tax_rate_bps = 1200
//! notification_webhook_url = "https://hooks.example.com/till"
//! ```

use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::warn;

use till_core::checkout::CheckoutConfig;
use till_core::validation::validate_tax_rate_bps;
use till_core::{TaxRate, DEFAULT_TAX_RATE_BPS};

/// Secret used when none is configured. Fine for development only.
pub const DEV_JWT_SECRET: &str = "till-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Secret for signing session tokens
    pub jwt_secret: String,

    /// Session token lifetime in seconds (default: 12 hours)
    pub jwt_lifetime_secs: i64,

    /// Sales tax in basis points (1200 = 12%)
    pub tax_rate_bps: u32,

    /// Accept sales paid below their total (zero change) instead of rejecting them
    pub allow_underpayment: bool,

    /// Where business events are POSTed. Unset disables notifications.
    pub notification_webhook_url: Option<String>,

    /// Upper bound for one webhook delivery in milliseconds
    pub notification_timeout_ms: u64,

    /// SQLite pool size
    pub max_db_connections: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            http_port: 8080,
            database_path: "./till.db".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_lifetime_secs: 43_200,
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
            allow_underpayment: false,
            notification_webhook_url: None,
            notification_timeout_ms: 3_000,
            max_db_connections: 5,
        }
    }
}

impl ApiConfig {
    /// Loads defaults, then `till.toml` if present, then `TILL_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let settings = Config::builder()
            .set_default("http_port", defaults.http_port as i64)?
            .set_default("database_path", defaults.database_path)?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_lifetime_secs", defaults.jwt_lifetime_secs)?
            .set_default("tax_rate_bps", defaults.tax_rate_bps as i64)?
            .set_default("allow_underpayment", defaults.allow_underpayment)?
            .set_default("notification_timeout_ms", defaults.notification_timeout_ms as i64)?
            .set_default("max_db_connections", defaults.max_db_connections as i64)?
            .add_source(File::with_name("till").required(false))
            .add_source(Environment::with_prefix("TILL").try_parsing(true))
            .build()?;

        let config: ApiConfig = settings.try_deserialize()?;
        config.validate()?;

        if config.jwt_secret == DEV_JWT_SECRET {
            warn!("TILL_JWT_SECRET is not set, using the development secret");
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }
        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("jwt_lifetime_secs".to_string()));
        }
        if validate_tax_rate_bps(self.tax_rate_bps).is_err() {
            return Err(ConfigError::InvalidValue("tax_rate_bps".to_string()));
        }
        if self.max_db_connections == 0 {
            return Err(ConfigError::InvalidValue("max_db_connections".to_string()));
        }
        Ok(())
    }

    /// Pricing policy handed to the checkout engine.
    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig {
            tax_rate: TaxRate::from_bps(self.tax_rate_bps),
            allow_underpayment: self.allow_underpayment,
        }
    }

    /// Configured webhook URL, ignoring blank values.
    pub fn webhook_url(&self) -> Option<&str> {
        self.notification_webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.checkout_config(), CheckoutConfig::default());
        assert!(config.webhook_url().is_none());
    }

    #[test]
    fn test_validation() {
        let blank_secret = ApiConfig {
            jwt_secret: "  ".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(blank_secret.validate(), Err(ConfigError::MissingRequired(_))));

        let tax = ApiConfig {
            tax_rate_bps: 10_001,
            ..ApiConfig::default()
        };
        assert!(matches!(tax.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_underpayment_policy_reaches_checkout() {
        assert!(!ApiConfig::default().checkout_config().allow_underpayment);

        let lenient = ApiConfig {
            allow_underpayment: true,
            tax_rate_bps: 0,
            ..ApiConfig::default()
        };
        let checkout = lenient.checkout_config();
        assert!(checkout.allow_underpayment);
        assert_eq!(checkout.tax_rate, TaxRate::zero());
    }

    #[test]
    fn test_blank_webhook_is_disabled() {
        let config = ApiConfig {
            notification_webhook_url: Some("   ".to_string()),
            ..ApiConfig::default()
        };
        assert!(config.webhook_url().is_none());
    }
}
