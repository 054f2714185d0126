//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use domain::{CheckoutPolicy, Money};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset keeps everything in memory
/// - `CATALOG_SEED`: path to a JSON array of products loaded at start-up
/// - `FREE_DELIVERY_THRESHOLD_CENTS`, `DELIVERY_FEE_CENTS`, `TAX_RATE_BPS`,
///   `DELIVERY_LEAD_DAYS`, `ORDER_NUMBER_PREFIX`: checkout policy
///
/// Unparseable numbers fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub catalog_seed: Option<PathBuf>,
    pub policy: CheckoutPolicy,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from any variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let policy = defaults.policy.clone();
        let number = |name: &str| var(name).and_then(|v| v.trim().parse::<i64>().ok());

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match var("LOG_FORMAT").as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: var("DATABASE_URL").filter(|url| !url.is_empty()),
            catalog_seed: var("CATALOG_SEED")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            policy: CheckoutPolicy {
                free_delivery_threshold: number("FREE_DELIVERY_THRESHOLD_CENTS")
                    .map_or(policy.free_delivery_threshold, Money::from_cents),
                delivery_fee: number("DELIVERY_FEE_CENTS")
                    .map_or(policy.delivery_fee, Money::from_cents),
                tax_rate_bps: var("TAX_RATE_BPS")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(policy.tax_rate_bps),
                delivery_lead_days: number("DELIVERY_LEAD_DAYS")
                    .unwrap_or(policy.delivery_lead_days),
                order_number_prefix: var("ORDER_NUMBER_PREFIX")
                    .filter(|p| !p.is_empty())
                    .unwrap_or(policy.order_number_prefix),
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            catalog_seed: None,
            policy: CheckoutPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.policy, CheckoutPolicy::default());
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.policy.delivery_fee, Money::from_cents(499));
        assert_eq!(config.policy.order_number_prefix, "FC");
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/grocery"),
            ("CATALOG_SEED", "/etc/grocery/products.json"),
            ("FREE_DELIVERY_THRESHOLD_CENTS", "50000"),
            ("DELIVERY_FEE_CENTS", "299"),
            ("TAX_RATE_BPS", "500"),
            ("DELIVERY_LEAD_DAYS", "1"),
            ("ORDER_NUMBER_PREFIX", "GR"),
        ]);
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/grocery")
        );
        assert_eq!(
            config.catalog_seed,
            Some(PathBuf::from("/etc/grocery/products.json"))
        );
        assert_eq!(config.policy.free_delivery_threshold, Money::from_dollars(500));
        assert_eq!(config.policy.delivery_fee, Money::from_cents(299));
        assert_eq!(config.policy.tax_rate_bps, 500);
        assert_eq!(config.policy.delivery_lead_days, 1);
        assert_eq!(config.policy.order_number_prefix, "GR");
    }

    #[test]
    fn test_garbage_numbers_fall_back() {
        let config = from_pairs(&[("PORT", "http"), ("TAX_RATE_BPS", "-3"), ("DATABASE_URL", "")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.policy.tax_rate_bps, 800);
        assert!(config.database_url.is_none());
    }
}
