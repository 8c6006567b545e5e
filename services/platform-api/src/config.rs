//! Configuration for the platform API service.

use std::time::Duration;

use fanvault_access_core::AccessConfig;
use fanvault_billing_core::BillingConfig;

/// Minimum length of the media signing secret
const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Longest fallback billing period accepted (ten years)
const MAX_DEFAULT_PERIOD_DAYS: u64 = 3660;

/// Platform API configuration
#[derive(Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL; in-memory store when absent
    pub database_url: Option<String>,
    /// Content access configuration
    pub access: AccessConfig,
    /// Billing event configuration
    pub billing: BillingConfig,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let http_port = parse_or(&lookup, "HTTP_PORT", 8080)?;

        // Billing
        let stripe_webhook_secret =
            lookup("STRIPE_WEBHOOK_SECRET").ok_or(ConfigError::Missing("STRIPE_WEBHOOK_SECRET"))?;
        let tolerance_secs: u64 = parse_or(&lookup, "WEBHOOK_TOLERANCE_SECS", 300)?;
        let dedup_capacity: u64 = parse_or(&lookup, "WEBHOOK_DEDUP_CAPACITY", 10_000)?;
        let dedup_retention_secs: u64 = parse_or(&lookup, "WEBHOOK_DEDUP_RETENTION_SECS", 86_400)?;
        let default_period_days: u64 = parse_or(&lookup, "DEFAULT_PERIOD_DAYS", 30)?;
        if default_period_days == 0 || default_period_days > MAX_DEFAULT_PERIOD_DAYS {
            return Err(ConfigError::Invalid("DEFAULT_PERIOD_DAYS"));
        }

        // Media
        let media_base_url =
            lookup("MEDIA_BASE_URL").ok_or(ConfigError::Missing("MEDIA_BASE_URL"))?;
        let media_signing_secret =
            lookup("MEDIA_SIGNING_SECRET").ok_or(ConfigError::Missing("MEDIA_SIGNING_SECRET"))?;
        if media_signing_secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(ConfigError::Invalid("MEDIA_SIGNING_SECRET"));
        }
        let media_url_ttl_secs: u64 = parse_or(&lookup, "MEDIA_URL_TTL_SECS", 3600)?;
        let view_dedup_window_secs: u64 = parse_or(&lookup, "VIEW_DEDUP_WINDOW_SECS", 300)?;

        // Server
        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let metrics_enabled = parse_or(&lookup, "METRICS_ENABLED", true)?;

        let access = AccessConfig::new(media_base_url, media_signing_secret)
            .with_media_url_ttl(Duration::from_secs(media_url_ttl_secs))
            .with_view_dedup_window(Duration::from_secs(view_dedup_window_secs));

        let billing = BillingConfig::new(stripe_webhook_secret)
            .with_signature_tolerance(Duration::from_secs(tolerance_secs))
            .with_dedup(dedup_capacity, Duration::from_secs(dedup_retention_secs))
            .with_default_period_days(default_period_days);

        Ok(Self {
            http_port,
            database_url,
            access,
            billing,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_port", &self.http_port)
            .field("database", &self.database_url.as_ref().map(|_| "postgres"))
            .field("media_base_url", &self.access.media_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish_non_exhaustive()
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("STRIPE_WEBHOOK_SECRET", "whsec_test"),
        ("MEDIA_BASE_URL", "https://media.example.com"),
        ("MEDIA_SIGNING_SECRET", "0123456789abcdef0123456789abcdef"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.http_port, 8080);
        assert!(config.database_url.is_none());
        assert_eq!(config.billing.signature_tolerance, Duration::from_secs(300));
        assert_eq!(config.billing.dedup_capacity, 10_000);
        assert_eq!(config.access.media_url_ttl, Duration::from_secs(3600));
        assert_eq!(config.access.view_dedup_window, Duration::from_secs(300));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_missing_webhook_secret() {
        let err = Config::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("STRIPE_WEBHOOK_SECRET")));
    }

    #[test]
    fn test_short_signing_secret_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars[2] = ("MEDIA_SIGNING_SECRET", "short");
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MEDIA_SIGNING_SECRET")));
    }

    #[test]
    fn test_invalid_number() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("HTTP_PORT", "eighty"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("HTTP_PORT")));
    }

    #[test]
    fn test_default_period_bounds() {
        for days in ["0", "200000000"] {
            let mut vars = REQUIRED.to_vec();
            vars.push(("DEFAULT_PERIOD_DAYS", days));
            let err = Config::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid("DEFAULT_PERIOD_DAYS")));
        }

        let mut vars = REQUIRED.to_vec();
        vars.push(("DEFAULT_PERIOD_DAYS", "365"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.billing.default_period, Duration::from_secs(365 * 24 * 60 * 60));
    }

    #[test]
    fn test_blank_database_url_means_memory() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("DATABASE_URL", "  "));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("whsec_test"));
        assert!(!rendered.contains("0123456789abcdef"));
    }
}
