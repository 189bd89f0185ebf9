//! API Configuration Module
//!
//! Cache lifetimes, upstream hosts, header authentication and CORS settings.
//! Configuration is loaded from environment variables with defaults that
//! point at the live NCAA hosts.

use std::str::FromStr;
use std::time::Duration;

use boxscore_core::ConfigError;

pub const DEFAULT_WEB_BASE: &str = "https://www.ncaa.com";
pub const DEFAULT_DATA_BASE: &str = "https://data.ncaa.com/casablanca";
pub const DEFAULT_GRAPHQL_BASE: &str = "https://sdataprod.ncaa.com";

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // Authentication
    // ========================================================================
    /// Value the `x-ncaa-key` request header must carry. `None` disables the
    /// check.
    pub header_key: Option<String>,

    // ========================================================================
    // Cache
    // ========================================================================
    /// Lifetime of entries in the long tier (stats, rankings, schedules).
    pub long_ttl: Duration,

    /// Lifetime of entries in the short tier (games, scoreboards).
    pub short_ttl: Duration,

    /// Upper bound on a single upstream fetch, including body decode.
    pub fetch_timeout: Duration,

    /// How often expired entries are purged from both tiers.
    pub sweep_interval: Duration,

    // ========================================================================
    // Upstream hosts
    // ========================================================================
    pub web_base: String,
    pub data_base: String,
    pub graphql_base: String,

    // ========================================================================
    // Routing / CORS
    // ========================================================================
    /// Where `GET /` redirects.
    pub home_redirect: String,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins.
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Telemetry
    // ========================================================================
    /// Record Prometheus metrics and serve `/metrics`.
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            header_key: None,
            long_ttl: Duration::from_secs(30 * 60),
            short_ttl: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(15),
            sweep_interval: Duration::from_secs(5 * 60),
            web_base: DEFAULT_WEB_BASE.to_string(),
            data_base: DEFAULT_DATA_BASE.to_string(),
            graphql_base: DEFAULT_GRAPHQL_BASE.to_string(),
            home_redirect: "/openapi.json".to_string(),
            cors_origins: Vec::new(),
            cors_max_age_secs: 86400,
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `BOXSCORE_HEADER_KEY`: required `x-ncaa-key` value (falls back to `NCAA_HEADER_KEY`)
    /// - `BOXSCORE_LONG_TTL_SECS`: long tier lifetime (default: 1800)
    /// - `BOXSCORE_SHORT_TTL_SECS`: short tier lifetime (default: 60)
    /// - `BOXSCORE_FETCH_TIMEOUT_SECS`: upstream fetch limit (default: 15)
    /// - `BOXSCORE_SWEEP_INTERVAL_SECS`: expired entry purge interval (default: 300)
    /// - `BOXSCORE_WEB_BASE`, `BOXSCORE_DATA_BASE`, `BOXSCORE_GRAPHQL_BASE`: upstream hosts
    /// - `BOXSCORE_HOME_REDIRECT`: target of `GET /` (default: /openapi.json)
    /// - `BOXSCORE_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `BOXSCORE_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    /// - `BOXSCORE_METRICS_ENABLED`: `true`/`1` to record metrics (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let header_key = std::env::var("BOXSCORE_HEADER_KEY")
            .or_else(|_| std::env::var("NCAA_HEADER_KEY"))
            .ok()
            .filter(|key| !key.is_empty());

        let cors_origins = std::env::var("BOXSCORE_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            header_key,
            long_ttl: env_secs("BOXSCORE_LONG_TTL_SECS", defaults.long_ttl),
            short_ttl: env_secs("BOXSCORE_SHORT_TTL_SECS", defaults.short_ttl),
            fetch_timeout: env_secs("BOXSCORE_FETCH_TIMEOUT_SECS", defaults.fetch_timeout),
            sweep_interval: env_secs("BOXSCORE_SWEEP_INTERVAL_SECS", defaults.sweep_interval),
            web_base: env_base("BOXSCORE_WEB_BASE", defaults.web_base),
            data_base: env_base("BOXSCORE_DATA_BASE", defaults.data_base),
            graphql_base: env_base("BOXSCORE_GRAPHQL_BASE", defaults.graphql_base),
            home_redirect: std::env::var("BOXSCORE_HOME_REDIRECT")
                .unwrap_or(defaults.home_redirect),
            cors_origins,
            cors_max_age_secs: env_parse("BOXSCORE_CORS_MAX_AGE_SECS", defaults.cors_max_age_secs),
            metrics_enabled: std::env::var("BOXSCORE_METRICS_ENABLED")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("long_ttl", self.long_ttl),
            ("short_ttl", self.short_ttl),
            ("fetch_timeout", self.fetch_timeout),
            ("sweep_interval", self.sweep_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: "0".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        for (field, value) in [
            ("web_base", &self.web_base),
            ("data_base", &self.data_base),
            ("graphql_base", &self.graphql_base),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.clone(),
                    reason: "must be an http(s) URL".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.example.com
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern))
                        || origin_domain == pattern;
                }
            }
            false
        })
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_parse(key, default.as_secs()))
}

/// Upstream base from the environment, without a trailing slash.
fn env_base(key: &str, default: String) -> String {
    std::env::var(key)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.header_key.is_none());
        assert_eq!(config.long_ttl, Duration::from_secs(1800));
        assert_eq!(config.short_ttl, Duration::from_secs(60));
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
        assert_eq!(config.web_base, "https://www.ncaa.com");
        assert_eq!(config.home_redirect, "/openapi.json");
        assert!(config.metrics_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let config = ApiConfig {
            short_ttl: Duration::ZERO,
            ..ApiConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "short_ttl"
        ));
    }

    #[test]
    fn test_non_http_base_is_rejected() {
        let config = ApiConfig {
            data_base: "data.ncaa.com".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_origin_allowed_dev_mode() {
        let config = ApiConfig::default();
        assert!(config.is_origin_allowed("https://anything.example"));
    }

    #[test]
    fn test_origin_allowed_exact_and_wildcard() {
        let config = ApiConfig {
            cors_origins: vec![
                "https://scores.example.com".to_string(),
                "*.boxscore.run".to_string(),
            ],
            ..ApiConfig::default()
        };
        assert!(config.is_origin_allowed("https://scores.example.com"));
        assert!(config.is_origin_allowed("https://app.boxscore.run"));
        assert!(config.is_origin_allowed("https://boxscore.run"));
        assert!(!config.is_origin_allowed("https://evilboxscore.run"));
        assert!(!config.is_origin_allowed("https://other.example.com"));
    }
}
