//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::time::Duration;

use auditlens_core::{DuplicatePolicy, PipelineConfig};

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 10)
    pub body_limit_mb: usize,
    /// Request timeout in seconds (default: 300; runs are long-lived)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 5)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 10)
    pub rate_limit_burst: u32,
    /// Postgres connection string; memory store fallback when unset
    pub database_url: Option<String>,
    /// Path to the rules JSON file (default: rules.json)
    pub rules_path: String,
    /// Object gateway base URL
    pub object_gateway_url: String,
    /// Object gateway bearer token
    pub object_gateway_api_key: Option<String>,
    /// Vision classifier base URL
    pub classifier_url: String,
    /// Vision classifier bearer token
    pub classifier_api_key: Option<String>,
    /// Prefix for file_url synthesis on image records
    pub object_url_prefix: Option<String>,
    /// Maximum Hamming distance for near-duplicate matching (default: 10)
    pub dedup_threshold: u32,
    /// Recency window in days for listing and dedup priors (default: 30)
    pub recent_days: i64,
    /// Maximum in-flight items per run (default: 6)
    pub concurrency: usize,
    /// Duplicate handling: "override_to_fail" or "flag_only"
    pub duplicate_policy: DuplicatePolicy,
    /// Timeout in seconds for each fetch/classify/persist call (default: 15)
    pub call_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 10,
            timeout_secs: 300,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 5,
            rate_limit_burst: 10,
            database_url: None,
            rules_path: "rules.json".into(),
            object_gateway_url: "http://127.0.0.1:8500".into(),
            object_gateway_api_key: None,
            classifier_url: "http://127.0.0.1:8600".into(),
            classifier_api_key: None,
            object_url_prefix: None,
            dedup_threshold: 10,
            recent_days: 30,
            concurrency: 6,
            duplicate_policy: DuplicatePolicy::OverrideToFail,
            call_timeout_secs: 15,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled
        // with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let duplicate_policy = match std::env::var("DUPLICATE_POLICY").ok().as_deref() {
            Some("flag_only") => DuplicatePolicy::FlagOnly,
            _ => DuplicatePolicy::OverrideToFail,
        };

        Self {
            port: env_parsed("PORT", defaults.port),
            host,
            allowed_origins,
            body_limit_mb: env_parsed("BODY_LIMIT_MB", defaults.body_limit_mb),
            timeout_secs: env_parsed("REQUEST_TIMEOUT_SECS", defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parsed("RATE_LIMIT_PER_SEC", defaults.rate_limit_per_sec),
            rate_limit_burst: env_parsed("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            database_url: std::env::var("DATABASE_URL").ok(),
            rules_path: std::env::var("RULES_PATH").unwrap_or(defaults.rules_path),
            object_gateway_url: std::env::var("OBJECT_GATEWAY_URL")
                .unwrap_or(defaults.object_gateway_url),
            object_gateway_api_key: std::env::var("OBJECT_GATEWAY_API_KEY").ok(),
            classifier_url: std::env::var("CLASSIFIER_URL").unwrap_or(defaults.classifier_url),
            classifier_api_key: std::env::var("CLASSIFIER_API_KEY").ok(),
            object_url_prefix: std::env::var("OBJECT_URL_PREFIX").ok(),
            dedup_threshold: env_parsed("DEDUP_THRESHOLD", defaults.dedup_threshold),
            recent_days: env_parsed("RECENT_DAYS", defaults.recent_days),
            concurrency: env_parsed("CONCURRENCY", defaults.concurrency),
            duplicate_policy,
            call_timeout_secs: env_parsed("CALL_TIMEOUT_SECS", defaults.call_timeout_secs),
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Pipeline tunables derived from this config
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            concurrency: self.concurrency,
            dedup_threshold: self.dedup_threshold,
            recent_window_days: self.recent_days,
            duplicate_policy: self.duplicate_policy,
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            object_url_prefix: self.object_url_prefix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(!config.rate_limit_enabled);
        assert!(config.database_url.is_none());
        assert_eq!(config.concurrency, 6);
    }

    #[test]
    fn test_pipeline_config_derivation() {
        let config = Config {
            concurrency: 2,
            dedup_threshold: 4,
            recent_days: 7,
            call_timeout_secs: 5,
            ..Config::default()
        };
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.concurrency, 2);
        assert_eq!(pipeline.dedup_threshold, 4);
        assert_eq!(pipeline.recent_window_days, 7);
        assert_eq!(pipeline.call_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
    }
}
