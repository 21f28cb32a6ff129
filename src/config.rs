//! # Configuration Module
//!
//! Environment-driven configuration for the core's runtime behavior,
//! covering every key documented in the component design's Configuration
//! Keys table. Loaded once via [`CoreConfig::from_env`] and threaded through
//! a [`crate::binding::ToolBinding`] at construction time.
//!
//! ## Environment Variables
//!
//! | Variable | Key | Default |
//! |---|---|---|
//! | `DYNTOOL_HTTP_TIMEOUT_MS` | `http_timeout_ms` | 30000 |
//! | `DYNTOOL_DISCOVERY_DEADLINE_MS` | `discovery_deadline_ms` | 300000 |
//! | `DYNTOOL_MAX_SPEC_BYTES` | `max_spec_bytes` | 52428800 (50 MiB) |
//! | `DYNTOOL_CACHE_TTL_S` | `cache_ttl_s` | 86400 (24h) |
//! | `DYNTOOL_MAX_RETRIES` | `max_retries` | 3 |
//! | `DYNTOOL_BACKOFF_BASE_MS` | `backoff_base_ms` | 1000 |
//! | `DYNTOOL_BACKOFF_MAX_MS` | `backoff_max_ms` | 3600000 (1h) |
//! | `DYNTOOL_DISCOVERY_CONCURRENCY` | (implementation detail, §5 default 5) | 5 |
//! | `DYNTOOL_PASSTHROUGH_MODE` | `passthrough_mode` | disabled |
//! | `DYNTOOL_FALLBACK_TO_SERVICE` | `fallback_to_service` | false |

use std::env;
use std::time::Duration;

/// How a tool-specific passthrough credential relates to the service credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughMode {
    Required,
    Optional,
    Disabled,
    Hybrid,
}

impl PassthroughMode {
    fn from_env_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "required" => PassthroughMode::Required,
            "optional" => PassthroughMode::Optional,
            "hybrid" => PassthroughMode::Hybrid,
            _ => PassthroughMode::Disabled,
        }
    }
}

/// Runtime configuration loaded from environment variables.
///
/// Every field has a documented default; a binding built without reading the
/// environment (e.g. in a test) should use [`CoreConfig::default`].
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub http_timeout: Duration,
    pub discovery_deadline: Duration,
    pub max_spec_bytes: usize,
    pub cache_ttl: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub discovery_concurrency: usize,
    pub discovery_paths: Vec<String>,
    pub discovery_subdomains: Vec<String>,
    pub hint_openapi_url: Option<String>,
    pub hint_api_format: Option<String>,
    pub passthrough_mode: PassthroughMode,
    pub fallback_to_service: bool,
    /// Redirects followed per outbound discovery fetch (§6 wire-level: redirect cap 10).
    pub redirect_cap: u8,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            http_timeout: Duration::from_millis(30_000),
            discovery_deadline: Duration::from_millis(300_000),
            max_spec_bytes: 50 * 1024 * 1024,
            cache_ttl: Duration::from_secs(86_400),
            max_retries: 3,
            backoff_base: Duration::from_millis(1_000),
            backoff_max: Duration::from_millis(3_600_000),
            discovery_concurrency: 5,
            discovery_paths: Vec::new(),
            discovery_subdomains: Vec::new(),
            hint_openapi_url: None,
            hint_api_format: None,
            passthrough_mode: PassthroughMode::Disabled,
            fallback_to_service: false,
            redirect_cap: 10,
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = CoreConfig::default();
        CoreConfig {
            http_timeout: env_millis("DYNTOOL_HTTP_TIMEOUT_MS", defaults.http_timeout),
            discovery_deadline: env_millis(
                "DYNTOOL_DISCOVERY_DEADLINE_MS",
                defaults.discovery_deadline,
            ),
            max_spec_bytes: env_usize("DYNTOOL_MAX_SPEC_BYTES", defaults.max_spec_bytes),
            cache_ttl: env_seconds("DYNTOOL_CACHE_TTL_S", defaults.cache_ttl),
            max_retries: env_u32("DYNTOOL_MAX_RETRIES", defaults.max_retries),
            backoff_base: env_millis("DYNTOOL_BACKOFF_BASE_MS", defaults.backoff_base),
            backoff_max: env_millis("DYNTOOL_BACKOFF_MAX_MS", defaults.backoff_max),
            discovery_concurrency: env_usize(
                "DYNTOOL_DISCOVERY_CONCURRENCY",
                defaults.discovery_concurrency,
            ),
            discovery_paths: env_list("DYNTOOL_DISCOVERY_PATHS"),
            discovery_subdomains: env_list("DYNTOOL_DISCOVERY_SUBDOMAINS"),
            hint_openapi_url: env::var("DYNTOOL_HINT_OPENAPI_URL").ok(),
            hint_api_format: env::var("DYNTOOL_HINT_API_FORMAT").ok(),
            passthrough_mode: env::var("DYNTOOL_PASSTHROUGH_MODE")
                .map(|v| PassthroughMode::from_env_str(&v))
                .unwrap_or(defaults.passthrough_mode),
            fallback_to_service: env::var("DYNTOOL_FALLBACK_TO_SERVICE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.fallback_to_service),
            redirect_cap: defaults.redirect_cap,
        }
    }
}

fn env_millis(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_seconds(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .ok()
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.max_spec_bytes, 50 * 1024 * 1024);
        assert_eq!(cfg.redirect_cap, 10);
    }

    #[test]
    fn passthrough_mode_parses_case_insensitively() {
        assert_eq!(PassthroughMode::from_env_str("REQUIRED"), PassthroughMode::Required);
        assert_eq!(PassthroughMode::from_env_str("bogus"), PassthroughMode::Disabled);
    }
}
