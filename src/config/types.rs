use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable consulted when `api.api-key` is not set
pub const API_KEY_ENV: &str = "STEAM_API_KEY";

/// Default Steam Web API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.steampowered.com";

/// Main configuration structure for Steam-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvest: HarvestConfig,
    pub quota: QuotaConfig,
    pub retry: RetryConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub output: OutputConfig,
}

/// Graph discovery and harvesting behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Account the breadth-first discovery starts from
    pub seed: String,

    /// Maximum number of friend hops from the seed
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of accounts harvested concurrently
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// Re-attempt accounts whose last outcome was an authorization denial
    #[serde(rename = "retry-denied", default)]
    pub retry_denied: bool,
}

/// Global call budget
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// Maximum number of logical calls per window
    #[serde(rename = "daily-limit")]
    pub daily_limit: u64,

    /// Length of the quota window in seconds
    #[serde(rename = "reset-window-secs")]
    pub reset_window_secs: u64,
}

impl QuotaConfig {
    pub fn reset_window(&self) -> Duration {
        Duration::from_secs(self.reset_window_secs)
    }
}

/// Backoff policy for rate-limited calls
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per logical call
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Remote API connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// API key; falls back to the `STEAM_API_KEY` environment variable
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Resolves the API key from the config file or the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite ledger database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the JSON file receiving harvested records
    #[serde(rename = "results-path")]
    pub results_path: String,

    /// Path to the markdown run summary
    #[serde(rename = "summary-path")]
    pub summary_path: String,

    /// Path to the append-only error log
    #[serde(rename = "error-log-path")]
    pub error_log_path: String,
}

impl OutputConfig {
    /// Creates the parent directories of every output path
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for path in [
            &self.database_path,
            &self.results_path,
            &self.summary_path,
            &self.error_log_path,
        ] {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        Ok(())
    }
}
