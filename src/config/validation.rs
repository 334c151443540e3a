use crate::config::types::{ApiConfig, Config, HarvestConfig, OutputConfig, QuotaConfig, RetryConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_quota_config(&config.quota)?;
    validate_retry_config(&config.retry)?;
    validate_api_config(&config.api)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.seed.is_empty() {
        return Err(ConfigError::Validation("seed cannot be empty".to_string()));
    }

    if config.seed.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "seed must not contain whitespace, got '{}'",
            config.seed
        )));
    }

    if config.max_workers < 1 || config.max_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 64, got {}",
            config.max_workers
        )));
    }

    Ok(())
}

fn validate_quota_config(config: &QuotaConfig) -> Result<(), ConfigError> {
    if config.daily_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "daily_limit must be >= 1, got {}",
            config.daily_limit
        )));
    }

    if config.reset_window_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "reset_window_secs must be >= 1, got {}",
            config.reset_window_secs
        )));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("database_path", &config.database_path),
        ("results_path", &config.results_path),
        ("summary_path", &config.summary_path),
        ("error_log_path", &config.error_log_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}
