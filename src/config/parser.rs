use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads, parses and validates a harvest configuration file
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

/// Parses TOML text into a validated [`Config`]
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let parsed: Config = toml::from_str(text)?;
    validate(&parsed)?;
    Ok(parsed)
}

/// Hex SHA-256 digest of a configuration file's raw bytes
///
/// Stored with every run so the ledger shows which settings produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    Ok(digest_text(&text))
}

fn digest_text(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Loads a configuration together with the digest of the text it came from
///
/// The file is read once, so the hash always matches the parsed settings.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let parsed = parse_config(&text)?;
    Ok((parsed, digest_text(&text)))
}
