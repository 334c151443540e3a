//! Steam-Harvest: a resumable social-graph harvester
//!
//! This crate walks the friends graph reachable from a seed account on the
//! Steam Web API and, for every account it discovers, harvests the profile,
//! owned games and friend relationships through a quota-aware client. A
//! durable ledger records the outcome for every account so an interrupted
//! run can be resumed without refetching finished work.

pub mod api;
pub mod config;
pub mod graph;
pub mod harvest;
pub mod ids;
pub mod ledger;
pub mod output;

use thiserror::Error;

/// Anything that can end a harvest run early
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] ledger::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("API call failed: {0}")]
    Call(#[from] api::CallError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Harvest task failed: {0}")]
    Task(String),
}

/// Problems with the configuration file or environment
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid setting: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("No API key configured (set api.api-key or the {0} environment variable)")]
    MissingApiKey(&'static str),
}

pub type Result<T> = std::result::Result<T, HarvestError>;

pub use api::{CallError, RateLimitedClient, RemoteApi, RemoteError, SteamWebApi};
pub use config::Config;
pub use graph::discover;
pub use harvest::{run_harvest, HarvestRecord, HarvestReport, Harvester};
pub use ids::NodeId;
pub use ledger::{Ledger, Outcome};
