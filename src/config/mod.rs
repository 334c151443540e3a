//! Harvest settings read from a TOML file
//!
//! Tables: `[harvest]`, `[quota]`, `[retry]`, `[api]` (optional) and `[output]`.
//! Keys are kebab-case. Every loaded file is validated before use.
//!
//! # Example
//!
//! ```no_run
//! use steam_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Discovery will walk {} hops", config.harvest.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    ApiConfig, Config, HarvestConfig, OutputConfig, QuotaConfig, RetryConfig, API_KEY_ENV,
    DEFAULT_BASE_URL,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
