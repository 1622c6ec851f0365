//! Configuration module for Campus-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use campus_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawling {} site domains", config.crawler.site_domains.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, BrowserMode, Config, CrawlerConfig, FormatConfig, StorageConfig,
    UserAgentConfig, VideoConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

pub(crate) use validation::validate_seed_url;
