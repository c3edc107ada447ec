//! Configuration module for Holdings-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use holdings_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.max_concurrent_fetches);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExtractorConfig, KeyField, OutputConfig, RecordsConfig, RetryConfig,
    SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{hash_config_text, load_config, load_config_with_hash, parse_config};

pub use validation::validate;

pub(crate) use validation::parse_selector;
