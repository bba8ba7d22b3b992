//! Configuration module for Boligscrape
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use boligscrape::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("boligscrape.toml")).unwrap();
//! println!("Crawling from: {}", config.site.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
