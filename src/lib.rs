//! Boligscrape: a crawl-and-extract pipeline for apartment listings
//!
//! This crate discovers every listing-index page of a rental site, collects the
//! detail-page links, fetches the detail pages concurrently and extracts one
//! record per listing into a raw CSV dataset for the cleaning stage.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Boligscrape operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("First index page {url} could not be fetched: {reason}")]
    FirstPage { url: String, reason: String },

    #[error("Crawl cancelled before any index page was fetched")]
    Cancelled,

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: output::OutputError,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: output::OutputError,
    },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },

    #[error("Invalid CSS selector '{0}'")]
    Selector(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Boligscrape operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{FetchFailure, FetchResult, IndexPage};
pub use extract::{extract_listing, Extraction, FieldError, FieldFailure, ListingRecord};
pub use output::RawDataset;
pub use state::RunState;
