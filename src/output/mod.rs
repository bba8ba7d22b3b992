//! Output module for persisting crawl results
//!
//! This module handles:
//! - Building the union-of-columns dataset from extracted records
//! - Writing the dated dataset and its "latest" alias
//! - Checkpointing fetched page bodies
//! - Reporting per-column null rates after each run

mod checkpoint;
mod dataset;
mod quality;

pub use checkpoint::{checkpoint_path, read_page_checkpoint, write_page_checkpoint};
pub use dataset::{dataset_path, latest_path, persist, PersistedPaths, RawDataset};
pub use quality::{null_rates_path, print_null_rates, write_null_rates, NullRates};

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed file: {0}")]
    Format(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Wraps an output error with the path it concerns
pub(crate) fn write_error(path: &Path, source: impl Into<OutputError>) -> crate::ScrapeError {
    crate::ScrapeError::Write {
        path: path.to_path_buf(),
        source: source.into(),
    }
}
