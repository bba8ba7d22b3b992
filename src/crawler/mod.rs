//! Crawler module for index discovery and detail-page fetching
//!
//! This module contains the crawl-and-extract pipeline, including:
//! - HTTP fetching without retries
//! - Sequential discovery of index pages until the empty-results sentinel
//! - Detail-link extraction from index pages
//! - Bounded, order-preserving fetching of detail pages
//! - Overall run coordination

mod coordinator;
mod discovery;
mod fetcher;
mod links;
mod pool;

pub use coordinator::{extract_all, rebuild_from_checkpoint, Coordinator, Extracted, RunReport};
pub use discovery::{discover, has_sentinel, index_url, Discovery, DiscoveryEnd, IndexPage};
pub use fetcher::{build_http_client, fetch_page, format_user_agent, FetchFailure, FetchResult};
pub use links::{collect_links, extract_links, IndexSelectors};
pub use pool::fetch_all;

use crate::config::Config;
use crate::ScrapeError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Discover index pages until the sentinel, a failed request or the page cap
/// 2. Collect the detail links from every index page
/// 3. Fetch all detail pages with bounded concurrency
/// 4. Extract one record per fetched page
/// 5. Write the dated dataset, its "latest" alias and the null-rate report
///
/// # Returns
///
/// * `Ok(RunReport)` - A dataset was written
/// * `Err(ScrapeError)` - No dataset exists (first page failed, cancelled, or write failed)
pub async fn crawl(config: Config, cancel: CancellationToken) -> Result<RunReport, ScrapeError> {
    let mut coordinator = Coordinator::new(config, cancel)?;
    coordinator.run().await
}
