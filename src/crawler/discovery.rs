//! Index-page discovery
//!
//! Index pages are requested one after another with a growing `offset` query
//! parameter. Each step decides whether to continue based on the previous
//! response, so this loop never runs concurrently.

use crate::config::SiteConfig;
use crate::crawler::fetcher::fetch_page;
use crate::crawler::links::IndexSelectors;
use crate::ScrapeError;
use reqwest::Client;
use scraper::Html;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One page of search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPage {
    /// Offset the page was requested with
    pub offset: u64,

    /// Raw document text
    pub body: String,
}

/// Why discovery stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryEnd {
    /// The empty-results sentinel was rendered
    Sentinel,

    /// An index request after the first one failed
    FetchFailed,

    /// The configured page cap was reached
    PageCap,

    /// The cancellation token fired
    Cancelled,
}

/// Pages collected by one discovery run
#[derive(Debug, Clone)]
pub struct Discovery {
    pub pages: Vec<IndexPage>,
    pub end: DiscoveryEnd,
}

/// Builds the index URL for a given offset
///
/// The offset is appended to whatever query the base URL already carries.
pub fn index_url(base_url: &str, offset: u64) -> Result<Url, ScrapeError> {
    let mut url = Url::parse(base_url)?;
    url.query_pairs_mut()
        .append_pair("offset", &offset.to_string());
    Ok(url)
}

/// Returns true if the body contains the empty-results sentinel
pub fn has_sentinel(body: &str, selectors: &IndexSelectors) -> bool {
    let document = Html::parse_document(body);
    let found = document.select(&selectors.sentinel).next().is_some();
    found
}

/// Requests index pages until the sentinel appears or a request fails
///
/// # Termination
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | first request fails | `Err(ScrapeError::FirstPage)` |
/// | later request fails | stop, keep pages so far |
/// | sentinel present | stop, sentinel page not kept |
/// | `max_pages` reached | stop with a warning |
/// | token cancelled before first request | `Err(ScrapeError::Cancelled)` |
/// | token cancelled later | stop, keep pages so far |
pub async fn discover(
    client: &Client,
    site: &SiteConfig,
    selectors: &IndexSelectors,
    max_pages: u32,
    cancel: &CancellationToken,
) -> Result<Discovery, ScrapeError> {
    let mut pages = Vec::new();
    let mut index: u64 = 0;

    let end = loop {
        if cancel.is_cancelled() {
            if index == 0 {
                return Err(ScrapeError::Cancelled);
            }
            tracing::info!(pages = pages.len(), "Discovery cancelled");
            break DiscoveryEnd::Cancelled;
        }

        if index >= u64::from(max_pages) {
            tracing::warn!(
                max_pages,
                "Page cap reached before the empty-results sentinel appeared"
            );
            break DiscoveryEnd::PageCap;
        }

        let offset = site.page_size * index;
        let url = index_url(&site.base_url, offset)?;
        let result = fetch_page(client, url.as_str()).await;

        let body = match (result.body, result.failure) {
            (Some(body), None) => body,
            (_, failure) => {
                let reason = failure
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "no body".to_string());

                if index == 0 {
                    return Err(ScrapeError::FirstPage {
                        url: url.to_string(),
                        reason,
                    });
                }

                tracing::warn!(page = index + 1, url = %url, %reason, "Failed to retrieve index page");
                break DiscoveryEnd::FetchFailed;
            }
        };

        if has_sentinel(&body, selectors) {
            tracing::info!(page = index + 1, "Stopping at empty-results sentinel");
            break DiscoveryEnd::Sentinel;
        }

        tracing::debug!(page = index + 1, offset, "Index page scraped");
        pages.push(IndexPage { offset, body });
        index += 1;
    };

    tracing::info!(pages = pages.len(), ?end, "Discovery finished");
    Ok(Discovery { pages, end })
}
