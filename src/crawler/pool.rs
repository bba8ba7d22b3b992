//! Bounded, order-preserving detail-page fetching
//!
//! Every link gets exactly one attempt and exactly one result slot. Result `i`
//! always belongs to link `i`; failures are represented, not dropped.

use crate::crawler::fetcher::{fetch_page, FetchFailure, FetchResult};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

/// Fetches all links with at most `concurrency` requests in flight
///
/// Once `cancel` fires, slots that have not started resolve to
/// [`FetchFailure::Cancelled`] without a request; in-flight requests finish or
/// time out on their own.
pub async fn fetch_all(
    client: &Client,
    links: &[String],
    concurrency: usize,
    cancel: &CancellationToken,
) -> Vec<FetchResult> {
    let concurrency = concurrency.max(1);
    tracing::info!(links = links.len(), concurrency, "Fetching detail pages");

    let results: Vec<FetchResult> = stream::iter(links.iter())
        .map(|url| {
            let client = client.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return FetchResult::failed(url.as_str(), FetchFailure::Cancelled);
                }

                let result = fetch_page(&client, url).await;
                if let Some(failure) = &result.failure {
                    tracing::warn!(url = %url, %failure, "Failed to retrieve detail page");
                }
                result
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    let ok = results.iter().filter(|r| r.ok()).count();
    tracing::info!(ok, failed = results.len() - ok, "Detail fetch finished");

    results
}
