//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives one crawl run through its phases:
//! - Discovering index pages
//! - Extracting and de-duplicating detail links
//! - Fetching detail pages with the bounded pool
//! - Extracting listing records
//! - Writing the dataset, the page checkpoint and the null-rate report
//!
//! The run either ends in `Written` with a (possibly imperfect) dataset, or in
//! `Failed` with a single error explaining why there is none.

use crate::config::Config;
use crate::crawler::discovery::{discover, DiscoveryEnd};
use crate::crawler::fetcher::{build_http_client, FetchFailure, FetchResult};
use crate::crawler::links::{collect_links, IndexSelectors};
use crate::crawler::pool::fetch_all;
use crate::extract::{extract_listing, FieldFailure, ListingRecord};
use crate::output::{
    persist, read_page_checkpoint, write_null_rates, write_page_checkpoint, NullRates,
    PersistedPaths, RawDataset,
};
use crate::state::RunState;
use crate::ScrapeError;
use chrono::NaiveDate;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use url::Url;

/// What one run did
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Final phase reached
    pub state: RunState,

    /// Index pages kept (sentinel page excluded)
    pub index_pages: usize,

    /// Why discovery stopped
    pub discovery_end: Option<DiscoveryEnd>,

    /// Unique detail links submitted to the pool
    pub links: usize,

    /// Detail pages retrieved
    pub fetched: usize,

    /// Detail pages that produced no record
    pub fetch_failures: Vec<(String, FetchFailure)>,

    /// Records in the dataset
    pub records: usize,

    /// Fields that could not be extracted
    pub field_failures: Vec<FieldFailure>,

    /// Page checkpoint written or replayed, if any
    pub checkpoint: Option<PathBuf>,

    /// Dated dataset and its "latest" alias
    pub dataset: Option<PersistedPaths>,

    /// Null-rate report, if it could be written
    pub null_rates: Option<PathBuf>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    client: Client,
    selectors: IndexSelectors,
    base: Url,
    cancel: CancellationToken,
    state: RunState,
    date: NaiveDate,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Output files are named after today's local date.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `cancel` - Token that stops discovery and the fetch pool when cancelled
    pub fn new(config: Config, cancel: CancellationToken) -> Result<Self, ScrapeError> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        let selectors = IndexSelectors::from_config(&config.site)?;
        let base = Url::parse(&config.site.base_url)?;

        Ok(Self {
            config,
            client,
            selectors,
            base,
            cancel,
            state: RunState::Idle,
            date: chrono::Local::now().date_naive(),
        })
    }

    /// Overrides the date used in output file names
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Current phase of the run
    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) -> Result<(), ScrapeError> {
        if !self.state.can_transition_to(next) {
            return Err(ScrapeError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(from = %self.state, to = %next, "Run state");
        self.state = next;
        Ok(())
    }

    /// Runs the crawl to completion
    pub async fn run(&mut self) -> Result<RunReport, ScrapeError> {
        let start_time = std::time::Instant::now();
        let mut report = RunReport::default();

        // Discovering
        self.transition(RunState::Discovering)?;
        let discovery = match discover(
            &self.client,
            &self.config.site,
            &self.selectors,
            self.config.crawler.max_pages,
            &self.cancel,
        )
        .await
        {
            Ok(discovery) => discovery,
            Err(e) => {
                self.transition(RunState::Failed)?;
                tracing::error!("Discovery failed: {}", e);
                return Err(e);
            }
        };
        report.index_pages = discovery.pages.len();
        report.discovery_end = Some(discovery.end);

        // LinksExtracted
        let links = collect_links(&discovery.pages, &self.selectors, &self.base);
        drop(discovery);
        report.links = links.len();
        self.transition(RunState::LinksExtracted)?;
        tracing::info!(
            pages = report.index_pages,
            links = report.links,
            "Detail links collected"
        );

        // Fetching
        self.transition(RunState::Fetching)?;
        let results = fetch_all(
            &self.client,
            &links,
            self.config.crawler.effective_concurrency(),
            &self.cancel,
        )
        .await;

        if self.config.output.write_page_checkpoint {
            match write_page_checkpoint(&results, Path::new(&self.config.output.raw_dir), self.date) {
                Ok((path, _)) => report.checkpoint = Some(path),
                Err(e) => tracing::warn!("Page checkpoint not written: {}", e),
            }
        }

        // Extracting
        self.transition(RunState::Extracting)?;
        let extracted = match extract_all(results).await {
            Ok(extracted) => extracted,
            Err(e) => {
                self.transition(RunState::Failed)?;
                tracing::error!("Extraction failed: {}", e);
                return Err(e);
            }
        };
        report.fetched = extracted.records.len();
        report.fetch_failures = extracted.fetch_failures;
        report.field_failures = extracted.field_failures;

        match write_outputs(&self.config, extracted.records, self.date) {
            Ok(outputs) => {
                report.records = outputs.rows;
                report.dataset = Some(outputs.paths);
                report.null_rates = outputs.null_rates;
            }
            Err(e) => {
                self.transition(RunState::Failed)?;
                tracing::error!("Dataset not written: {}", e);
                return Err(e);
            }
        }

        self.transition(RunState::Written)?;
        report.state = self.state;

        tracing::info!(
            records = report.records,
            fetch_failures = report.fetch_failures.len(),
            field_failures = report.field_failures.len(),
            "Crawl completed in {:?}",
            start_time.elapsed()
        );

        Ok(report)
    }
}

/// Records extracted from one batch of fetch results
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub records: Vec<ListingRecord>,
    pub fetch_failures: Vec<(String, FetchFailure)>,
    pub field_failures: Vec<FieldFailure>,
}

/// Files produced at the end of a run
struct Outputs {
    paths: PersistedPaths,
    rows: usize,
    null_rates: Option<PathBuf>,
}

/// Extracts records from the successful results
///
/// Failed results are returned as `(url, reason)` pairs and contribute no
/// record. Extraction runs on the blocking pool since parsed documents are
/// not `Send`.
pub async fn extract_all(results: Vec<FetchResult>) -> Result<Extracted, ScrapeError> {
    let mut pages = Vec::with_capacity(results.len());
    let mut fetch_failures = Vec::new();

    for result in results {
        match (result.body, result.failure) {
            (Some(body), None) => pages.push((result.url, body)),
            (_, failure) => fetch_failures.push((
                result.url,
                failure.unwrap_or_else(|| FetchFailure::Body("missing body".to_string())),
            )),
        }
    }

    let extractions = tokio::task::spawn_blocking(move || {
        pages
            .iter()
            .map(|(url, body)| extract_listing(body, url))
            .collect::<Vec<_>>()
    })
    .await?;

    let mut records = Vec::with_capacity(extractions.len());
    let mut field_failures = Vec::new();
    for extraction in extractions {
        records.push(extraction.record);
        field_failures.extend(extraction.failures);
    }

    Ok(Extracted {
        records,
        fetch_failures,
        field_failures,
    })
}

/// Persists the dataset, then the null-rate report
///
/// Only the dataset is fatal; a missing report is logged.
fn write_outputs(
    config: &Config,
    records: Vec<ListingRecord>,
    date: NaiveDate,
) -> Result<Outputs, ScrapeError> {
    let dataset = RawDataset::from_records(records);
    let paths = persist(&dataset, Path::new(&config.output.raw_dir), date)?;

    let rates = NullRates::from_dataset(&dataset);
    let null_rates = match write_null_rates(&rates, Path::new(&config.output.stats_dir), date) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!("Null-rate report not written: {}", e);
            None
        }
    };

    Ok(Outputs {
        paths,
        rows: dataset.len(),
        null_rates,
    })
}

/// Rebuilds the dataset from a page checkpoint without touching the network
pub async fn rebuild_from_checkpoint(
    config: &Config,
    checkpoint: &Path,
    date: NaiveDate,
) -> Result<RunReport, ScrapeError> {
    let results = read_page_checkpoint(checkpoint).map_err(|source| ScrapeError::Read {
        path: checkpoint.to_path_buf(),
        source,
    })?;
    tracing::info!(pages = results.len(), path = %checkpoint.display(), "Replaying page checkpoint");

    let mut report = RunReport {
        links: results.len(),
        checkpoint: Some(checkpoint.to_path_buf()),
        ..RunReport::default()
    };

    let extracted = extract_all(results).await?;
    report.fetched = extracted.records.len();
    report.fetch_failures = extracted.fetch_failures;
    report.field_failures = extracted.field_failures;

    let outputs = write_outputs(config, extracted.records, date)?;
    report.records = outputs.rows;
    report.dataset = Some(outputs.paths);
    report.null_rates = outputs.null_rates;
    report.state = RunState::Written;

    Ok(report)
}
