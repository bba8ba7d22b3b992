use serde::Deserialize;

/// Main configuration structure for Boligscrape
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The listing site and the markup it uses for pagination
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Listing-index URL including any search query; the offset is appended
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of listings the site renders per index page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u64,

    /// Element rendered only on an empty results page
    #[serde(rename = "sentinel-selector", default = "default_sentinel_selector")]
    pub sentinel_selector: String,

    /// Container element wrapping one detail-page link on an index page
    #[serde(rename = "listing-selector", default = "default_listing_selector")]
    pub listing_selector: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Safety cap on the number of index pages requested
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Maximum number of concurrent detail-page fetches
    ///
    /// Defaults to the available parallelism of the host.
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Total time allowed for one request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Time allowed for establishing a connection (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the dated datasets and the "latest" alias
    #[serde(rename = "raw-dir", default = "default_raw_dir")]
    pub raw_dir: String,

    /// Directory receiving the per-run null-rate report
    #[serde(rename = "stats-dir", default = "default_stats_dir")]
    pub stats_dir: String,

    /// Whether to persist fetched detail-page bodies as a checkpoint
    #[serde(rename = "write-page-checkpoint", default = "default_true")]
    pub write_page_checkpoint: bool,
}

impl CrawlerConfig {
    /// Effective worker count for the detail-page pool
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            concurrency: None,
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            stats_dir: default_stats_dir(),
            write_page_checkpoint: true,
        }
    }
}

fn default_page_size() -> u64 {
    18
}

fn default_sentinel_selector() -> String {
    ".css-16snok8".to_string()
}

fn default_listing_selector() -> String {
    "div.css-krvsu4".to_string()
}

fn default_max_pages() -> u32 {
    500
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_raw_dir() -> String {
    "data/raw".to_string()
}

fn default_stats_dir() -> String {
    "outputs/stats".to_string()
}

fn default_true() -> bool {
    true
}
