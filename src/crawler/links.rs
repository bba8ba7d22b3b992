//! Detail-link extraction from listing-index pages
//!
//! Every listing on an index page is wrapped in a container element holding an
//! anchor to the listing's detail page. Extraction is pure: same body, same
//! links, in document order.

use crate::config::SiteConfig;
use crate::crawler::IndexPage;
use crate::ScrapeError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Compiled selectors used on index pages
#[derive(Debug, Clone)]
pub struct IndexSelectors {
    /// Element present only on an empty results page
    pub sentinel: Selector,

    /// Container around one listing link
    pub listing: Selector,

    anchor: Selector,
}

impl IndexSelectors {
    /// Compiles the selectors named in the site configuration
    pub fn from_config(site: &SiteConfig) -> Result<Self, ScrapeError> {
        Ok(Self {
            sentinel: compile(&site.sentinel_selector)?,
            listing: compile(&site.listing_selector)?,
            anchor: compile("a[href]")?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|_| ScrapeError::Selector(selector.to_string()))
}

/// Extracts the detail-page links from one index-page body
///
/// For each listing container (in document order) the first anchor carrying an
/// `href` is taken. Containers without one contribute nothing. Relative hrefs
/// are resolved against `base`.
///
/// # Example
///
/// ```no_run
/// use boligscrape::config::SiteConfig;
/// use boligscrape::crawler::{extract_links, IndexSelectors};
/// use url::Url;
///
/// # fn example(site: &SiteConfig) -> Result<(), boligscrape::ScrapeError> {
/// let selectors = IndexSelectors::from_config(site)?;
/// let base = Url::parse("https://www.boligportal.dk/")?;
/// let html = r#"<div class="css-krvsu4"><a href="/lejligheder/id-1">1</a></div>"#;
/// let links = extract_links(html, &selectors, &base);
/// assert_eq!(links, vec!["https://www.boligportal.dk/lejligheder/id-1".to_string()]);
/// # Ok(())
/// # }
/// ```
pub fn extract_links(body: &str, selectors: &IndexSelectors, base: &Url) -> Vec<String> {
    let document = Html::parse_document(body);

    document
        .select(&selectors.listing)
        .filter_map(|container| container.select(&selectors.anchor).next())
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_link(href, base))
        .collect()
}

/// Extracts links from every page, keeping page order and dropping repeats
///
/// A listing shown on two index pages (the result set shifted while paging)
/// is kept at its first position only.
pub fn collect_links(pages: &[IndexPage], selectors: &IndexSelectors, base: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for page in pages {
        let page_links = extract_links(&page.body, selectors, base);
        tracing::debug!(offset = page.offset, count = page_links.len(), "Extracted links");

        for link in page_links {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
