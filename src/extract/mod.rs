//! Field extraction from listing detail pages
//!
//! [`extract_listing`] turns one fetched detail page into a [`ListingRecord`].
//! Every field is extracted on its own: a missing element makes that field
//! absent, is logged with the URL and field name, and is returned
//! as a [`FieldFailure`] next to the record. The record itself never fails;
//! in the worst case it carries only its URL.

mod fields;
mod record;

pub use fields::{characteristics, extract_field, FieldError};
pub use record::{is_reserved_column, Field, ListingRecord, MAX_CHARACTERISTICS, NO_ENERGY_MARK};

use scraper::Html;

/// One field that could not be extracted from one listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    pub url: String,
    pub field: Field,
    pub error: FieldError,
}

/// Result of extracting one detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub record: ListingRecord,
    pub failures: Vec<FieldFailure>,
}

/// Extracts all known fields from a detail-page body
///
/// # Example
///
/// ```
/// use boligscrape::extract::{extract_listing, Field};
///
/// let html = r#"<h3 class="css-1o5zkyw">Lys 2-værelses</h3>"#;
/// let extraction = extract_listing(html, "https://www.boligportal.dk/lejligheder/id-1");
///
/// assert_eq!(extraction.record.title.as_deref(), Some("Lys 2-værelses"));
/// assert_eq!(extraction.record.energy_mark_src.as_deref(), Some("none"));
/// assert!(extraction.failures.iter().any(|f| f.field == Field::Address));
/// ```
pub fn extract_listing(body: &str, url: &str) -> Extraction {
    let document = Html::parse_document(body);
    let mut record = ListingRecord::new(url);
    let mut failures = Vec::new();

    for field in Field::COLUMNS {
        match extract_field(&document, field) {
            Ok(value) => record.set(field, Some(value)),
            Err(error) => {
                tracing::error!(url, %field, %error, "Error extracting field");
                failures.push(FieldFailure {
                    url: url.to_string(),
                    field,
                    error,
                });
            }
        }
    }

    match characteristics(&document) {
        Ok(pairs) => {
            for (label, value) in pairs {
                if !record.insert_characteristic(label.clone(), value) {
                    tracing::debug!(url, %label, "Dropped characteristic");
                }
            }
        }
        Err(error) => {
            tracing::error!(url, field = %Field::Characteristics, %error, "Error extracting field");
            failures.push(FieldFailure {
                url: url.to_string(),
                field: Field::Characteristics,
                error,
            });
        }
    }

    Extraction { record, failures }
}
