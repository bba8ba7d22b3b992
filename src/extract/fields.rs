//! Per-field extraction steps
//!
//! Each step looks at an already parsed detail page and either returns the
//! field's value or says why it could not. Steps share nothing, so one failing
//! never affects another.
//!
//! A step fails only when the markup it needs is not there. An element that is
//! present but holds no text yields an empty string.

use crate::extract::record::{Field, NO_ENERGY_MARK};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

// Markup contract of the listing detail page
const BREADCRUMB_ITEMS: &str = ".css-7kp13n a";
const TITLE: &str = "h3.css-1o5zkyw";
const DESCRIPTION: &str = "div.css-1f7mpex";
const ADDRESS_PARTS: &str = "div.css-o9y6d5";
const MONTHLY_RENT: &str = ".css-woykcw .css-1fhvb05";
const PRICE_ROWS: &str = ".css-30nv8k";
const AVAILABLE_FROM: &str = ".css-2kngtw";
const RENTAL_TERMS: &str = ".css-14bctuo";
const CHARACTERISTIC_ROW: &str = ".css-1n6wxiw";
const CHARACTERISTIC_LABEL: &str = ".css-1td16zm";
const CHARACTERISTIC_VALUE: &str = ".css-1f8murc";
const ENERGY_MARK: &str = "img.css-rdsunt";

/// Why a single field could not be extracted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("no element matches '{selector}'")]
    Missing { selector: &'static str },

    #[error("expected at least {expected} elements matching '{selector}', found {found}")]
    TooFew {
        selector: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("element '{selector}' has no '{attribute}' attribute")]
    MissingAttribute {
        selector: &'static str,
        attribute: &'static str,
    },

    #[error("field '{0}' has no single-column value")]
    NotAColumn(Field),

    #[error("selector '{0}' does not parse")]
    InvalidSelector(&'static str),
}

/// Extracts one column field from the document
pub fn extract_field(document: &Html, field: Field) -> Result<String, FieldError> {
    match field {
        Field::Breadcrumb => breadcrumb(document),
        Field::Title => nth_text(document, TITLE, 0),
        Field::Description => nth_text(document, DESCRIPTION, 0),
        Field::Address => {
            let street = nth_text(document, ADDRESS_PARTS, 0)?;
            let city = nth_text(document, ADDRESS_PARTS, 1)?;
            Ok(format!("{}, {}", street, city))
        }
        Field::MonthlyRent => nth_text(document, MONTHLY_RENT, 0).map(|rent| rent + " kr."),
        Field::MonthlyAconto => nth_text(document, PRICE_ROWS, 0),
        Field::MoveInPrice => nth_text(document, PRICE_ROWS, 1),
        Field::AvailableFrom => nth_text(document, AVAILABLE_FROM, 0),
        Field::RentalPeriod => nth_text(document, RENTAL_TERMS, 1),
        Field::EnergyMarkSrc => energy_mark_src(document),
        // See `characteristics`
        Field::Characteristics => Err(FieldError::NotAColumn(field)),
    }
}

/// Extracts the label/value pairs of the attribute table
///
/// Rows without a value element are skipped, as are rows whose label is
/// missing or blank. A value element without text gives an empty value. A page
/// with no attribute table yields an empty list.
pub fn characteristics(document: &Html) -> Result<Vec<(String, String)>, FieldError> {
    let row = compile(CHARACTERISTIC_ROW)?;
    let label = compile(CHARACTERISTIC_LABEL)?;
    let value = compile(CHARACTERISTIC_VALUE)?;

    let mut pairs = Vec::new();
    for element in document.select(&row) {
        let Some(value_el) = element.select(&value).next() else {
            continue;
        };

        let label_text = element.select(&label).next().map(element_text);
        let value_text = element_text(value_el);

        match label_text {
            Some(l) if !l.is_empty() => pairs.push((l, value_text)),
            _ => tracing::debug!("Skipping characteristic row without label"),
        }
    }

    Ok(pairs)
}

/// Breadcrumb items joined with `" > "`; no items gives an empty trail
fn breadcrumb(document: &Html) -> Result<String, FieldError> {
    let selector = compile(BREADCRUMB_ITEMS)?;
    let items: Vec<String> = document.select(&selector).map(element_text).collect();
    Ok(items.join(" > "))
}

/// `src` of the energy-mark image, or the `"none"` marker when there is no image
fn energy_mark_src(document: &Html) -> Result<String, FieldError> {
    let selector = compile(ENERGY_MARK)?;

    let Some(image) = document.select(&selector).next() else {
        return Ok(NO_ENERGY_MARK.to_string());
    };

    let src = image
        .value()
        .attr("src")
        .ok_or(FieldError::MissingAttribute {
            selector: ENERGY_MARK,
            attribute: "src",
        })?;

    Ok(src.trim().to_string())
}

/// Text of the `n`-th element (zero based) matching `css`
fn nth_text(document: &Html, css: &'static str, n: usize) -> Result<String, FieldError> {
    let selector = compile(css)?;
    let matches: Vec<ElementRef> = document.select(&selector).collect();

    match matches.get(n) {
        Some(element) => Ok(element_text(*element)),
        None if matches.is_empty() => Err(FieldError::Missing { selector: css }),
        None => Err(FieldError::TooFew {
            selector: css,
            expected: n + 1,
            found: matches.len(),
        }),
    }
}

/// Concatenation of the element's trimmed text nodes
pub(crate) fn element_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

fn compile(css: &'static str) -> Result<Selector, FieldError> {
    Selector::parse(css).map_err(|_| FieldError::InvalidSelector(css))
}
