//! The per-listing record
//!
//! A record holds the stable fields every listing page is expected to carry,
//! each optional, plus an open-ended list of "detail characteristic" pairs
//! taken from the page's attribute table.

use std::fmt;

/// Value stored in `energy_mark_src` when the page has no energy-mark image
///
/// This is a real value, not an absence: a listing without a label is
/// distinct from a listing whose label could not be read.
pub const NO_ENERGY_MARK: &str = "none";

/// Upper bound on characteristic pairs kept per record
pub const MAX_CHARACTERISTICS: usize = 64;

/// Fields extracted from a detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Breadcrumb,
    Title,
    Description,
    Address,
    MonthlyRent,
    MonthlyAconto,
    MoveInPrice,
    AvailableFrom,
    RentalPeriod,
    EnergyMarkSrc,
    /// The attribute table as a whole
    Characteristics,
}

impl Field {
    /// Fields that map to exactly one dataset column, in column order
    pub const COLUMNS: [Field; 10] = [
        Field::Breadcrumb,
        Field::Title,
        Field::Description,
        Field::Address,
        Field::MonthlyRent,
        Field::MonthlyAconto,
        Field::MoveInPrice,
        Field::AvailableFrom,
        Field::RentalPeriod,
        Field::EnergyMarkSrc,
    ];

    /// Column name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breadcrumb => "breadcrumb",
            Self::Title => "title",
            Self::Description => "description",
            Self::Address => "address",
            Self::MonthlyRent => "monthly_rent",
            Self::MonthlyAconto => "monthly_aconto",
            Self::MoveInPrice => "move_in_price",
            Self::AvailableFrom => "available_from",
            Self::RentalPeriod => "rental_period",
            Self::EnergyMarkSrc => "energy_mark_src",
            Self::Characteristics => "characteristics",
        }
    }

    /// Looks a column field up by name
    pub fn from_column(name: &str) -> Option<Self> {
        Self::COLUMNS.iter().copied().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `name` is taken by `url` or one of the fixed columns
pub fn is_reserved_column(name: &str) -> bool {
    name == "url" || Field::from_column(name).is_some()
}

/// One listing
///
/// `url` is always set. Every other field is `None` when its extraction
/// failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingRecord {
    pub url: String,
    pub breadcrumb: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub monthly_rent: Option<String>,
    pub monthly_aconto: Option<String>,
    pub move_in_price: Option<String>,
    pub available_from: Option<String>,
    pub rental_period: Option<String>,
    pub energy_mark_src: Option<String>,

    /// Label/value pairs from the attribute table, in document order
    pub characteristics: Vec<(String, String)>,
}

impl ListingRecord {
    /// Creates a record with only the URL set
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Returns the value of a column field
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Breadcrumb => self.breadcrumb.as_deref(),
            Field::Title => self.title.as_deref(),
            Field::Description => self.description.as_deref(),
            Field::Address => self.address.as_deref(),
            Field::MonthlyRent => self.monthly_rent.as_deref(),
            Field::MonthlyAconto => self.monthly_aconto.as_deref(),
            Field::MoveInPrice => self.move_in_price.as_deref(),
            Field::AvailableFrom => self.available_from.as_deref(),
            Field::RentalPeriod => self.rental_period.as_deref(),
            Field::EnergyMarkSrc => self.energy_mark_src.as_deref(),
            Field::Characteristics => None,
        }
    }

    /// Sets the value of a column field
    ///
    /// Setting `Characteristics` is a no-op; use [`Self::insert_characteristic`].
    pub fn set(&mut self, field: Field, value: Option<String>) {
        let slot = match field {
            Field::Breadcrumb => &mut self.breadcrumb,
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
            Field::Address => &mut self.address,
            Field::MonthlyRent => &mut self.monthly_rent,
            Field::MonthlyAconto => &mut self.monthly_aconto,
            Field::MoveInPrice => &mut self.move_in_price,
            Field::AvailableFrom => &mut self.available_from,
            Field::RentalPeriod => &mut self.rental_period,
            Field::EnergyMarkSrc => &mut self.energy_mark_src,
            Field::Characteristics => return,
        };
        *slot = value;
    }

    /// Returns the value for a characteristic label
    pub fn characteristic(&self, label: &str) -> Option<&str> {
        self.characteristics
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Adds a characteristic pair, replacing an earlier value for the same label
    ///
    /// Returns false if the pair was rejected: the label collides with a fixed
    /// column, or the record already holds [`MAX_CHARACTERISTICS`] labels.
    pub fn insert_characteristic(&mut self, label: String, value: String) -> bool {
        if is_reserved_column(&label) {
            return false;
        }

        if let Some(existing) = self.characteristics.iter_mut().find(|(l, _)| *l == label) {
            existing.1 = value;
            return true;
        }

        if self.characteristics.len() >= MAX_CHARACTERISTICS {
            return false;
        }

        self.characteristics.push((label, value));
        true
    }

    /// Returns the value stored under a dataset column name
    pub fn column_value(&self, column: &str) -> Option<&str> {
        if column == "url" {
            return Some(self.url.as_str());
        }

        match Field::from_column(column) {
            Some(field) => self.get(field),
            None => self.characteristic(column),
        }
    }

    /// Number of column fields that hold a value
    pub fn present_fields(&self) -> usize {
        Field::COLUMNS
            .iter()
            .filter(|f| self.get(**f).is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_only_url() {
        let record = ListingRecord::new("https://www.boligportal.dk/lejligheder/id-1");
        assert_eq!(record.url, "https://www.boligportal.dk/lejligheder/id-1");
        assert_eq!(record.present_fields(), 0);
        assert!(record.characteristics.is_empty());
    }

    #[test]
    fn test_get_and_set() {
        let mut record = ListingRecord::new("u");
        record.set(Field::Title, Some("Lys 2-værelses".to_string()));
        record.set(Field::MonthlyRent, Some(String::new()));

        assert_eq!(record.get(Field::Title), Some("Lys 2-værelses"));
        // Present-but-empty stays distinguishable from absent
        assert_eq!(record.get(Field::MonthlyRent), Some(""));
        assert_eq!(record.get(Field::Address), None);
    }

    #[test]
    fn test_column_names_roundtrip() {
        for field in Field::COLUMNS {
            assert_eq!(Field::from_column(field.as_str()), Some(field));
        }
        assert_eq!(Field::from_column("Boligtype"), None);
        assert_eq!(Field::from_column("characteristics"), None);
    }

    #[test]
    fn test_insert_characteristic() {
        let mut record = ListingRecord::new("u");
        assert!(record.insert_characteristic("Boligtype".to_string(), "Lejlighed".to_string()));
        assert!(record.insert_characteristic("Størrelse".to_string(), "64 m²".to_string()));
        assert!(record.insert_characteristic("Boligtype".to_string(), "Rækkehus".to_string()));

        assert_eq!(record.characteristics.len(), 2);
        assert_eq!(record.characteristic("Boligtype"), Some("Rækkehus"));
        assert_eq!(record.column_value("Størrelse"), Some("64 m²"));
    }

    #[test]
    fn test_reserved_labels_are_rejected() {
        let mut record = ListingRecord::new("u");
        assert!(!record.insert_characteristic("url".to_string(), "x".to_string()));
        assert!(!record.insert_characteristic("title".to_string(), "x".to_string()));
        assert!(record.characteristics.is_empty());
        assert_eq!(record.column_value("url"), Some("u"));
    }

    #[test]
    fn test_characteristics_are_bounded() {
        let mut record = ListingRecord::new("u");
        for i in 0..MAX_CHARACTERISTICS {
            assert!(record.insert_characteristic(format!("label-{}", i), "v".to_string()));
        }
        assert!(!record.insert_characteristic("one-too-many".to_string(), "v".to_string()));
        assert_eq!(record.characteristics.len(), MAX_CHARACTERISTICS);
    }
}
