//! The raw dataset handed to the cleaning stage
//!
//! Columns are `url`, the fixed listing fields, then every characteristic
//! label seen in any record, in first-seen order.
//!
//! An absent value is written as [`ABSENT_CELL`], the marker pandas reads as a
//! missing value by default. An empty cell is a present, empty string. A
//! present value spelled like the marker is escaped with a leading backslash.

use crate::extract::{Field, ListingRecord};
use crate::output::{write_error, OutputError, OutputResult};
use crate::ScrapeError;
use chrono::NaiveDate;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Cell text of an absent value
pub const ABSENT_CELL: &str = "<NA>";

/// Records plus the column set inferred from them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDataset {
    columns: Vec<String>,
    records: Vec<ListingRecord>,
}

/// Where a dataset was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPaths {
    pub dated: PathBuf,
    pub latest: PathBuf,
}

impl RawDataset {
    /// Builds the union-of-columns view over the records
    pub fn from_records(records: Vec<ListingRecord>) -> Self {
        let mut columns: Vec<String> = std::iter::once("url")
            .chain(Field::COLUMNS.iter().map(|f| f.as_str()))
            .map(str::to_string)
            .collect();
        let mut seen: HashSet<String> = columns.iter().cloned().collect();

        for record in &records {
            for (label, _) in &record.characteristics {
                if seen.insert(label.clone()) {
                    columns.push(label.clone());
                }
            }
        }

        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[ListingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the dataset as CSV with a header row
    pub fn write_csv<W: io::Write>(&self, writer: W) -> OutputResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;

        for record in &self.records {
            for column in &self.columns {
                csv_writer.write_field(encode_cell(record.column_value(column)).as_bytes())?;
            }
            csv_writer.write_record(None::<&[u8]>)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Reads a dataset previously written by [`Self::write_csv`]
    pub fn read_csv<R: io::Read>(reader: R) -> OutputResult<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let columns: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

        let url_index = columns
            .iter()
            .position(|c| c == "url")
            .ok_or_else(|| OutputError::Format("dataset has no url column".to_string()))?;

        let mut records = Vec::new();
        for (line, row) in csv_reader.records().enumerate() {
            let row = row?;
            let url = match row.get(url_index).and_then(decode_cell) {
                Some(url) if !url.is_empty() => url,
                _ => return Err(OutputError::Format(format!("row {} has no url", line + 1))),
            };

            let mut record = ListingRecord::new(url);
            for (column, cell) in columns.iter().zip(row.iter()) {
                if column == "url" {
                    continue;
                }
                let Some(value) = decode_cell(cell) else {
                    continue;
                };
                match Field::from_column(column) {
                    Some(field) => record.set(field, Some(value)),
                    None => {
                        record.insert_characteristic(column.clone(), value);
                    }
                }
            }
            records.push(record);
        }

        Ok(Self { columns, records })
    }

    /// Reads a dataset from a file
    pub fn read_path(path: &Path) -> OutputResult<Self> {
        let file = fs::File::open(path)?;
        Self::read_csv(io::BufReader::new(file))
    }
}

fn encode_cell(value: Option<&str>) -> Cow<'_, str> {
    match value {
        None => Cow::Borrowed(ABSENT_CELL),
        Some(v) if v.trim_start_matches('\\') == ABSENT_CELL => Cow::Owned(format!("\\{}", v)),
        Some(v) => Cow::Borrowed(v),
    }
}

fn decode_cell(cell: &str) -> Option<String> {
    if cell == ABSENT_CELL {
        return None;
    }
    match cell.strip_prefix('\\') {
        Some(rest) if rest.trim_start_matches('\\') == ABSENT_CELL => Some(rest.to_string()),
        _ => Some(cell.to_string()),
    }
}

/// `{raw_dir}/bolig_data_{date}.csv`
pub fn dataset_path(raw_dir: &Path, date: NaiveDate) -> PathBuf {
    raw_dir.join(format!("bolig_data_{}.csv", date.format("%Y-%m-%d")))
}

/// `{raw_dir}/bolig_data_latest.csv`
pub fn latest_path(raw_dir: &Path) -> PathBuf {
    raw_dir.join("bolig_data_latest.csv")
}

/// Writes the dataset to its dated location and refreshes the "latest" alias
///
/// The dated file is written completely before the alias is replaced, so
/// the alias never points at a partial dataset.
pub fn persist(
    dataset: &RawDataset,
    raw_dir: &Path,
    date: NaiveDate,
) -> Result<PersistedPaths, ScrapeError> {
    fs::create_dir_all(raw_dir).map_err(|e| write_error(raw_dir, e))?;

    let dated = dataset_path(raw_dir, date);
    let staging = dated.with_extension("csv.partial");

    let file = fs::File::create(&staging).map_err(|e| write_error(&staging, e))?;
    dataset
        .write_csv(io::BufWriter::new(file))
        .map_err(|e| write_error(&staging, e))?;
    fs::rename(&staging, &dated).map_err(|e| write_error(&dated, e))?;

    let latest = latest_path(raw_dir);
    fs::copy(&dated, &latest).map_err(|e| write_error(&latest, e))?;

    tracing::info!(
        rows = dataset.len(),
        columns = dataset.columns().len(),
        path = %dated.display(),
        "Dataset written"
    );

    Ok(PersistedPaths { dated, latest })
}
