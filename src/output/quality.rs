//! Data-quality report for a dataset
//!
//! A markup change on the site shows up as a jump in the share of absent
//! values for the affected columns. The report lists that share per column.

use crate::output::{write_error, RawDataset};
use crate::ScrapeError;
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Share of absent values per column
#[derive(Debug, Clone, PartialEq)]
pub struct NullRates {
    /// Number of rows the rates were computed over
    pub rows: usize,

    /// `(column, percent absent)` in dataset column order
    pub columns: Vec<(String, f64)>,
}

impl NullRates {
    /// Computes the null rate of every column
    pub fn from_dataset(dataset: &RawDataset) -> Self {
        let rows = dataset.len();

        let columns = dataset
            .columns()
            .iter()
            .map(|column| {
                let absent = dataset
                    .records()
                    .iter()
                    .filter(|r| r.column_value(column).is_none())
                    .count();
                let percent = if rows > 0 {
                    (absent as f64 / rows as f64) * 100.0
                } else {
                    0.0
                };
                (column.clone(), percent)
            })
            .collect();

        Self { rows, columns }
    }

    /// Columns with at least one absent value
    pub fn non_zero(&self) -> impl Iterator<Item = &(String, f64)> {
        self.columns.iter().filter(|(_, pct)| *pct > 0.0)
    }

    /// Null rate of one column, if it exists
    pub fn rate(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, pct)| *pct)
    }

    /// One `column: 12.50% null` line per column with absent values
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (column, pct) in self.non_zero() {
            let _ = writeln!(out, "{}: {:.2}% null", column, pct);
        }
        out
    }
}

/// `{stats_dir}/null_pcts_{date}.txt`
pub fn null_rates_path(stats_dir: &Path, date: NaiveDate) -> PathBuf {
    stats_dir.join(format!("null_pcts_{}.txt", date.format("%Y-%m-%d")))
}

/// Writes the report and logs the worst columns
pub fn write_null_rates(
    rates: &NullRates,
    stats_dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, ScrapeError> {
    fs::create_dir_all(stats_dir).map_err(|e| write_error(stats_dir, e))?;

    let path = null_rates_path(stats_dir, date);
    fs::write(&path, rates.render()).map_err(|e| write_error(&path, e))?;

    let mut fixed: Vec<&(String, f64)> = rates.non_zero().collect();
    fixed.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (column, pct) in fixed.into_iter().take(5) {
        tracing::info!(column = %column, percent = %format!("{:.2}", pct), "Null rate");
    }

    Ok(path)
}

/// Prints the report to stdout in a formatted manner
pub fn print_null_rates(rates: &NullRates) {
    println!("=== Dataset Quality ===\n");
    println!("Rows: {}", rates.rows);
    println!("Columns: {}", rates.columns.len());
    println!();

    let mut sorted: Vec<&(String, f64)> = rates.columns.iter().collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

    println!("Null rate by column:");
    for (column, pct) in sorted {
        println!("  {:<24} {:>6.2}%", column, pct);
    }
}
