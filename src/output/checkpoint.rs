//! Checkpoint of fetched detail pages
//!
//! Successful fetches are written as `url,html_code` rows before extraction
//! starts, so a crash during extraction can be recovered without re-crawling.

use crate::crawler::FetchResult;
use crate::output::{write_error, OutputResult};
use crate::ScrapeError;
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// `{raw_dir}/boligportal_pages_{date}.csv`
pub fn checkpoint_path(raw_dir: &Path, date: NaiveDate) -> PathBuf {
    raw_dir.join(format!("boligportal_pages_{}.csv", date.format("%Y-%m-%d")))
}

/// Writes the bodies of all successful fetches
///
/// Returns the path written and the number of rows.
pub fn write_page_checkpoint(
    results: &[FetchResult],
    raw_dir: &Path,
    date: NaiveDate,
) -> Result<(PathBuf, usize), ScrapeError> {
    fs::create_dir_all(raw_dir).map_err(|e| write_error(raw_dir, e))?;

    let path = checkpoint_path(raw_dir, date);
    let file = fs::File::create(&path).map_err(|e| write_error(&path, e))?;
    let rows = write_rows(results, io::BufWriter::new(file)).map_err(|e| write_error(&path, e))?;

    tracing::info!(rows, path = %path.display(), "Page checkpoint written");
    Ok((path, rows))
}

fn write_rows<W: io::Write>(results: &[FetchResult], writer: W) -> OutputResult<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["url", "html_code"])?;

    let mut rows = 0;
    for result in results {
        if let Some(body) = &result.body {
            csv_writer.write_record([result.url.as_str(), body.as_str()])?;
            rows += 1;
        }
    }

    csv_writer.flush()?;
    Ok(rows)
}

/// Reads a checkpoint back as successful fetch results
pub fn read_page_checkpoint(path: &Path) -> OutputResult<Vec<FetchResult>> {
    let mut csv_reader = csv::Reader::from_path(path)?;

    let mut results = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let url = row.get(0).unwrap_or("");
        if url.is_empty() {
            continue;
        }
        let body = row.get(1).unwrap_or("").to_string();
        results.push(FetchResult::success(url, body));
    }

    Ok(results)
}
