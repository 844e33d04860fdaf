//! Per-ticker CSV store.
//!
//! One file per ticker per frequency under a single directory:
//! - ad-hoc downloads: `<ticker>_<frequency>.csv`
//! - codelist batches: `<asset_class>_<category>_<ticker>_<frequency>.csv`
//!   (missing classification segments become `unknown`)
//! All segments pass through `sanitize_ticker`. Files are UTF-8 with an
//! optional byte-order marker. An empty fetch still gets a header-only file.

use super::provider::{DataError, QuoteBar};
use crate::period::Frequency;
use crate::symbol::sanitize_ticker;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const BOM: &[u8] = b"\xef\xbb\xbf";

/// The CSV store.
pub struct CsvStore {
    dir: PathBuf,
    bom: bool,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>, bom: bool) -> Self {
        Self {
            dir: dir.into(),
            bom,
        }
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for an ad-hoc single-ticker download.
    pub fn plain_file_name(ticker: &str, frequency: Frequency) -> String {
        format!("{}_{}.csv", sanitize_ticker(ticker), frequency)
    }

    /// File name for a codelist download, carrying the classification.
    pub fn classified_file_name(
        asset_class: Option<&str>,
        category: Option<&str>,
        ticker: &str,
        frequency: Frequency,
    ) -> String {
        let segment = |value: Option<&str>| {
            let v = value.map(str::trim).unwrap_or("");
            if v.is_empty() {
                "unknown".to_string()
            } else {
                sanitize_ticker(v)
            }
        };
        format!(
            "{}_{}_{}_{}.csv",
            segment(asset_class),
            segment(category),
            sanitize_ticker(ticker),
            frequency
        )
    }

    /// Write one table, creating the store directory if needed.
    pub fn write(&self, file_name: &str, bars: &[QuoteBar]) -> Result<PathBuf, DataError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| DataError::StoreError(format!("create {}: {e}", self.dir.display())))?;
        let path = self.dir.join(file_name);
        let file = fs::File::create(&path)
            .map_err(|e| DataError::StoreError(format!("create {}: {e}", path.display())))?;
        write_table(file, bars, self.bom)
            .map_err(|e| DataError::StoreError(format!("{}: {e}", path.display())))?;
        Ok(path)
    }

    /// All stored tables of one frequency, sorted by file name.
    pub fn list_tables(&self, frequency: Frequency) -> Result<Vec<PathBuf>, DataError> {
        list_tables(&self.dir, frequency)
            .map_err(|e| DataError::StoreError(format!("read {}: {e}", self.dir.display())))
    }
}

/// List `*_<frequency>.csv` files under a directory, sorted by file name.
pub fn list_tables(dir: &Path, frequency: Frequency) -> std::io::Result<Vec<PathBuf>> {
    let suffix = format!("_{frequency}.csv");
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(&suffix) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Write bars as CSV to any sink (store file or stdout).
///
/// The `Adj Close` and `Capital Gains` columns appear only when at least one
/// bar carries them.
pub fn write_table(mut out: impl Write, bars: &[QuoteBar], bom: bool) -> std::io::Result<()> {
    if bom {
        out.write_all(BOM)?;
    }

    let has_adj_close = bars.iter().any(|b| b.adj_close.is_some());
    let has_capital_gains = bars.iter().any(|b| b.capital_gains.is_some());

    let mut wtr = csv::Writer::from_writer(out);

    let mut header = vec![
        "Date",
        "Open",
        "High",
        "Low",
        "Close",
        "Volume",
        "Dividends",
        "Stock Splits",
    ];
    if has_adj_close {
        header.push("Adj Close");
    }
    if has_capital_gains {
        header.push("Capital Gains");
    }
    wtr.write_record(&header)?;

    let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();

    for bar in bars {
        let mut record = vec![
            bar.date.format("%Y-%m-%d").to_string(),
            opt(bar.open),
            opt(bar.high),
            opt(bar.low),
            opt(bar.close),
            bar.volume.map(|v| v.to_string()).unwrap_or_default(),
            bar.dividends.to_string(),
            bar.stock_splits.to_string(),
        ];
        if has_adj_close {
            record.push(opt(bar.adj_close));
        }
        if has_capital_gains {
            record.push(opt(bar.capital_gains));
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()
}
