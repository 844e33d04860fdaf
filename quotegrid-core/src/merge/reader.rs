//! Row Store Reader — projects one per-ticker table onto a (date, value)
//! series.
//!
//! Every problem at this layer is recoverable: the caller skips the ticker,
//! emits a warning, and the run continues.

use super::aggregate::{Observation, ValueField};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Why a ticker's table was dropped from the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("unreadable: {0}")]
    Unreadable(String),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("table has no data rows")]
    Empty,

    #[error("no row has a parsable date")]
    NoParsableDates,
}

/// Read the (Date, field) projection of one stored table.
///
/// Rows with unparsable dates are excluded; if that discards every row the
/// whole table is skipped. A present date with an empty or non-numeric value
/// cell survives as a missing value.
pub fn read_series(path: &Path, field: ValueField) -> Result<Vec<Observation>, SkipReason> {
    let bytes = fs::read(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    read_series_from_bytes(&bytes, field)
}

/// Same as [`read_series`], over in-memory CSV bytes (BOM tolerated).
pub fn read_series_from_bytes(bytes: &[u8], field: ValueField) -> Result<Vec<Observation>, SkipReason> {
    let bytes = crate::data::codelist::strip_bom(bytes);
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers = rdr
        .headers()
        .map_err(|e| SkipReason::Unreadable(format!("header: {e}")))?
        .clone();

    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let date_idx = position("Date").ok_or_else(|| SkipReason::MissingColumn("Date".into()))?;
    let value_idx = position(field.column_name())
        .ok_or_else(|| SkipReason::MissingColumn(field.column_name().into()))?;

    let mut observations = Vec::new();
    let mut saw_rows = false;

    for record in rdr.records() {
        let record = match record {
            Ok(r) => r,
            // A malformed row is treated like a row with an unparsable date.
            Err(_) => {
                saw_rows = true;
                continue;
            }
        };
        saw_rows = true;

        let Some(date) = record.get(date_idx).and_then(parse_row_date) else {
            continue;
        };
        let value = record
            .get(value_idx)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .and_then(|v| v.parse::<f64>().ok());

        observations.push((date, value));
    }

    if observations.is_empty() {
        return Err(if saw_rows {
            SkipReason::NoParsableDates
        } else {
            SkipReason::Empty
        });
    }

    Ok(observations)
}

/// Parse a row's date cell, tolerating a trailing time-of-day component.
fn parse_row_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    // Downloaders sometimes leave a timestamp suffix ("2020-01-02 00:00:00")
    if s.len() > 10 {
        return NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d").ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn projects_the_requested_column() {
        let csv = b"Date,Open,Close\n2020-01-02,9,10\n2020-01-03,10,11\n";
        let out = read_series_from_bytes(csv, ValueField::Close).unwrap();
        assert_eq!(out, vec![(d(2020, 1, 2), Some(10.0)), (d(2020, 1, 3), Some(11.0))]);
    }

    #[test]
    fn missing_value_column_is_a_skip() {
        let csv = b"Date,Close\n2020-01-02,10\n";
        let err = read_series_from_bytes(csv, ValueField::Dividends).unwrap_err();
        assert_eq!(err, SkipReason::MissingColumn("Dividends".into()));
    }

    #[test]
    fn missing_date_column_is_a_skip() {
        let csv = b"Timestamp,Close\n2020-01-02,10\n";
        let err = read_series_from_bytes(csv, ValueField::Close).unwrap_err();
        assert_eq!(err, SkipReason::MissingColumn("Date".into()));
    }

    #[test]
    fn unparsable_dates_are_excluded_rows() {
        let csv = b"Date,Close\nnot-a-date,10\n2020-01-03,11\n";
        let out = read_series_from_bytes(csv, ValueField::Close).unwrap();
        assert_eq!(out, vec![(d(2020, 1, 3), Some(11.0))]);
    }

    #[test]
    fn all_dates_unparsable_skips_the_table() {
        let csv = b"Date,Close\nnope,10\nalso-nope,11\n";
        let err = read_series_from_bytes(csv, ValueField::Close).unwrap_err();
        assert_eq!(err, SkipReason::NoParsableDates);
    }

    #[test]
    fn header_only_table_is_empty() {
        let csv = b"Date,Close\n";
        let err = read_series_from_bytes(csv, ValueField::Close).unwrap_err();
        assert_eq!(err, SkipReason::Empty);
    }

    #[test]
    fn blank_or_non_numeric_values_become_missing() {
        let csv = b"Date,Close\n2020-01-02,\n2020-01-03,n/a\n2020-01-06,12\n";
        let out = read_series_from_bytes(csv, ValueField::Close).unwrap();
        assert_eq!(
            out,
            vec![
                (d(2020, 1, 2), None),
                (d(2020, 1, 3), None),
                (d(2020, 1, 6), Some(12.0)),
            ]
        );
    }

    #[test]
    fn timestamp_suffix_is_tolerated() {
        let csv = b"Date,Close\n2020-01-02 00:00:00,10\n";
        let out = read_series_from_bytes(csv, ValueField::Close).unwrap();
        assert_eq!(out, vec![(d(2020, 1, 2), Some(10.0))]);
    }

    #[test]
    fn bom_is_tolerated() {
        let csv = b"\xef\xbb\xbfDate,Close\n2020-01-02,10\n";
        let out = read_series_from_bytes(csv, ValueField::Close).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn stock_splits_header_has_a_space() {
        let csv = b"Date,Stock Splits\n2020-01-02,2\n";
        let out = read_series_from_bytes(csv, ValueField::StockSplits).unwrap();
        assert_eq!(out, vec![(d(2020, 1, 2), Some(2.0))]);
    }
}
