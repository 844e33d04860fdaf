//! Inclusive date-range filtering for merge runs.
//!
//! A range literal is `START-END` where each side is one of `YYYYMMDD`,
//! `YYYY-MM-DD`, or `YYYY/MM/DD`, and either side may be empty for an open
//! bound. `20200101-20210101`, `2020-01-01-2021-01-01`, and
//! `2020/01/01-2021/01/01` all denote the same inclusive range.

use super::MergeError;
use chrono::NaiveDate;

/// Inclusive date range; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// Parse a `START-END` literal.
    ///
    /// The separating hyphen is ambiguous when the dates themselves contain
    /// hyphens, so every candidate split position is tried until both halves
    /// parse. Malformed input is a fatal configuration error.
    pub fn parse(raw: &str) -> Result<Self, MergeError> {
        let s = raw.trim().replace('/', "-");
        let bad = || MergeError::BadDateRange(raw.to_string());

        for (i, b) in s.bytes().enumerate() {
            if b != b'-' {
                continue;
            }
            let (left, right) = (s[..i].trim(), s[i + 1..].trim());
            if left.is_empty() && right.is_empty() {
                continue;
            }
            let start = match left {
                "" => None,
                _ => match parse_flexible_date(left) {
                    Some(d) => Some(d),
                    None => continue,
                },
            };
            let end = match right {
                "" => None,
                _ => match parse_flexible_date(right) {
                    Some(d) => Some(d),
                    None => continue,
                },
            };
            return Ok(DateRange { start, end });
        }

        Err(bad())
    }
}

/// Parse a single flexible date literal: `YYYYMMDD`, `YYYY-MM-DD`, or
/// `YYYY/MM/DD`.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().replace('/', "-");
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let dashed = format!("{}-{}-{}", &s[0..4], &s[4..6], &s[6..8]);
        return NaiveDate::parse_from_str(&dashed, "%Y-%m-%d").ok();
    }
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}
