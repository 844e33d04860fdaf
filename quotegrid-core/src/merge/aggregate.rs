//! Per-field aggregation when collapsing rows into period buckets.
//!
//! Daily frequency is a pure pass-through. For weekly/monthly, every
//! observation is tagged with its period start and each bucket collapses to
//! one value under a field-specific rule.

use crate::period::Frequency;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which value column a merge run extracts from each table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueField {
    Open,
    High,
    Low,
    Close,
    Volume,
    Dividends,
    StockSplits,
    CapitalGains,
}

impl ValueField {
    /// Header of the source column in stored tables.
    pub fn column_name(&self) -> &'static str {
        match self {
            ValueField::Open => "Open",
            ValueField::High => "High",
            ValueField::Low => "Low",
            ValueField::Close => "Close",
            ValueField::Volume => "Volume",
            ValueField::Dividends => "Dividends",
            ValueField::StockSplits => "Stock Splits",
            ValueField::CapitalGains => "Capital Gains",
        }
    }

    /// Name used in CLI flags and output file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueField::Open => "open",
            ValueField::High => "high",
            ValueField::Low => "low",
            ValueField::Close => "close",
            ValueField::Volume => "volume",
            ValueField::Dividends => "dividends",
            ValueField::StockSplits => "stocksplits",
            ValueField::CapitalGains => "capitalgains",
        }
    }
}

impl fmt::Display for ValueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ValueField::Open),
            "high" => Ok(ValueField::High),
            "low" => Ok(ValueField::Low),
            "close" => Ok(ValueField::Close),
            "volume" => Ok(ValueField::Volume),
            "dividends" => Ok(ValueField::Dividends),
            "stocksplits" => Ok(ValueField::StockSplits),
            "capitalgains" => Ok(ValueField::CapitalGains),
            other => Err(format!(
                "unknown column '{other}'. Valid: open, high, low, close, volume, \
                 dividends, stocksplits, capitalgains"
            )),
        }
    }
}

/// A dated observation; `None` is a missing value.
pub type Observation = (NaiveDate, Option<f64>);

/// Collapse observations into one row per period bucket.
///
/// Daily passes values through unchanged, one row per original date. For
/// other frequencies the output is sorted by bucket key and contains exactly
/// one row per key.
pub fn aggregate(
    mut observations: Vec<Observation>,
    frequency: Frequency,
    field: ValueField,
) -> Vec<Observation> {
    if frequency == Frequency::Daily {
        return observations;
    }

    // Stable sort: observations sharing a date keep their input order, so
    // first/last rules stay deterministic.
    observations.sort_by_key(|(date, _)| *date);

    let mut buckets: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    for (date, value) in observations {
        buckets
            .entry(frequency.period_start(date))
            .or_default()
            .push(value);
    }

    buckets
        .into_iter()
        .map(|(key, values)| (key, combine(&values, field)))
        .collect()
}

/// Collapse one bucket's values (in ascending original-date order).
fn combine(values: &[Option<f64>], field: ValueField) -> Option<f64> {
    let mut present = values.iter().flatten().copied();
    match field {
        ValueField::Open => present.next(),
        ValueField::Close => present.last(),
        ValueField::High => present.fold(None, |acc, v| {
            Some(acc.map_or(v, |a: f64| a.max(v)))
        }),
        ValueField::Low => present.fold(None, |acc, v| {
            Some(acc.map_or(v, |a: f64| a.min(v)))
        }),
        // Sum of non-missing values; an all-missing bucket stays missing
        // rather than summing to zero.
        ValueField::Volume | ValueField::Dividends | ValueField::CapitalGains => {
            let mut sum = None;
            for v in present {
                *sum.get_or_insert(0.0) += v;
            }
            sum
        }
        // Multiplicative composition of split factors. A value of exactly 0
        // denotes "no split event" and is excluded; a bucket with no events
        // stays missing (not 1 and not 0).
        ValueField::StockSplits => {
            let mut product = None;
            for v in present.filter(|v| *v != 0.0) {
                *product.get_or_insert(1.0) *= v;
            }
            product
        }
    }
}
