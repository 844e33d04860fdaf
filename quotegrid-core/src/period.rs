//! Calendar frequency and period bucketing.
//!
//! Weekly buckets anchor on the ISO week start (Monday); monthly buckets
//! anchor on the first calendar day of the month. Daily is the identity.

use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Sampling frequency of a stored table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Name used in file suffixes (`_daily.csv`) and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    /// Interval code for the Yahoo chart API.
    pub fn yahoo_interval(&self) -> &'static str {
        match self {
            Frequency::Daily => "1d",
            Frequency::Weekly => "1wk",
            Frequency::Monthly => "1mo",
        }
    }

    /// Map a date to the start of its containing period.
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => date,
            Frequency::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Frequency::Monthly => date.with_day(1).unwrap(),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!(
                "unknown frequency '{other}'. Valid: daily, weekly, monthly"
            )),
        }
    }
}
