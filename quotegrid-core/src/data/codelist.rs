//! Codelist — the externally supplied reference order list.
//!
//! A CSV with a header-insensitive `etf_ticker` column and optional
//! `asset_class` / `category` classification columns. Row order is
//! significant: it drives both download order and merged-table column order.
//! Read once at the start of a run, immutable afterwards.

use super::provider::DataError;
use crate::symbol::sanitize_ticker;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One codelist row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodelistEntry {
    pub ticker: String,
    pub asset_class: Option<String>,
    pub category: Option<String>,
}

/// The parsed codelist, in first-appearance order.
#[derive(Debug, Clone, Default)]
pub struct Codelist {
    pub entries: Vec<CodelistEntry>,
    /// Non-fatal parse diagnostics (duplicate tickers with conflicting
    /// classifications).
    pub warnings: Vec<String>,
}

impl Codelist {
    /// Load a codelist from a CSV file (BOM tolerated).
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let bytes = fs::read(path)
            .map_err(|e| DataError::Codelist(format!("read {}: {e}", path.display())))?;
        Self::from_csv(&bytes)
            .map_err(|e| DataError::Codelist(format!("{}: {e}", path.display())))
    }

    /// Parse a codelist from raw CSV bytes.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, DataError> {
        let bytes = strip_bom(bytes);
        let mut rdr = csv::Reader::from_reader(bytes);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| DataError::Codelist(format!("header: {e}")))?
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .collect();

        let column = |name: &str| headers.iter().position(|h| h == name);
        let ticker_idx = column("etf_ticker")
            .ok_or_else(|| DataError::Codelist("missing 'etf_ticker' column".into()))?;
        let asset_idx = column("asset_class");
        let category_idx = column("category");

        let cell = |record: &csv::StringRecord, idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
                .map(String::from)
        };

        let mut entries: Vec<CodelistEntry> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut warnings = Vec::new();

        for record in rdr.records() {
            let record = record.map_err(|e| DataError::Codelist(format!("row: {e}")))?;
            let Some(ticker) = cell(&record, Some(ticker_idx)) else {
                continue;
            };
            let asset_class = cell(&record, asset_idx);
            let category = cell(&record, category_idx);

            match seen.get(&ticker) {
                None => {
                    seen.insert(ticker.clone(), entries.len());
                    entries.push(CodelistEntry {
                        ticker,
                        asset_class,
                        category,
                    });
                }
                Some(&first) => {
                    // Duplicate ticker: the first classification wins.
                    let kept = &entries[first];
                    let conflicting = (asset_class.is_some()
                        && kept.asset_class.is_some()
                        && asset_class != kept.asset_class)
                        || (category.is_some()
                            && kept.category.is_some()
                            && category != kept.category);
                    if conflicting {
                        warnings.push(format!(
                            "codelist ticker '{ticker}' appears twice with different \
                             classifications; keeping the first \
                             (asset_class={:?}, category={:?})",
                            kept.asset_class, kept.category
                        ));
                    }
                }
            }
        }

        Ok(Self { entries, warnings })
    }

    /// Rank of each normalized identifier, first occurrence winning.
    ///
    /// Built once per run and queried for every data column during assembly.
    pub fn rank_map(&self) -> HashMap<String, usize> {
        let mut ranks = HashMap::with_capacity(self.entries.len());
        for (rank, entry) in self.entries.iter().enumerate() {
            ranks.entry(sanitize_ticker(&entry.ticker)).or_insert(rank);
        }
        ranks
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strip a UTF-8 byte-order marker if present.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xef\xbb\xbf".as_slice()).unwrap_or(bytes)
}
