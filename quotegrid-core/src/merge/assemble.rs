//! Column Assembler — outer-joins per-ticker series into one wide table.
//!
//! The row index is the union of all normalized dates across all series,
//! ascending. Each ticker contributes one column; cells without an entry are
//! missing, optionally bridged by a one-step forward fill.

use super::aggregate::Observation;
use super::MergeWarning;
use crate::data::codelist::Codelist;
use crate::symbol::sanitize_ticker;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// One ticker's aggregated series plus its output column name.
#[derive(Debug, Clone)]
pub struct SeriesColumn {
    /// Output column header — the source file stem (`asset_category_ticker`).
    pub name: String,
    /// Normalized ticker identifier used for reference matching and ordering.
    pub identifier: String,
    pub observations: Vec<Observation>,
}

/// The assembled wide table.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    /// Row index, sorted ascending, no duplicates.
    pub dates: Vec<NaiveDate>,
    /// Column headers after the date column, in output order.
    pub columns: Vec<String>,
    /// Row-major cells; `cells.len() == dates.len()` and every row has
    /// `columns.len()` entries.
    pub cells: Vec<Vec<Option<f64>>>,
}

impl WideTable {
    /// Look up a cell by date and column header (test/diagnostic helper).
    pub fn cell(&self, date: NaiveDate, column: &str) -> Option<f64> {
        let row = self.dates.iter().position(|d| *d == date)?;
        let col = self.columns.iter().position(|c| c == column)?;
        self.cells[row][col]
    }
}

/// Order columns against an optional reference codelist.
///
/// With a codelist, columns are ordered by the rank of their normalized
/// identifier in the list; data columns absent from the list are appended in
/// ascending identifier order with a warning; list entries with no matching
/// data warn and are omitted. Without a list, ascending identifier order.
pub fn order_columns(
    series: Vec<SeriesColumn>,
    reference: Option<&Codelist>,
    warnings: &mut Vec<MergeWarning>,
) -> Vec<SeriesColumn> {
    let Some(reference) = reference else {
        let mut series = series;
        series.sort_by(|a, b| a.identifier.cmp(&b.identifier).then(a.name.cmp(&b.name)));
        return series;
    };

    let ranks = reference.rank_map();

    let mut ranked: Vec<(usize, SeriesColumn)> = Vec::new();
    let mut unranked: Vec<SeriesColumn> = Vec::new();
    for column in series {
        match ranks.get(&column.identifier) {
            Some(&rank) => ranked.push((rank, column)),
            None => {
                warnings.push(MergeWarning::DataWithoutReference {
                    identifier: column.identifier.clone(),
                });
                unranked.push(column);
            }
        }
    }
    ranked.sort_by_key(|(rank, _)| *rank);
    unranked.sort_by(|a, b| a.identifier.cmp(&b.identifier).then(a.name.cmp(&b.name)));

    let matched: BTreeSet<&str> = ranked
        .iter()
        .map(|(_, c)| c.identifier.as_str())
        .collect();
    for entry in &reference.entries {
        if !matched.contains(sanitize_ticker(&entry.ticker).as_str()) {
            warnings.push(MergeWarning::ReferenceWithoutData {
                ticker: entry.ticker.clone(),
            });
        }
    }

    let mut ordered: Vec<SeriesColumn> = ranked.into_iter().map(|(_, c)| c).collect();
    ordered.extend(unranked);
    ordered
}

/// Outer-join the (already ordered) series into a wide table.
///
/// When a series contains several entries for one date the last one wins;
/// aggregation guarantees uniqueness for weekly/monthly, daily relies on
/// this to dedupe.
pub fn assemble(series: &[SeriesColumn], forward_fill: bool) -> WideTable {
    let mut all_dates = BTreeSet::new();
    for column in series {
        for (date, _) in &column.observations {
            all_dates.insert(*date);
        }
    }
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let columns: Vec<String> = series.iter().map(|c| c.name.clone()).collect();

    let mut cells: Vec<Vec<Option<f64>>> = Vec::with_capacity(dates.len());
    let lookups: Vec<HashMap<NaiveDate, Option<f64>>> = series
        .iter()
        .map(|column| column.observations.iter().copied().collect())
        .collect();
    for date in &dates {
        cells.push(
            lookups
                .iter()
                .map(|lookup| lookup.get(date).copied().flatten())
                .collect(),
        );
    }

    if forward_fill {
        fill_one_step(&mut cells);
    }

    WideTable {
        dates,
        columns,
        cells,
    }
}

/// Forward-fill with a run-length limit of one step, per column.
///
/// A missing cell is filled from the preceding row only when that row's
/// pre-fill value is non-missing, so only the first slot of each contiguous
/// missing run is bridged: `[10, _, _, 20]` becomes `[10, 10, _, 20]`.
fn fill_one_step(cells: &mut [Vec<Option<f64>>]) {
    if cells.is_empty() {
        return;
    }
    let width = cells[0].len();
    for col in 0..width {
        let mut prev_original: Option<f64> = None;
        for row in cells.iter_mut() {
            let original = row[col];
            if original.is_none() {
                row[col] = prev_original;
            }
            prev_original = original;
        }
    }
}
