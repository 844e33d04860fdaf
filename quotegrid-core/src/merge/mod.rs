//! The merge engine — combines a directory of per-ticker tables of one
//! frequency into a single wide CSV keyed by date.
//!
//! Pipeline per ticker: read → date filter → period normalize + aggregate.
//! The per-ticker results are then outer-joined, gap-filled, and ordered by
//! the Column Assembler. Only configuration errors are fatal; every
//! per-ticker problem is a warning and the run continues.

pub mod aggregate;
pub mod assemble;
pub mod range;
pub mod reader;

pub use aggregate::{aggregate, Observation, ValueField};
pub use assemble::{assemble, order_columns, SeriesColumn, WideTable};
pub use range::DateRange;
pub use reader::SkipReason;

use crate::data::codelist::Codelist;
use crate::data::store;
use crate::period::Frequency;
use crate::symbol::{sanitize_ticker, split_stem};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal merge-run errors. Everything else is a [`MergeWarning`].
#[derive(Debug, Error)]
pub enum MergeError {
    #[error(
        "malformed date range '{0}': expected 'START-END' with YYYYMMDD, \
         YYYY-MM-DD, or YYYY/MM/DD dates"
    )]
    BadDateRange(String),

    #[error("no input tables matching '*_{frequency}.csv' under {dir}")]
    NoInputFiles { frequency: Frequency, dir: PathBuf },

    #[error("{0}")]
    Codelist(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal diagnostics from a merge run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeWarning {
    #[error("skipping {path}: {reason}")]
    SkippedTable { path: String, reason: SkipReason },

    #[error("ignoring {path}: name is not '<asset>_<category>_<ticker>_<frequency>.csv'")]
    UnrecognizedFileName { path: String },

    #[error("codelist ticker '{ticker}' has no matching table")]
    ReferenceWithoutData { ticker: String },

    #[error("column '{identifier}' is not in the codelist; appended after codelist columns")]
    DataWithoutReference { identifier: String },

    #[error("{0}")]
    Codelist(String),

    #[error("merge result is empty")]
    EmptyResult,
}

/// Configuration of one merge run.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub frequency: Frequency,
    pub field: ValueField,
    /// Inclusive filter applied to original (pre-normalization) dates.
    pub range: Option<DateRange>,
    pub input_dir: PathBuf,
    /// Defaults to `<input_dir>/merged_<frequency>_<field>.csv`.
    pub output: Option<PathBuf>,
    pub bom: bool,
    pub forward_fill: bool,
    pub codelist: Option<PathBuf>,
}

impl MergeConfig {
    pub fn new(frequency: Frequency, field: ValueField, input_dir: impl Into<PathBuf>) -> Self {
        Self {
            frequency,
            field,
            range: None,
            input_dir: input_dir.into(),
            output: None,
            bom: true,
            forward_fill: true,
            codelist: None,
        }
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            self.input_dir
                .join(format!("merged_{}_{}.csv", self.frequency, self.field))
        })
    }
}

/// Result of a merge run.
#[derive(Debug)]
pub struct MergeOutcome {
    pub output_path: PathBuf,
    pub row_count: usize,
    pub column_count: usize,
    pub warnings: Vec<MergeWarning>,
}

/// Merge every `*_<frequency>.csv` under the input directory into one wide
/// table and write it.
pub fn merge_dir(config: &MergeConfig) -> Result<MergeOutcome, MergeError> {
    let mut warnings: Vec<MergeWarning> = Vec::new();

    // Reference order list, read once up front. Unreadable codelists are
    // configuration errors: the run aborts before any I/O side effect.
    let reference: Option<Codelist> = match &config.codelist {
        Some(path) => {
            let codelist =
                Codelist::from_file(path).map_err(|e| MergeError::Codelist(e.to_string()))?;
            warnings.extend(codelist.warnings.iter().cloned().map(MergeWarning::Codelist));
            Some(codelist)
        }
        None => None,
    };

    let files = store::list_tables(&config.input_dir, config.frequency).map_err(|source| {
        MergeError::Io {
            path: config.input_dir.clone(),
            source,
        }
    })?;
    if files.is_empty() {
        return Err(MergeError::NoInputFiles {
            frequency: config.frequency,
            dir: config.input_dir.clone(),
        });
    }

    // Per-ticker pipeline: read → filter → normalize + aggregate.
    let suffix = format!("_{}.csv", config.frequency);
    let mut series: Vec<SeriesColumn> = Vec::new();
    for path in &files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let stem = name.strip_suffix(&suffix).unwrap_or(name);

        let Some(parts) = split_stem(stem) else {
            warnings.push(MergeWarning::UnrecognizedFileName {
                path: path.display().to_string(),
            });
            continue;
        };

        match reader::read_series(path, config.field) {
            Ok(mut observations) => {
                if let Some(range) = config.range {
                    observations.retain(|(date, _)| range.contains(*date));
                }
                let observations = aggregate(observations, config.frequency, config.field);
                series.push(SeriesColumn {
                    name: stem.to_string(),
                    identifier: sanitize_ticker(parts.ticker),
                    observations,
                });
            }
            Err(reason) => warnings.push(MergeWarning::SkippedTable {
                path: path.display().to_string(),
                reason,
            }),
        }
    }

    let ordered = order_columns(series, reference.as_ref(), &mut warnings);
    let table = assemble(&ordered, config.forward_fill);
    if table.dates.is_empty() {
        warnings.push(MergeWarning::EmptyResult);
    }

    let output_path = config.output_path();
    write_table(&output_path, &table, config.bom)?;

    Ok(MergeOutcome {
        output_path,
        row_count: table.dates.len(),
        column_count: table.columns.len(),
        warnings,
    })
}

/// Write the merged table as CSV: `Date` column first, dates `YYYY-MM-DD`,
/// numeric cells in plain decimal, missing cells empty, optional BOM.
pub fn write_table(path: &Path, table: &WideTable, bom: bool) -> Result<(), MergeError> {
    let io_err = |source: std::io::Error| MergeError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let mut file = fs::File::create(path).map_err(io_err)?;
    if bom {
        file.write_all(b"\xef\xbb\xbf").map_err(io_err)?;
    }

    let csv_err = |source: csv::Error| match source.into_kind() {
        csv::ErrorKind::Io(io) => io_err(io),
        other => io_err(std::io::Error::other(format!("csv: {other:?}"))),
    };

    let mut wtr = csv::Writer::from_writer(file);
    let mut header = vec!["Date".to_string()];
    header.extend(table.columns.iter().cloned());
    wtr.write_record(&header).map_err(csv_err)?;

    for (date, row) in table.dates.iter().zip(&table.cells) {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(
            row.iter()
                .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record).map_err(csv_err)?;
    }

    wtr.flush().map_err(io_err)?;
    Ok(())
}
