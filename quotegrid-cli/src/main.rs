//! QuoteGrid CLI — download and merge commands.
//!
//! Commands:
//! - `download` — fetch quote history from Yahoo Finance into per-ticker CSVs
//! - `merge` — combine per-ticker CSVs of one frequency into a wide table

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use quotegrid_core::data::{
    download_batch, fetch_bars, store, CircuitBreaker, Codelist, CodelistEntry, CsvStore,
    DownloadRequest, FetchSpan, StderrProgress, YahooProvider,
};
use quotegrid_core::merge::{merge_dir, range::parse_flexible_date, DateRange, MergeConfig};
use quotegrid_core::period::Frequency;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "quotegrid",
    about = "QuoteGrid — quote history downloader and wide-table merger"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch quote history from Yahoo Finance into one CSV per ticker.
    Download {
        /// Tickers to download (e.g., SPY QQQ BRK.B). Omit when using --codelist.
        tickers: Vec<String>,

        /// Codelist CSV with an etf_ticker column; drives download order and
        /// the four-segment classified file naming.
        #[arg(long)]
        codelist: Option<PathBuf>,

        /// Bar frequency: daily, weekly, monthly.
        #[arg(long, default_value = "daily")]
        frequency: String,

        /// Named lookback window (1mo, 6mo, 1y, 5y, max). Defaults to 1y.
        #[arg(long, conflicts_with_all = ["start", "end"])]
        period: Option<String>,

        /// Start date (YYYYMMDD, YYYY-MM-DD, or YYYY/MM/DD).
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYYMMDD, YYYY-MM-DD, or YYYY/MM/DD).
        #[arg(long)]
        end: Option<String>,

        /// Output directory for per-ticker tables.
        #[arg(long, default_value = "download")]
        out_dir: PathBuf,

        /// Write the table to this exact file path (single ticker only).
        #[arg(long, conflicts_with_all = ["codelist", "stdout"])]
        output: Option<PathBuf>,

        /// Write tables without a UTF-8 byte-order marker.
        #[arg(long, default_value_t = false)]
        no_bom: bool,

        /// Keep raw prices instead of folding the adjusted close into OHLC.
        #[arg(long, default_value_t = false)]
        no_adjust: bool,

        /// Seconds to pause between consecutive fetches.
        #[arg(long, default_value_t = 2.0)]
        sleep: f64,

        /// Print the table to stdout instead of writing a file
        /// (single ticker only).
        #[arg(long, default_value_t = false, conflicts_with = "codelist")]
        stdout: bool,
    },
    /// Combine per-ticker CSVs of one frequency into a single wide table.
    Merge {
        /// Frequency of the input tables: daily, weekly, monthly.
        #[arg(long)]
        frequency: String,

        /// Value column to extract: open, high, low, close, volume,
        /// dividends, stocksplits, capitalgains.
        #[arg(long, default_value = "close")]
        column: String,

        /// Inclusive date filter 'START-END'; either side may be empty.
        #[arg(long)]
        start_end: Option<String>,

        /// Directory holding the per-ticker tables.
        #[arg(long, default_value = "download")]
        input_dir: PathBuf,

        /// Output file. Defaults to <input-dir>/merged_<frequency>_<column>.csv.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the merged table without a UTF-8 byte-order marker.
        #[arg(long, default_value_t = false)]
        no_bom: bool,

        /// Disable the one-step forward fill of missing cells.
        #[arg(long, default_value_t = false)]
        no_ffill: bool,

        /// Codelist CSV whose row order fixes the output column order.
        #[arg(long)]
        codelist: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            tickers,
            codelist,
            frequency,
            period,
            start,
            end,
            out_dir,
            output,
            no_bom,
            no_adjust,
            sleep,
            stdout,
        } => run_download(
            tickers, codelist, &frequency, period, start, end, out_dir, output, no_bom, no_adjust,
            sleep, stdout,
        ),
        Commands::Merge {
            frequency,
            column,
            start_end,
            input_dir,
            output,
            no_bom,
            no_ffill,
            codelist,
        } => run_merge(
            &frequency, &column, start_end, input_dir, output, no_bom, no_ffill, codelist,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_download(
    tickers: Vec<String>,
    codelist: Option<PathBuf>,
    frequency: &str,
    period: Option<String>,
    start: Option<String>,
    end: Option<String>,
    out_dir: PathBuf,
    output: Option<PathBuf>,
    no_bom: bool,
    no_adjust: bool,
    sleep: f64,
    stdout: bool,
) -> Result<()> {
    let frequency: Frequency = frequency.parse().map_err(anyhow::Error::msg)?;

    let span = build_span(period, start.as_deref(), end.as_deref())?;

    let (entries, classified) = match &codelist {
        Some(path) => {
            if !tickers.is_empty() {
                bail!("positional tickers and --codelist are mutually exclusive");
            }
            let list = Codelist::from_file(path)?;
            if list.is_empty() {
                bail!("codelist {} contains no tickers", path.display());
            }
            for warning in &list.warnings {
                eprintln!("WARNING: {warning}");
            }
            (list.entries, true)
        }
        None => {
            if tickers.is_empty() {
                bail!("no tickers given; pass tickers or --codelist");
            }
            let entries = tickers
                .into_iter()
                .map(|ticker| CodelistEntry {
                    ticker,
                    asset_class: None,
                    category: None,
                })
                .collect();
            (entries, false)
        }
    };

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker);

    let request = DownloadRequest {
        frequency,
        span,
        adjust: !no_adjust,
        sleep: Duration::from_secs_f64(sleep.max(0.0)),
        classified,
    };

    if stdout {
        if entries.len() != 1 {
            bail!("--stdout works with exactly one ticker");
        }
        let bars = fetch_bars(&provider, &entries[0].ticker, &request)?;
        if bars.is_empty() {
            eprintln!("WARNING: empty history for '{}'", entries[0].ticker);
        }
        store::write_table(std::io::stdout().lock(), &bars, !no_bom)?;
        return Ok(());
    }

    if let Some(path) = output {
        if entries.len() != 1 {
            bail!("--output works with exactly one ticker");
        }
        let bars = fetch_bars(&provider, &entries[0].ticker, &request)?;
        if bars.is_empty() {
            eprintln!("WARNING: empty history for '{}'", entries[0].ticker);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        store::write_table(fs::File::create(&path)?, &bars, !no_bom)?;
        return Ok(());
    }

    let csv_store = CsvStore::new(out_dir, !no_bom);
    let summary = download_batch(&provider, &csv_store, &entries, &request, &StderrProgress);

    for warning in &summary.warnings {
        eprintln!("WARNING: {warning}");
    }
    if !summary.all_succeeded() {
        for (ticker, err) in &summary.errors {
            eprintln!("Error for {ticker}: {err}");
        }
        std::process::exit(1);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_merge(
    frequency: &str,
    column: &str,
    start_end: Option<String>,
    input_dir: PathBuf,
    output: Option<PathBuf>,
    no_bom: bool,
    no_ffill: bool,
    codelist: Option<PathBuf>,
) -> Result<()> {
    let frequency: Frequency = frequency.parse().map_err(anyhow::Error::msg)?;
    let field = column.parse().map_err(anyhow::Error::msg)?;
    let range = start_end.as_deref().map(DateRange::parse).transpose()?;

    let config = MergeConfig {
        frequency,
        field,
        range,
        input_dir,
        output,
        bom: !no_bom,
        forward_fill: !no_ffill,
        codelist,
    };

    let outcome = merge_dir(&config)?;

    for warning in &outcome.warnings {
        eprintln!("WARNING: {warning}");
    }
    println!(
        "Merged {} columns x {} rows -> {}",
        outcome.column_count,
        outcome.row_count,
        outcome.output_path.display()
    );

    Ok(())
}

/// Resolve the history span from --period or --start/--end.
fn build_span(
    period: Option<String>,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<FetchSpan> {
    if start.is_none() && end.is_none() {
        return Ok(match period {
            Some(p) => FetchSpan::Period(p),
            None => FetchSpan::default(),
        });
    }

    let parse = |raw: &str| {
        parse_flexible_date(raw)
            .ok_or_else(|| anyhow::anyhow!("unparsable date '{raw}': expected YYYYMMDD, YYYY-MM-DD, or YYYY/MM/DD"))
    };
    let start = start.map(parse).transpose()?;
    let end = end.map(parse).transpose()?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            bail!("start date {s} is after end date {e}");
        }
    }
    Ok(FetchSpan::Dates { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_accepts_a_single_file_output_path() {
        let cli = Cli::try_parse_from(["quotegrid", "download", "SPY", "--output", "out/spy.csv"])
            .unwrap();
        let Commands::Download {
            tickers, output, ..
        } = cli.command
        else {
            panic!("expected download command");
        };
        assert_eq!(tickers, vec!["SPY"]);
        assert_eq!(output, Some(PathBuf::from("out/spy.csv")));
    }

    #[test]
    fn file_output_rejects_codelist_mode() {
        let result = Cli::try_parse_from([
            "quotegrid",
            "download",
            "--codelist",
            "list.csv",
            "--output",
            "spy.csv",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn stdout_rejects_codelist_mode() {
        let result = Cli::try_parse_from([
            "quotegrid",
            "download",
            "--codelist",
            "list.csv",
            "--stdout",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn period_rejects_explicit_dates() {
        let result = Cli::try_parse_from([
            "quotegrid",
            "download",
            "SPY",
            "--period",
            "5y",
            "--start",
            "20200101",
        ]);
        assert!(result.is_err());
    }
}
