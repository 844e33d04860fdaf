//! Download orchestrator — coordinates multi-symbol downloads with progress
//! reporting, polite inter-request pacing, and early bail-out when the
//! circuit breaker trips.

use super::codelist::CodelistEntry;
use super::provider::{DataError, DownloadProgress, FetchSpan, QuoteBar, QuoteProvider};
use super::store::CsvStore;
use crate::period::Frequency;
use std::time::Duration;

/// Shared parameters for one download run.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub frequency: Frequency,
    pub span: FetchSpan,
    /// Fold the provider's adjusted close into the OHLC columns.
    pub adjust: bool,
    /// Pause between consecutive fetches.
    pub sleep: Duration,
    /// Use the four-segment classified file naming (codelist batches).
    pub classified: bool,
}

/// Summary of a batch download operation.
#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(String, DataError)>,
    /// Non-fatal diagnostics (empty fetches that produced header-only files).
    pub warnings: Vec<String>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Download a batch of tickers, writing one table per ticker.
pub fn download_batch(
    provider: &dyn QuoteProvider,
    store: &CsvStore,
    entries: &[CodelistEntry],
    request: &DownloadRequest,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let total = entries.len();
    let mut succeeded = 0;
    let mut failed = 0;
    let mut errors: Vec<(String, DataError)> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 && !request.sleep.is_zero() {
            std::thread::sleep(request.sleep);
        }

        progress.on_start(&entry.ticker, i, total);

        let result = download_single(provider, store, entry, request, &mut warnings);
        progress.on_complete(&entry.ticker, i, total, &result);

        match result {
            Ok(()) => succeeded += 1,
            Err(e) => {
                errors.push((entry.ticker.clone(), e));
                failed += 1;
            }
        }

        // Bail out early if the circuit breaker tripped
        if !provider.is_available() {
            for entry in &entries[(i + 1)..total] {
                errors.push((entry.ticker.clone(), DataError::CircuitBreakerTripped));
                failed += 1;
            }
            break;
        }
    }

    progress.on_batch_complete(succeeded, failed, total);

    DownloadSummary {
        total,
        succeeded,
        failed,
        errors,
        warnings,
    }
}

/// Download one ticker: fetch → adjust → store.
fn download_single(
    provider: &dyn QuoteProvider,
    store: &CsvStore,
    entry: &CodelistEntry,
    request: &DownloadRequest,
    warnings: &mut Vec<String>,
) -> Result<(), DataError> {
    let bars = fetch_bars(provider, &entry.ticker, request)?;
    if bars.is_empty() {
        warnings.push(format!(
            "empty history for '{}'; wrote a header-only table",
            entry.ticker
        ));
    }

    let file_name = if request.classified {
        CsvStore::classified_file_name(
            entry.asset_class.as_deref(),
            entry.category.as_deref(),
            &entry.ticker,
            request.frequency,
        )
    } else {
        CsvStore::plain_file_name(&entry.ticker, request.frequency)
    };
    store.write(&file_name, &bars)?;
    Ok(())
}

/// Fetch bars for one ticker, applying the adjustment policy.
pub fn fetch_bars(
    provider: &dyn QuoteProvider,
    ticker: &str,
    request: &DownloadRequest,
) -> Result<Vec<QuoteBar>, DataError> {
    let mut bars = provider.fetch(ticker, request.frequency, &request.span)?.bars;
    if request.adjust {
        adjust_bars(&mut bars);
    }
    Ok(bars)
}

/// Fold the adjusted close into the OHLC columns.
///
/// Each bar's prices are scaled by `adj_close / close`; the adjusted close is
/// then dropped (it would duplicate `Close`). Bars without both closes are
/// left untouched.
pub fn adjust_bars(bars: &mut [QuoteBar]) {
    for bar in bars {
        let (Some(close), Some(adj)) = (bar.close, bar.adj_close) else {
            continue;
        };
        if close == 0.0 {
            continue;
        }
        let ratio = adj / close;
        bar.open = bar.open.map(|v| v * ratio);
        bar.high = bar.high.map(|v| v * ratio);
        bar.low = bar.low.map(|v| v * ratio);
        bar.close = Some(adj);
        bar.adj_close = None;
    }
}
