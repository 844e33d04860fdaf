//! Quote provider trait and structured error types.
//!
//! The `QuoteProvider` trait abstracts over history sources so the download
//! orchestrator can be exercised against a mock in tests and other providers
//! can be slotted in later.

use crate::period::Frequency;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One bar of quote history with corporate actions attached.
///
/// Price fields are optional: providers report null OHLC on halted days, and
/// a bar is kept as long as at least one of open/high/low/close/volume is
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
    /// Cash dividend paid on this date (0 = no payout).
    pub dividends: f64,
    /// Split factor effective on this date (0 = no split event).
    pub stock_splits: f64,
    /// Provider-adjusted close. Cleared once the adjustment is folded into
    /// the OHLC columns.
    pub adj_close: Option<f64>,
    /// Fund capital-gain distribution. `None` means the response carried no
    /// capital-gains events at all and the column is absent from output.
    pub capital_gains: Option<f64>,
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("store error: {0}")]
    StoreError(String),

    #[error("codelist error: {0}")]
    Codelist(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Requested history span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSpan {
    /// Named lookback window understood by the provider: `1mo`, `6mo`, `1y`,
    /// `5y`, `max`.
    Period(String),
    /// Explicit inclusive date range; open bounds default to the epoch and
    /// today respectively.
    Dates {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl Default for FetchSpan {
    fn default() -> Self {
        FetchSpan::Period("1y".to_string())
    }
}

/// Result of a successful fetch for a single symbol.
///
/// `bars` may be empty: an empty fetch is not an error, the store writes a
/// header-only table for it.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<QuoteBar>,
}

/// Trait for quote history providers.
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for a symbol at the given frequency over the given span.
    fn fetch(
        &self,
        symbol: &str,
        frequency: Frequency,
        span: &FetchSpan,
    ) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not
    /// blocked).
    fn is_available(&self) -> bool;
}

/// Progress callback for multi-symbol operations.
pub trait DownloadProgress: Send {
    /// Called when starting to fetch a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol fetch completes.
    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: &Result<(), DataError>);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that prints to stderr, keeping stdout clean for
/// `--stdout` table output.
pub struct StderrProgress;

impl DownloadProgress for StderrProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        eprintln!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<(), DataError>,
    ) {
        match result {
            Ok(()) => eprintln!("  OK: {symbol}"),
            Err(e) => eprintln!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        eprintln!("Download complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}
