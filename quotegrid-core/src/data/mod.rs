//! Quote acquisition and storage.

pub mod circuit_breaker;
pub mod codelist;
pub mod download;
pub mod provider;
pub mod store;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use codelist::{Codelist, CodelistEntry};
pub use download::{adjust_bars, download_batch, fetch_bars, DownloadRequest, DownloadSummary};
pub use provider::{
    DataError, DownloadProgress, FetchResult, FetchSpan, QuoteBar, QuoteProvider, StderrProgress,
};
pub use store::CsvStore;
pub use yahoo::YahooProvider;
