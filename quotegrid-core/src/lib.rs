//! QuoteGrid Core — quote history download, CSV storage, and the merge engine.
//!
//! Two halves:
//! - `data` — Yahoo Finance provider, per-ticker CSV store, codelist handling,
//!   batch download orchestration
//! - `merge` — period normalization, per-field aggregation, gap fill, and
//!   outer-join assembly of per-ticker series into one date-keyed wide table
//!
//! The per-ticker merge pipeline (read → filter → normalize → aggregate) is
//! pure: each stage takes a series and returns a new one. Shared state only
//! appears at the final assembly step.

pub mod data;
pub mod merge;
pub mod period;
pub mod symbol;
