//! Ticker identifier normalization.
//!
//! Tickers appear in three places that must agree: codelist entries, stored
//! file names, and merge column matching. `sanitize_ticker` is the single
//! normalization all three use: every run of non-alphanumeric characters
//! becomes one `-`, leading/trailing separators are stripped.
//! `^GSPC` → `GSPC`, `BRK.B` → `BRK-B`, `7203.T` → `7203-T`.

/// Normalize a ticker into a filename-safe, comparable identifier.
///
/// An input with no alphanumeric characters at all falls back to `data`.
pub fn sanitize_ticker(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() {
        "data".to_string()
    } else {
        out
    }
}

/// The three segments of a stored table's file stem:
/// `<asset_class>_<category>_<ticker>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StemParts<'a> {
    pub asset_class: &'a str,
    pub category: &'a str,
    pub ticker: &'a str,
}

/// Split a file stem on its rightmost two underscores.
///
/// Sanitized segments never contain `_`, but an unsanitized asset class
/// might, so the split anchors from the right. Returns `None` for stems with
/// fewer than three segments (e.g. ad-hoc `<ticker>_<frequency>` downloads).
pub fn split_stem(stem: &str) -> Option<StemParts<'_>> {
    let mut it = stem.rsplitn(3, '_');
    let ticker = it.next()?;
    let category = it.next()?;
    let asset_class = it.next()?;
    Some(StemParts {
        asset_class,
        category,
        ticker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_index_prefix() {
        assert_eq!(sanitize_ticker("^GSPC"), "GSPC");
    }

    #[test]
    fn replaces_punctuation_with_hyphen() {
        assert_eq!(sanitize_ticker("BRK.B"), "BRK-B");
        assert_eq!(sanitize_ticker("7203.T"), "7203-T");
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(sanitize_ticker("A..//B"), "A-B");
    }

    #[test]
    fn empty_input_falls_back() {
        assert_eq!(sanitize_ticker(""), "data");
        assert_eq!(sanitize_ticker("^^^"), "data");
    }

    #[test]
    fn already_clean_passes_through() {
        assert_eq!(sanitize_ticker("SPY"), "SPY");
    }

    #[test]
    fn stem_splits_from_right() {
        let parts = split_stem("equity_us_large_SPY").unwrap();
        assert_eq!(parts.asset_class, "equity_us");
        assert_eq!(parts.category, "large");
        assert_eq!(parts.ticker, "SPY");
    }

    #[test]
    fn short_stem_is_rejected() {
        assert!(split_stem("SPY").is_none());
        assert!(split_stem("etf_SPY").is_none());
    }
}
