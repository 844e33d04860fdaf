//! End-to-end tests for the merge pipeline over real files.
//!
//! Each test seeds a temp directory with per-ticker tables, runs `merge_dir`,
//! and inspects the written wide table.

use quotegrid_core::merge::{
    merge_dir, DateRange, MergeConfig, MergeError, MergeWarning, SkipReason, ValueField,
};
use quotegrid_core::period::Frequency;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn seed(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn read_lines(path: &Path) -> Vec<String> {
    let bytes = fs::read(path).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    text.lines().map(String::from).collect()
}

fn config(dir: &TempDir, frequency: Frequency, field: ValueField) -> MergeConfig {
    let mut config = MergeConfig::new(frequency, field, dir.path());
    config.bom = false;
    config
}

#[test]
fn monthly_close_merge_joins_and_fills() {
    let dir = TempDir::new().unwrap();
    // A trades through January and March; B only in January. The monthly
    // close keeps the last value of each month; B's February gap is bridged
    // by the one-step fill but March stays missing.
    seed(
        dir.path(),
        "etf_us_AAA_monthly.csv",
        "Date,Close\n2020-01-02,10\n2020-01-31,11\n2020-02-14,12\n2020-03-31,13\n",
    );
    seed(
        dir.path(),
        "etf_us_BBB_monthly.csv",
        "Date,Close\n2020-01-02,5\n2020-01-15,6\n",
    );

    let outcome = merge_dir(&config(&dir, Frequency::Monthly, ValueField::Close)).unwrap();
    assert_eq!(outcome.row_count, 3);
    assert_eq!(outcome.column_count, 2);
    assert!(outcome.warnings.is_empty());

    let lines = read_lines(&outcome.output_path);
    assert_eq!(lines[0], "Date,etf_us_AAA,etf_us_BBB");
    assert_eq!(lines[1], "2020-01-01,11,6");
    assert_eq!(lines[2], "2020-02-01,12,6");
    assert_eq!(lines[3], "2020-03-01,13,");
}

#[test]
fn default_output_path_encodes_frequency_and_field() {
    let dir = TempDir::new().unwrap();
    seed(dir.path(), "etf_us_AAA_daily.csv", "Date,High\n2020-01-02,10\n");

    let outcome = merge_dir(&config(&dir, Frequency::Daily, ValueField::High)).unwrap();
    assert_eq!(
        outcome.output_path,
        dir.path().join("merged_daily_high.csv")
    );
}

#[test]
fn tables_missing_the_column_are_skipped_with_warning() {
    let dir = TempDir::new().unwrap();
    seed(
        dir.path(),
        "etf_us_AAA_daily.csv",
        "Date,Close,Dividends\n2020-01-02,10,0\n",
    );
    seed(dir.path(), "etf_us_BBB_daily.csv", "Date,Close\n2020-01-02,5\n");

    let outcome = merge_dir(&config(&dir, Frequency::Daily, ValueField::Dividends)).unwrap();
    assert_eq!(outcome.column_count, 1);

    let skipped: Vec<_> = outcome
        .warnings
        .iter()
        .filter_map(|w| match w {
            MergeWarning::SkippedTable { path, reason } => Some((path.clone(), reason.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].0.contains("BBB"));
    assert_eq!(skipped[0].1, SkipReason::MissingColumn("Dividends".into()));
}

#[test]
fn unrecognized_file_names_warn_and_are_ignored() {
    let dir = TempDir::new().unwrap();
    seed(dir.path(), "etf_us_AAA_daily.csv", "Date,Close\n2020-01-02,10\n");
    // Ad-hoc two-segment download name: no classification segments.
    seed(dir.path(), "SPY_daily.csv", "Date,Close\n2020-01-02,5\n");

    let outcome = merge_dir(&config(&dir, Frequency::Daily, ValueField::Close)).unwrap();
    assert_eq!(outcome.column_count, 1);
    assert!(outcome
        .warnings
        .iter()
        .any(|w| matches!(w, MergeWarning::UnrecognizedFileName { path } if path.contains("SPY"))));
}

#[test]
fn codelist_fixes_column_order_and_reports_mismatches() {
    let dir = TempDir::new().unwrap();
    seed(dir.path(), "etf_us_AAA_daily.csv", "Date,Close\n2020-01-02,1\n");
    seed(dir.path(), "etf_us_BBB_daily.csv", "Date,Close\n2020-01-02,2\n");
    seed(dir.path(), "etf_us_DDD_daily.csv", "Date,Close\n2020-01-02,4\n");
    let codelist = dir.path().join("codelist.csv");
    fs::write(&codelist, "etf_ticker\nBBB\nAAA\nCCC\n").unwrap();

    let mut config = config(&dir, Frequency::Daily, ValueField::Close);
    config.codelist = Some(codelist);
    let outcome = merge_dir(&config).unwrap();

    let lines = read_lines(&outcome.output_path);
    assert_eq!(lines[0], "Date,etf_us_BBB,etf_us_AAA,etf_us_DDD");

    assert!(outcome.warnings.contains(&MergeWarning::ReferenceWithoutData {
        ticker: "CCC".into()
    }));
    assert!(outcome.warnings.contains(&MergeWarning::DataWithoutReference {
        identifier: "DDD".into()
    }));
}

#[test]
fn date_range_filters_before_normalization() {
    let dir = TempDir::new().unwrap();
    // With the range ending 2020-01-15, the 2020-01-31 close must not leak
    // into the January bucket.
    seed(
        dir.path(),
        "etf_us_AAA_monthly.csv",
        "Date,Close\n2020-01-02,10\n2020-01-31,99\n2020-02-03,20\n",
    );

    let mut config = config(&dir, Frequency::Monthly, ValueField::Close);
    config.range = Some(DateRange::parse("20200101-20200115").unwrap());
    let outcome = merge_dir(&config).unwrap();

    let lines = read_lines(&outcome.output_path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "2020-01-01,10");
}

#[test]
fn range_encodings_are_interchangeable() {
    let dir = TempDir::new().unwrap();
    seed(
        dir.path(),
        "etf_us_AAA_daily.csv",
        "Date,Close\n2019-12-31,1\n2020-06-15,2\n2021-01-02,3\n",
    );

    for literal in ["20200101-20201231", "2020-01-01-2020-12-31", "2020/01/01-2020/12/31"] {
        let mut config = config(&dir, Frequency::Daily, ValueField::Close);
        config.range = Some(DateRange::parse(literal).unwrap());
        let outcome = merge_dir(&config).unwrap();
        assert_eq!(outcome.row_count, 1, "{literal}");
    }
}

#[test]
fn empty_directory_is_a_fatal_error() {
    let dir = TempDir::new().unwrap();
    // A file of the wrong frequency does not count.
    seed(dir.path(), "etf_us_AAA_weekly.csv", "Date,Close\n2020-01-06,1\n");

    let err = merge_dir(&config(&dir, Frequency::Daily, ValueField::Close)).unwrap_err();
    assert!(matches!(err, MergeError::NoInputFiles { .. }));
}

#[test]
fn all_tables_skipped_still_writes_a_header_and_warns_empty() {
    let dir = TempDir::new().unwrap();
    seed(dir.path(), "etf_us_AAA_daily.csv", "Date,Close\n");

    let outcome = merge_dir(&config(&dir, Frequency::Daily, ValueField::Close)).unwrap();
    assert_eq!(outcome.row_count, 0);
    assert_eq!(outcome.column_count, 0);
    assert!(outcome.warnings.contains(&MergeWarning::EmptyResult));

    let lines = read_lines(&outcome.output_path);
    assert_eq!(lines, vec!["Date".to_string()]);
}

#[test]
fn bom_round_trip() {
    let dir = TempDir::new().unwrap();
    // Input carries a BOM; output gets one when configured.
    seed(
        dir.path(),
        "etf_us_AAA_daily.csv",
        "\u{feff}Date,Close\n2020-01-02,10\n",
    );

    let mut config = config(&dir, Frequency::Daily, ValueField::Close);
    config.bom = true;
    let outcome = merge_dir(&config).unwrap();

    let bytes = fs::read(&outcome.output_path).unwrap();
    assert!(bytes.starts_with(b"\xef\xbb\xbf"));
    assert_eq!(outcome.row_count, 1);
}

#[test]
fn weekly_volume_sums_within_monday_buckets() {
    let dir = TempDir::new().unwrap();
    // 2024-03-11 is a Monday; 2024-03-15 the same week's Friday.
    seed(
        dir.path(),
        "etf_us_AAA_weekly.csv",
        "Date,Volume\n2024-03-11,100\n2024-03-15,250\n2024-03-18,40\n",
    );

    let outcome = merge_dir(&config(&dir, Frequency::Weekly, ValueField::Volume)).unwrap();
    let lines = read_lines(&outcome.output_path);
    assert_eq!(lines[1], "2024-03-11,350");
    assert_eq!(lines[2], "2024-03-18,40");
}

#[test]
fn forward_fill_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    seed(dir.path(), "etf_us_AAA_daily.csv", "Date,Close\n2020-01-02,10\n2020-01-03,11\n");
    seed(dir.path(), "etf_us_BBB_daily.csv", "Date,Close\n2020-01-02,5\n");

    let mut config = config(&dir, Frequency::Daily, ValueField::Close);
    config.forward_fill = false;
    let outcome = merge_dir(&config).unwrap();

    let lines = read_lines(&outcome.output_path);
    assert_eq!(lines[2], "2020-01-03,11,");
}

#[test]
fn unreadable_codelist_is_fatal() {
    let dir = TempDir::new().unwrap();
    seed(dir.path(), "etf_us_AAA_daily.csv", "Date,Close\n2020-01-02,10\n");

    let mut config = config(&dir, Frequency::Daily, ValueField::Close);
    config.codelist = Some(dir.path().join("missing.csv"));
    let err = merge_dir(&config).unwrap_err();
    assert!(matches!(err, MergeError::Codelist(_)));
}
