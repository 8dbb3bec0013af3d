//! Behavior-driven tests for the warehouse upsert policy.
//!
//! These tests verify what a caller observes after writing rows: key
//! uniqueness, overwrite-on-conflict, and idempotent re-runs.

use mm_warehouse::{
    FearGreedRecord, PriceRecord, Warehouse, WarehouseConfig, WarehouseError, FEAR_GREED_TABLE,
    PRICES_TABLE,
};
use std::fs;
use tempfile::tempdir;
use time::macros::{date, datetime};
use time::{Date, OffsetDateTime};

fn open(dir: &std::path::Path) -> Warehouse {
    Warehouse::open(WarehouseConfig::new(dir.join("data").join("market.duckdb")))
        .expect("warehouse open")
}

fn bar(symbol: &str, date: Date, close: f64, ingested_at: OffsetDateTime) -> PriceRecord {
    PriceRecord {
        symbol: symbol.to_string(),
        date,
        open: close - 1.5,
        high: close + 2.0,
        low: close - 3.0,
        close,
        adj_close: close,
        volume: Some(1_000_000),
        source: String::from("yahoo-chart"),
        ingested_at,
    }
}

fn reading(metric_date: Date, value: f64, source: &str) -> FearGreedRecord {
    FearGreedRecord {
        metric_date,
        value,
        description: Some(String::from("neutral")),
        source_last_update_utc: metric_date.midnight().assume_utc(),
        ingested_at_utc: datetime!(2024-02-01 12:00 UTC),
        source: source.to_string(),
    }
}

// =============================================================================
// Prices
// =============================================================================

#[test]
fn when_the_same_bars_are_written_twice_the_table_is_unchanged() {
    // Given: A fresh warehouse and a two-day batch
    let temp = tempdir().expect("tempdir");
    let warehouse = open(temp.path());
    let first_run = datetime!(2024-01-05 21:00 UTC);
    let batch = vec![
        bar("SPY", date!(2024 - 01 - 02), 472.65, first_run),
        bar("SPY", date!(2024 - 01 - 03), 468.79, first_run),
    ];

    // When: The batch is upserted twice
    assert_eq!(warehouse.upsert_prices(&batch).expect("first"), 2);
    let after_first = warehouse.price_rows("SPY").expect("rows");
    assert_eq!(warehouse.upsert_prices(&batch).expect("second"), 2);
    let after_second = warehouse.price_rows("SPY").expect("rows");

    // Then: Row count and every value are identical
    assert_eq!(after_first, after_second);
    assert_eq!(after_second.len(), 2);
    assert_eq!(after_second[0].date, date!(2024 - 01 - 02));
}

#[test]
fn when_a_bar_is_rewritten_every_non_key_column_takes_the_new_value() {
    // Given: A stored bar
    let temp = tempdir().expect("tempdir");
    let warehouse = open(temp.path());
    let day = date!(2024 - 01 - 02);
    warehouse
        .upsert_prices(&[bar("SPY", day, 470.0, datetime!(2024-01-02 22:00 UTC))])
        .expect("seed");

    // When: A corrected bar for the same key arrives later
    let mut corrected = bar("SPY", day, 472.65, datetime!(2024-01-03 22:00 UTC));
    corrected.adj_close = 465.1;
    corrected.volume = None;
    warehouse.upsert_prices(&[corrected.clone()]).expect("rewrite");

    // Then: One row remains and it carries the new values
    let rows = warehouse.price_rows("SPY").expect("rows");
    assert_eq!(rows, vec![corrected]);
}

#[test]
fn symbols_share_a_date_without_colliding() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open(temp.path());
    let day = date!(2024 - 01 - 02);
    let at = datetime!(2024-01-02 22:00 UTC);

    warehouse
        .upsert_prices(&[bar("SPY", day, 472.65, at), bar("^VIX", day, 14.04, at)])
        .expect("upsert");

    assert_eq!(warehouse.price_rows("SPY").expect("spy").len(), 1);
    assert_eq!(warehouse.price_rows("^VIX").expect("vix")[0].close, 14.04);
}

#[test]
fn empty_price_batch_still_prepares_the_table() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open(temp.path());

    assert_eq!(warehouse.upsert_prices(&[]).expect("empty"), 0);

    assert!(warehouse.table_exists(PRICES_TABLE).expect("exists"));
    assert!(warehouse.price_rows("SPY").expect("rows").is_empty());
}

// =============================================================================
// Fear & Greed
// =============================================================================

#[test]
fn one_row_per_metric_date_with_latest_writer_winning() {
    // Given: A backfilled reading
    let temp = tempdir().expect("tempdir");
    let warehouse = open(temp.path());
    let day = date!(2024 - 01 - 31);
    warehouse
        .upsert_fear_greed(&[reading(day, 61.0, "cnn-graphdata")])
        .expect("backfill");

    // When: The live ingestor writes the same date
    warehouse
        .upsert_fear_greed(&[reading(day, 63.5, "cnn-fear-greed-current")])
        .expect("current");

    // Then: The live reading replaced the backfilled one
    let rows = warehouse.fear_greed_rows().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, 63.5);
    assert_eq!(rows[0].source, "cnn-fear-greed-current");
}

#[test]
fn duplicate_dates_inside_one_batch_keep_the_last() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open(temp.path());
    let day = date!(2024 - 01 - 31);

    let processed = warehouse
        .upsert_fear_greed(&[
            reading(day, 10.0, "cnn-graphdata"),
            reading(date!(2024 - 01 - 30), 20.0, "cnn-graphdata"),
            reading(day, 30.0, "cnn-graphdata"),
        ])
        .expect("upsert");

    assert_eq!(processed, 3);
    let rows = warehouse.fear_greed_rows().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].metric_date, day);
    assert_eq!(rows[1].value, 30.0);
}

#[test]
fn empty_fear_greed_batch_touches_nothing() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open(temp.path());

    assert_eq!(warehouse.upsert_fear_greed(&[]).expect("empty"), 0);

    assert!(!warehouse.table_exists(FEAR_GREED_TABLE).expect("exists"));
}

#[test]
fn data_survives_reopening_the_file() {
    // Given: Rows written through one handle
    let temp = tempdir().expect("tempdir");
    {
        let warehouse = open(temp.path());
        warehouse
            .upsert_fear_greed(&[reading(date!(2024 - 01 - 31), 55.0, "cnn-graphdata")])
            .expect("upsert");
    }

    // When: The file is opened again
    let reopened = open(temp.path());

    // Then: The rows are still there
    assert_eq!(reopened.fear_greed_rows().expect("rows").len(), 1);
}

// =============================================================================
// Storage failures
// =============================================================================

#[test]
fn opening_a_file_that_is_not_a_database_is_an_error() {
    // Given: A path holding arbitrary bytes
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("market.duckdb");
    fs::write(&path, "not a duckdb file\n".repeat(512)).expect("write garbage");

    // When: The warehouse is opened on it
    let result = Warehouse::open(WarehouseConfig::new(&path));

    // Then: A typed storage error comes back instead of a panic
    assert!(matches!(result, Err(WarehouseError::DuckDb(_))));
}

#[test]
fn a_batch_that_fails_partway_commits_nothing() {
    // Given: A Fear & Greed table that rejects values above 100
    let temp = tempdir().expect("tempdir");
    let warehouse = open(temp.path());
    warehouse
        .connection()
        .execute_batch(
            r#"
CREATE TABLE raw_fear_greed_daily (
    metric_date DATE PRIMARY KEY,
    value DOUBLE CHECK (value <= 100),
    description TEXT,
    source_last_update_utc TIMESTAMP,
    ingested_at_utc TIMESTAMP,
    source TEXT
);
"#,
        )
        .expect("create constrained table");

    // When: The second row of a batch violates the constraint
    let result = warehouse.upsert_fear_greed(&[
        reading(date!(2024 - 01 - 30), 40.0, "cnn-graphdata"),
        reading(date!(2024 - 01 - 31), 150.0, "cnn-graphdata"),
    ]);

    // Then: The batch fails, the first row is rolled back, and the handle still works
    assert!(result.is_err());
    assert!(warehouse.fear_greed_rows().expect("rows").is_empty());
    warehouse
        .upsert_fear_greed(&[reading(date!(2024 - 01 - 30), 40.0, "cnn-graphdata")])
        .expect("later batch");
    assert_eq!(warehouse.fear_greed_rows().expect("rows").len(), 1);
}
