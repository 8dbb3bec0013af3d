//! # mm-warehouse
//!
//! Local DuckDB storage for the market-monitor raw tables.
//!
//! | Table | Key | Written by |
//! |-------|-----|------------|
//! | `raw_prices_daily` | `(symbol, date)` | price ingestors |
//! | `raw_fear_greed_daily` | `metric_date` | Fear & Greed ingestors |
//!
//! Every write is an upsert: inserting a row whose key already exists replaces
//! all non-key columns with the new values. Re-running an ingestion over the
//! same upstream data therefore leaves the table unchanged apart from the
//! ingestion timestamps.
//!
//! ```rust,no_run
//! use mm_warehouse::{Warehouse, WarehouseConfig};
//!
//! let warehouse = Warehouse::open(WarehouseConfig::new("data/market.duckdb"))?;
//! let rows = warehouse.price_rows("SPY")?;
//! println!("{} SPY rows", rows.len());
//! # Ok::<(), mm_warehouse::WarehouseError>(())
//! ```

pub mod duckdb;
pub mod schema;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, Connection};
use thiserror::Error;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

pub use schema::{FEAR_GREED_TABLE, PRICES_TABLE};

/// Database path used when no override is configured.
pub const DEFAULT_DB_PATH: &str = "data/market.duckdb";

/// Environment variable that overrides [`DEFAULT_DB_PATH`].
pub const DB_PATH_ENV: &str = "DUCKDB_PATH";

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error creating the database directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A stored value could not be converted back into a record.
    #[error("invalid stored value: {0}")]
    InvalidData(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    pub db_path: PathBuf,
}

impl WarehouseConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

/// One daily OHLCV row in `raw_prices_daily`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub symbol: String,
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: Option<i64>,
    pub source: String,
    pub ingested_at: OffsetDateTime,
}

/// One daily reading in `raw_fear_greed_daily`.
#[derive(Debug, Clone, PartialEq)]
pub struct FearGreedRecord {
    pub metric_date: Date,
    pub value: f64,
    pub description: Option<String>,
    pub source_last_update_utc: OffsetDateTime,
    pub ingested_at_utc: OffsetDateTime,
    pub source: String,
}

/// A single open database file. The connection closes when the warehouse is
/// dropped, on success and error paths alike.
pub struct Warehouse {
    config: WarehouseConfig,
    connection: Connection,
}

impl Warehouse {
    /// Open or create the database file, creating its parent directory first.
    ///
    /// No tables are created here; each upsert ensures its own table.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let connection = duckdb::open_connection(config.db_path.as_path())?;
        tracing::debug!(path = %config.db_path.display(), "opened warehouse");
        Ok(Self { config, connection })
    }

    pub fn db_path(&self) -> &Path {
        self.config.db_path.as_path()
    }

    /// Underlying connection, for ad-hoc SQL.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn ensure_price_table(&self) -> Result<(), WarehouseError> {
        schema::ensure_price_table(&self.connection)?;
        Ok(())
    }

    pub fn ensure_fear_greed_table(&self) -> Result<(), WarehouseError> {
        schema::ensure_fear_greed_table(&self.connection)?;
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, WarehouseError> {
        Ok(schema::table_exists(&self.connection, name)?)
    }

    /// Upsert price rows keyed by `(symbol, date)` and return how many rows
    /// were processed.
    ///
    /// The batch runs in one transaction. Duplicate keys inside the batch
    /// collapse to their last occurrence.
    pub fn upsert_prices(&self, rows: &[PriceRecord]) -> Result<usize, WarehouseError> {
        self.ensure_price_table()?;
        if rows.is_empty() {
            return Ok(0);
        }

        let unique = last_per_key(rows, |row| (row.symbol.clone(), row.date));
        self.connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            let mut statement = self.connection.prepare(
                r#"
INSERT INTO raw_prices_daily (
    symbol, date, open, high, low, close, adj_close, volume, source, ingested_at
) VALUES (
    ?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP)
)
ON CONFLICT (symbol, date) DO UPDATE SET
    open = excluded.open,
    high = excluded.high,
    low = excluded.low,
    close = excluded.close,
    adj_close = excluded.adj_close,
    volume = excluded.volume,
    source = excluded.source,
    ingested_at = excluded.ingested_at
"#,
            )?;
            for row in &unique {
                statement.execute(params![
                    row.symbol,
                    sql_date(row.date),
                    row.open,
                    row.high,
                    row.low,
                    row.close,
                    row.adj_close,
                    row.volume,
                    row.source,
                    sql_timestamp(row.ingested_at)?,
                ])?;
            }
            Ok(())
        })();

        finalize_transaction(&self.connection, result)?;
        tracing::debug!(rows = rows.len(), unique = unique.len(), "upserted prices");
        Ok(rows.len())
    }

    /// Upsert Fear & Greed rows keyed by `metric_date`.
    ///
    /// An empty batch returns 0 without touching the schema.
    pub fn upsert_fear_greed(&self, rows: &[FearGreedRecord]) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.ensure_fear_greed_table()?;

        let unique = last_per_key(rows, |row| row.metric_date);
        self.connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            let mut statement = self.connection.prepare(
                r#"
INSERT INTO raw_fear_greed_daily (
    metric_date, value, description, source_last_update_utc, ingested_at_utc, source
) VALUES (
    CAST(? AS DATE), ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP), ?
)
ON CONFLICT (metric_date) DO UPDATE SET
    value = excluded.value,
    description = excluded.description,
    source_last_update_utc = excluded.source_last_update_utc,
    ingested_at_utc = excluded.ingested_at_utc,
    source = excluded.source
"#,
            )?;
            for row in &unique {
                statement.execute(params![
                    sql_date(row.metric_date),
                    row.value,
                    row.description,
                    sql_timestamp(row.source_last_update_utc)?,
                    sql_timestamp(row.ingested_at_utc)?,
                    row.source,
                ])?;
            }
            Ok(())
        })();

        finalize_transaction(&self.connection, result)?;
        tracing::debug!(rows = rows.len(), unique = unique.len(), "upserted fear & greed");
        Ok(rows.len())
    }

    /// Stored prices for `symbol`, oldest first. Empty if the table is absent.
    pub fn price_rows(&self, symbol: &str) -> Result<Vec<PriceRecord>, WarehouseError> {
        if !self.table_exists(PRICES_TABLE)? {
            return Ok(Vec::new());
        }

        let mut statement = self.connection.prepare(
            r#"
SELECT symbol, CAST(date AS VARCHAR), open, high, low, close, adj_close, volume, source,
       epoch_us(ingested_at)
FROM raw_prices_daily
WHERE symbol = ?
ORDER BY date
"#,
        )?;
        let raw = statement
            .query_map([symbol], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, Option<i64>>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, i64>(9)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(
                |(symbol, date, open, high, low, close, adj_close, volume, source, ingested)| {
                    Ok(PriceRecord {
                        symbol,
                        date: parse_sql_date(&date)?,
                        open,
                        high,
                        low,
                        close,
                        adj_close,
                        volume,
                        source,
                        ingested_at: from_epoch_us(ingested)?,
                    })
                },
            )
            .collect()
    }

    /// All stored Fear & Greed readings, oldest first. Empty if the table is absent.
    pub fn fear_greed_rows(&self) -> Result<Vec<FearGreedRecord>, WarehouseError> {
        if !self.table_exists(FEAR_GREED_TABLE)? {
            return Ok(Vec::new());
        }

        let mut statement = self.connection.prepare(
            r#"
SELECT CAST(metric_date AS VARCHAR), value, description,
       epoch_us(source_last_update_utc), epoch_us(ingested_at_utc), source
FROM raw_fear_greed_daily
ORDER BY metric_date
"#,
        )?;
        let raw = statement
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(date, value, description, last_update, ingested, source)| {
                Ok(FearGreedRecord {
                    metric_date: parse_sql_date(&date)?,
                    value,
                    description,
                    source_last_update_utc: from_epoch_us(last_update)?,
                    ingested_at_utc: from_epoch_us(ingested)?,
                    source,
                })
            })
            .collect()
    }
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// Keep only the last row for each key, preserving the order of those rows.
fn last_per_key<T, K, F>(rows: &[T], key: F) -> Vec<&T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut last = BTreeMap::new();
    for (index, row) in rows.iter().enumerate() {
        last.insert(key(row), index);
    }
    rows.iter()
        .enumerate()
        .filter(|(index, row)| last.get(&key(*row)) == Some(index))
        .map(|(_, row)| row)
        .collect()
}

fn sql_date(date: Date) -> String {
    date.to_string()
}

fn sql_timestamp(value: OffsetDateTime) -> Result<String, WarehouseError> {
    value
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
        ))
        .map_err(|error| WarehouseError::InvalidData(format!("unformattable timestamp: {error}")))
}

fn parse_sql_date(value: &str) -> Result<Date, WarehouseError> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|_| WarehouseError::InvalidData(format!("date '{value}'")))
}

fn from_epoch_us(micros: i64) -> Result<OffsetDateTime, WarehouseError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|_| WarehouseError::InvalidData(format!("timestamp {micros}us")))
}
