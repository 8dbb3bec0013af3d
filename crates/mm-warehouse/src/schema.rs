//! Raw table definitions. Every statement is `CREATE ... IF NOT EXISTS`, so the
//! ensure functions can run on every ingestion.

use ::duckdb::Connection;

pub const PRICES_TABLE: &str = "raw_prices_daily";
pub const FEAR_GREED_TABLE: &str = "raw_fear_greed_daily";

struct TableDef {
    name: &'static str,
    sql: &'static str,
}

const PRICES: TableDef = TableDef {
    name: PRICES_TABLE,
    sql: r#"
CREATE TABLE IF NOT EXISTS raw_prices_daily (
    symbol TEXT NOT NULL,
    date DATE NOT NULL,
    open DOUBLE,
    high DOUBLE,
    low DOUBLE,
    close DOUBLE,
    adj_close DOUBLE,
    volume BIGINT,
    source TEXT,
    ingested_at TIMESTAMP,
    PRIMARY KEY(symbol, date)
);
"#,
};

const FEAR_GREED: TableDef = TableDef {
    name: FEAR_GREED_TABLE,
    sql: r#"
CREATE TABLE IF NOT EXISTS raw_fear_greed_daily (
    metric_date DATE PRIMARY KEY,
    value DOUBLE,
    description TEXT,
    source_last_update_utc TIMESTAMP,
    ingested_at_utc TIMESTAMP,
    source TEXT
);
"#,
};

/// Create `raw_prices_daily` keyed by `(symbol, date)` if it is missing.
pub fn ensure_price_table(connection: &Connection) -> Result<(), ::duckdb::Error> {
    ensure(connection, &PRICES)
}

/// Create `raw_fear_greed_daily` keyed by `metric_date` if it is missing.
pub fn ensure_fear_greed_table(connection: &Connection) -> Result<(), ::duckdb::Error> {
    ensure(connection, &FEAR_GREED)
}

fn ensure(connection: &Connection, table: &TableDef) -> Result<(), ::duckdb::Error> {
    tracing::debug!(table = table.name, "ensuring table");
    connection.execute_batch(table.sql)
}

pub fn table_exists(connection: &Connection, name: &str) -> Result<bool, ::duckdb::Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
