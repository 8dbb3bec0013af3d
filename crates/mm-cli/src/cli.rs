//! Arguments shared by the ingestion binaries.
//!
//! | Option | Env | Default |
//! |--------|-----|---------|
//! | `--db-path` | `DUCKDB_PATH` | `data/market.duckdb` |
//! | `--date` (backfill only) | | none |
//!
//! Every binary runs with no arguments.

use std::path::PathBuf;

use clap::{Args, Parser};
use mm_warehouse::{WarehouseConfig, DB_PATH_ENV, DEFAULT_DB_PATH};
use time::macros::format_description;
use time::Date;

#[derive(Debug, Clone, Args)]
pub struct WarehouseArgs {
    /// DuckDB file to write into.
    #[arg(long, env = DB_PATH_ENV, default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,
}

impl WarehouseArgs {
    pub fn config(&self) -> WarehouseConfig {
        WarehouseConfig::new(self.db_path.clone())
    }
}

/// Fetch and upsert one source into the local warehouse.
#[derive(Debug, Parser)]
#[command(version)]
pub struct IngestCli {
    #[command(flatten)]
    pub warehouse: WarehouseArgs,
}

/// Backfill Fear & Greed history from the graphdata endpoint.
#[derive(Debug, Parser)]
#[command(version)]
pub struct BackfillCli {
    #[command(flatten)]
    pub warehouse: WarehouseArgs,

    /// Start date appended to the endpoint (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    pub date: Option<Date>,
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}
