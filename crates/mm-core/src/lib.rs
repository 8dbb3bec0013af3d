//! Core ingestion for market-monitor.
//!
//! This crate contains:
//! - Provider adapters for the Yahoo chart API and the CNN Fear & Greed endpoint
//! - Price frame normalisation and source timestamp parsing
//! - Ingestors that write provider data into the local warehouse

pub mod adapters;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod ingest;
pub mod source;

pub use adapters::{CnnFearGreedAdapter, FearGreedReading, GraphPayload, YahooAdapter};
pub use domain::{
    canonical_column_name, parse_source_timestamp, ColumnLabel, DailyBar, FrameError, PriceFrame,
};
pub use error::IngestError;
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, StaticHttpClient,
};
pub use ingest::{
    BackfillReport, CurrentFearGreedIngestor, CurrentRunReport, FearGreedBackfill, PriceIngestor,
    PriceRunReport,
};
pub use mm_warehouse::{
    FearGreedRecord, PriceRecord, Warehouse, WarehouseConfig, WarehouseError, DB_PATH_ENV,
    DEFAULT_DB_PATH,
};
pub use source::Provenance;
