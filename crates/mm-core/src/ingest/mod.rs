//! Ingestion jobs: fetch from a provider, tag rows, upsert into the warehouse.

pub mod fear_greed;
pub mod fear_greed_backfill;
pub mod prices;

pub use fear_greed::{CurrentFearGreedIngestor, CurrentRunReport};
pub use fear_greed_backfill::{normalize, BackfillReport, FearGreedBackfill};
pub use prices::{PriceIngestor, PriceRunReport, LOOKBACK_DAYS, SPY, VIX};
