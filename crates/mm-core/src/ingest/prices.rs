use std::fmt::{Display, Formatter};

use mm_warehouse::{PriceRecord, Warehouse};
use time::{Date, Duration, OffsetDateTime};

use crate::adapters::YahooAdapter;
use crate::domain::{now_utc, DailyBar};
use crate::error::IngestError;
use crate::source::Provenance;

pub const SPY: &str = "SPY";
pub const VIX: &str = "^VIX";

/// Trailing window fetched on every run.
pub const LOOKBACK_DAYS: i64 = 3650;

/// Fetches daily bars for one symbol and upserts them into `raw_prices_daily`.
pub struct PriceIngestor {
    adapter: YahooAdapter,
    symbol: String,
    lookback: Duration,
}

impl PriceIngestor {
    pub fn new(adapter: YahooAdapter, symbol: impl Into<String>) -> Self {
        Self {
            adapter,
            symbol: symbol.into(),
            lookback: Duration::days(LOOKBACK_DAYS),
        }
    }

    pub fn spy(adapter: YahooAdapter) -> Self {
        Self::new(adapter, SPY)
    }

    pub fn vix(adapter: YahooAdapter) -> Self {
        Self::new(adapter, VIX)
    }

    /// Short lowercase name used as the summary prefix: `SPY` -> `spy`, `^VIX` -> `vix`.
    pub fn tag(&self) -> String {
        self.symbol
            .trim_start_matches('^')
            .to_ascii_lowercase()
    }

    /// Bars for the trailing window ending now.
    pub fn fetch(&self) -> Result<Vec<DailyBar>, IngestError> {
        let end = now_utc();
        self.fetch_window(end - self.lookback, end)
    }

    pub fn fetch_window(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<DailyBar>, IngestError> {
        let frame = self.adapter.daily_frame(&self.symbol, start, end)?;
        frame
            .into_bars()
            .map_err(|error| IngestError::empty("yahoo", format!("{}: {error}", self.symbol)))
    }

    /// Tag every bar with the symbol, provenance and a shared write timestamp,
    /// then upsert. Returns the number of rows processed.
    pub fn upsert(&self, warehouse: &Warehouse, bars: &[DailyBar]) -> Result<usize, IngestError> {
        let ingested_at = now_utc();
        let rows = bars
            .iter()
            .map(|bar| PriceRecord {
                symbol: self.symbol.clone(),
                date: bar.date,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                adj_close: bar.adj_close,
                volume: bar.volume,
                source: Provenance::YahooChart.to_string(),
                ingested_at,
            })
            .collect::<Vec<_>>();

        Ok(warehouse.upsert_prices(&rows)?)
    }

    pub fn run(&self, warehouse: &Warehouse) -> Result<PriceRunReport, IngestError> {
        tracing::info!(symbol = %self.symbol, "price fetch start");
        let bars = self.fetch()?;
        let first_date = bars.iter().map(|bar| bar.date).min();
        let last_date = bars.iter().map(|bar| bar.date).max();
        tracing::info!(
            symbol = %self.symbol,
            rows = bars.len(),
            first = ?first_date,
            last = ?last_date,
            "price fetch done"
        );

        let written = self.upsert(warehouse, &bars)?;
        Ok(PriceRunReport {
            tag: self.tag(),
            fetched: bars.len(),
            first_date,
            last_date,
            written,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRunReport {
    pub tag: String,
    pub fetched: usize,
    pub first_date: Option<Date>,
    pub last_date: Option<Date>,
    pub written: usize,
}

impl Display for PriceRunReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] fetched rows={}", self.tag, self.fetched)?;
        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            write!(f, " date_range={first}~{last}")?;
        }
        write!(f, " upserted={}", self.written)
    }
}
