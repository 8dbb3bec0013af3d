use std::fmt::{Display, Formatter};

use mm_warehouse::{FearGreedRecord, Warehouse};

use crate::adapters::{CnnFearGreedAdapter, FearGreedReading};
use crate::domain::{now_utc, utc_date};
use crate::error::IngestError;
use crate::source::Provenance;

/// Live Fear & Greed reading, one row per run keyed by the UTC date of the
/// source's last update.
pub struct CurrentFearGreedIngestor {
    adapter: CnnFearGreedAdapter,
}

impl CurrentFearGreedIngestor {
    pub fn new(adapter: CnnFearGreedAdapter) -> Self {
        Self { adapter }
    }

    pub fn fetch_current(&self) -> Result<FearGreedReading, IngestError> {
        self.adapter.current()
    }

    pub fn upsert_one(
        &self,
        warehouse: &Warehouse,
        reading: &FearGreedReading,
    ) -> Result<FearGreedRecord, IngestError> {
        let record = FearGreedRecord {
            metric_date: utc_date(reading.last_update_utc),
            value: reading.value,
            description: Some(reading.description.clone()),
            source_last_update_utc: reading.last_update_utc,
            ingested_at_utc: now_utc(),
            source: Provenance::CnnCurrent.to_string(),
        };
        warehouse.upsert_fear_greed(std::slice::from_ref(&record))?;
        Ok(record)
    }

    /// Fetch and store the current reading. Failures are logged and returned;
    /// nothing is written when the fetch fails.
    pub fn run(&self, warehouse: &Warehouse) -> Result<CurrentRunReport, IngestError> {
        let result = self
            .fetch_current()
            .and_then(|reading| self.upsert_one(warehouse, &reading));

        match result {
            Ok(record) => Ok(CurrentRunReport { record }),
            Err(error) => {
                tracing::error!(%error, "fear & greed current ingest failed");
                Err(error)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentRunReport {
    pub record: FearGreedRecord,
}

impl Display for CurrentRunReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[fear_greed] upsert ok metric_date={} value={} desc={}",
            self.record.metric_date,
            self.record.value,
            self.record.description.as_deref().unwrap_or("-"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::cnn::DEFAULT_GRAPHDATA_URL;
    use crate::http_client::{HttpError, HttpResponse, StaticHttpClient};
    use mm_warehouse::{WarehouseConfig, FEAR_GREED_TABLE};
    use tempfile::tempdir;
    use time::macros::date;

    fn ingestor(client: StaticHttpClient) -> CurrentFearGreedIngestor {
        CurrentFearGreedIngestor::new(CnnFearGreedAdapter::new(Arc::new(client)))
    }

    #[test]
    fn run_keys_row_by_utc_date_of_last_update() {
        let dir = tempdir().expect("tempdir");
        let warehouse =
            Warehouse::open(WarehouseConfig::new(dir.path().join("m.duckdb"))).expect("open");
        let client = StaticHttpClient::new().route(
            DEFAULT_GRAPHDATA_URL,
            HttpResponse::ok_json(
                r#"{"fear_and_greed":{"score":25.7,"rating":"extreme fear","timestamp":"2024-03-01T21:00:00-05:00"}}"#,
            ),
        );

        let report = ingestor(client).run(&warehouse).expect("run");

        assert_eq!(report.record.metric_date, date!(2024 - 03 - 02));
        assert_eq!(report.record.source, "cnn-fear-greed-current");
        assert_eq!(
            report.to_string(),
            "[fear_greed] upsert ok metric_date=2024-03-02 value=25.7 desc=extreme fear"
        );
        let rows = warehouse.fear_greed_rows().expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 25.7);
    }

    #[test]
    fn network_failure_writes_nothing() {
        let dir = tempdir().expect("tempdir");
        let warehouse =
            Warehouse::open(WarehouseConfig::new(dir.path().join("m.duckdb"))).expect("open");
        let client = StaticHttpClient::new()
            .route_error(DEFAULT_GRAPHDATA_URL, HttpError::timeout("timed out"));

        let error = ingestor(client).run(&warehouse).expect_err("timeout");

        assert!(matches!(error, IngestError::Network { .. }));
        assert!(!warehouse.table_exists(FEAR_GREED_TABLE).expect("exists"));
    }
}
