//! Fear & Greed history from the graphdata endpoint.
//!
//! The payload shape is not stable. Shape drift yields zero rows rather than
//! an error so a scheduler keeps running; the summary line makes the anomaly
//! visible to whoever reads the logs.

use std::fmt::{Display, Formatter};

use mm_warehouse::{FearGreedRecord, Warehouse};
use serde_json::{Map, Value};
use time::{Date, OffsetDateTime};

use crate::adapters::cnn::{rating_text, score_value};
use crate::adapters::{CnnFearGreedAdapter, GraphPayload};
use crate::domain::{now_utc, parse_source_timestamp, utc_date};
use crate::error::IngestError;
use crate::source::Provenance;

pub struct FearGreedBackfill {
    adapter: CnnFearGreedAdapter,
}

impl FearGreedBackfill {
    pub fn new(adapter: CnnFearGreedAdapter) -> Self {
        Self { adapter }
    }

    pub fn fetch_range(&self, date: Option<Date>) -> Result<Value, IngestError> {
        self.adapter.fetch_graphdata(date)
    }

    pub fn upsert_many(
        &self,
        warehouse: &Warehouse,
        rows: &[FearGreedRecord],
    ) -> Result<usize, IngestError> {
        Ok(warehouse.upsert_fear_greed(rows)?)
    }

    pub fn run(&self, warehouse: &Warehouse, date: Option<Date>) -> Result<BackfillReport, IngestError> {
        let payload = self.fetch_range(date)?;
        let rows = normalize(&payload, now_utc());
        if rows.is_empty() {
            tracing::warn!("graphdata payload produced no rows");
        }
        let upserted = self.upsert_many(warehouse, &rows)?;

        Ok(BackfillReport {
            upserted,
            first_date: rows.iter().map(|row| row.metric_date).min(),
            last_date: rows.iter().map(|row| row.metric_date).max(),
        })
    }
}

/// Turn a graphdata payload into rows. Unrecognised payloads and malformed
/// points are dropped without error.
pub fn normalize(payload: &Value, ingested_at: OffsetDateTime) -> Vec<FearGreedRecord> {
    match GraphPayload::classify(payload) {
        GraphPayload::Historical(points) => {
            let rows = points
                .iter()
                .filter_map(|point| historical_row(point, ingested_at))
                .collect::<Vec<_>>();
            tracing::debug!(points = points.len(), kept = rows.len(), "normalized history");
            rows
        }
        GraphPayload::Current(current) => current_row(current, ingested_at).into_iter().collect(),
        GraphPayload::Unrecognized => Vec::new(),
    }
}

/// Points are `{score, rating, timestamp}`; the chart form `{x, y, rating}` is
/// accepted when the named fields are absent.
fn historical_row(point: &Value, ingested_at: OffsetDateTime) -> Option<FearGreedRecord> {
    let point = point.as_object()?;
    let score = field_or_alias(point, "score", "y").and_then(score_value)?;
    let timestamp = field_or_alias(point, "timestamp", "x").and_then(parse_source_timestamp)?;

    Some(FearGreedRecord {
        metric_date: utc_date(timestamp),
        value: score,
        description: rating_text(point.get("rating")),
        source_last_update_utc: timestamp,
        ingested_at_utc: ingested_at,
        source: Provenance::CnnGraphdata.to_string(),
    })
}

/// A missing timestamp falls back to the ingestion time.
fn current_row(current: &Map<String, Value>, ingested_at: OffsetDateTime) -> Option<FearGreedRecord> {
    let score = current.get("score").and_then(score_value)?;
    let timestamp = current
        .get("timestamp")
        .and_then(parse_source_timestamp)
        .unwrap_or(ingested_at);

    Some(FearGreedRecord {
        metric_date: utc_date(timestamp),
        value: score,
        description: rating_text(current.get("rating")),
        source_last_update_utc: timestamp,
        ingested_at_utc: ingested_at,
        source: Provenance::CnnGraphdata.to_string(),
    })
}

fn field_or_alias<'a>(point: &'a Map<String, Value>, field: &str, alias: &str) -> Option<&'a Value> {
    point
        .get(field)
        .filter(|value| !value.is_null())
        .or_else(|| point.get(alias))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    pub upserted: usize,
    pub first_date: Option<Date>,
    pub last_date: Option<Date>,
}

impl Display for BackfillReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.first_date, self.last_date) {
            (Some(first), Some(last)) => write!(
                f,
                "[fear_greed_backfill] upserted={} range={first}~{last}",
                self.upserted
            ),
            _ => f.write_str(
                "[fear_greed_backfill] no rows parsed (endpoint format changed or blocked)",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::{date, datetime};

    const INGESTED: OffsetDateTime = datetime!(2024-01-10 06:00:00 UTC);

    #[test]
    fn historical_points_accept_millis_seconds_and_iso() {
        let payload = json!({
            "fear_and_greed_historical": {"data": [
                {"score": 30.1, "rating": "fear", "timestamp": 1703721600000_i64},
                {"score": 31.0, "rating": "fear", "timestamp": 1703808000},
                {"score": 35.5, "rating": "fear", "timestamp": "2023-12-30T00:00:00Z"}
            ]}
        });

        let rows = normalize(&payload, INGESTED);
        let dates = rows.iter().map(|row| row.metric_date).collect::<Vec<_>>();
        assert_eq!(
            dates,
            vec![date!(2023 - 12 - 28), date!(2023 - 12 - 29), date!(2023 - 12 - 30)]
        );
        assert!(rows.iter().all(|row| row.source == "cnn-graphdata"));
        assert!(rows.iter().all(|row| row.ingested_at_utc == INGESTED));
    }

    #[test]
    fn malformed_points_are_skipped_but_siblings_survive() {
        let payload = json!({
            "fear_and_greed_historical": {"data": [
                {"score": null, "rating": "fear", "timestamp": 1703721600000_i64},
                {"score": 44.0, "rating": "neutral", "timestamp": "not a date"},
                {"score": 45.0, "rating": "neutral"},
                "garbage",
                {"score": 46.0, "rating": "neutral", "timestamp": 1703808000000_i64}
            ]}
        });

        let rows = normalize(&payload, INGESTED);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 46.0);
        assert_eq!(rows[0].metric_date, date!(2023 - 12 - 29));
    }

    #[test]
    fn unrepresentable_timestamp_drops_only_that_point() {
        let payload = json!({
            "fear_and_greed_historical": {"data": [
                {"score": 12.0, "rating": "extreme fear", "timestamp": "9999-12-31T23:00:00-05:00"},
                {"score": 46.0, "rating": "neutral", "timestamp": 1703808000000_i64}
            ]}
        });

        let rows = normalize(&payload, INGESTED);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 46.0);
    }

    #[test]
    fn chart_style_points_use_x_and_y() {
        let payload = json!({
            "fear_and_greed_historical": {"data": [
                {"x": 1703721600000.0, "y": 52.3, "rating": "neutral"}
            ]}
        });

        let rows = normalize(&payload, INGESTED);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 52.3);
        assert_eq!(rows[0].description.as_deref(), Some("neutral"));
    }

    #[test]
    fn current_shape_without_timestamp_uses_ingestion_time() {
        let payload = json!({"fear_and_greed": {"score": 70, "rating": "greed"}});

        let rows = normalize(&payload, INGESTED);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_last_update_utc, INGESTED);
        assert_eq!(rows[0].metric_date, date!(2024 - 01 - 10));
        assert_eq!(rows[0].value, 70.0);
    }

    #[test]
    fn missing_rating_is_null_description() {
        let payload = json!({
            "fear_and_greed": {"score": 70, "timestamp": "2024-01-09T23:00:00Z"}
        });
        let rows = normalize(&payload, INGESTED);
        assert_eq!(rows[0].description, None);
    }

    #[test]
    fn unrecognized_payload_yields_no_rows() {
        assert!(normalize(&json!({"market_momentum_sp500": {}}), INGESTED).is_empty());
        assert!(normalize(&json!([]), INGESTED).is_empty());
    }

    #[test]
    fn report_distinguishes_empty_runs() {
        let empty = BackfillReport {
            upserted: 0,
            first_date: None,
            last_date: None,
        };
        assert!(empty.to_string().contains("no rows parsed"));

        let full = BackfillReport {
            upserted: 3,
            first_date: Some(date!(2023 - 12 - 28)),
            last_date: Some(date!(2023 - 12 - 30)),
        };
        assert_eq!(
            full.to_string(),
            "[fear_greed_backfill] upserted=3 range=2023-12-28~2023-12-30"
        );
    }
}
