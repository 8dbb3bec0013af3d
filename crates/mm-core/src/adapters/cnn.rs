//! CNN Fear & Greed Index via the public `graphdata` endpoint.
//!
//! The endpoint is undocumented. It rejects bare library user agents, so every
//! request carries a browser-like `User-Agent`.

use std::sync::Arc;

use serde_json::{Map, Value};
use time::{Date, OffsetDateTime};

use crate::domain::parse_source_timestamp;
use crate::error::IngestError;
use crate::http_client::{HttpClient, HttpRequest, BROWSER_USER_AGENT};

const PROVIDER: &str = "cnn";
pub const DEFAULT_GRAPHDATA_URL: &str =
    "https://production.dataviz.cnn.io/index/fearandgreed/graphdata";

/// Latest index reading with its source timestamp converted to UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct FearGreedReading {
    pub value: f64,
    pub description: String,
    pub last_update_utc: OffsetDateTime,
}

/// Shape of a graphdata payload, decided by which keys are present.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphPayload<'a> {
    /// `fear_and_greed_historical.data` is a non-empty list of points.
    Historical(&'a [Value]),
    /// `fear_and_greed` is an object with a non-null score.
    Current(&'a Map<String, Value>),
    Unrecognized,
}

impl<'a> GraphPayload<'a> {
    pub fn classify(payload: &'a Value) -> Self {
        let historical = payload
            .get("fear_and_greed_historical")
            .and_then(Value::as_object)
            .and_then(|series| series.get("data"))
            .and_then(Value::as_array)
            .filter(|points| !points.is_empty());
        if let Some(points) = historical {
            return Self::Historical(points.as_slice());
        }

        let current = payload
            .get("fear_and_greed")
            .and_then(Value::as_object)
            .filter(|current| current.get("score").is_some_and(|score| !score.is_null()));
        match current {
            Some(current) => Self::Current(current),
            None => Self::Unrecognized,
        }
    }
}

/// Numeric score from a JSON number or a numeric string.
pub fn score_value(value: &Value) -> Option<f64> {
    let score: Option<f64> = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    score.filter(|score| score.is_finite())
}

/// Rating text; non-string scalars are stringified, null is absent.
pub fn rating_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Clone)]
pub struct CnnFearGreedAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl CnnFearGreedAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(DEFAULT_GRAPHDATA_URL),
            timeout_ms: 30_000,
        }
    }

    pub fn graphdata_url(&self, date: Option<Date>) -> String {
        let base = self.base_url.trim_end_matches('/');
        match date {
            Some(date) => format!("{base}/{date}"),
            None => base.to_string(),
        }
    }

    /// GET the raw graphdata payload, optionally for a single start date.
    pub fn fetch_graphdata(&self, date: Option<Date>) -> Result<Value, IngestError> {
        let url = self.graphdata_url(date);
        let request = HttpRequest::get(url.as_str())
            .with_header("user-agent", BROWSER_USER_AGENT)
            .with_timeout_ms(self.timeout_ms);

        let response = self
            .http_client
            .execute(request)
            .map_err(|source| IngestError::Network {
                provider: PROVIDER,
                source,
            })?;

        if !response.is_success() {
            return Err(IngestError::Status {
                provider: PROVIDER,
                status: response.status,
                url,
            });
        }

        serde_json::from_str(&response.body)
            .map_err(|e| IngestError::parse(PROVIDER, format!("graphdata body: {e}")))
    }

    /// Fetch the latest reading. Unlike the backfill path, every field is
    /// required here: a missing score, rating or timestamp is an error.
    pub fn current(&self) -> Result<FearGreedReading, IngestError> {
        let payload = self.fetch_graphdata(None)?;
        current_reading(&payload)
    }
}

pub fn current_reading(payload: &Value) -> Result<FearGreedReading, IngestError> {
    let current = payload
        .get("fear_and_greed")
        .and_then(Value::as_object)
        .ok_or_else(|| IngestError::parse(PROVIDER, "missing 'fear_and_greed' object"))?;

    let value = current
        .get("score")
        .and_then(score_value)
        .ok_or_else(|| IngestError::parse(PROVIDER, "missing or non-numeric score"))?;
    let description = rating_text(current.get("rating"))
        .ok_or_else(|| IngestError::parse(PROVIDER, "missing rating"))?;
    let last_update_utc = current
        .get("timestamp")
        .and_then(parse_source_timestamp)
        .ok_or_else(|| IngestError::parse(PROVIDER, "missing or unparseable timestamp"))?;

    Ok(FearGreedReading {
        value,
        description,
        last_update_utc,
    })
}
