//! Yahoo Finance v8 chart API.
//!
//! The chart endpoint is unofficial and changes without notice. Responses are
//! reshaped into a [`PriceFrame`] whose columns carry `(field, ticker)` labels;
//! canonical naming happens in the frame normalisation.

use std::sync::Arc;

use serde::Deserialize;
use time::{OffsetDateTime, UtcOffset};

use crate::domain::{ColumnLabel, PriceFrame};
use crate::error::IngestError;
use crate::http_client::{HttpClient, HttpRequest};

const PROVIDER: &str = "yahoo";
pub const DEFAULT_CHART_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
    #[serde(default)]
    adjclose: Option<Vec<ChartAdjClose>>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct ChartAdjClose {
    adjclose: Option<Vec<Option<f64>>>,
}

#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(DEFAULT_CHART_BASE_URL),
            timeout_ms: 30_000,
        }
    }

    pub fn chart_url(&self, symbol: &str, start: OffsetDateTime, end: OffsetDateTime) -> String {
        format!(
            "{}/{}?period1={}&period2={}&interval=1d&includeAdjustedClose=true",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(symbol),
            start.unix_timestamp(),
            end.unix_timestamp(),
        )
    }

    /// Fetch daily bars for `symbol` between `start` and `end`.
    pub fn daily_frame(
        &self,
        symbol: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<PriceFrame, IngestError> {
        let url = self.chart_url(symbol, start, end);
        let request = HttpRequest::get(url.as_str())
            .with_header("referer", "https://finance.yahoo.com/")
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

        parse_chart(symbol, &response.body)
    }
}

/// Reshape a chart response body into a frame of `(field, ticker)` columns.
pub fn parse_chart(symbol: &str, body: &str) -> Result<PriceFrame, IngestError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| IngestError::parse(PROVIDER, format!("chart body: {e}")))?;

    if let Some(error) = response.chart.error.filter(|error| !error.is_null()) {
        return Err(IngestError::empty(PROVIDER, format!("chart error: {error}")));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| IngestError::empty(PROVIDER, "chart result is empty"))?;

    let timestamps = result
        .timestamp
        .ok_or_else(|| IngestError::empty(PROVIDER, "chart has no timestamps"))?;
    let gmtoffset = result.meta.and_then(|meta| meta.gmtoffset).unwrap_or(0);
    let offset = i32::try_from(gmtoffset)
        .ok()
        .and_then(|seconds| UtcOffset::from_whole_seconds(seconds).ok())
        .ok_or_else(|| IngestError::parse(PROVIDER, format!("invalid gmtoffset {gmtoffset}")))?;

    let dates = timestamps
        .iter()
        .map(|&ts| {
            OffsetDateTime::from_unix_timestamp(ts)
                .ok()
                .and_then(|instant| instant.checked_to_offset(offset))
                .map(|local| local.date())
                .ok_or_else(|| IngestError::parse(PROVIDER, format!("invalid timestamp {ts}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut frame = PriceFrame::new(dates);
    if let Some(quote) = result.indicators.quote.into_iter().next() {
        let fields = [
            ("Open", quote.open),
            ("High", quote.high),
            ("Low", quote.low),
            ("Close", quote.close),
            ("Volume", quote.volume),
        ];
        for (field, values) in fields {
            if let Some(values) = values {
                frame = frame.with_column(ColumnLabel::nested(field, symbol), values);
            }
        }
    }

    if let Some(values) = result
        .indicators
        .adjclose
        .and_then(|series| series.into_iter().next())
        .and_then(|series| series.adjclose)
    {
        frame = frame.with_column(ColumnLabel::nested("Adj Close", symbol), values);
    }

    Ok(frame)
}
