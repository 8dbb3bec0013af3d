//! Column-oriented daily price table as returned by a provider, and its
//! normalisation into canonical daily bars.

use std::collections::BTreeMap;

use thiserror::Error;
use time::Date;

/// Column label as the provider reports it. Multi-ticker responses label
/// columns with both the field and the ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnLabel {
    Field(String),
    Nested { field: String, ticker: String },
}

impl ColumnLabel {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn nested(field: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self::Nested {
            field: field.into(),
            ticker: ticker.into(),
        }
    }

    /// Canonical lowercase, underscore-separated name. Nested labels keep only
    /// the field.
    pub fn canonical(&self) -> String {
        match self {
            Self::Field(field) | Self::Nested { field, .. } => canonical_column_name(field),
        }
    }
}

/// `" Adj Close "` -> `"adj_close"`. The provider alias `adjclose` maps to
/// `adj_close` as well.
pub fn canonical_column_name(raw: &str) -> String {
    let name = raw
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    match name.as_str() {
        "adjclose" => String::from("adj_close"),
        _ => name,
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("missing price column '{0}'")]
    MissingColumn(&'static str),
    #[error("no rows with a complete open/high/low/close")]
    NoRows,
}

/// One normalised trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceFrame {
    pub dates: Vec<Date>,
    pub columns: Vec<(ColumnLabel, Vec<Option<f64>>)>,
}

impl PriceFrame {
    pub fn new(dates: Vec<Date>) -> Self {
        Self {
            dates,
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, label: ColumnLabel, values: Vec<Option<f64>>) -> Self {
        self.columns.push((label, values));
        self
    }

    /// Flatten and canonicalise the column labels, then build one bar per
    /// usable row.
    ///
    /// Rows where every field is null (market holidays) are skipped silently;
    /// rows missing any of open/high/low/close are dropped with a warning.
    /// A missing `adj_close` column, or a null value in it, falls back to close.
    pub fn into_bars(self) -> Result<Vec<DailyBar>, FrameError> {
        let mut columns = BTreeMap::new();
        for (label, values) in self.columns {
            columns.entry(label.canonical()).or_insert(values);
        }

        let open = take(&mut columns, "open")?;
        let high = take(&mut columns, "high")?;
        let low = take(&mut columns, "low")?;
        let close = take(&mut columns, "close")?;
        let adj_close = columns.remove("adj_close");
        let volume = columns.remove("volume");

        let mut bars = Vec::with_capacity(self.dates.len());
        for (index, &date) in self.dates.iter().enumerate() {
            let cell = |column: &[Option<f64>]| column.get(index).copied().flatten();
            let volume_cell = volume.as_deref().and_then(cell);
            let ohlc = (cell(&open), cell(&high), cell(&low), cell(&close));

            let (Some(o), Some(h), Some(l), Some(c)) = ohlc else {
                if ohlc != (None, None, None, None) || volume_cell.is_some() {
                    tracing::warn!(%date, "dropping price row with incomplete OHLC");
                }
                continue;
            };

            bars.push(DailyBar {
                date,
                open: o,
                high: h,
                low: l,
                close: c,
                adj_close: adj_close.as_deref().and_then(cell).unwrap_or(c),
                volume: volume_cell.map(|v| v.round() as i64),
            });
        }

        if bars.is_empty() {
            return Err(FrameError::NoRows);
        }
        Ok(bars)
    }
}

fn take(
    columns: &mut BTreeMap<String, Vec<Option<f64>>>,
    name: &'static str,
) -> Result<Vec<Option<f64>>, FrameError> {
    columns.remove(name).ok_or(FrameError::MissingColumn(name))
}
