pub mod price_frame;
pub mod timestamp;

pub use price_frame::{canonical_column_name, ColumnLabel, DailyBar, FrameError, PriceFrame};
pub use timestamp::{
    now_utc, parse_iso_timestamp, parse_source_timestamp, utc_date, EPOCH_MILLIS_THRESHOLD,
};
