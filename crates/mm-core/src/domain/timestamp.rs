//! UTC timestamp handling for upstream payloads.
//!
//! Upstream sources mix epoch seconds, epoch milliseconds and ISO-8601 strings.
//! Everything is normalised to an `OffsetDateTime` at UTC before it reaches the
//! warehouse; calendar dates are always taken from the UTC value.

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Numeric timestamps strictly above this value are epoch milliseconds; at or
/// below it they are epoch seconds.
///
/// 10,000,000,000 seconds is year 2286 and 10,000,000,000 milliseconds is
/// 1970-04-26, so both units are unambiguous for present-day data.
pub const EPOCH_MILLIS_THRESHOLD: i64 = 10_000_000_000;

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Calendar date of `value` once converted to UTC.
pub fn utc_date(value: OffsetDateTime) -> Date {
    value.to_offset(UtcOffset::UTC).date()
}

/// Parse a JSON timestamp field: a number (epoch seconds or milliseconds) or
/// an ISO-8601 string. Returns `None` for anything unparseable.
pub fn parse_source_timestamp(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                from_epoch_integer(integer)
            } else {
                number.as_f64().and_then(from_epoch_float)
            }
        }
        Value::String(text) => parse_iso_timestamp(text),
        _ => None,
    }
}

pub fn from_epoch_integer(value: i64) -> Option<OffsetDateTime> {
    let nanos = if value > EPOCH_MILLIS_THRESHOLD {
        i128::from(value) * 1_000_000
    } else {
        i128::from(value) * 1_000_000_000
    };
    OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
}

pub fn from_epoch_float(value: f64) -> Option<OffsetDateTime> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value > EPOCH_MILLIS_THRESHOLD as f64 {
        value.round()
    } else {
        (value * 1_000.0).round()
    };
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis as i64) * 1_000_000).ok()
}

/// Parse an ISO-8601 timestamp. Offsets (including `Z`) are honoured and the
/// result converted to UTC; strings without an offset are taken as UTC.
/// An instant that has no representable UTC value is `None`.
pub fn parse_iso_timestamp(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();
    if let Ok(parsed) = OffsetDateTime::parse(text, &Rfc3339) {
        return parsed.checked_to_offset(UtcOffset::UTC);
    }

    let naive_formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ];
    for format in naive_formats {
        if let Ok(parsed) = PrimitiveDateTime::parse(text, format) {
            return Some(parsed.assume_utc());
        }
    }

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}
