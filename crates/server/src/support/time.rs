#![forbid(unsafe_code)]

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub(crate) use gl_storage::now_ms;

const EPOCH_RFC3339: &str = "1970-01-01T00:00:00Z";

/// UTC RFC3339 text for a millisecond timestamp; the epoch when the value is
/// outside what `time` can represent.
pub(crate) fn rfc3339_ms(ts_ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ts_ms) * 1_000_000)
        .ok()
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| EPOCH_RFC3339.to_string())
}
