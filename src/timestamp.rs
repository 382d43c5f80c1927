use chrono::{DateTime, Utc};

/// Number of seconds between the UNIX epoch and the FIT epoch (1989-12-31T00:00:00Z).
///
/// Add this value to any FIT timestamp to get the equivalent UNIX timestamp.
pub const TIMESTAMP_OFFSET: u32 = 631_065_600;

/// Converts a FIT timestamp to seconds since the UNIX epoch.
#[inline]
pub fn fit_to_unix(fit_ts: u32) -> i64 {
    i64::from(fit_ts) + i64::from(TIMESTAMP_OFFSET)
}

/// Converts a FIT timestamp to a UTC datetime.
pub fn to_utc(fit_ts: u32) -> DateTime<Utc> {
    // Every u32 FIT timestamp is in chrono's representable range.
    DateTime::from_timestamp(fit_to_unix(fit_ts), 0).unwrap_or_default()
}

/// Formats a FIT timestamp the way TCX expects: UTC, second precision,
/// trailing `Z`.
pub fn format_utc(fit_ts: u32) -> String {
    to_utc(fit_ts).format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
