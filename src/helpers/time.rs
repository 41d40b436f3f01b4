use chrono::{DateTime, Utc};
use tokio::time::Instant;

pub fn now_u64() -> u64 {
    now_i64().max(0) as u64
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// Renders a unix timestamp for log lines; `None` when out of chrono's range.
pub fn unix_to_datetime(unix_ts: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::try_from(unix_ts).ok()?, 0)
}
