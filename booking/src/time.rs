use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, NaiveDate};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Today's calendar date in the local timezone. Earlier dates cannot be booked.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
