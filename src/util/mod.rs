use chrono::{DateTime, SecondsFormat, Utc};

pub mod config;
pub mod facilities;
pub mod geo;
pub mod logging;
pub mod time;

pub struct DateTimeUtils {}

impl DateTimeUtils {
    pub fn now_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn millis_to_rfc3339(millis: i64) -> String {
        DateTime::<Utc>::from_timestamp_millis(millis)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}
