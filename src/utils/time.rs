use chrono::Utc;

/// Milliseconds since the unix epoch.
pub fn time_millis() -> i64 {
    Utc::now().timestamp_millis()
}
