// Display formatting in venue time

use crate::application::constants::VENUE_UTC_OFFSET_SECS;
use crate::domain::EpochMillis;
use chrono::{DateTime, FixedOffset, Utc};

/// Render a projected start as `"Start: HH:MM"` in venue time
///
/// Unknown starts (and instants outside chrono's range) render as
/// `"Start: --:--"`.
pub fn format_start(start: Option<EpochMillis>) -> String {
    match start.and_then(venue_clock) {
        Some(hhmm) => format!("Start: {hhmm}"),
        None => "Start: --:--".to_string(),
    }
}

/// `HH:MM` wall-clock time at the venue for an epoch instant
pub fn venue_clock(millis: EpochMillis) -> Option<String> {
    let offset = FixedOffset::east_opt(VENUE_UTC_OFFSET_SECS)?;
    let utc: DateTime<Utc> = DateTime::from_timestamp_millis(millis)?;
    Some(utc.with_timezone(&offset).format("%H:%M").to_string())
}

/// `"1h 05min"` / `"25min"` for a total wait in minutes
pub fn format_wait(minutes: i64) -> String {
    let minutes = minutes.max(0);
    if minutes >= 60 {
        format!("{}h {:02}min", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}min")
    }
}
