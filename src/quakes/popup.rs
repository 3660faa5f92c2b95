use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::types::Quake;

/// Text shown when a marker is clicked.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub place: String,
    pub magnitude: String,
    pub depth: String,
    pub time: String,
}

impl PopupContent {
    pub fn for_quake(quake: &Quake) -> Self {
        Self::for_quake_in(quake, &Local)
    }

    pub fn for_quake_in<Tz: TimeZone>(quake: &Quake, tz: &Tz) -> Self
    where
        Tz::Offset: Display,
    {
        PopupContent {
            place: quake
                .place
                .clone()
                .unwrap_or_else(|| "Unknown location".to_string()),
            magnitude: quake
                .magnitude
                .map_or_else(|| "unknown".to_string(), |m| m.to_string()),
            depth: quake
                .depth_km
                .map_or_else(|| "unknown".to_string(), |d| format!("{} km", d)),
            time: quake
                .time_ms
                .and_then(|ms| format_event_time(ms, tz))
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }

    pub fn lines(&self) -> [String; 3] {
        [
            format!("Magnitude: {}", self.magnitude),
            format!("Depth: {}", self.depth),
            format!("Time: {}", self.time),
        ]
    }
}

/// Formats epoch milliseconds the way a browser prints a `Date`, e.g.
/// `Thu Jan 01 1970 00:00:00 GMT+0000`.
pub fn format_event_time<Tz: TimeZone>(millis: i64, tz: &Tz) -> Option<String>
where
    Tz::Offset: Display,
{
    let utc = DateTime::<Utc>::from_timestamp_millis(millis)?;
    Some(
        utc.with_timezone(tz)
            .format("%a %b %d %Y %H:%M:%S GMT%z")
            .to_string(),
    )
}
