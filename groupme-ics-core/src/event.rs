//! Upstream GroupMe event records and the calendar entries derived from them.
//!
//! `RawEvent` mirrors the JSON returned by the GroupMe events endpoint, plus
//! the group tags added by the fetcher. `CalendarEntry` is the provider-neutral
//! shape that the ICS generator works with.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{FeedError, FeedResult};

/// One event as returned by the GroupMe API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_at: String,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Soft-deletion marker. The key being present is what counts, even with a null value.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<serde_json::Value>,
    #[serde(default)]
    pub location: Option<RawLocation>,

    // Tags added by the fetcher
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
}

impl RawEvent {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Location block attached to a GroupMe event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLocation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<Coordinate>,
    #[serde(default)]
    pub lng: Option<Coordinate>,
}

/// A latitude or longitude, kept as the text GroupMe sent.
///
/// The API sends coordinates as strings, but numbers are accepted too so the
/// map link reproduces whatever the source gave us.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coordinate(String);

impl Coordinate {
    pub fn new(value: impl Into<String>) -> Self {
        Coordinate(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Coordinate(s.trim().to_string())),
            serde_json::Value::Number(n) => Ok(Coordinate(n.to_string())),
            other => Err(de::Error::custom(format!(
                "expected a coordinate, got {other}"
            ))),
        }
    }
}

/// Only called when the key exists, so a JSON null still becomes `Some`.
fn deserialize_present<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<serde_json::Value>, D::Error> {
    serde_json::Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventTime {
    DateTimeUtc(DateTime<Utc>),
    /// No offset given; interpreted in the calendar's X-WR-TIMEZONE by clients
    DateTimeFloating(NaiveDateTime),
    Date(NaiveDate),
}

impl EventTime {
    /// Parse an upstream timestamp.
    ///
    /// Accepts RFC 3339, ISO 8601 with `+HHMM` offsets, naive date-times and
    /// plain dates. Offsets are normalized to UTC.
    pub fn parse(field: &'static str, value: &str) -> FeedResult<Self> {
        let s = value.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(EventTime::DateTimeUtc(dt.with_timezone(&Utc)));
        }
        if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Ok(EventTime::DateTimeUtc(dt.with_timezone(&Utc)));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(EventTime::DateTimeFloating(naive));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(EventTime::Date(date));
        }

        Err(FeedError::Timestamp {
            field,
            value: value.to_string(),
        })
    }

    /// Best-effort UTC instant, used for LAST-MODIFIED and DTSTAMP.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::DateTimeUtc(dt) => *dt,
            EventTime::DateTimeFloating(naive) => naive.and_utc(),
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }
}

/// A calendar entry derived from one non-deleted [`RawEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    pub uid: String,
    pub start: EventTime,
    pub end: Option<EventTime>,
    pub summary: String,
    pub description: String,
    pub location: Option<String>,
    /// Map link for the coordinates when it is not already the location
    pub url: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl CalendarEntry {
    /// Deterministic DTSTAMP: never the wall clock, so rebuilding is byte-stable.
    pub fn stamp(&self) -> DateTime<Utc> {
        self.last_modified
            .or(self.created)
            .unwrap_or_else(|| self.start.to_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_normalizes_to_utc() {
        let t = EventTime::parse("start_at", "2024-05-01T18:30:00-07:00").unwrap();
        assert_eq!(
            t,
            EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2024, 5, 2, 1, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_compact_offset() {
        let t = EventTime::parse("start_at", "2024-05-01T18:30:00-0700").unwrap();
        assert_eq!(
            t,
            EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2024, 5, 2, 1, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_zulu_with_fraction() {
        let t = EventTime::parse("start_at", "2024-05-01T18:30:00.000Z").unwrap();
        assert_eq!(
            t,
            EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_naive_is_floating() {
        let t = EventTime::parse("start_at", "2024-05-01T18:30:00").unwrap();
        assert!(matches!(t, EventTime::DateTimeFloating(_)));
    }

    #[test]
    fn test_parse_date_only() {
        let t = EventTime::parse("start_at", "2024-05-01").unwrap();
        assert_eq!(
            t,
            EventTime::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        );
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let err = EventTime::parse("updated_at", "next tuesday").unwrap_err();
        assert!(matches!(
            err,
            FeedError::Timestamp {
                field: "updated_at",
                ..
            }
        ));
    }

    #[test]
    fn test_deleted_at_null_still_marks_deletion() {
        let event: RawEvent = serde_json::from_str(
            r#"{"event_id":"e1","name":"Gone","start_at":"2024-05-01T18:30:00Z","deleted_at":null}"#,
        )
        .unwrap();
        assert!(event.is_deleted());

        let event: RawEvent = serde_json::from_str(
            r#"{"event_id":"e2","name":"Here","start_at":"2024-05-01T18:30:00Z"}"#,
        )
        .unwrap();
        assert!(!event.is_deleted());
    }

    #[test]
    fn test_coordinate_accepts_strings_and_numbers() {
        let loc: RawLocation =
            serde_json::from_str(r#"{"lat":"37.7749","lng":-122.0}"#).unwrap();
        assert_eq!(loc.lat.unwrap().as_str(), "37.7749");
        assert_eq!(loc.lng.unwrap().as_str(), "-122.0");
    }
}
