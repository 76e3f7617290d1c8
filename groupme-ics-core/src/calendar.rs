//! Calendar document assembly.

use tracing::warn;

use crate::event::{CalendarEntry, RawEvent};
use crate::ics::generate_ics;
use crate::transform::to_calendar_entry;

pub const PRODUCT_ID: &str = "-//GroupMe-to-ICS//GroupMe-to-ICS 0.1//EN";
pub const VERSION: &str = "2.0";
pub const CALENDAR_SCALE: &str = "GREGORIAN";
pub const METHOD: &str = "PUBLISH";

/// Prefix on every calendar display name
const DISPLAY_NAME_PREFIX: &str = "GroupMe: ";

/// A full calendar: fixed metadata plus entries in upstream order.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDocument {
    pub product_id: &'static str,
    pub version: &'static str,
    pub calendar_scale: &'static str,
    pub method: &'static str,
    pub display_name: String,
    pub timezone: String,
    pub entries: Vec<CalendarEntry>,
}

impl CalendarDocument {
    fn with_metadata(display_name: String, timezone: &str) -> Self {
        CalendarDocument {
            product_id: PRODUCT_ID,
            version: VERSION,
            calendar_scale: CALENDAR_SCALE,
            method: METHOD,
            display_name,
            timezone: timezone.to_string(),
            entries: Vec::new(),
        }
    }

    /// Assemble a calendar from already-converted entries, preserving their order.
    pub fn build(entries: Vec<CalendarEntry>, name: &str, timezone: &str) -> Self {
        let mut doc = Self::with_metadata(format!("{DISPLAY_NAME_PREFIX}{name}"), timezone);
        doc.entries = entries;
        doc
    }

    /// An empty but subscribable calendar whose name carries the error text.
    pub fn build_error(name: &str, timezone: &str, error_text: &str) -> Self {
        Self::with_metadata(
            format!("{DISPLAY_NAME_PREFIX}{name} ({error_text})"),
            timezone,
        )
    }

    pub fn to_ics(&self) -> String {
        generate_ics(self)
    }
}

/// Convert a batch of upstream events, dropping deleted ones.
///
/// An event whose timestamps cannot be parsed is skipped with a warning.
pub fn entries_from_events(events: &[RawEvent]) -> Vec<CalendarEntry> {
    events
        .iter()
        .filter_map(|event| match to_calendar_entry(event) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    event_id = %event.event_id,
                    group_id = event.group_id.as_deref().unwrap_or_default(),
                    error = %e,
                    "Skipping event"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_event(id: &str, start_at: &str) -> RawEvent {
        serde_json::from_value(serde_json::json!({
            "event_id": id,
            "name": format!("Event {id}"),
            "start_at": start_at,
            "group_name": "Climbing",
        }))
        .unwrap()
    }

    #[test]
    fn test_build_sets_fixed_metadata() {
        let doc = CalendarDocument::build(Vec::new(), "Climbing", "America/Los_Angeles");
        assert_eq!(doc.product_id, PRODUCT_ID);
        assert_eq!(doc.version, "2.0");
        assert_eq!(doc.calendar_scale, "GREGORIAN");
        assert_eq!(doc.method, "PUBLISH");
        assert_eq!(doc.display_name, "GroupMe: Climbing");
        assert_eq!(doc.timezone, "America/Los_Angeles");
    }

    #[test]
    fn test_build_error_has_no_entries() {
        let doc = CalendarDocument::build_error(
            "GroupMe Calendar",
            "America/Los_Angeles",
            "GROUPME_API_KEY not set",
        );
        assert!(doc.entries.is_empty());
        assert_eq!(
            doc.display_name,
            "GroupMe: GroupMe Calendar (GROUPME_API_KEY not set)"
        );
    }

    #[test]
    fn test_entries_keep_upstream_order_and_drop_deleted() {
        let mut deleted = raw_event("b", "2024-05-02T10:00:00Z");
        deleted.deleted_at = Some(serde_json::Value::Null);
        let events = vec![
            raw_event("c", "2024-05-03T10:00:00Z"),
            deleted,
            raw_event("a", "2024-05-01T10:00:00Z"),
        ];

        let uids: Vec<String> = entries_from_events(&events)
            .into_iter()
            .map(|e| e.uid)
            .collect();
        assert_eq!(uids, vec!["c", "a"]);
    }

    #[test]
    fn test_unparseable_event_is_skipped_not_fatal() {
        let events = vec![
            raw_event("good", "2024-05-01T10:00:00Z"),
            raw_event("bad", "the day after tomorrow"),
        ];

        let entries = entries_from_events(&events);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uid, "good");
    }
}
