//! ICS generation.

use crate::calendar::CalendarDocument;
use crate::event::{CalendarEntry, EventTime};
use chrono::{DateTime, Utc};
use icalendar::{Calendar, Component, EventLike, Property, ValueType};

/// Serialize a calendar document.
///
/// Output only depends on the document, so generating twice yields identical bytes.
pub fn generate_ics(doc: &CalendarDocument) -> String {
    let mut cal = Calendar::new();
    cal.append_property(Property::new("METHOD", doc.method));
    cal.append_property(Property::new("X-WR-CALNAME", doc.display_name.as_str()));
    cal.append_property(Property::new("X-WR-TIMEZONE", doc.timezone.as_str()));

    for entry in &doc.entries {
        cal.push(to_ics_event(entry));
    }
    let cal = cal.done();

    rewrite_header(&cal.to_string(), doc)
}

fn to_ics_event(entry: &CalendarEntry) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&entry.uid);
    ics_event.summary(&entry.summary);

    // DTSTAMP - required by RFC 5545, derived from the entry rather than the clock
    ics_event.add_property("DTSTAMP", format_utc(&entry.stamp()));

    add_datetime_property(&mut ics_event, "DTSTART", &entry.start);
    if let Some(ref end) = entry.end {
        add_datetime_property(&mut ics_event, "DTEND", end);
    }

    if !entry.description.is_empty() {
        ics_event.description(&entry.description);
    }

    if let Some(ref loc) = entry.location {
        ics_event.location(loc);
    }

    if let Some(ref url) = entry.url {
        ics_event.add_property("URL", url);
    }

    if let Some(created) = entry.created {
        ics_event.add_property("CREATED", format_utc(&created));
    }

    if let Some(updated) = entry.last_modified {
        ics_event.add_property("LAST-MODIFIED", format_utc(&updated));
    }

    ics_event.done()
}

/// The icalendar crate writes its own PRODID; swap in ours and keep the
/// VERSION/CALSCALE lines in sync with the document.
fn rewrite_header(ics: &str, doc: &CalendarDocument) -> String {
    let mut result = String::with_capacity(ics.len());
    let mut in_header = true;

    for line in ics.lines() {
        if line.starts_with("BEGIN:") && line != "BEGIN:VCALENDAR" {
            in_header = false;
        }

        if in_header {
            if line.starts_with("PRODID:") {
                result.push_str(&format!("PRODID:{}\r\n", doc.product_id));
                continue;
            }
            if line.starts_with("VERSION:") {
                result.push_str(&format!("VERSION:{}\r\n", doc.version));
                continue;
            }
            if line.starts_with("CALSCALE:") {
                result.push_str(&format!("CALSCALE:{}\r\n", doc.calendar_scale));
                continue;
            }
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Add a datetime property with proper formatting based on EventTime variant
fn add_datetime_property(ics_event: &mut icalendar::Event, name: &str, time: &EventTime) {
    match time {
        EventTime::Date(d) => {
            let mut prop = Property::new(name, d.format("%Y%m%d").to_string());
            prop.append_parameter(ValueType::Date);
            ics_event.append_property(prop);
        }
        EventTime::DateTimeUtc(dt) => {
            ics_event.add_property(name, format_utc(dt));
        }
        EventTime::DateTimeFloating(dt) => {
            // Floating datetime (no Z, no TZID)
            ics_event.add_property(name, dt.format("%Y%m%dT%H%M%S").to_string());
        }
    }
}
