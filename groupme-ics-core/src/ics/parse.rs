//! ICS parsing using the icalendar crate's parser.
//!
//! Used to read a generated feed back, e.g. to check what a subscriber sees.

use crate::event::EventTime;
use icalendar::{
    DatePerhapsTime,
    parser::{Component, read_calendar, unfold},
};

/// Calendar-level metadata and events read back from an ICS feed
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCalendar {
    pub display_name: Option<String>,
    pub timezone: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    pub uid: String,
    pub summary: String,
    pub start: EventTime,
    pub end: Option<EventTime>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
}

/// Parse ICS content. Returns `None` if the content is not a calendar.
///
/// Events without a UID or a readable DTSTART are left out.
pub fn parse_calendar(content: &str) -> Option<ParsedCalendar> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).ok()?;

    let calendar_prop = |name: &str| {
        calendar
            .properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| unescape_ics_value(p.val.as_ref()))
    };

    let entries = calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(parse_entry)
        .collect();

    Some(ParsedCalendar {
        display_name: calendar_prop("X-WR-CALNAME"),
        timezone: calendar_prop("X-WR-TIMEZONE"),
        entries,
    })
}

fn parse_entry(vevent: &Component) -> Option<ParsedEntry> {
    let text = |name: &str| {
        vevent
            .find_prop(name)
            .map(|p| unescape_ics_value(p.val.as_ref()))
    };

    let uid = text("UID")?;
    let summary = text("SUMMARY").unwrap_or_else(|| "(No title)".to_string());
    let start = to_event_time(DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?);
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time);

    Some(ParsedEntry {
        uid,
        summary,
        start,
        end,
        description: text("DESCRIPTION"),
        location: text("LOCATION"),
        url: text("URL"),
    })
}

/// Convert icalendar's DatePerhapsTime to our EventTime.
///
/// Zoned times lose their TZID; the feed never writes them.
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, .. } => {
                EventTime::DateTimeFloating(date_time)
            }
        },
    }
}

/// Unescape ICS property values per RFC 5545
/// Reverses: \, → , and \; → ; and \\ → \ and \n → newline
fn unescape_ics_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&escaped @ (',' | ';' | '\\')) => {
                    result.push(escaped);
                    chars.next();
                }
                Some('n') | Some('N') => {
                    result.push('\n');
                    chars.next();
                }
                _ => result.push(c),
            }
        } else {
            result.push(c);
        }
    }

    result
}
