//! GroupMe event → calendar entry conversion.

use crate::error::FeedResult;
use crate::event::{CalendarEntry, EventTime, RawEvent, RawLocation};

const DEFAULT_GROUP_LABEL: &str = "GroupMe";
const MAP_URL_BASE: &str = "https://www.google.com/maps?q=";

/// Convert one upstream event. Soft-deleted events yield `Ok(None)`.
///
/// Timestamp failures on `start_at`, `end_at`, `created_at` or `updated_at`
/// are returned as errors for this event; nothing is silently dropped here.
pub fn to_calendar_entry(event: &RawEvent) -> FeedResult<Option<CalendarEntry>> {
    if event.is_deleted() {
        return Ok(None);
    }

    let start = EventTime::parse("start_at", &event.start_at)?;
    let end = non_empty(event.end_at.as_deref())
        .map(|s| EventTime::parse("end_at", s))
        .transpose()?;
    let created = non_empty(event.created_at.as_deref())
        .map(|s| EventTime::parse("created_at", s).map(|t| t.to_utc()))
        .transpose()?;
    let last_modified = non_empty(event.updated_at.as_deref())
        .map(|s| EventTime::parse("updated_at", s).map(|t| t.to_utc()))
        .transpose()?;

    let group = non_empty(event.group_name.as_deref()).unwrap_or(DEFAULT_GROUP_LABEL);
    let summary = format!("[{}] {}", group, event.name);

    let mut description = event.description.clone().unwrap_or_default();
    let mut location = None;
    let mut url = None;

    if let Some(raw) = event.location.as_ref().filter(|l| has_location(l)) {
        let composed = compose_location(raw);

        if !description.is_empty() {
            description.push_str("\n\nLocation:\n");
        }
        description.push_str(&composed.description);

        location = composed.location;
        url = composed.url;
    }

    Ok(Some(CalendarEntry {
        uid: event.event_id.clone(),
        start,
        end,
        summary,
        description,
        location,
        url,
        created,
        last_modified,
    }))
}

struct ComposedLocation {
    location: Option<String>,
    description: String,
    url: Option<String>,
}

/// Build the LOCATION value and the text for the description's location section.
///
/// Name and address win. The map link only stands in for them when neither is
/// set; otherwise it is kept aside as the entry URL.
fn compose_location(raw: &RawLocation) -> ComposedLocation {
    let name = non_empty(raw.name.as_deref());
    let address = non_empty(raw.address.as_deref());

    let (mut location, mut description) = match (name, address) {
        (Some(name), Some(address)) => (
            Some(format!("{}, {}", name, clean_address(address))),
            format!("{}\n{}", name, address),
        ),
        (Some(name), None) => (Some(name.to_string()), name.to_string()),
        (None, Some(address)) => (Some(clean_address(address)), address.to_string()),
        (None, None) => (None, String::new()),
    };

    let mut url = None;
    if let (Some(lat), Some(lng)) = (
        raw.lat.as_ref().filter(|c| !c.is_empty()),
        raw.lng.as_ref().filter(|c| !c.is_empty()),
    ) {
        let link = map_url(lat.as_str(), lng.as_str());
        if location.is_none() {
            description.push_str(&link);
            location = Some(link);
        } else {
            url = Some(link);
        }
    }

    ComposedLocation {
        location,
        description,
        url,
    }
}

pub fn map_url(lat: &str, lng: &str) -> String {
    format!("{MAP_URL_BASE}{lat},{lng}")
}

/// Single-line form of a multi-line address.
fn clean_address(address: &str) -> String {
    address.trim().replace('\n', ", ")
}

/// A lone latitude or longitude gives nothing to show, so it does not count.
fn has_location(raw: &RawLocation) -> bool {
    non_empty(raw.name.as_deref()).is_some()
        || non_empty(raw.address.as_deref()).is_some()
        || (raw.lat.as_ref().is_some_and(|c| !c.is_empty())
            && raw.lng.as_ref().is_some_and(|c| !c.is_empty()))
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
