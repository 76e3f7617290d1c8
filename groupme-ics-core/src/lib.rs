//! Core of the GroupMe calendar feed.
//!
//! Turns GroupMe group events into an ICS calendar:
//! - `fetch` pulls group metadata and events from the GroupMe API
//! - `transform` and `calendar` turn them into a `CalendarDocument`
//! - `ics` serializes (and parses back) the document
//! - `cache` and `feed` gate upstream calls behind a staleness window

pub mod cache;
pub mod calendar;
pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod fetch;
pub mod ics;
pub mod transform;
pub mod urls;

pub use calendar::CalendarDocument;
pub use config::Settings;
pub use error::{ErrorKind, FeedError, FeedResult};
pub use event::{CalendarEntry, EventTime, RawEvent, RawLocation};
pub use feed::{CalendarFeed, FeedSnapshot};
pub use urls::SubscriptionUrls;
