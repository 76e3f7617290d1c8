//! ICS feed generation and parsing.
//!
//! This module handles reading and writing .ics calendars according to RFC 5545.

mod generate;
mod parse;

pub use generate::generate_ics;
pub use parse::{ParsedCalendar, ParsedEntry, parse_calendar};
