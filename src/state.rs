use std::sync::Arc;

use anyhow::Result;
use groupme_ics_core::CalendarFeed;
use groupme_ics_core::Settings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    // One feed per process; its cache gate is what the handlers share
    pub feed: Arc<CalendarFeed>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self> {
        Ok(AppState {
            feed: Arc::new(CalendarFeed::new(settings)?),
        })
    }
}
