//! The calendar feed: settings check, cache gate, fetch, build.

use std::sync::Arc;

use tracing::{error, info};

use crate::cache::{CacheGate, Refresh};
use crate::calendar::{CalendarDocument, entries_from_events};
use crate::config::Settings;
use crate::error::{ErrorKind, FeedError, FeedResult};
use crate::fetch::GroupMeClient;

/// Why a snapshot holds an error calendar instead of events.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

/// One rendered feed, as handed to every request until the cache goes stale.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    /// Serialized calendar, always a valid ICS document
    pub ics: String,
    /// Aggregate calendar name (group names or the static name)
    pub name: String,
    pub entry_count: usize,
    pub failure: Option<Failure>,
}

pub struct CalendarFeed {
    settings: Settings,
    client: GroupMeClient,
    gate: CacheGate<FeedSnapshot>,
}

impl CalendarFeed {
    pub fn new(settings: Settings) -> FeedResult<Self> {
        let client = GroupMeClient::new(&settings.api_url, settings.api_timeout)?;
        let gate = CacheGate::new(settings.cache_duration);
        Ok(CalendarFeed {
            settings,
            client,
            gate,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The current feed, refreshed first if the cache is stale.
    pub async fn snapshot(&self) -> Arc<FeedSnapshot> {
        self.gate.get_or_refresh(|| self.refresh()).await
    }

    async fn refresh(&self) -> Refresh<FeedSnapshot> {
        // Without credentials there is nothing to ask upstream
        let (api_key, group_ids) = match self
            .settings
            .api_key()
            .and_then(|key| Ok((key, self.settings.group_ids()?)))
        {
            Ok(credentials) => credentials,
            Err(e) => return Refresh::Uncached(self.error_snapshot(e)),
        };

        let outcome = self.client.fetch(api_key, group_ids).await;
        if !outcome.success {
            return Refresh::Uncached(self.error_snapshot(FeedError::NoEvents(group_ids.to_vec())));
        }

        let name = outcome.calendar_name(&self.settings.static_name);
        let entries = entries_from_events(&outcome.events);
        info!(
            calendar = %name,
            fetched = outcome.events.len(),
            entries = entries.len(),
            "Rebuilt calendar"
        );

        let doc = CalendarDocument::build(entries, &name, &self.settings.timezone);
        Refresh::Commit(FeedSnapshot {
            ics: doc.to_ics(),
            name,
            entry_count: doc.entries.len(),
            failure: None,
        })
    }

    fn error_snapshot(&self, err: FeedError) -> FeedSnapshot {
        error!(error = %err, "Serving error calendar");

        let message = err.to_string();
        let doc = CalendarDocument::build_error(
            &self.settings.static_name,
            &self.settings.timezone,
            &message,
        );
        FeedSnapshot {
            ics: doc.to_ics(),
            name: self.settings.static_name.clone(),
            entry_count: 0,
            failure: Some(Failure {
                kind: err.kind(),
                message,
            }),
        }
    }
}
