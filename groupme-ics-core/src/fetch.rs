//! GroupMe API client.
//!
//! Fetches group metadata and event lists one group at a time. A failing
//! group never aborts the whole fetch; its events are simply missing.

use std::time::Duration;

use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::error::{FeedError, FeedResult};
use crate::event::RawEvent;

const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";

/// Every GroupMe response wraps its payload in `{"response": ...}`
#[derive(Deserialize)]
struct Envelope<T> {
    response: Option<T>,
}

#[derive(Deserialize)]
struct GroupInfo {
    name: Option<String>,
}

#[derive(Deserialize)]
struct EventList {
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

/// Result of one pass over all configured groups.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Events across all groups, in group order then upstream order
    pub events: Vec<RawEvent>,
    /// Names of the groups whose metadata could be resolved
    pub names: Vec<String>,
    /// At least one event was fetched
    pub success: bool,
}

impl FetchOutcome {
    /// Comma-joined group names, or `fallback` when none resolved.
    pub fn calendar_name(&self, fallback: &str) -> String {
        if self.names.is_empty() {
            fallback.to_string()
        } else {
            self.names.join(", ")
        }
    }
}

#[derive(Clone)]
pub struct GroupMeClient {
    http: reqwest::Client,
    base_url: String,
}

impl GroupMeClient {
    /// `timeout` bounds each request.
    pub fn new(base_url: &str, timeout: Duration) -> FeedResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(GroupMeClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch every group in order, tagging events with their group.
    pub async fn fetch(&self, api_key: &str, group_ids: &[String]) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();

        for group_id in group_ids {
            let group_name = match self.group_name(api_key, group_id).await {
                Ok(name) => name,
                Err(e) => {
                    warn!(group_id = %group_id, error = %e, "Could not load group info");
                    None
                }
            };
            if let Some(ref name) = group_name {
                outcome.names.push(name.clone());
            }

            let events = match self.group_events(api_key, group_id).await {
                Ok(events) => events,
                Err(e) => {
                    error!(group_id = %group_id, error = %e, "Could not load group events");
                    continue;
                }
            };
            debug!(group_id = %group_id, count = events.len(), "Loaded group events");

            outcome.events.extend(events.into_iter().map(|mut event| {
                event.group_id = Some(group_id.clone());
                event.group_name = group_name.clone();
                event
            }));
        }

        outcome.success = !outcome.events.is_empty();
        outcome
    }

    async fn group_name(&self, api_key: &str, group_id: &str) -> FeedResult<Option<String>> {
        let url = format!("{}/groups/{}", self.base_url, group_id);
        let info: Option<GroupInfo> = self.get(api_key, group_id, &url).await?;
        Ok(info.and_then(|i| i.name).filter(|name| !name.is_empty()))
    }

    async fn group_events(&self, api_key: &str, group_id: &str) -> FeedResult<Vec<RawEvent>> {
        let url = format!("{}/conversations/{}/events/list", self.base_url, group_id);
        let list: Option<EventList> = self.get(api_key, group_id, &url).await?;

        let events = list
            .map(|l| l.events)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawEvent>(value) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(group_id = %group_id, error = %e, "Ignoring malformed event");
                    None
                }
            })
            .collect();

        Ok(events)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        api_key: &str,
        group_id: &str,
        url: &str,
    ) -> FeedResult<Option<T>> {
        let token = HeaderValue::from_str(api_key)
            .map_err(|_| FeedError::Config("GROUPME_API_KEY is not a valid header value".into()))?;

        let response = self
            .http
            .get(url)
            .header(ACCESS_TOKEN_HEADER, token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(group_id = %group_id, status = %status, body = %body, "GroupMe error body");
            return Err(FeedError::UpstreamStatus {
                group_id: group_id.to_string(),
                status: status.as_u16(),
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| FeedError::UpstreamBody(e.to_string()))?;
        Ok(envelope.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GroupMeClient {
        GroupMeClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    async fn mount_group(server: &MockServer, id: &str, name: &str, events: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/groups/{id}")))
            .and(header("X-Access-Token", "token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"response": {"name": name}})),
            )
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/conversations/{id}/events/list")))
            .and(header("X-Access-Token", "token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": {"events": events}})),
            )
            .mount(server)
            .await;
    }

    fn event_json(id: &str) -> serde_json::Value {
        json!({
            "event_id": id,
            "name": format!("Event {id}"),
            "start_at": "2024-05-01T18:30:00Z",
        })
    }

    #[tokio::test]
    async fn test_fetch_tags_events_and_joins_names() {
        let server = MockServer::start().await;
        mount_group(&server, "1", "Climbing", json!([event_json("a"), event_json("b")])).await;
        mount_group(&server, "2", "Board Games", json!([event_json("c")])).await;

        let outcome = client_for(&server)
            .fetch("token", &["1".to_string(), "2".to_string()])
            .await;

        assert!(outcome.success);
        let ids: Vec<&str> = outcome.events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(outcome.events[0].group_id.as_deref(), Some("1"));
        assert_eq!(outcome.events[0].group_name.as_deref(), Some("Climbing"));
        assert_eq!(outcome.events[2].group_name.as_deref(), Some("Board Games"));
        assert_eq!(outcome.calendar_name("Fallback"), "Climbing, Board Games");
    }

    #[tokio::test]
    async fn test_failed_group_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/groups/1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/conversations/1/events/list"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        mount_group(&server, "2", "Hikers", json!([event_json("z")])).await;

        let outcome = client_for(&server)
            .fetch("token", &["1".to_string(), "2".to_string()])
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].event_id, "z");
        assert_eq!(outcome.names, vec!["Hikers"]);
    }

    #[tokio::test]
    async fn test_missing_group_name_keeps_events() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/groups/1"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/conversations/1/events/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": {"events": [event_json("a")]}})),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server).fetch("token", &["1".to_string()]).await;

        assert!(outcome.success);
        assert_eq!(outcome.events[0].group_name, None);
        assert!(outcome.names.is_empty());
        assert_eq!(outcome.calendar_name("GroupMe Calendar"), "GroupMe Calendar");
    }

    #[tokio::test]
    async fn test_no_events_anywhere_is_not_success() {
        let server = MockServer::start().await;
        mount_group(&server, "1", "Quiet Group", json!([])).await;

        let outcome = client_for(&server).fetch("token", &["1".to_string()]).await;

        assert!(!outcome.success);
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.names, vec!["Quiet Group"]);
    }

    #[tokio::test]
    async fn test_malformed_event_is_ignored() {
        let server = MockServer::start().await;
        mount_group(
            &server,
            "1",
            "Climbing",
            json!([{"name": "no id or start"}, event_json("ok")]),
        )
        .await;

        let outcome = client_for(&server).fetch("token", &["1".to_string()]).await;

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].event_id, "ok");
    }

    #[tokio::test]
    async fn test_unreachable_api_is_not_a_panic() {
        let client = GroupMeClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();

        let outcome = client.fetch("token", &["1".to_string()]).await;

        assert!(!outcome.success);
        assert!(outcome.names.is_empty());
    }
}
