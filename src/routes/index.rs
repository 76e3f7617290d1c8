use askama::Template;
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use groupme_ics_core::{FeedError, Settings, SubscriptionUrls};

use super::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    title: &'a str,
    group_ids: String,
    timezone: &'a str,
    ics_url_webcal: &'a str,
    ics_url_google: &'a str,
    ics_url_http: &'a str,
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let settings = state.feed.settings();
    if let Some(message) = missing_setting_message(settings) {
        return Ok(message.into_response());
    }

    let snapshot = state.feed.snapshot().await;
    if let Some(failure) = &snapshot.failure {
        return Ok(failure.message.clone().into_response());
    }

    let ics_url = match &settings.proxy_url {
        Some(proxy) => proxy.clone(),
        None => request_ics_url(&headers),
    };
    let urls = SubscriptionUrls::from_ics_url(&ics_url)?;

    let page = IndexTemplate {
        title: &snapshot.name,
        group_ids: settings.group_ids.join(", "),
        timezone: &settings.timezone,
        ics_url_webcal: &urls.webcal,
        ics_url_google: &urls.google,
        ics_url_http: &urls.http,
    };
    Ok(Html(page.render()?).into_response())
}

/// Group ids are checked before the API key.
fn missing_setting_message(settings: &Settings) -> Option<String> {
    let missing = match (settings.group_ids(), settings.api_key()) {
        (Err(FeedError::MissingSetting(name)), _) | (_, Err(FeedError::MissingSetting(name))) => {
            name
        }
        _ => return None,
    };
    Some(format!("ERROR: The {missing} is not set."))
}

fn request_ics_url(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}/calendar.ics")
}
