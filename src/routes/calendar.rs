use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::state::AppState;

const ICS_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendar.ics", get(calendar_ics))
        .route("/recent.ics", get(recent_ics))
}

/// Always 200: configuration and upstream trouble arrive as an error calendar
/// so subscribed clients keep polling.
async fn calendar_ics(State(state): State<AppState>) -> Response {
    let snapshot = state.feed.snapshot().await;
    (
        [
            (header::CONTENT_TYPE, ICS_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, "attachment"),
        ],
        snapshot.ics.clone(),
    )
        .into_response()
}

async fn recent_ics() -> &'static str {
    "Soon!"
}
