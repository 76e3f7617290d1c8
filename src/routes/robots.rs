use axum::{Router, routing::get};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/robots.txt", get(robots_txt))
}

async fn robots_txt() -> &'static str {
    "User-agent: *\nDisallow: /"
}
