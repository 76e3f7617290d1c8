mod routes;
mod state;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use groupme_ics_core::Settings;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load().context("Failed to load settings")?;
    let addr: SocketAddr = format!("{}:{}", settings.bind_address, settings.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                settings.bind_address, settings.port
            )
        })?;

    info!(
        groups = settings.group_ids.len(),
        cache_minutes = settings.cache_duration.as_secs() / 60,
        timezone = %settings.timezone,
        "Starting GroupMe calendar feed"
    );

    let state = AppState::new(settings)?;
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    info!("groupme-ics listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
