use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use nyx_core::data::database::Database;
use nyx_core::stats::{BotStats, SECRET_HEADER};
use poise::serenity_prelude::Cache;

/// What the stats endpoint reads from the running bot.
#[derive(Clone)]
pub struct RpcState {
    pub cache: Arc<Cache>,
    pub database: Arc<Database>,
    pub commands_run: Arc<AtomicU64>,
    pub time_started: Instant,
    pub secret: Option<String>,
}

impl RpcState {
    fn snapshot(&self) -> BotStats {
        BotStats::collect(
            &self.cache,
            &self.database,
            self.commands_run.load(Ordering::Relaxed),
            self.time_started,
        )
    }
}

/// No secret configured means the endpoint is open.
#[must_use]
pub fn authorize(expected: Option<&str>, provided: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => provided.is_some_and(|p| p == expected),
    }
}

async fn stats(
    State(state): State<RpcState>,
    headers: HeaderMap,
) -> Result<Json<BotStats>, StatusCode> {
    let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !authorize(state.secret.as_deref(), provided) {
        tracing::warn!("Rejected stats request with a bad secret");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(state.snapshot()))
}

pub fn router(state: RpcState) -> Router {
    Router::new().route("/stats", get(stats)).with_state(state)
}

/// Serves the stats endpoint until the process exits.
pub async fn serve(bind: SocketAddr, state: RpcState) {
    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%bind, error = %e, "Could not bind the stats endpoint");
            return;
        }
    };
    tracing::info!(%bind, "Stats endpoint listening");

    if let Err(e) = axum::serve(listener, router(state)).await {
        tracing::error!(error = %e, "Stats endpoint stopped");
    }
}
