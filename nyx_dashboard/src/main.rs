#![warn(clippy::pedantic)]

mod render;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use nyx_core::config::{ConfigError, DEFAULT_RPC_BIND};
use nyx_core::stats::{BotStats, SECRET_HEADER};

const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
struct DashboardConfig {
    bind: SocketAddr,
    /// Full url of the bot's stats endpoint.
    stats_url: String,
    secret: Option<String>,
}

impl DashboardConfig {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind = get("DASHBOARD_BIND").unwrap_or_else(|| DEFAULT_BIND.to_owned());
        let bind = bind.parse().map_err(|_| ConfigError::Invalid {
            var: "DASHBOARD_BIND",
            value: bind.clone(),
        })?;

        let base = match get("RPC_URL") {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => url,
            Some(url) => {
                return Err(ConfigError::Invalid {
                    var: "RPC_URL",
                    value: url,
                })
            }
            None => format!(
                "http://{}",
                get("RPC_BIND").unwrap_or_else(|| DEFAULT_RPC_BIND.to_owned())
            ),
        };

        Ok(Self {
            bind,
            stats_url: format!("{}/stats", base.trim_end_matches('/')),
            secret: get("RPC_SECRET"),
        })
    }
}

struct AppState {
    client: reqwest::Client,
    config: DashboardConfig,
}

type SharedState = Arc<AppState>;

async fn fetch_stats(state: &AppState) -> Result<BotStats, reqwest::Error> {
    let mut request = state.client.get(&state.config.stats_url);
    if let Some(secret) = &state.config.secret {
        request = request.header(SECRET_HEADER, secret);
    }
    request.send().await?.error_for_status()?.json().await
}

async fn index(State(state): State<SharedState>) -> Response {
    match fetch_stats(&state).await {
        Ok(stats) => Html(render::stats_page(&stats)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Bot stats unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, Html(render::offline_page())).into_response()
        }
    }
}

async fn api_stats(State(state): State<SharedState>) -> Response {
    match fetch_stats(&state).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Bot stats unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "bot unreachable").into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/stats", get(api_stats))
        .route("/health", get(health))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nyx_dashboard=info")),
        )
        .init();

    let config = match DashboardConfig::from_lookup(|var| std::env::var(var).ok()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build the http client");
            std::process::exit(1);
        }
    };

    let bind = config.bind;
    tracing::info!(%bind, stats = %config.stats_url, "Starting dashboard");
    let state = Arc::new(AppState { client, config });

    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%bind, error = %e, "Could not bind");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    {
        tracing::error!(error = %e, "Server error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<DashboardConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        DashboardConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.stats_url, "http://127.0.0.1:8089/stats");
        assert_eq!(config.secret, None);
    }

    #[test]
    fn rpc_url_wins_over_bind() {
        let config = config(&[
            ("RPC_URL", "https://bot.internal:9000/"),
            ("RPC_BIND", "127.0.0.1:1"),
            ("RPC_SECRET", "s3cret"),
        ])
        .unwrap();
        assert_eq!(config.stats_url, "https://bot.internal:9000/stats");
        assert_eq!(config.secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn rpc_bind_used_without_url() {
        let config = config(&[("RPC_BIND", "10.0.0.2:7000"), ("RPC_SECRET", " ")]).unwrap();
        assert_eq!(config.stats_url, "http://10.0.0.2:7000/stats");
        assert_eq!(config.secret, None);
    }

    #[test]
    fn invalid_values() {
        assert_eq!(
            config(&[("DASHBOARD_BIND", "nope")]),
            Err(ConfigError::Invalid {
                var: "DASHBOARD_BIND",
                value: "nope".to_owned()
            })
        );
        assert!(config(&[("RPC_URL", "bot:8089")]).is_err());
    }
}
