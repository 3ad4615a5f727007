use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use campuswatch_common::Config;
use campuswatch_store::{DedupPolicy, Directory, IncidentRepository, MemoryBackend};

mod auth;
mod realtime;
mod rest;

pub struct AppState {
    pub config: Config,
    pub repo: Arc<dyn IncidentRepository>,
    pub directory: Arc<dyn Directory>,
    pub rate_limiter: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

impl AppState {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("campuswatch=info".parse()?))
        .init();

    let config = Config::from_env();
    let addr = format!("{}:{}", config.host, config.port);

    let backend = Arc::new(MemoryBackend::new(DedupPolicy::new(
        config.duplicate_window_minutes,
        config.similarity_threshold,
    )));
    let admin = backend
        .seed_admin(&config.admin_email, &config.admin_password)
        .await;
    info!(admin = %admin.email, "seed admin account ready");

    let state = Arc::new(AppState {
        config,
        repo: backend.clone(),
        directory: backend,
        rate_limiter: Mutex::new(HashMap::new()),
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Sessions and accounts
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/session", get(auth::current_session))
        // Incidents
        .route(
            "/api/incidents",
            get(rest::list_incidents).post(rest::submit::submit_incident),
        )
        .route("/api/incidents/recent", get(rest::recent_incidents))
        .route("/api/incidents/stream", get(realtime::incident_stream))
        .route("/api/incidents/{id}/status", post(rest::change_status))
        // Per-location rollup for the heatmap and the ranked list
        .route("/api/stats", get(rest::location_stats))
        // Admin: account management
        .route("/api/users", get(rest::list_users))
        .route("/api/users/{id}/status", post(rest::set_user_status))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path only (no query params, no IP)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    info!("CampusWatch API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
