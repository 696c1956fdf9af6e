use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use migration::MigratorTrait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod rate_limit;
pub mod rewards;
pub mod util;

use config::Config;
use engine::Engine;
use mailer::{BrevoMailer, Mailer, NullMailer};
use rate_limit::RateLimiter;

pub struct AppState {
    pub engine: Engine,
}

/// Request bodies are tiny (an email, a couple of codes); capping them bounds
/// abuse on the public endpoints.
const MAX_BODY_BYTES: usize = 4 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(Any)
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health))
        .route("/waitlist/join", post(handlers::waitlist::join))
        .route("/waitlist/confirm", get(handlers::waitlist::confirm))
        .route("/waitlist/resend", post(handlers::waitlist::resend))
        .route("/waitlist/change-email", post(handlers::waitlist::change_email))
        .route("/squad/leave", post(handlers::squad::leave))
        .route("/squad/{share_code}", get(handlers::squad::get_squad))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "service": "vantage" }))
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();

    info!("Connecting to database...");
    let db = db::db_connect(&config.database_url)
        .await
        .expect("Failed to open database connection");

    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let mailer: Arc<dyn Mailer> = match BrevoMailer::from_config(&config) {
        Some(brevo) => Arc::new(brevo),
        None => {
            info!("Brevo credentials not set; outbound mail is logged, not sent");
            Arc::new(NullMailer)
        }
    };

    let engine = Engine::new(db, mailer, RateLimiter::new(), config.base_url.clone());
    let state = Arc::new(AppState { engine });

    let app = router(state);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address)
        .await
        .expect("Failed to bind listen address");
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    info!("Server shutting down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
