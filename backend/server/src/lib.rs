//! Documentation of the Flow Masters course delivery backend.
//!
//! Serves course lessons behind drip release rules. Everything else on the site
//! (CMS, checkout, newsletters, feeds) lives elsewhere and only shares the catalog data.
//!
//!
//!
//! # General Infrastructure
//! - User goes to the public site, the frontend calls this server with the session token
//! - Server resolves the token to a user through Redis
//! - Lessons, modules, courses and enrollments are read from Redis on every request
//! - Catalog data is written by the `seed` tool (or the CMS sync) using [`catalog::keys`]
//!
//!
//!
//! # Routes
//!
//! | Route                   | Success                 | Locked                       |
//! |-------------------------|-------------------------|------------------------------|
//! | `GET /lessons/{id}`     | 200, lesson with module | 403, reason + release time   |
//! | `GET /modules/{id}/lessons` | 200, lock state per lesson | n/a                   |
//! | `GET /health`           | 200                     | n/a                          |
//!
//! Faults map to 401 (no session), 404 (unknown lesson or module) and 500 (broken
//! content records, Redis failures). A locked lesson is never reported as a fault and a
//! fault is never reported as locked.
//!
//!
//!
//! # Setup
//!
//! Environment
//! - `RUST_PORT`: listen port, default `1111`
//! - `REDIS_URL`: default `redis://redis:6379`
//! - `RUST_LOG`: tracing filter, e.g. `server=debug`
//! - `/run/secrets/REDIS_PASSWORD`: optional, injected into `REDIS_URL`
//!
//! Seed a local Redis.
//! ```sh
//! cargo run -p seed -- catalog.json redis://localhost:6379
//! ```
//!
//! Run the server.
//! ```sh
//! RUST_LOG=info cargo run -p flow
//! ```
use std::{error::Error, sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod access;
pub mod config;
pub mod database;
pub mod error;
pub mod memory;
pub mod routes;
pub mod state;
pub mod store;
pub mod user;

use config::Config;
use routes::{health_handler, lesson_handler, module_lessons_handler};
use state::State;

pub fn router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/lessons/{id}", get(lesson_handler))
        .route("/modules/{id}/lessons", get(module_lessons_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<(), Box<dyn Error + Send + Sync>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config).await?;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
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
