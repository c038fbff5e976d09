//! Web server module: the JSON/CSV control API.

mod handlers;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::monitor::Monitor;
use crate::notify::SharedIndicator;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<Store>,
    pub monitor: Arc<Monitor>,
    pub indicator: Arc<SharedIndicator>,
}

pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(
        config: ServerConfig,
        store: Arc<Store>,
        monitor: Arc<Monitor>,
        indicator: Arc<SharedIndicator>,
    ) -> Self {
        Self {
            state: AppState {
                config,
                store,
                monitor,
                indicator,
            },
        }
    }

    /// Build the router with all routes.
    pub(crate) fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

        Router::new()
            .route("/api/status", get(handlers::handle_get_status))
            .route(
                "/api/logs",
                get(handlers::handle_get_logs).delete(handlers::handle_clear_logs),
            )
            .route("/api/logs.csv", get(handlers::handle_export_logs))
            .route("/api/settings", put(handlers::handle_update_settings))
            .route("/api/messages", post(handlers::handle_message))
            .route("/api/indicator", get(handlers::handle_get_indicator))
            .route("/api/speed-test", post(handlers::handle_speed_test))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(64 * 1024))
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Control API listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
