//! linkwatch - Connectivity Monitoring Daemon
//!
//! Probes internet reachability on a schedule, keeps uptime statistics and
//! a transition log, and shows the current state through a status icon.

mod config;
mod db;
mod monitor;
mod notify;
mod probe;
mod scheduler;
mod settings;
mod web;

use config::ServerConfig;
use db::Store;
use monitor::Monitor;
use notify::{Coordinator, SharedIndicator, TaskSurfaceHost};
use probe::RouteLinkSignal;
use scheduler::Scheduler;
use web::Server;

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("linkwatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting linkwatch on port {}...", cfg.http_port);
    tracing::info!("Using database at {}", cfg.db_path);

    // Initialize database
    let store = Arc::new(Store::new(&cfg.db_path)?);
    tracing::info!("Database initialized successfully");

    // Notification surface and indicator
    let indicator = Arc::new(SharedIndicator::default());
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let host = Arc::new(TaskSurfaceHost::new(events_tx));
    let coordinator = Arc::new(Coordinator::new(host, indicator.clone()));
    coordinator.clone().spawn_listener(events_rx);

    // Monitor
    let link = Arc::new(RouteLinkSignal::new(&cfg.link_check_addr)?);
    let monitor = Arc::new(Monitor::new(store.clone(), &cfg, link, coordinator)?);

    // Start scheduler
    let scheduler = Scheduler::new(monitor.clone());
    scheduler.start();

    // Start web server
    let server = Server::new(cfg, store, monitor, indicator);
    server.start().await?;

    scheduler.stop();
    Ok(())
}
