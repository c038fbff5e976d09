//! HTTP request handlers.

use super::AppState;
use crate::db::LogEntry;
use crate::monitor::ControlMessage;
use crate::settings::SettingsPatch;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, SecondsFormat};
use std::fmt::Write;

// ============================================================================
// Dashboard
// ============================================================================

pub async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.monitor.snapshot() {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_get_indicator(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.indicator.snapshot())
}

// ============================================================================
// Logs
// ============================================================================

pub async fn handle_get_logs(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.get_logs() {
        Ok(logs) => Json(logs).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_clear_logs(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.clear_logs() {
        Ok(()) => {
            tracing::info!("Logs cleared");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_export_logs(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.get_logs() {
        Ok(logs) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"connection_logs.csv\""),
            ],
            render_csv(&logs),
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Render the log as CSV, newest first, with ISO-8601 millisecond timestamps.
pub fn render_csv(logs: &[LogEntry]) -> String {
    let mut out = String::from("Timestamp,Type,From,To\n");

    for entry in logs {
        let timestamp = DateTime::from_timestamp_millis(entry.timestamp)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{},{}",
            timestamp,
            entry.kind.as_str(),
            entry.from,
            entry.to
        );
    }

    out
}

// ============================================================================
// Settings & control messages
// ============================================================================

pub async fn handle_update_settings(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> impl IntoResponse {
    match state.monitor.update_settings(&patch) {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_message(
    State(state): State<AppState>,
    Json(msg): Json<ControlMessage>,
) -> impl IntoResponse {
    match state.monitor.handle_control(msg) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

// ============================================================================
// Speed test
// ============================================================================

pub async fn handle_speed_test(State(state): State<AppState>) -> impl IntoResponse {
    match state.monitor.speed_test().await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            tracing::warn!("Speed test failed: {}", e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}
