//! Probe module for reachability checks.
//!
//! A probe never fails from the caller's point of view: transport errors of
//! any kind collapse into an unreachable [`ProbeResult`].

mod http;
mod link;

pub use http::*;
pub use link::*;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub reachable: bool,
    /// Round-trip time in milliseconds, absent when no response arrived
    pub latency_millis: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl ProbeResult {
    pub fn unreachable(observed_at: DateTime<Utc>) -> Self {
        Self {
            reachable: false,
            latency_millis: None,
            observed_at,
        }
    }
}

/// Probe `url` unless the link is already known to be down.
///
/// With no link the result is unreachable and no request is issued. Any
/// HTTP response counts as reachable, whatever its status code.
pub async fn probe(client: &reqwest::Client, url: &str, link_up: bool) -> ProbeResult {
    let observed_at = Utc::now();

    if !link_up {
        return ProbeResult::unreachable(observed_at);
    }

    match run_http_probe(client, url).await {
        Ok(rtt) => ProbeResult {
            reachable: true,
            latency_millis: Some(rtt.as_secs_f64() * 1000.0),
            observed_at,
        },
        Err(e) => {
            tracing::debug!("Probe to {} failed: {}", url, e);
            ProbeResult::unreachable(observed_at)
        }
    }
}
