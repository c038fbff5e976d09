//! HTTP probe implementation.

use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::ProbeError;

/// Build the shared client used for probes and the public IP lookup.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ProbeError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProbeError::Config(e.to_string()))
}

/// Run a cache-bypassing HEAD probe against `url`.
///
/// Returns the time until response headers arrived. The status code is
/// not inspected; only transport completion matters.
pub async fn run_http_probe(client: &reqwest::Client, url: &str) -> Result<Duration, ProbeError> {
    let start = Instant::now();

    client
        .head(url)
        .header(CACHE_CONTROL, "no-cache")
        .header(PRAGMA, "no-cache")
        .send()
        .await
        .map_err(map_transport_error)?;

    Ok(start.elapsed())
}

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

/// Look up the public IP via a `{"ip": "..."}` JSON endpoint.
pub async fn fetch_public_ip(client: &reqwest::Client, url: &str) -> Result<String, ProbeError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(map_transport_error)?
        .error_for_status()
        .map_err(|e| ProbeError::Network(e.to_string()))?;

    let body: IpResponse = response
        .json()
        .await
        .map_err(|e| ProbeError::Network(e.to_string()))?;

    Ok(body.ip)
}

/// Outcome of a download throughput test.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedTestResult {
    pub bytes: u64,
    pub duration_millis: f64,
    pub mbps: f64,
}

/// Download `url` once and report throughput in Mbps (2^20 bits per second).
///
/// A `t=<epoch millis>` query parameter is appended so no cache answers.
/// Non-success statuses are errors.
pub async fn run_speed_test(client: &reqwest::Client, url: &str) -> Result<SpeedTestResult, ProbeError> {
    let start = Instant::now();

    let body = client
        .get(url)
        .query(&[("t", Utc::now().timestamp_millis())])
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await
        .map_err(map_transport_error)?
        .error_for_status()
        .map_err(|e| ProbeError::Network(e.to_string()))?
        .bytes()
        .await
        .map_err(map_transport_error)?;

    let elapsed = start.elapsed().max(Duration::from_micros(1));
    let bits = body.len() as f64 * 8.0;

    Ok(SpeedTestResult {
        bytes: body.len() as u64,
        duration_millis: elapsed.as_secs_f64() * 1000.0,
        mbps: bits / elapsed.as_secs_f64() / (1024.0 * 1024.0),
    })
}

fn map_transport_error(e: reqwest::Error) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout
    } else {
        ProbeError::Network(e.to_string())
    }
}
