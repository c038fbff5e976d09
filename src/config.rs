//! Configuration module for linkwatch.
//!
//! Loads process configuration from environment variables with sensible
//! defaults. User-facing settings (probe URL, interval, sounds) live in the
//! store instead, see [`crate::settings`].

use std::env;
use std::time::Duration;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the control API (default: 8080)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "linkwatch.db")
    pub db_path: String,
    /// Transport timeout applied to every probe request (default: 10s)
    pub probe_timeout: Duration,
    /// Endpoint returning `{"ip": "..."}`; empty disables the lookup
    pub ip_lookup_url: String,
    /// Address used to ask the OS whether a route exists (default: "1.1.1.1:53")
    pub link_check_addr: String,
    /// Payload downloaded by the on-demand speed test
    pub speed_test_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            db_path: "linkwatch.db".to_string(),
            probe_timeout: Duration::from_secs(10),
            ip_lookup_url: "https://api.ipify.org?format=json".to_string(),
            link_check_addr: "1.1.1.1:53".to_string(),
            speed_test_url: "https://speed.cloudflare.com/__down?bytes=2000000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `LINKWATCH_HTTP_PORT`: HTTP port (default: 8080)
    /// - `LINKWATCH_DB_PATH`: Database file path (default: "linkwatch.db")
    /// - `LINKWATCH_PROBE_TIMEOUT_SECS`: Probe transport timeout (default: 10)
    /// - `LINKWATCH_IP_LOOKUP_URL`: Public IP endpoint, empty to disable
    /// - `LINKWATCH_LINK_CHECK_ADDR`: Route check address (default: "1.1.1.1:53")
    /// - `LINKWATCH_SPEED_TEST_URL`: Speed test download (default: 2MB from Cloudflare)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port_str) = lookup("LINKWATCH_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Some(db_path) = lookup("LINKWATCH_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Some(secs) = lookup("LINKWATCH_PROBE_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => cfg.probe_timeout = Duration::from_secs(secs),
                _ => tracing::warn!("Ignoring invalid LINKWATCH_PROBE_TIMEOUT_SECS={}", secs),
            }
        }

        if let Some(url) = lookup("LINKWATCH_IP_LOOKUP_URL") {
            cfg.ip_lookup_url = url;
        }

        if let Some(addr) = lookup("LINKWATCH_LINK_CHECK_ADDR") {
            cfg.link_check_addr = addr;
        }

        if let Some(url) = lookup("LINKWATCH_SPEED_TEST_URL").filter(|u| !u.is_empty()) {
            cfg.speed_test_url = url;
        }

        cfg
    }
}
