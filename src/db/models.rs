//! Persisted record types.
//!
//! Timestamps are epoch milliseconds, matching what the dashboard reads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of entries kept in the transition log.
pub const MAX_LOG_ENTRIES: usize = 100;

/// Classified connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectivityState {
    Online,
    LanNoInternet,
    #[default]
    Offline,
}

impl ConnectivityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::LanNoInternet => "LAN_NO_INTERNET",
            Self::Offline => "OFFLINE",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the most recent cycle, overwritten every time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub status: ConnectivityState,
    /// Round-trip time of the last probe, 0 when no request completed
    pub latency_millis: f64,
    pub last_checked: i64,
}

/// Cumulative uptime/downtime bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    pub total_uptime_millis: i64,
    pub total_downtime_millis: i64,
    pub disconnects: u64,
    pub last_online_start: Option<i64>,
    pub last_offline_start: Option<i64>,
    pub last_updated: i64,
}

impl StatsRecord {
    /// Fresh record starting at `now` while in `state`.
    pub fn new(now: i64, state: ConnectivityState) -> Self {
        Self {
            total_uptime_millis: 0,
            total_downtime_millis: 0,
            disconnects: 0,
            last_online_start: state.is_online().then_some(now),
            last_offline_start: (!state.is_online()).then_some(now),
            last_updated: now,
        }
    }

    /// Share of tracked time spent online, in percent. 100 when nothing is tracked yet.
    pub fn availability_percent(&self) -> f64 {
        let total = self.total_uptime_millis + self.total_downtime_millis;
        if total <= 0 {
            return 100.0;
        }
        self.total_uptime_millis as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogKind {
    StatusChange,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusChange => "STATUS_CHANGE",
        }
    }
}

/// One transition in the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub from: ConnectivityState,
    pub to: ConnectivityState,
}

impl LogEntry {
    pub fn status_change(timestamp: i64, from: ConnectivityState, to: ConnectivityState) -> Self {
        Self {
            timestamp,
            kind: LogKind::StatusChange,
            from,
            to,
        }
    }
}

/// Insert `entry` at the front of a newest-first log, dropping the oldest
/// entries beyond [`MAX_LOG_ENTRIES`].
pub fn push_bounded(logs: &mut Vec<LogEntry>, entry: LogEntry) {
    logs.insert(0, entry);
    logs.truncate(MAX_LOG_ENTRIES);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_bounding() {
        let mut logs = Vec::new();
        for i in 0..150 {
            push_bounded(
                &mut logs,
                LogEntry::status_change(i, ConnectivityState::Online, ConnectivityState::Offline),
            );
        }

        assert_eq!(logs.len(), MAX_LOG_ENTRIES);
        assert_eq!(logs.first().unwrap().timestamp, 149);
        assert_eq!(logs.last().unwrap().timestamp, 50);
        assert!(logs.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
    }

    #[test]
    fn test_state_wire_names() {
        let json = serde_json::to_string(&ConnectivityState::LanNoInternet).unwrap();
        assert_eq!(json, "\"LAN_NO_INTERNET\"");

        let entry = LogEntry::status_change(7, ConnectivityState::Offline, ConnectivityState::Online);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "STATUS_CHANGE");
        assert_eq!(value["from"], "OFFLINE");
        assert_eq!(value["to"], "ONLINE");
    }

    #[test]
    fn test_new_stats_marks_start() {
        let online = StatsRecord::new(1_000, ConnectivityState::Online);
        assert_eq!(online.last_online_start, Some(1_000));
        assert_eq!(online.last_offline_start, None);

        let offline = StatsRecord::new(1_000, ConnectivityState::LanNoInternet);
        assert_eq!(offline.last_online_start, None);
        assert_eq!(offline.last_offline_start, Some(1_000));
    }

    #[test]
    fn test_availability() {
        let mut stats = StatsRecord::new(0, ConnectivityState::Online);
        assert_eq!(stats.availability_percent(), 100.0);

        stats.total_uptime_millis = 3_000;
        stats.total_downtime_millis = 1_000;
        assert_eq!(stats.availability_percent(), 75.0);
    }
}
