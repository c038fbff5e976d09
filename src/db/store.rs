//! SQLite-backed key-value store.
//!
//! Every record lives as a JSON document under a fixed key in the `kv`
//! table, so the dashboard and the monitor agree on one shape per key.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use super::models::*;
use crate::settings::{Settings, SettingsPatch};

pub const KEY_SETTINGS: &str = "settings";
pub const KEY_CURRENT_STATUS: &str = "currentStatus";
pub const KEY_STATS: &str = "stats";
pub const KEY_LOGS: &str = "logs";
pub const KEY_CACHED_IP: &str = "cachedIP";

/// Older names for settings fields, superseded on write.
const LEGACY_SETTINGS_KEYS: &[&str] = &["pingUrl", "checkInterval", "playSounds"];

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Malformed value under {key}: {source}")]
    Decode {
        key: &'static str,
        source: serde_json::Error,
    },
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Connection lock poisoned")]
    Poisoned,
}

/// Thread-safe database store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // --- Settings ---

    /// Stored settings as a partial document; fields missing from the blob stay `None`.
    pub fn get_settings_patch(&self) -> Result<Option<SettingsPatch>, DbError> {
        read(&*self.conn()?, KEY_SETTINGS)
    }

    /// Merge `settings` into the stored blob.
    ///
    /// Keys this daemon does not model (a dashboard's `theme`, `precision`)
    /// are kept. Legacy aliases of modelled fields are dropped so the blob
    /// never carries two names for one field.
    pub fn put_settings(&self, settings: &Settings) -> Result<(), DbError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut blob = match read::<Value>(&tx, KEY_SETTINGS)? {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for key in LEGACY_SETTINGS_KEYS {
            blob.remove(*key);
        }
        if let Value::Object(fields) = serde_json::to_value(settings)? {
            blob.extend(fields);
        }

        write(&tx, KEY_SETTINGS, &blob)?;
        tx.commit()?;
        Ok(())
    }

    // --- Status / stats / logs ---

    pub fn get_status(&self) -> Result<Option<StatusRecord>, DbError> {
        read(&*self.conn()?, KEY_CURRENT_STATUS)
    }

    pub fn get_stats(&self) -> Result<Option<StatsRecord>, DbError> {
        read(&*self.conn()?, KEY_STATS)
    }

    /// Transition log, newest first.
    pub fn get_logs(&self) -> Result<Vec<LogEntry>, DbError> {
        Ok(read(&*self.conn()?, KEY_LOGS)?.unwrap_or_default())
    }

    /// Persist one classification cycle atomically.
    ///
    /// Writes the status record, runs `update_stats` against the stored stats
    /// (or `None` on first use) and appends `transition` to the log, all in
    /// a single transaction. Returns the stats that were written.
    pub fn record_cycle<F>(
        &self,
        status: &StatusRecord,
        transition: Option<&LogEntry>,
        update_stats: F,
    ) -> Result<StatsRecord, DbError>
    where
        F: FnOnce(Option<StatsRecord>) -> StatsRecord,
    {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        write(&tx, KEY_CURRENT_STATUS, status)?;

        let stats = update_stats(read(&tx, KEY_STATS)?);
        write(&tx, KEY_STATS, &stats)?;

        if let Some(entry) = transition {
            let mut logs: Vec<LogEntry> = read(&tx, KEY_LOGS)?.unwrap_or_default();
            push_bounded(&mut logs, entry.clone());
            write(&tx, KEY_LOGS, &logs)?;
        }

        tx.commit()?;
        Ok(stats)
    }

    /// Append a single entry to the bounded log.
    #[cfg(test)]
    pub fn append_log(&self, entry: &LogEntry) -> Result<(), DbError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut logs: Vec<LogEntry> = read(&tx, KEY_LOGS)?.unwrap_or_default();
        push_bounded(&mut logs, entry.clone());
        write(&tx, KEY_LOGS, &logs)?;
        tx.commit()?;
        Ok(())
    }

    pub fn clear_logs(&self) -> Result<(), DbError> {
        write(&*self.conn()?, KEY_LOGS, &Vec::<LogEntry>::new())
    }

    /// Replace the stats with a fresh record starting at `now`.
    pub fn reset_stats(&self, now: i64, state: ConnectivityState) -> Result<StatsRecord, DbError> {
        let stats = StatsRecord::new(now, state);
        write(&*self.conn()?, KEY_STATS, &stats)?;
        Ok(stats)
    }

    // --- Public IP ---

    pub fn get_cached_ip(&self) -> Result<Option<String>, DbError> {
        read(&*self.conn()?, KEY_CACHED_IP)
    }

    pub fn set_cached_ip(&self, ip: &str) -> Result<(), DbError> {
        write(&*self.conn()?, KEY_CACHED_IP, &ip)
    }
}

fn read<T: DeserializeOwned>(conn: &Connection, key: &'static str) -> Result<Option<T>, DbError> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
        .optional()?;

    raw.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|source| DbError::Decode { key, source })
}

fn write<T: Serialize + ?Sized>(conn: &Connection, key: &str, value: &T) -> Result<(), DbError> {
    let json = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
        params![key, json, Utc::now().format("%Y-%m-%d %H:%M:%S%.9f").to_string()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn status(state: ConnectivityState, at: i64) -> StatusRecord {
        StatusRecord {
            status: state,
            latency_millis: 12.0,
            last_checked: at,
        }
    }

    #[test]
    fn test_empty_store() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        assert!(store.get_status().unwrap().is_none());
        assert!(store.get_stats().unwrap().is_none());
        assert!(store.get_logs().unwrap().is_empty());
        assert!(store.get_cached_ip().unwrap().is_none());
        assert!(store.get_settings_patch().unwrap().is_none());
    }

    #[test]
    fn test_record_cycle() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        let entry = LogEntry::status_change(1_000, ConnectivityState::Offline, ConnectivityState::Online);
        let written = store
            .record_cycle(&status(ConnectivityState::Online, 1_000), Some(&entry), |prev| {
                assert!(prev.is_none());
                StatsRecord::new(1_000, ConnectivityState::Online)
            })
            .unwrap();

        assert_eq!(store.get_stats().unwrap(), Some(written));
        assert_eq!(store.get_status().unwrap().unwrap().status, ConnectivityState::Online);
        assert_eq!(store.get_logs().unwrap(), vec![entry]);

        // A second cycle sees the stats written by the first
        store
            .record_cycle(&status(ConnectivityState::Online, 2_000), None, |prev| {
                let mut stats = prev.expect("stats from first cycle");
                stats.last_updated = 2_000;
                stats
            })
            .unwrap();
        assert_eq!(store.get_stats().unwrap().unwrap().last_updated, 2_000);
        assert_eq!(store.get_logs().unwrap().len(), 1);
    }

    #[test]
    fn test_log_is_bounded() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        for i in 0..150 {
            store
                .append_log(&LogEntry::status_change(
                    i,
                    ConnectivityState::Online,
                    ConnectivityState::LanNoInternet,
                ))
                .unwrap();
        }

        let logs = store.get_logs().unwrap();
        assert_eq!(logs.len(), MAX_LOG_ENTRIES);
        assert_eq!(logs[0].timestamp, 149);
        assert_eq!(logs[99].timestamp, 50);

        store.clear_logs().unwrap();
        assert!(store.get_logs().unwrap().is_empty());
    }

    #[test]
    fn test_reset_stats() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        store
            .record_cycle(&status(ConnectivityState::Offline, 10), None, |_| StatsRecord {
                total_uptime_millis: 500,
                total_downtime_millis: 700,
                disconnects: 4,
                last_online_start: Some(1),
                last_offline_start: Some(2),
                last_updated: 10,
            })
            .unwrap();

        let fresh = store.reset_stats(20, ConnectivityState::Online).unwrap();
        assert_eq!(fresh.disconnects, 0);
        assert_eq!(fresh.total_uptime_millis + fresh.total_downtime_millis, 0);
        assert_eq!(store.get_stats().unwrap(), Some(fresh));
    }

    #[test]
    fn test_put_settings_keeps_unknown_keys() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        let legacy = serde_json::json!({
            "pingUrl": "https://www.baidu.com",
            "checkInterval": 60000,
            "theme": "light",
            "precision": "high"
        });
        write(&*store.conn().unwrap(), KEY_SETTINGS, &legacy).unwrap();

        let settings = Settings::default().merged(&store.get_settings_patch().unwrap().unwrap());
        assert_eq!(settings.probe_url, "https://www.baidu.com");
        store.put_settings(&settings).unwrap();

        let blob: Value = read(&*store.conn().unwrap(), KEY_SETTINGS).unwrap().unwrap();
        assert_eq!(blob["theme"], "light");
        assert_eq!(blob["precision"], "high");
        assert_eq!(blob["probeUrl"], "https://www.baidu.com");
        assert!(blob.get("pingUrl").is_none());
        assert!(blob.get("checkInterval").is_none());

        // Still readable with no duplicate-field conflict
        let reread = Settings::default().merged(&store.get_settings_patch().unwrap().unwrap());
        assert_eq!(reread, settings);
    }

    #[test]
    fn test_settings_and_ip_round_trip() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        let settings = Settings {
            poll_interval_millis: 30_000,
            ..Default::default()
        };
        store.put_settings(&settings).unwrap();
        let patch = store.get_settings_patch().unwrap().unwrap();
        assert_eq!(Settings::default().merged(&patch), settings);

        store.set_cached_ip("203.0.113.7").unwrap();
        assert_eq!(store.get_cached_ip().unwrap().as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_reopen_keeps_data() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let store = Store::new(tmp.path()).unwrap();
            store.set_cached_ip("198.51.100.1").unwrap();
        }
        let store = Store::new(tmp.path()).unwrap();
        assert_eq!(store.get_cached_ip().unwrap().as_deref(), Some("198.51.100.1"));
    }
}
