//! Connectivity monitor: one probe/classify/persist/notify cycle at a time.

mod classify;
mod stats;

pub use classify::*;
pub use stats::*;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::db::{ConnectivityState, DbError, LogEntry, StatsRecord, StatusRecord, Store};
use crate::notify::{Coordinator, Rendered};
use crate::probe::{self, LinkSignal, ProbeError, SpeedTestResult};
use crate::settings::{Settings, SettingsPatch};

/// Monitor error types.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),
}

/// Messages accepted from the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SettingsUpdated,
    ResetStats,
}

/// What a single cycle observed and did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub previous: ConnectivityState,
    pub state: ConnectivityState,
    pub latency_millis: Option<f64>,
    pub rendered: Rendered,
    pub sound_played: bool,
    pub stats: StatsRecord,
}

impl CycleReport {
    pub fn changed(&self) -> bool {
        self.previous != self.state
    }
}

/// Everything the dashboard shows, read in one go.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub current_status: Option<StatusRecord>,
    pub settings: Settings,
    #[serde(rename = "cachedIP")]
    pub cached_ip: Option<String>,
    pub stats: Option<StatsRecord>,
    pub availability_percent: f64,
    /// Time since the link came back, while online
    pub online_for_millis: Option<i64>,
    /// Time since the last drop, while not online
    pub offline_for_millis: Option<i64>,
}

pub struct Monitor {
    store: Arc<Store>,
    client: reqwest::Client,
    link: Arc<dyn LinkSignal>,
    coordinator: Arc<Coordinator>,
    settings: watch::Sender<Settings>,
    /// State classified by the most recent cycle
    current: Mutex<ConnectivityState>,
    ip_lookup_url: String,
    speed_test_url: String,
}

impl Monitor {
    /// Build a monitor, restoring settings and the last known state from `store`.
    pub fn new(
        store: Arc<Store>,
        config: &ServerConfig,
        link: Arc<dyn LinkSignal>,
        coordinator: Arc<Coordinator>,
    ) -> Result<Self, MonitorError> {
        let client = probe::build_client(config.probe_timeout)?;

        let settings = match store.get_settings_patch()? {
            Some(patch) => Settings::default().merged(&patch),
            None => Settings::default(),
        };
        let current = store.get_status()?.map(|s| s.status).unwrap_or_default();

        tracing::info!(
            "Monitor: probing {} every {:?}, last state {}",
            settings.probe_url,
            settings.poll_interval(),
            current
        );

        let (settings, _) = watch::channel(settings);

        Ok(Self {
            store,
            client,
            link,
            coordinator,
            settings,
            current: Mutex::new(current),
            ip_lookup_url: config.ip_lookup_url.clone(),
            speed_test_url: config.speed_test_url.clone(),
        })
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    /// Receiver notified on every settings swap.
    pub fn subscribe_settings(&self) -> watch::Receiver<Settings> {
        self.settings.subscribe()
    }

    pub fn current_state(&self) -> ConnectivityState {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn swap_state(&self, next: ConnectivityState) -> ConnectivityState {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *current, next)
    }

    /// Run one probe cycle.
    ///
    /// Notifications go out even when persisting fails, so the indicator
    /// reflects what was observed; the storage error is returned afterwards.
    pub async fn run_cycle(&self) -> Result<CycleReport, MonitorError> {
        let settings = self.settings();

        let link_up = self.link.link_up();
        let result = probe::probe(&self.client, &settings.probe_url, link_up).await;
        let state = classify(link_up, &result);
        let now = Utc::now().timestamp_millis();

        let previous = self.swap_state(state);
        let changed = previous != state;

        let status = StatusRecord {
            status: state,
            latency_millis: result.latency_millis.unwrap_or(0.0),
            last_checked: now,
        };
        let transition = changed.then(|| LogEntry::status_change(now, previous, state));

        let persisted = self.store.record_cycle(&status, transition.as_ref(), |stored| {
            let stats = stored.unwrap_or_else(|| StatsRecord::new(now, state));
            apply_transition(&stats, previous, state, now)
        });

        if changed {
            tracing::info!("Status changed: {} -> {}", previous, state);
        } else {
            tracing::debug!("Status unchanged: {}", state);
        }

        let rendered = self.coordinator.render_icon(settings.icon_theme, state).await;

        let sound_played = if changed && settings.sound_enabled {
            self.coordinator
                .play_sound(state, settings.sound_profile, settings.volume)
                .await
        } else {
            false
        };

        if state.is_online() {
            self.spawn_ip_lookup();
        }

        Ok(CycleReport {
            previous,
            state,
            latency_millis: result.latency_millis,
            rendered,
            sound_played,
            stats: persisted?,
        })
    }

    fn spawn_ip_lookup(&self) {
        if self.ip_lookup_url.is_empty() {
            return;
        }

        let client = self.client.clone();
        let store = self.store.clone();
        let url = self.ip_lookup_url.clone();

        tokio::spawn(async move {
            match probe::fetch_public_ip(&client, &url).await {
                Ok(ip) => {
                    if let Err(e) = store.set_cached_ip(&ip) {
                        tracing::warn!("Failed to cache public IP: {}", e);
                    }
                }
                Err(e) => tracing::debug!("Public IP lookup failed: {}", e),
            }
        });
    }

    /// Measure download throughput on demand. Not part of the cycle.
    pub async fn speed_test(&self) -> Result<SpeedTestResult, MonitorError> {
        let result = probe::run_speed_test(&self.client, &self.speed_test_url).await?;
        tracing::info!(
            "Speed test: {:.2} Mbps ({} bytes in {:.0}ms)",
            result.mbps,
            result.bytes,
            result.duration_millis
        );
        Ok(result)
    }

    pub fn handle_control(&self, msg: ControlMessage) -> Result<(), MonitorError> {
        match msg {
            ControlMessage::SettingsUpdated => {
                self.reload_settings()?;
            }
            ControlMessage::ResetStats => {
                let now = Utc::now().timestamp_millis();
                self.store.reset_stats(now, self.current_state())?;
                tracing::info!("Statistics reset");
            }
        }
        Ok(())
    }

    /// Merge the stored settings onto the current snapshot and swap it in.
    ///
    /// Subscribers are notified even when nothing changed.
    pub fn reload_settings(&self) -> Result<Settings, MonitorError> {
        let next = match self.store.get_settings_patch()? {
            Some(patch) => self.settings.borrow().merged(&patch),
            None => self.settings(),
        };

        tracing::info!("Settings reloaded: probing {} every {:?}", next.probe_url, next.poll_interval());
        self.settings.send_replace(next.clone());
        Ok(next)
    }

    /// Apply `patch`, persist the result and swap it in.
    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, MonitorError> {
        let next = self.settings.borrow().merged(patch);
        self.store.put_settings(&next)?;
        self.reload_settings()
    }

    pub fn snapshot(&self) -> Result<DashboardSnapshot, MonitorError> {
        let current_status = self.store.get_status()?;
        let stats = self.store.get_stats()?;
        let cached_ip = self.store.get_cached_ip()?;
        let now = Utc::now().timestamp_millis();

        let online = current_status.as_ref().is_some_and(|s| s.status.is_online());
        let since = |start: Option<i64>| start.map(|t| (now - t).max(0));
        let (online_for_millis, offline_for_millis) = match &stats {
            Some(s) if online => (since(s.last_online_start), None),
            Some(s) => (None, since(s.last_offline_start)),
            None => (None, None),
        };

        Ok(DashboardSnapshot {
            availability_percent: stats.as_ref().map_or(100.0, StatsRecord::availability_percent),
            current_status,
            settings: self.settings(),
            cached_ip,
            stats,
            online_for_millis,
            offline_for_millis,
        })
    }
}
