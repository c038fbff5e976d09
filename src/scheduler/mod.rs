//! Scheduler module for running monitor cycles on a timer.

use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::monitor::Monitor;

/// Cycles allowed in flight at once; further ticks are skipped.
pub const MAX_OVERLAPPING_CYCLES: usize = 5;

/// Drives [`Monitor::run_cycle`] at the configured poll interval.
pub struct Scheduler {
    monitor: Arc<Monitor>,
    stop_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        let (stop_tx, _) = broadcast::channel(1);
        Self { monitor, stop_tx }
    }

    /// Start the probe loop.
    ///
    /// The interval is re-armed on every settings swap, and each re-arm
    /// fires a cycle immediately.
    pub fn start(&self) -> JoinHandle<()> {
        tracing::info!("Starting scheduler");
        tokio::spawn(run_loop(self.monitor.clone(), self.stop_tx.subscribe()))
    }

    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

async fn run_loop(monitor: Arc<Monitor>, mut stop_rx: broadcast::Receiver<()>) {
    let mut settings_rx = monitor.subscribe_settings();
    let semaphore = Arc::new(Semaphore::new(MAX_OVERLAPPING_CYCLES));

    let mut period = settings_rx.borrow_and_update().poll_interval();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                tracing::info!("Scheduler stopped");
                break;
            }
            changed = settings_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                period = settings_rx.borrow_and_update().poll_interval();
                tracing::info!("Scheduler: re-armed with period {:?}", period);

                // First tick of a fresh interval completes immediately
                interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            }
            _ = interval.tick() => {
                let permit = match semaphore.clone().try_acquire_owned() {
                    Ok(p) => p,
                    Err(_) => {
                        tracing::warn!("Skipping cycle, {} already in flight", MAX_OVERLAPPING_CYCLES);
                        continue;
                    }
                };

                let monitor = monitor.clone();
                tokio::spawn(async move {
                    let _permit = permit;

                    match monitor.run_cycle().await {
                        Ok(report) => tracing::debug!(
                            "Cycle done: {} -> {} (changed: {}), latency {:?}, {:?}, sound played: {}, disconnects {}",
                            report.previous,
                            report.state,
                            report.changed(),
                            report.latency_millis,
                            report.rendered,
                            report.sound_played,
                            report.stats.disconnects
                        ),
                        Err(e) => tracing::error!("Cycle failed: {}", e),
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::db::Store;
    use crate::notify::testing::RecordingHost;
    use crate::notify::{Coordinator, SharedIndicator};
    use crate::probe::StaticLink;
    use crate::settings::SettingsPatch;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn monitor(db: &NamedTempFile) -> (Arc<Monitor>, Arc<RecordingHost>) {
        let store = Arc::new(Store::new(db.path()).unwrap());
        let host = Arc::new(RecordingHost::new(None));
        host.alive.store(true, Ordering::SeqCst);
        let coordinator = Arc::new(Coordinator::new(host.clone(), Arc::new(SharedIndicator::default())));
        let config = ServerConfig {
            ip_lookup_url: String::new(),
            ..Default::default()
        };
        let monitor = Monitor::new(store, &config, Arc::new(StaticLink::new(false)), coordinator).unwrap();
        (Arc::new(monitor), host)
    }

    #[tokio::test]
    async fn test_first_cycle_is_immediate() {
        let db = NamedTempFile::new().unwrap();
        let (monitor, host) = monitor(&db);

        let scheduler = Scheduler::new(monitor);
        let handle = scheduler.start();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(host.sends.load(Ordering::SeqCst), 1);

        scheduler.stop();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_settings_swap_fires_cycle() {
        let db = NamedTempFile::new().unwrap();
        let (monitor, host) = monitor(&db);

        let scheduler = Scheduler::new(monitor.clone());
        let handle = scheduler.start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(host.sends.load(Ordering::SeqCst), 1);

        monitor
            .update_settings(&SettingsPatch {
                poll_interval_millis: Some(60_000),
                ..Default::default()
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(host.sends.load(Ordering::SeqCst), 2);

        scheduler.stop();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
