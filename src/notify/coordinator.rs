//! Notification coordinator.
//!
//! Guarantees a single live surface before dispatching render or sound
//! requests, and degrades to a badge when the surface misbehaves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{Badge, ImageBuffer, Indicator, SurfaceError, SurfaceHost, SurfaceMessage};
use crate::db::ConnectivityState;
use crate::settings::{IconTheme, SoundProfile};

/// How long to wait for SURFACE_READY before proceeding anyway.
pub const READY_TIMEOUT: Duration = Duration::from_secs(1);
/// Total delivery attempts per request.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;
pub const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// What ended up on the indicator after a render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendered {
    Icon,
    Badge,
}

pub struct Coordinator {
    host: Arc<dyn SurfaceHost>,
    indicator: Arc<dyn Indicator>,
    /// Held for the whole duration of a creation attempt
    creating: tokio::sync::Mutex<()>,
    /// Completed creation attempts; lets waiters attach to the attempt they queued behind
    attempts: AtomicU64,
    ready_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl Coordinator {
    pub fn new(host: Arc<dyn SurfaceHost>, indicator: Arc<dyn Indicator>) -> Self {
        Self {
            host,
            indicator,
            creating: tokio::sync::Mutex::new(()),
            attempts: AtomicU64::new(0),
            ready_tx: Mutex::new(None),
        }
    }

    /// Forward messages emitted by the surface (readiness) into the coordinator.
    pub fn spawn_listener(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<SurfaceMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(msg) = events.recv().await {
                self.on_surface_message(msg);
            }
        })
    }

    pub fn on_surface_message(&self, msg: SurfaceMessage) {
        match msg {
            SurfaceMessage::SurfaceReady => {
                if let Some(tx) = self.take_ready_tx() {
                    let _ = tx.send(());
                }
            }
            other => tracing::debug!("Ignoring unexpected surface message: {:?}", other),
        }
    }

    /// Make sure a surface exists, creating it if needed.
    ///
    /// Concurrent callers never race to create: whoever queues behind an
    /// in-flight creation attaches to it and returns once it completes.
    /// "Already exists" is not an error. A surface that never reports ready
    /// is used anyway after [`READY_TIMEOUT`].
    pub async fn ensure_surface(&self) -> Result<(), SurfaceError> {
        if self.host.has_surface().await {
            return Ok(());
        }

        let observed = self.attempts.load(Ordering::SeqCst);
        let _guard = self.creating.lock().await;

        if self.attempts.load(Ordering::SeqCst) != observed {
            return Ok(());
        }
        if self.host.has_surface().await {
            return Ok(());
        }

        let result = self.create_and_wait_ready().await;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn create_and_wait_ready(&self) -> Result<(), SurfaceError> {
        // Installed before creation so an early SURFACE_READY is not lost
        let (tx, rx) = oneshot::channel();
        *self.ready_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);

        match self.host.create_surface().await {
            Ok(()) => {}
            Err(SurfaceError::AlreadyExists) => {
                tracing::debug!("Surface already exists");
                self.take_ready_tx();
                return Ok(());
            }
            Err(e) => {
                tracing::error!("Failed to create surface: {}", e);
                self.take_ready_tx();
                return Err(e);
            }
        }

        if tokio::time::timeout(READY_TIMEOUT, rx).await.is_err() {
            tracing::warn!("Surface not ready after {:?}, proceeding", READY_TIMEOUT);
        }
        self.take_ready_tx();
        Ok(())
    }

    fn take_ready_tx(&self) -> Option<oneshot::Sender<()>> {
        self.ready_tx.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Deliver `message`, retrying with a fixed backoff.
    pub async fn dispatch(&self, message: &SurfaceMessage) -> Result<serde_json::Value, SurfaceError> {
        let payload = serde_json::to_value(message).map_err(|e| SurfaceError::Delivery(e.to_string()))?;

        let mut attempt = 1;
        loop {
            match self.host.send(payload.clone()).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < MAX_DELIVERY_ATTEMPTS => {
                    tracing::debug!("Delivery attempt {} failed: {}", attempt, e);
                    attempt += 1;
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Render the status icon, falling back to a badge on any failure.
    pub async fn render_icon(&self, theme: IconTheme, status: ConnectivityState) -> Rendered {
        if self.ensure_surface().await.is_err() {
            return self.fallback(status);
        }

        let msg = SurfaceMessage::RenderIcon {
            theme: theme.as_str().to_string(),
            status,
        };

        let reply = match self.dispatch(&msg).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Icon render failed: {}", e);
                return self.fallback(status);
            }
        };

        match ImageBuffer::from_reply(&reply) {
            Ok(image) => {
                self.indicator.set_icon(&image);
                Rendered::Icon
            }
            Err(e) => {
                tracing::error!("Icon processing error: {}", e);
                self.fallback(status)
            }
        }
    }

    fn fallback(&self, status: ConnectivityState) -> Rendered {
        self.indicator.set_badge(&Badge::for_state(status));
        Rendered::Badge
    }

    /// Play the transition sound for `sound`. Returns whether it was delivered.
    ///
    /// Exhausting retries tears the surface down so the next request gets a
    /// fresh one; the failure is only logged.
    pub async fn play_sound(&self, sound: ConnectivityState, profile: SoundProfile, volume: f64) -> bool {
        if let Err(e) = self.ensure_surface().await {
            tracing::warn!("Skipping sound, no surface: {}", e);
            return false;
        }

        let msg = SurfaceMessage::PlaySound {
            sound,
            profile: profile.as_str().to_string(),
            volume,
        };

        match self.dispatch(&msg).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Sound playback failed: {}", e);
                if let Err(e) = self.host.close_surface().await {
                    tracing::debug!("Closing surface after failed playback: {}", e);
                }
                false
            }
        }
    }
}
