//! Notification module: icon and sound delivery through a rendering surface.
//!
//! The [`Coordinator`] owns the relationship with a single surface provided
//! by a [`SurfaceHost`]. Messages cross the host boundary as JSON values so
//! that any out-of-process surface can speak the same protocol.

mod coordinator;
mod indicator;
mod protocol;
mod render;
mod sound;
mod surface;

pub use coordinator::*;
pub use indicator::*;
pub use protocol::*;
pub use surface::*;

use async_trait::async_trait;
use thiserror::Error;

/// Surface error types.
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("a surface already exists")]
    AlreadyExists,
    #[error("failed to create surface: {0}")]
    Create(String),
    #[error("no surface is running")]
    NotConnected,
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("malformed reply: {0}")]
    MalformedReply(String),
}

/// Runtime that can host at most one rendering surface.
#[async_trait]
pub trait SurfaceHost: Send + Sync {
    /// Whether a surface is currently alive.
    async fn has_surface(&self) -> bool;

    /// Create the surface. Fails with [`SurfaceError::AlreadyExists`] if one is alive.
    async fn create_surface(&self) -> Result<(), SurfaceError>;

    /// Tear the surface down so the next creation starts fresh.
    async fn close_surface(&self) -> Result<(), SurfaceError>;

    /// Deliver a message and wait for the surface's reply.
    async fn send(&self, message: serde_json::Value) -> Result<serde_json::Value, SurfaceError>;
}

#[cfg(test)]
pub mod testing {
    //! Scripted surface host for coordinator and monitor tests.

    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    pub struct RecordingHost {
        pub alive: AtomicBool,
        pub creates: AtomicUsize,
        pub closes: AtomicUsize,
        pub sends: AtomicUsize,
        /// Number of upcoming sends that fail before deliveries succeed
        pub failing_sends: AtomicUsize,
        pub create_error: Mutex<Option<fn() -> SurfaceError>>,
        pub create_delay: Duration,
        pub announce_ready: bool,
        pub messages: Mutex<Vec<serde_json::Value>>,
        pub reply: Mutex<serde_json::Value>,
        pub events: Option<mpsc::UnboundedSender<SurfaceMessage>>,
    }

    impl RecordingHost {
        pub fn new(events: Option<mpsc::UnboundedSender<SurfaceMessage>>) -> Self {
            Self {
                alive: AtomicBool::new(false),
                creates: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                sends: AtomicUsize::new(0),
                failing_sends: AtomicUsize::new(0),
                create_error: Mutex::new(None),
                create_delay: Duration::ZERO,
                announce_ready: true,
                messages: Mutex::new(Vec::new()),
                reply: Mutex::new(serde_json::json!({
                    "imageData": { "width": 1, "height": 1, "data": [1, 2, 3, 4] }
                })),
                events,
            }
        }

        pub fn sent_types(&self) -> Vec<String> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .filter_map(|m| m["type"].as_str().map(str::to_string))
                .collect()
        }
    }

    #[async_trait]
    impl SurfaceHost for RecordingHost {
        async fn has_surface(&self) -> bool {
            self.alive.load(Ordering::SeqCst)
        }

        async fn create_surface(&self) -> Result<(), SurfaceError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if !self.create_delay.is_zero() {
                tokio::time::sleep(self.create_delay).await;
            }
            let error = *self.create_error.lock().unwrap();
            if let Some(make_error) = error {
                return Err(make_error());
            }
            self.alive.store(true, Ordering::SeqCst);
            if self.announce_ready {
                if let Some(events) = &self.events {
                    let _ = events.send(SurfaceMessage::SurfaceReady);
                }
            }
            Ok(())
        }

        async fn close_surface(&self) -> Result<(), SurfaceError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.alive.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn send(&self, message: serde_json::Value) -> Result<serde_json::Value, SurfaceError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            let failing = self.failing_sends.load(Ordering::SeqCst);
            if failing > 0 {
                self.failing_sends.store(failing - 1, Ordering::SeqCst);
                return Err(SurfaceError::Delivery("receiving end does not exist".to_string()));
            }
            self.messages.lock().unwrap().push(message);
            Ok(self.reply.lock().unwrap().clone())
        }
    }
}
