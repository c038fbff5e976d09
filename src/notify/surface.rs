//! Built-in rendering surface running as a tokio task.
//!
//! The task receives JSON requests, answers RENDER_ICON with a raster and
//! PLAY_SOUND with an acknowledgment, and announces SURFACE_READY on the
//! event channel once it is running.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use super::{render, sound, SurfaceError, SurfaceHost, SurfaceMessage};
use crate::settings::{IconTheme, SoundProfile};

type Envelope = (Value, oneshot::Sender<Value>);

struct SurfaceHandle {
    tx: mpsc::Sender<Envelope>,
    task: JoinHandle<()>,
}

pub struct TaskSurfaceHost {
    handle: Mutex<Option<SurfaceHandle>>,
    events: mpsc::UnboundedSender<SurfaceMessage>,
}

impl TaskSurfaceHost {
    pub fn new(events: mpsc::UnboundedSender<SurfaceMessage>) -> Self {
        Self {
            handle: Mutex::new(None),
            events,
        }
    }
}

#[async_trait]
impl SurfaceHost for TaskSurfaceHost {
    async fn has_surface(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.task.is_finished())
    }

    async fn create_surface(&self) -> Result<(), SurfaceError> {
        let mut handle = self.handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.task.is_finished()) {
            return Err(SurfaceError::AlreadyExists);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SurfaceError::Create(e.to_string()))?;

        let (tx, rx) = mpsc::channel(16);
        let task = runtime.spawn(run_surface(rx, self.events.clone()));
        *handle = Some(SurfaceHandle { tx, task });

        tracing::info!("Surface created");
        Ok(())
    }

    async fn close_surface(&self) -> Result<(), SurfaceError> {
        match self.handle.lock().await.take() {
            Some(h) => {
                h.task.abort();
                tracing::info!("Surface closed");
                Ok(())
            }
            None => Err(SurfaceError::NotConnected),
        }
    }

    async fn send(&self, message: Value) -> Result<Value, SurfaceError> {
        let tx = self
            .handle
            .lock()
            .await
            .as_ref()
            .map(|h| h.tx.clone())
            .ok_or(SurfaceError::NotConnected)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send((message, reply_tx))
            .await
            .map_err(|_| SurfaceError::Delivery("surface is gone".to_string()))?;

        reply_rx
            .await
            .map_err(|_| SurfaceError::Delivery("surface dropped the request".to_string()))
    }
}

async fn run_surface(mut rx: mpsc::Receiver<Envelope>, events: mpsc::UnboundedSender<SurfaceMessage>) {
    let _ = events.send(SurfaceMessage::SurfaceReady);

    while let Some((message, reply)) = rx.recv().await {
        if let Some(response) = handle_message(message) {
            let _ = reply.send(response);
        }
    }
}

fn handle_message(message: Value) -> Option<Value> {
    let msg: SurfaceMessage = match serde_json::from_value(message) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("Surface: unreadable message: {}", e);
            return None;
        }
    };

    match msg {
        SurfaceMessage::RenderIcon { theme, status } => {
            let image = render::render_icon(IconTheme::parse_lenient(&theme), status);
            Some(json!({ "imageData": image.to_wire() }))
        }
        SurfaceMessage::PlaySound { sound, profile, volume } => {
            let profile = SoundProfile::parse_lenient(&profile);
            let plan = sound::plan(profile, sound, volume);
            tracing::info!("Surface: playing {} sound ({}): {}", sound, profile.as_str(), plan);
            Some(json!(true))
        }
        SurfaceMessage::SurfaceReady => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ConnectivityState;
    use crate::notify::ImageBuffer;

    #[tokio::test]
    async fn test_lifecycle() {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let host = TaskSurfaceHost::new(events_tx);

        assert!(!host.has_surface().await);
        assert!(matches!(host.send(json!({})).await, Err(SurfaceError::NotConnected)));

        host.create_surface().await.unwrap();
        assert!(host.has_surface().await);
        assert_eq!(events_rx.recv().await, Some(SurfaceMessage::SurfaceReady));
        assert!(matches!(host.create_surface().await, Err(SurfaceError::AlreadyExists)));

        host.close_surface().await.unwrap();
        assert!(!host.has_surface().await);
        host.create_surface().await.unwrap();
    }

    #[test]
    fn test_create_without_runtime_fails() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let host = TaskSurfaceHost::new(events_tx);

        let mut create = tokio_test::task::spawn(host.create_surface());
        let result = tokio_test::assert_ready!(create.poll());
        assert!(matches!(result, Err(SurfaceError::Create(_))));
        drop(create);

        assert!(!tokio_test::block_on(host.has_surface()));
    }

    #[tokio::test]
    async fn test_render_reply_reconstructs() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let host = TaskSurfaceHost::new(events_tx);
        host.create_surface().await.unwrap();

        let request = serde_json::to_value(SurfaceMessage::RenderIcon {
            theme: "unknown-theme".to_string(),
            status: ConnectivityState::Online,
        })
        .unwrap();
        let reply = host.send(request).await.unwrap();

        let image = ImageBuffer::from_reply(&reply).unwrap();
        assert_eq!((image.width, image.height), (render::ICON_SIZE, render::ICON_SIZE));
    }

    #[tokio::test]
    async fn test_sound_is_acknowledged() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let host = TaskSurfaceHost::new(events_tx);
        host.create_surface().await.unwrap();

        let request = serde_json::to_value(SurfaceMessage::PlaySound {
            sound: ConnectivityState::LanNoInternet,
            profile: "8bit".to_string(),
            volume: 0.3,
        })
        .unwrap();
        assert_eq!(host.send(request).await.unwrap(), json!(true));
    }

    #[tokio::test]
    async fn test_unreadable_message_fails_delivery() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let host = TaskSurfaceHost::new(events_tx);
        host.create_surface().await.unwrap();

        let result = host.send(json!({"type": "SELF_DESTRUCT"})).await;
        assert!(matches!(result, Err(SurfaceError::Delivery(_))));
    }
}
