//! Player notifications
//!
//! Every notification, whether raised synchronously by a caller operation or
//! asynchronously by the render loop, goes through one unbounded channel with
//! a single consumer. Delivery order is therefore emission order, and the
//! render loop never blocks on whoever reacts to the callbacks.

use log::{debug, info, warn};
use serde::Serialize;
use std::thread;
use tokio::sync::mpsc;

/// Notification emitted by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Both engines prepared
    Prepared { duration_ms: i64 },
    /// Playback reached end of stream
    Completion,
    /// Prepare or decode failure
    Error { code: i32, extra: i32 },
    /// Current position
    Progress { position_ms: i64 },
    /// Playback restarted after a natural completion (seek preview released with resume)
    EndResume,
}

impl PlayerEvent {
    /// Invoke the matching listener callback
    pub fn dispatch(&self, listener: &dyn PlayerListener) {
        match *self {
            PlayerEvent::Prepared { duration_ms } => listener.on_prepared(duration_ms),
            PlayerEvent::Completion => listener.on_completion(),
            PlayerEvent::Error { code, extra } => listener.on_error(code, extra),
            PlayerEvent::Progress { position_ms } => listener.on_progress(position_ms),
            PlayerEvent::EndResume => listener.on_end_resume(),
        }
    }
}

/// Callback sink for player notifications; every method defaults to a no-op.
pub trait PlayerListener: Send {
    fn on_prepared(&self, _duration_ms: i64) {}

    fn on_completion(&self) {}

    fn on_error(&self, _code: i32, _extra: i32) {}

    fn on_progress(&self, _position_ms: i64) {}

    fn on_end_resume(&self) {}
}

/// Producer side of the notification channel, cloned into the render loop.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    tx: mpsc::UnboundedSender<PlayerEvent>,
}

impl EventDispatcher {
    /// Create a dispatcher and the single consumer end of its channel
    pub fn channel() -> (Self, PlayerEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, PlayerEvents { rx })
    }

    /// Queue a notification. Never blocks; a gone consumer just drops it.
    pub fn post(&self, event: PlayerEvent) {
        if self.tx.send(event).is_err() {
            debug!("EventDispatcher: no consumer, dropped {:?}", event);
        }
    }

    pub fn prepared(&self, duration_ms: i64) {
        self.post(PlayerEvent::Prepared { duration_ms });
    }

    pub fn completion(&self) {
        self.post(PlayerEvent::Completion);
    }

    pub fn error(&self, code: i32, extra: i32) {
        self.post(PlayerEvent::Error { code, extra });
    }

    pub fn progress(&self, position_ms: i64) {
        self.post(PlayerEvent::Progress { position_ms });
    }

    pub fn end_resume(&self) {
        self.post(PlayerEvent::EndResume);
    }
}

/// Consumer side of the notification channel
#[derive(Debug)]
pub struct PlayerEvents {
    rx: mpsc::UnboundedReceiver<PlayerEvent>,
}

impl PlayerEvents {
    /// Wait for the next notification from async code
    pub async fn recv(&mut self) -> Option<PlayerEvent> {
        self.rx.recv().await
    }

    /// Wait for the next notification from a plain thread.
    ///
    /// Must not be called from inside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<PlayerEvent> {
        self.rx.blocking_recv()
    }

    /// Take the next notification if one is queued
    pub fn try_recv(&mut self) -> Option<PlayerEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently queued
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Deliver notifications to `listener` on a dedicated thread until the player is dropped.
    pub fn spawn_listener(
        mut self,
        listener: Box<dyn PlayerListener>,
    ) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("player-callbacks".into())
            .spawn(move || {
                info!("EventDispatcher: listener thread started");
                let mut delivered = 0u64;
                while let Some(event) = self.blocking_recv() {
                    event.dispatch(listener.as_ref());
                    delivered += 1;
                }
                info!(
                    "EventDispatcher: listener thread finished ({} events)",
                    delivered
                );
            })
            .inspect_err(|e| warn!("EventDispatcher: failed to spawn listener thread: {}", e))
    }
}
