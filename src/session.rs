//! session.rs
//!
//! Per-connection stream session. Drains its subscriber queue to the
//! transport and fills idle time with keepalive frames.
//!
//! # States
//!
//! ```text
//! Active ──(frame queued)──► Draining ──(queue empty)──► Active
//!    │                           │
//!    └────────(close / drop / queue closed)────────► Closed
//! ```
//!
//! The session unregisters itself when closed. `Drop` closes it, so a
//! transport that simply drops the stream still releases the subscriber.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, Stream};
use tokio::time::sleep;

use crate::registry::{SubscriberHandle, SubscriberRegistry};
use crate::types::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for frames, sending keepalives.
    Active,
    /// Emitting queued frames back to back.
    Draining,
    Closed,
}

pub struct StreamSession {
    handle: SubscriberHandle,
    registry: Arc<SubscriberRegistry>,
    keepalive: Duration,
    state: SessionState,
    idle_wait: bool,
}

impl StreamSession {
    /// Register a new subscriber and open a session on it.
    pub fn open(registry: Arc<SubscriberRegistry>, keepalive: Duration) -> Self {
        let handle = registry.register();
        log::info!("Stream session {} opened ({} live)", handle.id, registry.len());
        Self {
            handle,
            registry,
            keepalive,
            state: SessionState::Active,
            idle_wait: false,
        }
    }

    pub fn id(&self) -> uuid::Uuid {
        self.handle.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Next frame to send, or `None` once the session is closed.
    ///
    /// A queued frame is returned immediately. With nothing queued a
    /// keepalive is returned, and the following call waits one keepalive
    /// interval before looking at the queue again.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        if self.state == SessionState::Closed {
            return None;
        }
        if self.idle_wait {
            self.idle_wait = false;
            sleep(self.keepalive).await;
        }
        if self.handle.queue.is_closed() {
            self.close();
            return None;
        }
        match self.handle.queue.pop() {
            Some(frame) => {
                self.state = SessionState::Draining;
                Some(frame)
            }
            None => {
                self.state = SessionState::Active;
                self.idle_wait = true;
                Some(Frame::Keepalive)
            }
        }
    }

    /// Unregister and stop. Safe to call more than once.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        self.registry.unregister(self.handle.id);
        log::info!(
            "Stream session {} closed ({} live)",
            self.handle.id,
            self.registry.len()
        );
    }

    /// Adapt into a stream of frames. Dropping the stream closes the session.
    pub fn into_stream(self) -> impl Stream<Item = Frame> + Send + 'static {
        stream::unfold(self, |mut session| async move {
            session.next_frame().await.map(|frame| (frame, session))
        })
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn event(n: u32) -> Frame {
        Frame::Event(format!("data: {}\n\n", n))
    }

    fn open() -> (Arc<SubscriberRegistry>, StreamSession) {
        let registry = Arc::new(SubscriberRegistry::new(8));
        let session = StreamSession::open(Arc::clone(&registry), Duration::from_millis(200));
        (registry, session)
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_frames_are_drained_before_keepalive() {
        let (registry, mut session) = open();
        registry.broadcast(&event(1));
        registry.broadcast(&event(2));

        assert_eq!(session.next_frame().await, Some(event(1)));
        assert_eq!(session.state(), SessionState::Draining);
        assert_eq!(session.next_frame().await, Some(event(2)));
        assert_eq!(session.next_frame().await, Some(Frame::Keepalive));
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_waits_between_keepalives() {
        let (registry, mut session) = open();
        let start = tokio::time::Instant::now();

        assert_eq!(session.next_frame().await, Some(Frame::Keepalive));
        assert_eq!(start.elapsed(), Duration::ZERO);

        registry.broadcast(&event(7));
        assert_eq!(session.next_frame().await, Some(event(7)));
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_close_unregisters_once() {
        let (registry, mut session) = open();
        assert_eq!(registry.len(), 1);

        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(registry.is_empty());
        assert_eq!(session.next_frame().await, None);
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let (registry, session) = open();
        let id = session.id();
        assert!(registry.contains(id));

        drop(session);
        assert!(!registry.contains(id));
    }

    #[tokio::test]
    async fn test_session_ends_when_registry_drops_it() {
        let (registry, mut session) = open();
        registry.unregister(session.id());

        assert_eq!(session.next_frame().await, None);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_the_stream_releases_the_subscriber() {
        let (registry, session) = open();
        registry.broadcast(&event(1));

        let mut frames = Box::pin(session.into_stream());
        assert_eq!(frames.next().await, Some(event(1)));
        assert_eq!(frames.next().await, Some(Frame::Keepalive));
        assert_eq!(registry.len(), 1);

        drop(frames);
        assert!(registry.is_empty());
    }
}
