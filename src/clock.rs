//! clock.rs
//!
//! Session clock. Event timestamps are offsets from the last reset.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::time::Instant;

#[derive(Clone, Copy, Debug)]
struct SessionStart {
    instant: Instant,
    wall: DateTime<Utc>,
}

impl SessionStart {
    fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }
}

pub struct SessionClock {
    start: RwLock<SessionStart>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: RwLock::new(SessionStart::now()),
        }
    }

    fn current(&self) -> SessionStart {
        *self.start.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Milliseconds elapsed since the current session start.
    pub fn now_offset_ms(&self) -> u64 {
        let elapsed = self.current().instant.elapsed();
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Wall-clock time of the current session start.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.current().wall
    }

    /// Start a new session. Returns the new start time.
    pub fn reset(&self) -> DateTime<Utc> {
        let next = SessionStart::now();
        *self.start.write().unwrap_or_else(PoisonError::into_inner) = next;
        log::info!("Session reset at {}", next.wall.to_rfc3339());
        next.wall
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_offset_tracks_elapsed_time() {
        let clock = SessionClock::new();
        assert_eq!(clock.now_offset_ms(), 0);

        tokio::time::advance(Duration::from_millis(1_250)).await;
        assert_eq!(clock.now_offset_ms(), 1_250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restarts_from_zero() {
        let clock = SessionClock::new();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(clock.now_offset_ms(), 3_000);

        let before = clock.started_at();
        let reset_at = clock.reset();
        assert!(reset_at >= before);
        assert_eq!(clock.started_at(), reset_at);
        assert_eq!(clock.now_offset_ms(), 0);

        tokio::time::advance(Duration::from_millis(40)).await;
        assert_eq!(clock.now_offset_ms(), 40);
    }
}
