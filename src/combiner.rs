//! combiner.rs
//!
//! Fixed-rate combiner. Each tick reads both signals, stamps the result with
//! the session clock and fans the serialized frame out to every subscriber.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::clock::SessionClock;
use crate::registry::{BroadcastReport, SubscriberRegistry};
use crate::store::ReadingStore;
use crate::types::{CombinedEvent, Signal};

pub struct Combiner {
    store: Arc<ReadingStore>,
    clock: Arc<SessionClock>,
    registry: Arc<SubscriberRegistry>,
    period: Duration,
}

impl Combiner {
    pub fn new(
        store: Arc<ReadingStore>,
        clock: Arc<SessionClock>,
        registry: Arc<SubscriberRegistry>,
        period: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            registry,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Build the event for this instant. The two signals are read under
    /// separate locks.
    pub fn snapshot(&self) -> CombinedEvent {
        let t = self.clock.now_offset_ms();
        let bpm = self.store.get(Signal::HeartRate);
        let emg = self.store.get(Signal::Emg);
        CombinedEvent::new(bpm, emg, t)
    }

    /// One iteration: build, serialize and broadcast.
    pub fn tick(&self) -> (CombinedEvent, BroadcastReport) {
        let event = self.snapshot();
        let report = match event.to_frame() {
            Ok(frame) => self.registry.broadcast(&frame),
            Err(e) => {
                log::warn!("Failed to serialize combined event {:?}: {}", event, e);
                BroadcastReport::default()
            }
        };
        if report.removed > 0 {
            log::info!("Removed {} dead subscriber(s)", report.removed);
        }
        (event, report)
    }

    /// Tick forever. Sleep-based, so the cadence drifts under load; every
    /// event carries its own timestamp.
    pub async fn run(self) {
        log::info!(
            "Combiner streaming at {:.1} Hz",
            1.0 / self.period.as_secs_f64()
        );
        loop {
            self.tick();
            sleep(self.period).await;
        }
    }
}
