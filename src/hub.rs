//! hub.rs
//!
//! The hub owns the long-lived shared state (readings, session clock,
//! subscriber registry) and hands references to every task it starts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::clock::SessionClock;
use crate::combiner::Combiner;
use crate::config::HubConfig;
use crate::error::HubError;
use crate::ingest::HeartRateIngest;
use crate::poller::EmgPoller;
use crate::registry::SubscriberRegistry;
use crate::session::StreamSession;
use crate::source::SourceConnector;
use crate::store::ReadingStore;
use crate::types::{HeartRateBatch, LatestValues};

/// Handles of the background tasks started by [`Hub::start`].
pub struct HubTasks {
    pub poller: JoinHandle<Result<(), HubError>>,
    pub combiner: JoinHandle<()>,
}

impl HubTasks {
    pub fn abort(&self) {
        self.poller.abort();
        self.combiner.abort();
    }
}

pub struct Hub {
    config: HubConfig,
    store: Arc<ReadingStore>,
    clock: Arc<SessionClock>,
    registry: Arc<SubscriberRegistry>,
    ingest: HeartRateIngest,
}

impl Hub {
    pub fn new(config: HubConfig) -> Result<Self, HubError> {
        config.validate()?;
        let store = Arc::new(ReadingStore::new());
        let ingest = HeartRateIngest::new(Arc::clone(&store), config.heart_rate_name.clone());
        Ok(Self {
            store,
            clock: Arc::new(SessionClock::new()),
            registry: Arc::new(SubscriberRegistry::new(config.queue_capacity)),
            ingest,
            config,
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ReadingStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<SessionClock> {
        &self.clock
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn combiner(&self) -> Combiner {
        Combiner::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            Arc::clone(&self.registry),
            self.config.stream_period(),
        )
    }

    pub fn poller<C: SourceConnector>(&self, connector: C) -> EmgPoller<C> {
        EmgPoller::new(
            connector,
            Arc::clone(&self.store),
            self.config.emg_column,
            self.config.poll_interval(),
            self.config.retry_policy(),
        )
    }

    /// Spawn the EMG poller and the combiner on the current runtime.
    pub fn start<C>(&self, connector: C) -> HubTasks
    where
        C: SourceConnector + 'static,
    {
        let poller = self.poller(connector);
        let poller = tokio::spawn(async move {
            let result = poller.run().await;
            if let Err(e) = &result {
                log::error!("[Sheets] EMG poller stopped: {}", e);
            }
            result
        });
        let combiner = tokio::spawn(self.combiner().run());
        HubTasks { poller, combiner }
    }

    /// Heart-rate push boundary.
    pub fn ingest(&self, batch: &HeartRateBatch) -> usize {
        self.ingest.ingest(batch)
    }

    /// Latest-value query boundary.
    pub fn latest(&self) -> LatestValues {
        self.store.latest()
    }

    /// Reset trigger boundary.
    pub fn reset(&self) -> DateTime<Utc> {
        self.clock.reset()
    }

    /// Open a stream session for a new client.
    pub fn open_stream(&self) -> StreamSession {
        StreamSession::open(Arc::clone(&self.registry), self.config.keepalive_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MeasurementEntry;

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = HubConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(Hub::new(config), Err(HubError::ConfigError(_))));
    }

    #[test]
    fn test_latest_reflects_ingest() {
        let hub = Hub::new(HubConfig::default()).unwrap();
        hub.ingest(&HeartRateBatch {
            payload: vec![MeasurementEntry::heart_rate(63.27)],
        });
        assert_eq!(hub.latest(), LatestValues { bpm: 63.3, emg: 0.0 });
    }

    #[tokio::test]
    async fn test_open_stream_registers_until_dropped() {
        let hub = Hub::new(HubConfig {
            queue_capacity: 3,
            ..Default::default()
        })
        .unwrap();
        let session = hub.open_stream();
        assert_eq!(hub.registry().len(), 1);
        drop(session);
        assert!(hub.registry().is_empty());
    }
}
