// JawSense - heart-rate and EMG fusion hub

pub mod clock;
pub mod combiner;
pub mod config;
pub mod error;
pub mod hub;
pub mod ingest;
pub mod policy;
pub mod poller;
pub mod queue;
pub mod registry;
pub mod server;
pub mod session;
pub mod source;
pub mod store;
pub mod types;

pub use clock::SessionClock;
pub use combiner::Combiner;
pub use config::HubConfig;
pub use error::HubError;
pub use hub::{Hub, HubTasks};
pub use ingest::HeartRateIngest;
pub use poller::{EmgPoller, PollOutcome, PollerState, RowCursor};
pub use policy::{BackoffPolicy, RetryPolicy};
pub use queue::{DropOldest, QueueClosed, SubscriberQueue};
pub use registry::{BroadcastReport, SubscriberHandle, SubscriberRegistry};
pub use session::{SessionState, StreamSession};
pub use store::ReadingStore;
pub use types::{CombinedEvent, Frame, HeartRateBatch, LatestValues, Reading, Signal};
