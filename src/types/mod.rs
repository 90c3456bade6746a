pub mod event;
pub mod heartrate;
pub mod reading;

pub use event::{CombinedEvent, Frame, KEEPALIVE_FRAME};
pub use heartrate::{HeartRateBatch, MeasurementEntry, MeasurementValues};
pub use reading::{LatestValues, Reading, Signal};
