//! ingest.rs
//!
//! Heart-rate ingest: writes every usable heart-rate sample of a pushed batch
//! into the store. Unusable entries are skipped without failing the batch.

use std::sync::Arc;

use crate::store::ReadingStore;
use crate::types::{HeartRateBatch, Signal};

pub struct HeartRateIngest {
    store: Arc<ReadingStore>,
    name: String,
}

impl HeartRateIngest {
    pub fn new(store: Arc<ReadingStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    /// Apply a batch in order. Returns the number of samples written.
    pub fn ingest(&self, batch: &HeartRateBatch) -> usize {
        let mut accepted = 0;
        for entry in batch.payload.iter().filter(|e| e.is_named(&self.name)) {
            match entry.bpm() {
                Some(bpm) => {
                    self.store.set(Signal::HeartRate, bpm);
                    log::debug!("[HR] {} bpm", bpm);
                    accepted += 1;
                }
                None => log::debug!("[HR] skipping entry without usable bpm: {:?}", entry.values.bpm),
            }
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MeasurementEntry, MeasurementValues};

    fn entry(name: &str, bpm: Option<serde_json::Value>) -> MeasurementEntry {
        MeasurementEntry {
            name: Some(name.to_string()),
            values: MeasurementValues { bpm },
        }
    }

    fn ingest() -> (Arc<ReadingStore>, HeartRateIngest) {
        let store = Arc::new(ReadingStore::new());
        let ingest = HeartRateIngest::new(Arc::clone(&store), "heart rate");
        (store, ingest)
    }

    #[test]
    fn test_ingest_writes_heart_rate() {
        let (store, ingest) = ingest();
        let batch = HeartRateBatch {
            payload: vec![MeasurementEntry::heart_rate(68)],
        };

        assert_eq!(ingest.ingest(&batch), 1);
        assert_eq!(store.get(Signal::HeartRate), 68.0);
        assert_eq!(store.get(Signal::Emg), 0.0);
    }

    #[test]
    fn test_ingest_ignores_other_names_and_bad_values() {
        let (store, ingest) = ingest();
        store.set(Signal::HeartRate, 70.0);

        let batch = HeartRateBatch {
            payload: vec![
                entry("steps", Some(serde_json::json!(120))),
                entry("Heart Rate", Some(serde_json::json!(99))),
                entry("heart rate", None),
                entry("heart rate", Some(serde_json::json!("n/a"))),
                entry("heart rate", Some(serde_json::json!(-1))),
                MeasurementEntry::default(),
            ],
        };

        assert_eq!(ingest.ingest(&batch), 0);
        assert_eq!(store.get(Signal::HeartRate), 70.0);
    }

    #[test]
    fn test_bad_entry_does_not_block_the_rest_of_the_batch() {
        let (store, ingest) = ingest();
        let batch = HeartRateBatch {
            payload: vec![
                MeasurementEntry::heart_rate(66),
                entry("heart rate", Some(serde_json::json!("abc"))),
                MeasurementEntry::heart_rate("81.5"),
            ],
        };

        assert_eq!(ingest.ingest(&batch), 2);
        assert_eq!(store.get(Signal::HeartRate), 81.5);
    }

    #[test]
    fn test_misshapen_sibling_entries_are_skipped() {
        let (store, ingest) = ingest();
        let batch: HeartRateBatch = serde_json::from_str(
            r#"{"payload": [
                {"name": "battery", "values": 87},
                {"name": ["heart rate"], "values": {"bpm": 99}},
                {"name": "heart rate", "values": null},
                {"name": "heart rate", "values": {"bpm": 75}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(ingest.ingest(&batch), 1);
        assert_eq!(store.get(Signal::HeartRate), 75.0);
    }

    #[test]
    fn test_empty_batch_is_acknowledged() {
        let (store, ingest) = ingest();
        assert_eq!(ingest.ingest(&HeartRateBatch::default()), 0);
        assert!(store.reading(Signal::HeartRate).updated_at.is_none());
    }
}
