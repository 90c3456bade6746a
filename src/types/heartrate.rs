//! types/heartrate.rs
//!
//! Payload pushed by the wearable. A batch carries any number of named
//! measurements; only heart-rate entries with a usable `bpm` are consumed.
//!
//! Entries are decoded leniently: an entry of the wrong shape becomes an
//! unnamed entry instead of failing the whole batch.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of a wearable push.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HeartRateBatch {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub payload: Vec<MeasurementEntry>,
}

/// A non-array `payload` reads as empty.
fn lenient_entries<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<MeasurementEntry>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items.into_iter().map(MeasurementEntry::from).collect(),
        _ => Vec::new(),
    })
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct MeasurementEntry {
    pub name: Option<String>,
    pub values: MeasurementValues,
}

impl From<Value> for MeasurementEntry {
    fn from(entry: Value) -> Self {
        let name = entry.get("name").and_then(Value::as_str).map(str::to_string);
        let bpm = entry
            .get("values")
            .and_then(|values| values.get("bpm"))
            .cloned();
        Self {
            name,
            values: MeasurementValues { bpm },
        }
    }
}

impl<'de> Deserialize<'de> for MeasurementEntry {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Value::deserialize(d).map(MeasurementEntry::from)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MeasurementValues {
    /// Left untyped: devices send numbers, numeric strings, or nothing.
    #[serde(default)]
    pub bpm: Option<Value>,
}

impl MeasurementEntry {
    pub fn heart_rate(bpm: impl Into<Value>) -> Self {
        Self {
            name: Some("heart rate".to_string()),
            values: MeasurementValues {
                bpm: Some(bpm.into()),
            },
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    /// The `bpm` value as a finite, non-negative number.
    pub fn bpm(&self) -> Option<f64> {
        let bpm = match self.values.bpm.as_ref()? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (bpm.is_finite() && bpm >= 0.0).then_some(bpm)
    }
}
