//! types/reading.rs
//!
//! Signals tracked by the hub and the latest-value snapshot served to
//! polling clients.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An input signal with its own producer and its own store cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    HeartRate,
    Emg,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::HeartRate => write!(f, "heart_rate"),
            Signal::Emg => write!(f, "emg"),
        }
    }
}

/// Latest decoded sample of one signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub signal: Signal,
    pub value: f64,
    /// `None` until the producer has written at least once.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Reading {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            value: 0.0,
            updated_at: None,
        }
    }
}

/// Both readings, rounded for output.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatestValues {
    pub bpm: f64,
    pub emg: f64,
}

impl LatestValues {
    pub fn new(bpm: f64, emg: f64) -> Self {
        Self {
            bpm: round_one_decimal(bpm),
            emg: round_one_decimal(emg),
        }
    }
}

/// Round to one decimal place. Ties go to even on the exact decimal
/// expansion of `value`, and magnitudes too large to scale pass through.
pub fn round_one_decimal(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}
