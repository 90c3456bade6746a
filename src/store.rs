//! store.rs
//!
//! Latest value of every signal. Each signal lives in its own cell behind its
//! own mutex, so the heart-rate and EMG producers never contend.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::types::{LatestValues, Reading, Signal};

pub struct ReadingStore {
    heart_rate: Mutex<Reading>,
    emg: Mutex<Reading>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self {
            heart_rate: Mutex::new(Reading::new(Signal::HeartRate)),
            emg: Mutex::new(Reading::new(Signal::Emg)),
        }
    }

    fn cell(&self, signal: Signal) -> MutexGuard<'_, Reading> {
        let cell = match signal {
            Signal::HeartRate => &self.heart_rate,
            Signal::Emg => &self.emg,
        };
        // A panicking writer cannot leave a half-written f64 behind.
        cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite the value of `signal` and stamp it with the current time.
    pub fn set(&self, signal: Signal, value: f64) {
        let mut reading = self.cell(signal);
        reading.value = value;
        reading.updated_at = Some(Utc::now());
    }

    /// Most recent value of `signal`, `0.0` if never set.
    pub fn get(&self, signal: Signal) -> f64 {
        self.cell(signal).value
    }

    pub fn reading(&self, signal: Signal) -> Reading {
        self.cell(signal).clone()
    }

    /// Both values, each read under its own lock.
    pub fn latest(&self) -> LatestValues {
        let bpm = self.get(Signal::HeartRate);
        let emg = self.get(Signal::Emg);
        LatestValues::new(bpm, emg)
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new()
    }
}
