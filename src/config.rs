//! config.rs
//!
//! Hub configuration. Durations are stored as plain milliseconds so the file
//! format stays flat JSON; use the accessor methods for `Duration` values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HubError;
use crate::policy::{BackoffPolicy, RetryPolicy};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    /// Combined stream rate in Hz.
    pub stream_hz: u32,
    /// How often the EMG sheet is re-read.
    pub poll_interval_ms: u64,
    /// Wait after the first failed connection attempt to the sheet.
    pub reconnect_backoff_ms: u64,
    /// Growth of the reconnect wait per further failure. 1.0 keeps it constant.
    pub reconnect_backoff_factor: f64,
    /// Ceiling for the reconnect wait.
    pub reconnect_backoff_max_ms: u64,
    /// Extra wait after a failed poll before reconnecting.
    pub poll_error_delay_ms: u64,
    /// Stop reconnecting after this many failures. `None` retries forever.
    pub max_connect_attempts: Option<u32>,
    /// 0-indexed column the EMG device writes to.
    pub emg_column: usize,
    /// Per-subscriber queue capacity.
    pub queue_capacity: usize,
    /// Keepalive cadence of an idle stream.
    pub keepalive_interval_ms: u64,
    /// Measurement name accepted by the heart-rate ingest.
    pub heart_rate_name: String,
    pub spreadsheet_id: String,
    pub credentials_path: PathBuf,
    pub bind_addr: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            stream_hz: 10,
            poll_interval_ms: 1_000,
            reconnect_backoff_ms: 10_000,
            reconnect_backoff_factor: 1.0,
            reconnect_backoff_max_ms: 10_000,
            poll_error_delay_ms: 5_000,
            max_connect_attempts: None,
            emg_column: 1,
            queue_capacity: 200,
            keepalive_interval_ms: 200,
            heart_rate_name: "heart rate".to_string(),
            spreadsheet_id: String::new(),
            credentials_path: PathBuf::from("credentials/service-account.json"),
            bind_addr: "0.0.0.0:5001".to_string(),
        }
    }
}

impl HubConfig {
    /// Load from a JSON file. Missing fields fall back to their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HubError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: HubConfig = serde_json::from_str(&raw).map_err(|e| {
            HubError::ConfigError(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HubError> {
        if self.stream_hz == 0 {
            return Err(HubError::ConfigError("stream_hz must be positive".into()));
        }
        if self.queue_capacity == 0 {
            return Err(HubError::ConfigError("queue_capacity must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(HubError::ConfigError("poll_interval_ms must be positive".into()));
        }
        if self.keepalive_interval_ms == 0 {
            return Err(HubError::ConfigError(
                "keepalive_interval_ms must be positive".into(),
            ));
        }
        if !self.reconnect_backoff_factor.is_finite() || self.reconnect_backoff_factor < 1.0 {
            return Err(HubError::ConfigError(
                "reconnect_backoff_factor must be at least 1.0".into(),
            ));
        }
        if self.reconnect_backoff_max_ms < self.reconnect_backoff_ms {
            return Err(HubError::ConfigError(
                "reconnect_backoff_max_ms must not be below reconnect_backoff_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn stream_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.stream_hz.max(1)))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            connect: BackoffPolicy {
                first: Duration::from_millis(self.reconnect_backoff_ms),
                max: Duration::from_millis(self.reconnect_backoff_max_ms),
                factor: self.reconnect_backoff_factor,
            },
            poll_error_delay: Duration::from_millis(self.poll_error_delay_ms),
            max_connect_attempts: self.max_connect_attempts,
        }
    }
}
