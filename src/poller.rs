//! poller.rs
//!
//! EMG poller. Bridges the spreadsheet the EMG device appends to into the
//! reading store.
//!
//! # State machine
//!
//! ```text
//! Disconnected ──connect ok──► Connected ──seeded──► Polling ◄──┐
//!      ▲  │                                             │       │ tick
//!      │  └─connect failed: back off, retry             └───────┘
//!      │                                                │
//!      └──────────── PollError ◄───── read failed ──────┘
//! ```
//!
//! New data is detected by row count alone: the source is assumed to be
//! append-only. A shrinking sheet rebases the cursor without touching the
//! store, so rows appended after a truncation are still picked up.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::HubError;
use crate::policy::RetryPolicy;
use crate::source::{GridSource, SourceConnector};
use crate::store::ReadingStore;
use crate::types::Signal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollerState {
    Disconnected,
    Connected,
    Polling,
    PollError,
}

/// Last observed row count of the source, header row included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowCursor {
    pub count: usize,
}

/// What one look at the grid did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PollOutcome {
    /// Row count unchanged; nothing touched.
    Unchanged,
    /// New rows arrived and the last one decoded to `value`.
    Updated { added: usize, value: f64 },
    /// New rows arrived but the last one did not decode. The cursor still
    /// moves past them.
    Malformed { added: usize },
    /// The sheet shrank; cursor rebased to the new count.
    Shrunk { from: usize, to: usize },
}

/// Decode a cell as a finite, non-negative number.
pub fn parse_cell(cell: &str) -> Option<f64> {
    let value = cell.trim().parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Target column of the last data row, if there is one and it decodes.
fn last_value(grid: &[Vec<String>], column: usize) -> Option<f64> {
    if grid.len() < 2 {
        return None;
    }
    grid.last()?.get(column).and_then(|cell| parse_cell(cell))
}

pub struct EmgPoller<C: SourceConnector> {
    connector: C,
    store: Arc<ReadingStore>,
    column: usize,
    interval: Duration,
    retry: RetryPolicy,
    state: PollerState,
    cursor: RowCursor,
    source: Option<Box<dyn GridSource>>,
}

impl<C: SourceConnector> EmgPoller<C> {
    pub fn new(
        connector: C,
        store: Arc<ReadingStore>,
        column: usize,
        interval: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            connector,
            store,
            column,
            interval,
            retry,
            state: PollerState::Disconnected,
            cursor: RowCursor::default(),
            source: None,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn cursor(&self) -> RowCursor {
        self.cursor
    }

    /// Disconnected → Connected. Backs off between failures per the retry
    /// policy; only an exhausted bounded policy returns an error.
    pub async fn connect(&mut self) -> Result<(), HubError> {
        self.state = PollerState::Disconnected;
        self.source = None;
        let mut failures = 0u32;
        loop {
            match self.connector.connect().await {
                Ok(source) => {
                    log::info!("[Sheets] Connected to {}", source.describe());
                    self.source = Some(source);
                    self.state = PollerState::Connected;
                    return Ok(());
                }
                Err(e) => {
                    failures += 1;
                    log::warn!("[Sheets] Connection attempt {} failed: {}", failures, e);
                    match self.retry.reconnect_delay(failures) {
                        Some(delay) => {
                            log::info!("[Sheets] Retrying connection in {:?}", delay);
                            sleep(delay).await;
                        }
                        None => return Err(HubError::SourceUnavailable(failures)),
                    }
                }
            }
        }
    }

    /// Connected → Polling. Reads the whole grid once, takes its row count as
    /// the cursor and seeds the store from the last data row. A failed read
    /// leaves the cursor at zero so the first good poll seeds instead.
    pub async fn seed(&mut self) {
        self.cursor = RowCursor::default();
        let read = match self.source.as_ref() {
            Some(source) => source.fetch_all().await,
            None => Err(HubError::SourceError("no source handle".into())),
        };
        match read {
            Ok(grid) => {
                self.cursor.count = grid.len();
                log::info!(
                    "[Sheets] Headers: {:?}, EMG column {}, rows in sheet: {}",
                    grid.first(),
                    self.column,
                    grid.len()
                );
                if let Some(value) = last_value(&grid, self.column) {
                    self.store.set(Signal::Emg, value);
                    log::info!("[Sheets] Seeded EMG with {:.0}", value);
                }
            }
            Err(e) => log::warn!("[Sheets] Initial read failed: {}", e),
        }
        self.state = PollerState::Polling;
    }

    /// Compare a freshly read grid against the cursor and update the store.
    pub fn apply_grid(&mut self, grid: &[Vec<String>]) -> PollOutcome {
        let count = grid.len();
        let seen = self.cursor.count;

        if count < seen {
            self.cursor.count = count;
            log::warn!("[Sheets] Sheet shrank from {} to {} rows", seen, count);
            return PollOutcome::Shrunk { from: seen, to: count };
        }
        if count == seen || count < 2 {
            return PollOutcome::Unchanged;
        }

        let added = count - seen;
        self.cursor.count = count;
        match last_value(grid, self.column) {
            Some(value) => {
                self.store.set(Signal::Emg, value);
                log::debug!("[Sheets] +{} rows -> EMG={:.0} (total: {})", added, value, count);
                PollOutcome::Updated { added, value }
            }
            None => {
                log::debug!("[Sheets] +{} rows, last row has no usable EMG value", added);
                PollOutcome::Malformed { added }
            }
        }
    }

    /// One Polling cycle without the interval sleep.
    pub async fn poll_once(&mut self) -> Result<PollOutcome, HubError> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| HubError::SourceError("no source handle".into()))?;
        let read = source.fetch_all().await;
        match read {
            Ok(grid) => Ok(self.apply_grid(&grid)),
            Err(e) => {
                self.state = PollerState::PollError;
                Err(e)
            }
        }
    }

    /// PollError → Connected → Polling: wait, reconnect, re-seed.
    async fn recover(&mut self) -> Result<(), HubError> {
        sleep(self.retry.poll_error_delay).await;
        self.connect().await?;
        self.seed().await;
        log::info!("[Sheets] Reconnected (rows: {})", self.cursor.count);
        Ok(())
    }

    /// Run until the retry policy gives up. With the default policy this
    /// never returns.
    pub async fn run(mut self) -> Result<(), HubError> {
        self.connect().await?;
        self.seed().await;
        loop {
            sleep(self.interval).await;
            if let Err(e) = self.poll_once().await {
                log::warn!("[Sheets] Poll error: {}", e);
                self.recover().await?;
            }
        }
    }
}
