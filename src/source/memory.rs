//! In-process grid source
//!
//! A shared grid that tests and demos can append to, truncate, or make fail,
//! standing in for the spreadsheet without any network access.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{Grid, GridSource, SourceConnector};
use crate::error::HubError;

/// The shared grid. Handles from [`MemoryConnector`] all read the same rows.
pub struct MemorySheet {
    rows: Mutex<Grid>,
    failing_reads: AtomicU32,
    reads: AtomicUsize,
}

impl MemorySheet {
    pub fn new() -> Arc<Self> {
        Self::with_rows(Vec::new())
    }

    /// A sheet holding only a header row.
    pub fn with_header(header: &[&str]) -> Arc<Self> {
        Self::with_rows(vec![header.iter().map(|c| c.to_string()).collect()])
    }

    pub fn with_rows(rows: Grid) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            failing_reads: AtomicU32::new(0),
            reads: AtomicUsize::new(0),
        })
    }

    fn rows(&self) -> MutexGuard<'_, Grid> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append_row(&self, row: &[&str]) {
        self.rows().push(row.iter().map(|c| c.to_string()).collect());
    }

    /// Keep only the first `len` rows.
    pub fn truncate(&self, len: usize) {
        self.rows().truncate(len);
    }

    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    /// Make the next `n` reads fail.
    pub fn fail_next_reads(&self, n: u32) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Reads served so far, failed ones included.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<Grid, HubError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.failing_reads) {
            return Err(HubError::SourceError("simulated read failure".into()));
        }
        Ok(self.rows().clone())
    }
}

/// Decrement `counter` if positive. Returns whether it was.
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

struct MemoryHandle {
    sheet: Arc<MemorySheet>,
}

#[async_trait]
impl GridSource for MemoryHandle {
    async fn fetch_all(&self) -> Result<Grid, HubError> {
        self.sheet.read()
    }

    fn describe(&self) -> String {
        "in-memory sheet".to_string()
    }
}

/// Hands out handles on one [`MemorySheet`].
pub struct MemoryConnector {
    sheet: Arc<MemorySheet>,
    failing_connects: AtomicU32,
    connects: AtomicUsize,
}

impl MemoryConnector {
    pub fn new(sheet: Arc<MemorySheet>) -> Self {
        Self {
            sheet,
            failing_connects: AtomicU32::new(0),
            connects: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` connection attempts fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.failing_connects.store(n, Ordering::SeqCst);
    }

    /// Connection attempts so far, failed ones included.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn sheet(&self) -> &Arc<MemorySheet> {
        &self.sheet
    }
}

#[async_trait]
impl SourceConnector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn GridSource>, HubError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.failing_connects) {
            return Err(HubError::SourceError("simulated connect failure".into()));
        }
        Ok(Box::new(MemoryHandle {
            sheet: Arc::clone(&self.sheet),
        }))
    }
}
