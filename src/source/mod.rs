//! source/mod.rs
//!
//! The external grid the EMG device writes to. The hub only ever asks for the
//! whole grid: row 0 is the header, every later row is one sample.
//!
//! Implementations:
//! - [`sheets::SheetsConnector`] reads a Google Sheets worksheet over HTTP
//! - [`memory::MemoryConnector`] serves an in-process grid for tests and demos

pub mod memory;
pub mod sheets;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HubError;

/// Rows of cell text.
pub type Grid = Vec<Vec<String>>;

/// An open handle on the grid.
#[async_trait]
pub trait GridSource: Send + Sync {
    /// Read every row currently in the source.
    async fn fetch_all(&self) -> Result<Grid, HubError>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Establishes [`GridSource`] handles. Credentials and transport live here.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn GridSource>, HubError>;
}

#[async_trait]
impl<C: SourceConnector + ?Sized> SourceConnector for Arc<C> {
    async fn connect(&self) -> Result<Box<dyn GridSource>, HubError> {
        (**self).connect().await
    }
}

pub use memory::{MemoryConnector, MemorySheet};
pub use sheets::{SheetsConnector, SheetsCredentials};
