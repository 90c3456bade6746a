//! types/event.rs
//!
//! The combined event and the text frames written to stream clients.
//!
//! Frames follow the event-stream format: an event is a `data:` line carrying
//! one JSON object, a keepalive is a comment line, and both end with a blank
//! line. JSON is written with `", "` and `": "` separators.

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;

use crate::error::HubError;
use crate::types::reading::round_one_decimal;

pub const KEEPALIVE_FRAME: &str = ": keepalive\n\n";

/// One tick of the fused stream.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombinedEvent {
    pub bpm: f64,
    pub emg: f64,
    /// Milliseconds since the session clock was last reset.
    pub t: u64,
}

impl CombinedEvent {
    /// Build an event, rounding both values to one decimal place.
    pub fn new(bpm: f64, emg: f64, t: u64) -> Self {
        Self {
            bpm: round_one_decimal(bpm),
            emg: round_one_decimal(emg),
            t,
        }
    }

    pub fn to_frame(&self) -> Result<Frame, HubError> {
        Ok(Frame::Event(format!("data: {}\n\n", to_spaced_json(self)?)))
    }
}

/// A unit of output on a stream connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Event(String),
    Keepalive,
}

impl Frame {
    pub fn as_str(&self) -> &str {
        match self {
            Frame::Event(text) => text,
            Frame::Keepalive => KEEPALIVE_FRAME,
        }
    }

    pub fn is_keepalive(&self) -> bool {
        matches!(self, Frame::Keepalive)
    }

    pub fn into_string(self) -> String {
        match self {
            Frame::Event(text) => text,
            Frame::Keepalive => KEEPALIVE_FRAME.to_string(),
        }
    }
}

/// Compact JSON with a space after every `,` and `:`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

pub fn to_spaced_json<T: Serialize>(value: &T) -> Result<String, HubError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| HubError::SerializationError(e.to_string()))
}
