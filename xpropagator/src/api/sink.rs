//! Outbound stream abstraction for the ephemeris operation.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use super::EphemResponse;

/// The transport failed to deliver a chunk.
///
/// Raised by sink implementations; the pipeline latches the first such
/// error and surfaces it once the stream drains.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to send ephemeris chunk: {0}")]
pub struct SinkSendError(pub String);

/// Where ephemeris response chunks go.
///
/// The transport layer implements this over its server stream. `send`
/// is called from a dedicated sender task, strictly in chunk order; a
/// returned error stops the stream.
pub trait EphemSink: Send {
    /// Deliver one chunk to the client.
    fn send(&mut self, chunk: EphemResponse) -> Result<(), SinkSendError>;
}

/// Sink that buffers every chunk in memory.
///
/// Intended for tests and in-process consumers; clone the handle before
/// passing the sink in, then inspect after the stream finishes.
#[derive(Clone, Default)]
pub struct CollectingSink {
    chunks: Arc<Mutex<Vec<EphemResponse>>>,
}

impl CollectingSink {
    /// New empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunks delivered so far.
    pub fn chunks(&self) -> Vec<EphemResponse> {
        self.chunks.lock().unwrap().clone()
    }

    /// Number of chunks delivered so far.
    pub fn len(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    /// Whether nothing has been delivered.
    pub fn is_empty(&self) -> bool {
        self.chunks.lock().unwrap().is_empty()
    }
}

impl EphemSink for CollectingSink {
    fn send(&mut self, chunk: EphemResponse) -> Result<(), SinkSendError> {
        self.chunks.lock().unwrap().push(chunk);
        Ok(())
    }
}
