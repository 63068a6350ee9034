//! Host log sink capability.
//!
//! The host framework hands the loader a console-like sink. Pool errors and
//! skipped catalog rows are reported through it so that they reach the host's
//! output instead of terminating the process.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{error, info};

/// Log sink provided by the host.
pub trait LogSink: Send + Sync {
    /// Informational message.
    fn log(&self, message: &str);

    /// Error with a detail string (usually the rendered source error).
    fn error(&self, message: &str, detail: &str);
}

/// Default sink forwarding to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str) {
        info!("{}", message);
    }

    fn error(&self, message: &str, detail: &str) {
        error!("{} {}", message, detail);
    }
}

/// A single entry captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEntry {
    Log(String),
    Error { message: String, detail: String },
}

/// Sink that records every entry in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<SinkEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded entries.
    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Recorded error entries only.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                SinkEntry::Error { message, detail } => Some((message, detail)),
                SinkEntry::Log(_) => None,
            })
            .collect()
    }

    fn push(&self, entry: SinkEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: &str) {
        self.push(SinkEntry::Log(message.to_string()));
    }

    fn error(&self, message: &str, detail: &str) {
        self.push(SinkEntry::Error {
            message: message.to_string(),
            detail: detail.to_string(),
        });
    }
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn LogSink>;

/// Adapter that lets bb8 report background connection errors to the host sink.
#[derive(Clone)]
pub(crate) struct PoolErrorSink {
    sink: SharedSink,
}

impl PoolErrorSink {
    pub(crate) fn new(sink: SharedSink) -> Self {
        Self { sink }
    }
}

impl fmt::Debug for PoolErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolErrorSink").finish_non_exhaustive()
    }
}

impl<E> bb8::ErrorSink<E> for PoolErrorSink
where
    E: fmt::Display + Send + 'static,
{
    fn sink(&self, error: E) {
        self.sink.error("ConnectionPool Error:", &error.to_string());
    }

    fn boxed_clone(&self) -> Box<dyn bb8::ErrorSink<E>> {
        Box::new(self.clone())
    }
}
