//! Streaming execution: observe node events live while a graph runs.
//!
//! A [`StreamingRunnable`] starts the run on a background task and hands
//! the caller a [`StreamRun`]: a buffered event channel fed by a
//! [`StreamingListener`], single-shot result and error channels, and a
//! completion signal. [`StreamingExecutor`] folds the same machinery into
//! a callback-per-event call for consumers that do not want to manage
//! channels.

pub mod listener;
pub mod runnable;

use std::collections::HashMap;
use std::time::SystemTime;

use crate::error::GraphError;
use crate::listener::NodeEvent;

pub use listener::StreamingListener;
pub use runnable::{StreamRun, StreamingExecutor, StreamingGraph, StreamingRunnable};

/// Tuning for streaming execution.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Capacity of the event channel. When it is full, new events are
    /// dropped rather than blocking the run.
    pub buffer_size: usize,
    /// Drops beyond this count are no longer logged, keeping a slow
    /// consumer from flooding the log.
    pub max_dropped_events: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            max_dropped_events: 100,
        }
    }
}

/// One node lifecycle event as seen by a stream consumer.
#[derive(Debug, Clone)]
pub struct StreamEvent<S> {
    pub timestamp: SystemTime,
    pub node_name: String,
    pub event: NodeEvent,
    /// Input state for start/error events, produced state for complete.
    pub state: S,
    pub error: Option<GraphError>,
    /// Extra key/value context. Empty for engine-produced events.
    pub metadata: HashMap<String, String>,
}
