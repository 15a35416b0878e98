//! Listener that forwards node events into a bounded channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::context::Context;
use crate::error::GraphError;
use crate::listener::{NodeEvent, NodeListener};
use crate::stream::{StreamConfig, StreamEvent};

/// Bridges listener notifications onto a `tokio` mpsc channel.
///
/// Sends never block: when the channel is full the event is dropped and
/// counted, so a slow consumer cannot stall graph execution. After
/// [`close`](Self::close), late notifications from still-joining dispatch
/// tasks are suppressed instead of racing the closed channel.
pub struct StreamingListener<S> {
    tx: mpsc::Sender<StreamEvent<S>>,
    config: StreamConfig,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl<S> StreamingListener<S> {
    pub fn new(tx: mpsc::Sender<StreamEvent<S>>, config: StreamConfig) -> Self {
        Self {
            tx,
            config,
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    /// Suppresses all further sends. Called when the run has delivered its
    /// outcome.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Events dropped because the channel was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S> NodeListener<S> for StreamingListener<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn on_node_event(
        &self,
        _ctx: Context,
        event: NodeEvent,
        node_name: String,
        state: S,
        error: Option<GraphError>,
    ) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let stream_event = StreamEvent {
            timestamp: SystemTime::now(),
            node_name,
            event,
            state,
            error,
            metadata: HashMap::new(),
        };
        match self.tx.try_send(stream_event) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped_event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::SeqCst) + 1;
                if dropped <= self.config.max_dropped_events {
                    tracing::warn!(
                        node = %dropped_event.node_name,
                        event = %dropped_event.event,
                        dropped,
                        "stream buffer full, dropping event"
                    );
                }
            }
            // consumer went away; nothing left to deliver to
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
