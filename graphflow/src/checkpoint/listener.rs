//! Listener that persists a checkpoint after each node completion.

use std::sync::Arc;

use async_trait::async_trait;

use crate::checkpoint::{checkpoint_for_node, CheckpointError, SharedCheckpointStore};
use crate::context::Context;
use crate::error::GraphError;
use crate::listener::{NodeEvent, NodeListener};

/// Callback receiving checkpoint-save failures from the auto-save path.
pub type CheckpointErrorSink = Arc<dyn Fn(&CheckpointError) + Send + Sync>;

/// Saves a checkpoint on every [`NodeEvent::Complete`].
///
/// Start, progress and error events produce nothing: a checkpoint always
/// holds a state that a node successfully produced. The save runs on its
/// own task so slow stores do not hold up the run; a failed save is logged
/// and reported to the error sink, never propagated into the run.
pub struct CheckpointListener<S> {
    store: SharedCheckpointStore<S>,
    execution_id: String,
    error_sink: Option<CheckpointErrorSink>,
}

impl<S> CheckpointListener<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(store: SharedCheckpointStore<S>, execution_id: impl Into<String>) -> Self {
        Self {
            store,
            execution_id: execution_id.into(),
            error_sink: None,
        }
    }

    /// Attaches a sink observing save failures.
    pub fn with_error_sink(mut self, sink: CheckpointErrorSink) -> Self {
        self.error_sink = Some(sink);
        self
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }
}

#[async_trait]
impl<S> NodeListener<S> for CheckpointListener<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn on_node_event(
        &self,
        _ctx: Context,
        event: NodeEvent,
        node_name: String,
        state: S,
        _error: Option<GraphError>,
    ) {
        if event != NodeEvent::Complete {
            return;
        }
        let checkpoint = checkpoint_for_node(
            &self.execution_id,
            node_name.clone(),
            state,
            Some(event),
            false,
        );
        let store = Arc::clone(&self.store);
        let sink = self.error_sink.clone();
        tokio::spawn(async move {
            if let Err(err) = store.save(checkpoint).await {
                tracing::warn!(node = %node_name, error = %err, "checkpoint save failed");
                if let Some(sink) = sink {
                    sink(&err);
                }
            }
        });
    }
}
