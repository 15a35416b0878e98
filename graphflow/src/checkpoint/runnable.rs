//! Checkpointing surface: config, builder and the checkpointable runnable.

use std::future::Future;
use std::sync::Arc;

use crate::checkpoint::listener::{CheckpointErrorSink, CheckpointListener};
use crate::checkpoint::{
    checkpoint_for_node, Checkpoint, CheckpointError, MemoryCheckpointStore, SharedCheckpointStore,
};
use crate::context::Context;
use crate::error::GraphError;
use crate::graph::node::Node;
use crate::graph::target::Target;
use crate::listener::graph::{ListenableGraph, ListenableRunnable};
use crate::listener::NodeListener;

/// Checkpointing behavior of a [`CheckpointableRunnable`].
#[derive(Clone)]
pub struct CheckpointConfig<S> {
    store: SharedCheckpointStore<S>,
    auto_save: bool,
    error_sink: Option<CheckpointErrorSink>,
}

impl<S> Default for CheckpointConfig<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Memory-backed store with auto-save on.
    fn default() -> Self {
        Self::new(Arc::new(MemoryCheckpointStore::new()))
    }
}

impl<S> CheckpointConfig<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(store: SharedCheckpointStore<S>) -> Self {
        Self {
            store,
            auto_save: true,
            error_sink: None,
        }
    }

    /// Turns automatic per-node saving on or off. Manual saves always work.
    pub fn with_auto_save(mut self, enabled: bool) -> Self {
        self.auto_save = enabled;
        self
    }

    /// Callback observing auto-save failures, which are otherwise only
    /// logged.
    pub fn with_error_sink(
        mut self,
        sink: impl Fn(&CheckpointError) + Send + Sync + 'static,
    ) -> Self {
        self.error_sink = Some(Arc::new(sink));
        self
    }

    pub fn store(&self) -> &SharedCheckpointStore<S> {
        &self.store
    }
}

/// Builder for graphs executed with checkpoint persistence.
pub struct CheckpointableGraph<S> {
    graph: ListenableGraph<S>,
    config: CheckpointConfig<S>,
}

impl<S> Default for CheckpointableGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> CheckpointableGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            graph: ListenableGraph::new(),
            config: CheckpointConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CheckpointConfig<S>) -> Self {
        self.config = config;
        self
    }

    pub fn add_node(&mut self, name: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.graph.add_node(name, node);
        self
    }

    pub fn add_node_fn<F, Fut>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(Context, S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, GraphError>> + Send + 'static,
    {
        self.graph.add_node_fn(name, func);
        self
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<Target>) -> &mut Self {
        self.graph.add_edge(from, to);
        self
    }

    pub fn add_conditional_edge<F>(&mut self, from: impl Into<String>, condition: F) -> &mut Self
    where
        F: Fn(&Context, &S) -> Target + Send + Sync + 'static,
    {
        self.graph.add_conditional_edge(from, condition);
        self
    }

    pub fn set_entry_point(&mut self, name: impl Into<String>) -> &mut Self {
        self.graph.set_entry_point(name);
        self
    }

    /// Additional listener observing the run alongside checkpointing.
    pub fn add_listener(&mut self, listener: Arc<dyn NodeListener<S>>) -> &mut Self {
        self.graph.add_listener(listener);
        self
    }

    pub fn compile(self) -> Result<CheckpointableRunnable<S>, GraphError> {
        Ok(CheckpointableRunnable::new(self.graph.compile()?, self.config))
    }
}

/// Listenable runnable with checkpoint persistence per run.
///
/// Every instance gets a fresh execution id; all checkpoints it saves,
/// automatic and manual, are tagged with it, so
/// [`list_checkpoints`](Self::list_checkpoints) sees exactly this
/// runnable's history.
pub struct CheckpointableRunnable<S> {
    runnable: Arc<ListenableRunnable<S>>,
    config: CheckpointConfig<S>,
    execution_id: String,
}

impl<S> CheckpointableRunnable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(runnable: ListenableRunnable<S>, config: CheckpointConfig<S>) -> Self {
        Self {
            runnable: Arc::new(runnable),
            config,
            execution_id: format!("exec-{}", uuid::Uuid::new_v4()),
        }
    }

    /// Id tagging every checkpoint this runnable saves.
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Runs the graph. With auto-save on, a [`CheckpointListener`] is
    /// attached for the duration of the call and detached afterwards, so
    /// every successful node completion leaves a checkpoint behind.
    pub async fn invoke(&self, ctx: &Context, state: S) -> Result<S, GraphError> {
        if !self.config.auto_save {
            return self.runnable.invoke(ctx, state).await;
        }

        let mut listener =
            CheckpointListener::new(Arc::clone(&self.config.store), self.execution_id.clone());
        if let Some(sink) = &self.config.error_sink {
            listener = listener.with_error_sink(Arc::clone(sink));
        }
        let listener: Arc<dyn NodeListener<S>> = Arc::new(listener);

        self.runnable.add_listener(Arc::clone(&listener));
        let result = self.runnable.invoke(ctx, state).await;
        self.runnable.remove_listener(&listener);
        result
    }

    /// Saves a checkpoint outside the auto-save path and returns its id.
    pub async fn save_checkpoint(
        &self,
        node_name: impl Into<String>,
        state: S,
    ) -> Result<String, CheckpointError> {
        let checkpoint =
            checkpoint_for_node(&self.execution_id, node_name.into(), state, None, true);
        let id = checkpoint.id.clone();
        self.config.store.save(checkpoint).await?;
        Ok(id)
    }

    pub async fn load_checkpoint(&self, id: &str) -> Result<Checkpoint<S>, CheckpointError> {
        self.config.store.load(id).await
    }

    /// This runnable's checkpoints, oldest first.
    pub async fn list_checkpoints(&self) -> Result<Vec<Checkpoint<S>>, CheckpointError> {
        self.config.store.list(&self.execution_id).await
    }

    pub async fn delete_checkpoint(&self, id: &str) -> Result<(), CheckpointError> {
        self.config.store.delete(id).await
    }

    pub async fn clear_checkpoints(&self) -> Result<(), CheckpointError> {
        self.config.store.clear(&self.execution_id).await
    }

    /// Loads a checkpoint and returns its stored state.
    ///
    /// This does not re-enter the graph at the checkpointed node. The
    /// caller gets the persisted state back and decides how to continue,
    /// typically by invoking a graph built to start where the original
    /// left off.
    pub async fn resume_from_checkpoint(&self, id: &str) -> Result<S, CheckpointError> {
        let checkpoint = self.config.store.load(id).await?;
        tracing::debug!(
            checkpoint = %id,
            node = %checkpoint.node_name,
            "resuming from checkpoint"
        );
        Ok(checkpoint.state)
    }
}
