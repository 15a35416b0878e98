//! Streaming graph builder, background runner and callback executor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::node::Node;
use crate::graph::target::Target;
use crate::listener::graph::{ListenableGraph, ListenableRunnable};
use crate::listener::NodeListener;
use crate::stream::listener::StreamingListener;
use crate::stream::{StreamConfig, StreamEvent};

/// Wait for in-flight listener dispatch tasks after detaching, before the
/// channels are closed.
const DISPATCH_GRACE: Duration = Duration::from_millis(10);

/// Live channels of one streaming run.
///
/// `events` carries node lifecycle events while the run progresses. The
/// single outcome arrives on `result` or `errors` (capacity one each);
/// `done` resolves once the run has finished, late events were flushed and
/// the channels closed. The receivers are plain fields so callers can move
/// them into their own select loops.
pub struct StreamRun<S> {
    pub events: mpsc::Receiver<StreamEvent<S>>,
    pub result: mpsc::Receiver<S>,
    pub errors: mpsc::Receiver<GraphError>,
    pub done: oneshot::Receiver<()>,
    run_ctx: Context,
}

impl<S> StreamRun<S> {
    /// Requests cooperative cancellation of the run. Nodes observing their
    /// context stop early; execution is not forcibly preempted.
    pub fn cancel(&self) {
        self.run_ctx.cancel();
    }

    /// The run's derived context, e.g. to move a cancel handle elsewhere.
    pub fn context(&self) -> &Context {
        &self.run_ctx
    }

    /// Adapts the event receiver into a `Stream`.
    ///
    /// Consumes the other channels; the run still completes, its outcome
    /// is just no longer observable.
    pub fn into_event_stream(self) -> ReceiverStream<StreamEvent<S>> {
        ReceiverStream::new(self.events)
    }
}

/// Builder for graphs executed with event streaming.
pub struct StreamingGraph<S> {
    graph: ListenableGraph<S>,
    config: StreamConfig,
}

impl<S> Default for StreamingGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StreamingGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            graph: ListenableGraph::new(),
            config: StreamConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StreamConfig) -> Self {
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

    /// Additional listener observing the run alongside the stream.
    pub fn add_listener(&mut self, listener: Arc<dyn NodeListener<S>>) -> &mut Self {
        self.graph.add_listener(listener);
        self
    }

    pub fn compile(self) -> Result<StreamingRunnable<S>, GraphError> {
        Ok(StreamingRunnable {
            runnable: Arc::new(self.graph.compile()?),
            config: self.config,
        })
    }
}

/// Runs a listenable graph on a background task, streaming its events.
pub struct StreamingRunnable<S> {
    runnable: Arc<ListenableRunnable<S>>,
    config: StreamConfig,
}

impl<S> StreamingRunnable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(runnable: ListenableRunnable<S>, config: StreamConfig) -> Self {
        Self {
            runnable: Arc::new(runnable),
            config,
        }
    }

    /// Starts the run and returns its channels immediately.
    ///
    /// A [`StreamingListener`] is attached to every node for the duration
    /// of the run. When the run finishes the outcome is delivered first,
    /// then the listener is closed and detached, in-flight dispatches get
    /// a short grace period, `done` fires and the channels close.
    pub fn stream(&self, ctx: &Context, state: S) -> StreamRun<S> {
        let (event_tx, event_rx) = mpsc::channel(self.config.buffer_size.max(1));
        let (result_tx, result_rx) = mpsc::channel(1);
        let (error_tx, error_rx) = mpsc::channel(1);
        let (done_tx, done_rx) = oneshot::channel();

        let run_ctx = ctx.child();
        let listener = Arc::new(StreamingListener::new(event_tx, self.config.clone()));
        let listener_dyn: Arc<dyn NodeListener<S>> = listener.clone();
        self.runnable.add_listener(Arc::clone(&listener_dyn));

        let runnable = Arc::clone(&self.runnable);
        let task_ctx = run_ctx.clone();
        tokio::spawn(async move {
            match runnable.invoke(&task_ctx, state).await {
                Ok(final_state) => {
                    let _ = result_tx.send(final_state).await;
                }
                Err(err) => {
                    let _ = error_tx.send(err).await;
                }
            }

            listener.close();
            runnable.remove_listener(&listener_dyn);
            tokio::time::sleep(DISPATCH_GRACE).await;
            let _ = done_tx.send(());
        });

        StreamRun {
            events: event_rx,
            result: result_rx,
            errors: error_rx,
            done: done_rx,
            run_ctx,
        }
    }
}

/// Drives a streaming run through a per-event callback.
///
/// For consumers that want live events without managing channels: events
/// are drained as they arrive and the final outcome is returned from the
/// call itself.
pub struct StreamingExecutor<S> {
    runnable: StreamingRunnable<S>,
}

impl<S> StreamingExecutor<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(runnable: StreamingRunnable<S>) -> Self {
        Self { runnable }
    }

    /// Runs to completion, invoking `on_event` for every stream event in
    /// delivery order, and returns the run's outcome.
    pub async fn execute_with_callback<F>(
        &self,
        ctx: &Context,
        state: S,
        mut on_event: F,
    ) -> Result<S, GraphError>
    where
        F: FnMut(StreamEvent<S>),
    {
        let mut run = self.runnable.stream(ctx, state);
        while let Some(event) = run.events.recv().await {
            on_event(event);
        }
        if let Some(final_state) = run.result.recv().await {
            return Ok(final_state);
        }
        match run.errors.recv().await {
            Some(err) => Err(err),
            None => Err(GraphError::Cancelled),
        }
    }

    /// Starts the run and hands back its channels without driving them.
    pub fn execute_async(&self, ctx: &Context, state: S) -> StreamRun<S> {
        self.runnable.stream(ctx, state)
    }
}
