//! Node decorator that broadcasts lifecycle events to listeners.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::future::join_all;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::node::Node;
use crate::listener::{NodeEvent, NodeListener};

/// Wraps a node so listeners observe its lifecycle.
///
/// `run` notifies `Start` with the input state, executes the inner node,
/// then notifies `Complete` with the produced state or `Error` with the
/// input state and the error. Listeners added while a notification batch
/// is in flight are picked up from the next event on; the batch itself
/// works on a snapshot taken under the lock.
///
/// **Interaction**: implements [`Node`], so the engine traverses
/// listenable nodes exactly like plain ones, conditional edges included.
pub struct ListenableNode<S> {
    name: String,
    inner: Arc<dyn Node<S>>,
    listeners: Mutex<Vec<Arc<dyn NodeListener<S>>>>,
}

impl<S> ListenableNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, inner: Arc<dyn Node<S>>) -> Self {
        Self {
            name: name.into(),
            inner,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_listener(&self, listener: Arc<dyn NodeListener<S>>) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Removes a previously added listener. Identity is by `Arc` pointer,
    /// so pass a clone of the handle used when adding.
    pub fn remove_listener(&self, listener: &Arc<dyn NodeListener<S>>) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|existing| !Arc::ptr_eq(existing, listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Broadcasts `event` to the current listener set and waits for every
    /// dispatch task to finish. Public so long-running node bodies can
    /// emit [`NodeEvent::Progress`] themselves.
    pub async fn notify_listeners(
        &self,
        ctx: &Context,
        event: NodeEvent,
        state: S,
        error: Option<GraphError>,
    ) {
        let snapshot: Vec<Arc<dyn NodeListener<S>>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if snapshot.is_empty() {
            return;
        }

        let handles: Vec<_> = snapshot
            .into_iter()
            .map(|listener| {
                let ctx = ctx.clone();
                let node_name = self.name.clone();
                let state = state.clone();
                let error = error.clone();
                tokio::spawn(async move {
                    listener
                        .on_node_event(ctx, event, node_name, state, error)
                        .await;
                })
            })
            .collect();

        for joined in join_all(handles).await {
            if joined.is_err() {
                tracing::warn!(node = %self.name, event = %event, "node listener panicked");
            }
        }
    }
}

#[async_trait]
impl<S> Node<S> for ListenableNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn run(&self, ctx: &Context, state: S) -> Result<S, GraphError> {
        self.notify_listeners(ctx, NodeEvent::Start, state.clone(), None)
            .await;
        match self.inner.run(ctx, state.clone()).await {
            Ok(next) => {
                self.notify_listeners(ctx, NodeEvent::Complete, next.clone(), None)
                    .await;
                Ok(next)
            }
            Err(err) => {
                self.notify_listeners(ctx, NodeEvent::Error, state, Some(err.clone()))
                    .await;
                Err(err)
            }
        }
    }
}
