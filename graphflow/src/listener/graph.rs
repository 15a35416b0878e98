//! Graph builder and runnable with listener broadcast on every node.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::compiled::CompiledGraph;
use crate::graph::node::{fn_node, Node};
use crate::graph::state_graph::StateGraph;
use crate::graph::target::Target;
use crate::listener::listenable::ListenableNode;
use crate::listener::NodeListener;

/// Builder wrapping every registered node in a [`ListenableNode`].
///
/// Listeners added through [`add_listener`](Self::add_listener) are global:
/// they are attached to every node already registered and to every node
/// registered afterwards. Per-node listeners go through
/// [`add_node_listener`](Self::add_node_listener).
pub struct ListenableGraph<S> {
    graph: StateGraph<S>,
    nodes: HashMap<String, Arc<ListenableNode<S>>>,
    global_listeners: Vec<Arc<dyn NodeListener<S>>>,
}

impl<S> Default for ListenableGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ListenableGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            graph: StateGraph::new(),
            nodes: HashMap::new(),
            global_listeners: Vec::new(),
        }
    }

    /// Registers `node` under `name`, wrapped for listener broadcast.
    pub fn add_node(&mut self, name: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        let name = name.into();
        let listenable = Arc::new(ListenableNode::new(name.clone(), node));
        for listener in &self.global_listeners {
            listenable.add_listener(Arc::clone(listener));
        }
        self.nodes.insert(name.clone(), Arc::clone(&listenable));
        self.graph.add_node(name, listenable as Arc<dyn Node<S>>);
        self
    }

    /// Registers an async closure as a listenable node.
    pub fn add_node_fn<F, Fut>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(Context, S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, GraphError>> + Send + 'static,
    {
        self.add_node(name, fn_node(func))
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

    /// Attaches `listener` to every node, present and future.
    pub fn add_listener(&mut self, listener: Arc<dyn NodeListener<S>>) -> &mut Self {
        for node in self.nodes.values() {
            node.add_listener(Arc::clone(&listener));
        }
        self.global_listeners.push(listener);
        self
    }

    /// Attaches `listener` to a single node.
    pub fn add_node_listener(
        &mut self,
        name: &str,
        listener: Arc<dyn NodeListener<S>>,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get(name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))?;
        node.add_listener(listener);
        Ok(())
    }

    /// Compiles into a runnable that keeps the listener handles alive.
    pub fn compile(self) -> Result<ListenableRunnable<S>, GraphError> {
        Ok(ListenableRunnable {
            inner: self.graph.compile()?,
            nodes: self.nodes,
        })
    }
}

/// Compiled graph whose nodes broadcast lifecycle events.
///
/// Execution is the ordinary engine traversal; the listenable wrappers run
/// as nodes, so routing, conditional edges and error semantics are
/// identical to [`CompiledGraph::invoke`]. Listeners can still be attached
/// and detached between or during runs.
pub struct ListenableRunnable<S> {
    inner: CompiledGraph<S>,
    nodes: HashMap<String, Arc<ListenableNode<S>>>,
}

impl<S> ListenableRunnable<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Runs the graph to completion, broadcasting node events on the way.
    pub async fn invoke(&self, ctx: &Context, state: S) -> Result<S, GraphError> {
        self.inner.invoke(ctx, state).await
    }

    /// Attaches `listener` to every node.
    pub fn add_listener(&self, listener: Arc<dyn NodeListener<S>>) {
        for node in self.nodes.values() {
            node.add_listener(Arc::clone(&listener));
        }
    }

    /// Detaches `listener` (by `Arc` identity) from every node.
    pub fn remove_listener(&self, listener: &Arc<dyn NodeListener<S>>) {
        for node in self.nodes.values() {
            node.remove_listener(listener);
        }
    }

    /// Attaches `listener` to a single node.
    pub fn add_node_listener(
        &self,
        name: &str,
        listener: Arc<dyn NodeListener<S>>,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get(name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))?;
        node.add_listener(listener);
        Ok(())
    }

    /// The listenable wrapper of one node, e.g. to emit progress events.
    pub fn node(&self, name: &str) -> Option<&Arc<ListenableNode<S>>> {
        self.nodes.get(name)
    }
}
