//! Workflow builder: nodes, edges, conditional routing, entry point.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::compiled::CompiledGraph;
use crate::graph::node::{FnNode, Node};
use crate::graph::target::Target;
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, RateLimiter, RetryConfig, RetryNode, TimeoutNode,
};

/// Routing function of a conditional edge. Inspects the state produced by a
/// node and names the next transition.
pub type Condition<S> = Arc<dyn Fn(&Context, &S) -> Target + Send + Sync>;

/// Mutable workflow builder, generic over the caller's state type `S`.
///
/// Register nodes with [`add_node`](Self::add_node) or
/// [`add_node_fn`](Self::add_node_fn), connect them with
/// [`add_edge`](Self::add_edge) and
/// [`add_conditional_edge`](Self::add_conditional_edge), pick the first node
/// with [`set_entry_point`](Self::set_entry_point), then
/// [`compile`](Self::compile) into an immutable [`CompiledGraph`].
///
/// **Interaction**: a conditional edge takes precedence over static edges
/// leaving the same node; among static edges the first added wins. Edge
/// targets are not validated at compile time, an unknown name surfaces as
/// [`GraphError::NodeNotFound`] when traversal reaches it.
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: Vec<(String, Target)>,
    conditional_edges: HashMap<String, Condition<S>>,
    entry_point: Option<String>,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
            entry_point: None,
        }
    }

    /// Registers `node` under `name`. Re-registering a name replaces the
    /// previous node.
    pub fn add_node(&mut self, name: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(name.into(), node);
        self
    }

    /// Registers an async closure as a node.
    pub fn add_node_fn<F, Fut>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(Context, S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, GraphError>> + Send + 'static,
    {
        self.add_node(name, Arc::new(FnNode::new(func)))
    }

    /// Registers `node` wrapped in retry-with-backoff behavior.
    pub fn add_node_with_retry(
        &mut self,
        name: impl Into<String>,
        node: Arc<dyn Node<S>>,
        config: RetryConfig,
    ) -> &mut Self {
        let name = name.into();
        let wrapped = RetryNode::new(name.clone(), node, config);
        self.add_node(name, Arc::new(wrapped))
    }

    /// Registers `node` with a bound on its execution time.
    pub fn add_node_with_timeout(
        &mut self,
        name: impl Into<String>,
        node: Arc<dyn Node<S>>,
        timeout: Duration,
    ) -> &mut Self {
        let name = name.into();
        let wrapped = TimeoutNode::new(name.clone(), node, timeout);
        self.add_node(name, Arc::new(wrapped))
    }

    /// Registers `node` behind a circuit breaker.
    pub fn add_node_with_circuit_breaker(
        &mut self,
        name: impl Into<String>,
        node: Arc<dyn Node<S>>,
        config: CircuitBreakerConfig,
    ) -> &mut Self {
        let name = name.into();
        let wrapped = CircuitBreaker::new(name.clone(), node, config);
        self.add_node(name, Arc::new(wrapped))
    }

    /// Registers `node` behind a sliding-window rate limit.
    pub fn add_node_with_rate_limit(
        &mut self,
        name: impl Into<String>,
        node: Arc<dyn Node<S>>,
        max_calls: usize,
        window: Duration,
    ) -> &mut Self {
        let name = name.into();
        let wrapped = RateLimiter::new(name.clone(), node, max_calls, window);
        self.add_node(name, Arc::new(wrapped))
    }

    /// Adds a static edge from `from` to `to`.
    ///
    /// `to` accepts a node name or [`Target::End`].
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<Target>) -> &mut Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Adds a conditional edge leaving `from`. At most one condition per
    /// node; adding another replaces it.
    pub fn add_conditional_edge<F>(&mut self, from: impl Into<String>, condition: F) -> &mut Self
    where
        F: Fn(&Context, &S) -> Target + Send + Sync + 'static,
    {
        self.conditional_edges.insert(from.into(), Arc::new(condition));
        self
    }

    /// Names the node where traversal starts.
    pub fn set_entry_point(&mut self, name: impl Into<String>) -> &mut Self {
        self.entry_point = Some(name.into());
        self
    }

    /// Freezes the builder into an executable graph.
    ///
    /// Fails with [`GraphError::EntryPointNotSet`] when no entry point was
    /// chosen. Unknown node names in edges are reported lazily at run time.
    pub fn compile(self) -> Result<CompiledGraph<S>, GraphError> {
        let entry_point = self.entry_point.ok_or(GraphError::EntryPointNotSet)?;
        Ok(CompiledGraph::new(
            self.nodes,
            self.edges,
            self.conditional_edges,
            entry_point,
        ))
    }
}
