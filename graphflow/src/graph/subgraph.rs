//! A whole graph embedded as a single node of a parent graph.

use async_trait::async_trait;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::compiled::CompiledGraph;
use crate::graph::node::Node;
use crate::graph::state_graph::StateGraph;

/// Wraps a compiled graph so it can be registered as one node.
///
/// The child graph runs to completion inside the parent's step; its final
/// state becomes the parent's next state. Child failures are wrapped in
/// [`GraphError::NodeExecution`] under the subgraph's name, so the parent
/// sees a nested error chain naming both levels.
pub struct Subgraph<S> {
    name: String,
    graph: CompiledGraph<S>,
}

impl<S> Subgraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Compiles `graph` and wraps it under `name`.
    pub fn new(name: impl Into<String>, graph: StateGraph<S>) -> Result<Self, GraphError> {
        Ok(Self {
            name: name.into(),
            graph: graph.compile()?,
        })
    }

    /// Wraps an already compiled graph.
    pub fn from_compiled(name: impl Into<String>, graph: CompiledGraph<S>) -> Self {
        Self {
            name: name.into(),
            graph,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<S> Node<S> for Subgraph<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn run(&self, ctx: &Context, state: S) -> Result<S, GraphError> {
        self.graph
            .invoke(ctx, state)
            .await
            .map_err(|err| GraphError::NodeExecution {
                node: self.name.clone(),
                source: Box::new(err),
            })
    }
}
