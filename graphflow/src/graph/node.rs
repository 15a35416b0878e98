//! Node contract: async, state in, state out.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::GraphError;

/// A unit of work in a graph. Receives the current state, returns the next.
///
/// Nodes are registered under a name in [`StateGraph`](crate::graph::StateGraph)
/// and shared as `Arc<dyn Node<S>>`. The resilience wrappers and
/// [`ListenableNode`](crate::listener::ListenableNode) implement this trait
/// around an inner node, so decorated nodes compose like plain ones.
#[async_trait]
pub trait Node<S>: Send + Sync {
    /// Runs one step. An error aborts the surrounding run.
    async fn run(&self, ctx: &Context, state: S) -> Result<S, GraphError>;
}

/// Adapter lifting an async closure into [`Node`].
///
/// The closure receives an owned [`Context`] clone because the future it
/// returns must not borrow from the call frame.
pub struct FnNode<F> {
    func: F,
}

impl<F> FnNode<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<S, F, Fut> Node<S> for FnNode<F>
where
    S: Send + 'static,
    F: Fn(Context, S) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S, GraphError>> + Send,
{
    async fn run(&self, ctx: &Context, state: S) -> Result<S, GraphError> {
        (self.func)(ctx.clone(), state).await
    }
}

/// Wraps an async closure as a shareable node.
///
/// Shorthand for `Arc::new(FnNode::new(func))` with the trait-object
/// coercion applied, handy when handing nodes to the resilience wrappers.
pub fn fn_node<S, F, Fut>(func: F) -> Arc<dyn Node<S>>
where
    S: Send + 'static,
    F: Fn(Context, S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S, GraphError>> + Send + 'static,
{
    Arc::new(FnNode::new(func))
}
