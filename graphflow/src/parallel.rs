//! Fan-out node: run several nodes concurrently, merge their results.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::context::Context;
use crate::error::GraphError;
use crate::graph::node::Node;

/// Runs a set of branch nodes concurrently over clones of the input state
/// and merges their outputs into the next state.
///
/// Branches run on their own tasks and are all joined before the outcome
/// is decided. On failures the branch with the lowest index wins and its
/// error is reported as [`GraphError::NodeExecution`] named
/// `"name[index]"`; a panicking branch is contained and reported as an
/// execution failure. The merge function receives the branch results in
/// branch order.
pub struct ParallelNode<S> {
    name: String,
    branches: Vec<Arc<dyn Node<S>>>,
    merge: Arc<dyn Fn(Vec<S>) -> Result<S, GraphError> + Send + Sync>,
}

impl<S> ParallelNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<String>,
        branches: Vec<Arc<dyn Node<S>>>,
        merge: impl Fn(Vec<S>) -> Result<S, GraphError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            branches,
            merge: Arc::new(merge),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }
}

#[async_trait]
impl<S> Node<S> for ParallelNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn run(&self, ctx: &Context, state: S) -> Result<S, GraphError> {
        let handles: Vec<_> = self
            .branches
            .iter()
            .map(|branch| {
                let branch = Arc::clone(branch);
                let ctx = ctx.clone();
                let state = state.clone();
                tokio::spawn(async move { branch.run(&ctx, state).await })
            })
            .collect();

        let joined = join_all(handles).await;

        let mut results = Vec::with_capacity(joined.len());
        for (index, outcome) in joined.into_iter().enumerate() {
            match outcome {
                Ok(Ok(branch_state)) => results.push(branch_state),
                Ok(Err(err)) => {
                    return Err(GraphError::NodeExecution {
                        node: format!("{}[{}]", self.name, index),
                        source: Box::new(err),
                    })
                }
                Err(_) => {
                    return Err(GraphError::ExecutionFailed(format!(
                        "panic in branch {} of {}",
                        index, self.name
                    )))
                }
            }
        }

        (self.merge)(results)
    }
}
