//! Graph model: builder, compiled engine, node contract, transitions.
//!
//! [`StateGraph`] collects nodes and edges, [`StateGraph::compile`] freezes
//! them into a [`CompiledGraph`] that can be invoked any number of times.
//! [`Node`] is the execution contract; [`Target`] names where a transition
//! leads; [`Subgraph`] embeds one graph inside another.

pub mod compiled;
pub mod node;
pub mod state_graph;
pub mod subgraph;
pub mod target;

pub use compiled::CompiledGraph;
pub use node::{fn_node, FnNode, Node};
pub use state_graph::{Condition, StateGraph};
pub use subgraph::Subgraph;
pub use target::Target;
