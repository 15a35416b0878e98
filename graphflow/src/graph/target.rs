//! Transition targets: where an edge leads.

/// Destination of a transition: a named node or the end of the graph.
///
/// Using an enum instead of a reserved node name means a workflow is free
/// to register a node literally called "END" without colliding with the
/// terminal marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Transition to the node registered under this name.
    Node(String),
    /// Halt traversal and return the current state to the caller.
    End,
}

impl Target {
    /// Target naming a node.
    pub fn node(name: impl Into<String>) -> Self {
        Target::Node(name.into())
    }

    /// True for [`Target::End`].
    pub fn is_end(&self) -> bool {
        matches!(self, Target::End)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::Node(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::Node(name)
    }
}
