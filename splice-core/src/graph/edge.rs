//! Graph Edges
//!
//! An edge connects one node's output parameter to another node's input
//! parameter. Edges are stored once in the graph; both endpoint parameters
//! hold the edge's id.

use std::fmt;

use super::node::NodeId;
use super::param::ParamRef;

/// Identifier of an edge within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

impl EdgeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for EdgeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A directed connection from an output to an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    id: EdgeId,
    output: ParamRef,
    input: ParamRef,
}

impl Edge {
    pub(crate) fn new(id: EdgeId, output: ParamRef, input: ParamRef) -> Self {
        Self { id, output, input }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// The upstream output parameter.
    pub fn output(&self) -> &ParamRef {
        &self.output
    }

    /// The downstream input parameter.
    pub fn input(&self) -> &ParamRef {
        &self.input
    }

    /// Node that provides the data.
    pub fn output_node(&self) -> NodeId {
        self.output.node
    }

    /// Node that consumes the data.
    pub fn input_node(&self) -> NodeId {
        self.input.node
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.output, self.input)
    }
}
