//! Error types for graph mutation, traversal and project loading.

use thiserror::Error;

use crate::graph::{EdgeId, NodeId};
use crate::value::DataType;

/// Errors produced by [`NodeGraph`](crate::graph::NodeGraph) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Referenced node does not exist in the graph.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// Referenced edge does not exist in the graph.
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    /// The node has no parameter with this id.
    #[error("node {node} has no parameter '{param}'")]
    ParameterNotFound {
        /// Owning node.
        node: NodeId,
        /// Requested parameter id.
        param: String,
    },

    /// A parameter with this id was already added to the node.
    #[error("node {node} already has a parameter '{param}'")]
    DuplicateParameter {
        /// Owning node.
        node: NodeId,
        /// Duplicated parameter id.
        param: String,
    },

    /// The parameter exists but has the wrong role for the operation.
    #[error("parameter '{param}' on node {node} is not an {expected}")]
    RoleMismatch {
        /// Owning node.
        node: NodeId,
        /// Parameter id.
        param: String,
        /// Role the operation required ("input" or "output").
        expected: &'static str,
    },

    /// The output is already connected to this input.
    #[error("{output_node}.{output} is already connected to {input_node}.{input}")]
    DuplicateEdge {
        /// Source node.
        output_node: NodeId,
        /// Source output id.
        output: String,
        /// Destination node.
        input_node: NodeId,
        /// Destination input id.
        input: String,
    },

    /// A non-array input already has an incoming edge.
    #[error("input '{param}' on node {node} already has a connection")]
    InputOccupied {
        /// Owning node.
        node: NodeId,
        /// Input id.
        param: String,
    },

    /// A value of the wrong type was written to an input.
    #[error("input '{param}' on node {node} expects {expected:?}, got {found:?}")]
    TypeMismatch {
        /// Owning node.
        node: NodeId,
        /// Input id.
        param: String,
        /// Declared type of the input.
        expected: DataType,
        /// Type of the rejected value.
        found: DataType,
    },

    /// Connecting these nodes would make the graph cyclic, or a traversal
    /// reached a node already on its own path.
    #[error("cycle detected through node {0}")]
    CycleDetected(NodeId),

    /// A block operation was applied to a node that is not a block.
    #[error("node {0} is not a block")]
    NotABlock(NodeId),
}

/// Errors produced while reading or writing a graph document.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The underlying XML stream is malformed.
    #[error("malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),

    /// An attribute could not be decoded.
    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Writing the document failed.
    #[error("failed to write XML: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid UTF-8.
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// A required attribute is absent from an element.
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: &'static str,
    },

    /// An attribute is present but its value cannot be used.
    #[error("<{element}> has invalid {attribute}=\"{value}\"")]
    InvalidAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: &'static str,
        /// Offending value.
        value: String,
    },

    /// The root element is not a graph document.
    #[error("expected <graph> root element, found <{0}>")]
    UnexpectedRoot(String),

    /// Rebuilding the graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Strict loading was requested and some links could not be resolved.
    #[error("{0} connection(s) or block link(s) could not be resolved")]
    UnresolvedLinks(usize),
}

/// A parameter value could not be decoded from its text form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse '{text}' as {data_type:?}")]
pub struct ValueParseError {
    /// Type the text was decoded as.
    pub data_type: DataType,
    /// Offending text.
    pub text: String,
}
