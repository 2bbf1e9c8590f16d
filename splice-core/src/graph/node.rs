//! Graph Nodes
//!
//! This module defines the nodes that live in the graph: their identity,
//! their ordered parameters, and the per-node record of which time ranges of
//! cached output are stale.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::error;

use super::param::{ParamRef, Parameter};
use crate::error::GraphError;
use crate::time::{TimeRange, TimeRangeList};

/// Unique identifier for a node.
///
/// Ids are process-unique and never reused, so a stale id can only miss,
/// never alias a different node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Refer to one of this node's parameters.
    pub fn param(self, id: impl Into<String>) -> ParamRef {
        ParamRef::new(self, id)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What role the node plays in the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A processing node with no timeline placement.
    Standard,

    /// A node placed on the timeline. Blocks may be linked to other blocks
    /// (a video clip and its audio, for instance); links are kept symmetric
    /// by the graph.
    Block {
        /// Linked blocks, in link order, without duplicates.
        links: SmallVec<[NodeId; 2]>,
    },
}

impl NodeKind {
    /// A block with no links yet.
    pub fn block() -> Self {
        NodeKind::Block {
            links: SmallVec::new(),
        }
    }
}

/// Ranges of a node's cached output that must be re-rendered.
///
/// Propagation only records ranges here. Discarding the actual frames is up
/// to whatever owns them; a render scheduler reads
/// [`FrameCache::invalidated`] and calls [`FrameCache::validate`] as it
/// refills the cache.
#[derive(Debug, Clone, Default)]
pub struct FrameCache {
    invalidated: TimeRangeList,
    invalidation_count: u64,
}

impl FrameCache {
    /// Record that `range` is stale.
    pub fn invalidate(&mut self, range: TimeRange) {
        self.invalidated.insert(range);
        self.invalidation_count += 1;
    }

    /// Record that `range` has been rendered again.
    pub fn validate(&mut self, range: TimeRange) {
        self.invalidated.remove(range);
    }

    /// Ranges still waiting for a render.
    pub fn invalidated(&self) -> &TimeRangeList {
        &self.invalidated
    }

    /// True if nothing needs re-rendering.
    pub fn is_valid(&self) -> bool {
        self.invalidated.is_empty()
    }

    /// Number of invalidations received over the node's lifetime.
    pub fn invalidation_count(&self) -> u64 {
        self.invalidation_count
    }
}

/// A node in the graph.
///
/// A node is not `Clone`. Its id is its identity in the graph, and a copy
/// sharing that id could replace the original while the original's edges
/// are still attached.
///
/// ```compile_fail
/// use splice_core::graph::Node;
///
/// let node = Node::standard("blur");
/// let copy = node.clone();
/// ```
#[derive(Debug)]
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// Registered node type, e.g. "transform" or "clip.video".
    type_id: String,

    /// Display name.
    label: String,

    kind: NodeKind,

    /// Parameters in declaration order, keyed by id.
    params: IndexMap<String, Parameter>,

    cache: FrameCache,
}

impl Node {
    /// Create a new node of the given type.
    pub fn new(type_id: impl Into<String>, kind: NodeKind) -> Self {
        let type_id = type_id.into();
        Self {
            id: NodeId::new(),
            label: type_id.clone(),
            type_id,
            kind,
            params: IndexMap::new(),
            cache: FrameCache::default(),
        }
    }

    /// Create a new standard (non-block) node.
    pub fn standard(type_id: impl Into<String>) -> Self {
        Self::new(type_id, NodeKind::Standard)
    }

    /// Create a new block node.
    pub fn block(type_id: impl Into<String>) -> Self {
        Self::new(type_id, NodeKind::block())
    }

    /// Set the display name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Builder form of [`Node::add_parameter`].
    pub fn with_parameter(mut self, param: Parameter) -> Result<Self, GraphError> {
        self.add_parameter(param)?;
        Ok(self)
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Block { .. })
    }

    /// Blocks linked to this one. Empty for non-blocks.
    pub fn links(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Block { links } => links.as_slice(),
            NodeKind::Standard => &[],
        }
    }

    /// Add a one-way link. Returns false if it already existed.
    pub(crate) fn add_link(&mut self, other: NodeId) -> Result<bool, GraphError> {
        match &mut self.kind {
            NodeKind::Block { links } => {
                if links.contains(&other) {
                    return Ok(false);
                }
                links.push(other);
                Ok(true)
            }
            NodeKind::Standard => Err(GraphError::NotABlock(self.id)),
        }
    }

    /// Forget every edge and link. Used when a node enters a graph.
    pub(crate) fn detach_all(&mut self) {
        for param in self.params.values_mut() {
            param.clear_edges();
        }
        if let NodeKind::Block { links } = &mut self.kind {
            links.clear();
        }
    }

    pub(crate) fn remove_link(&mut self, other: NodeId) {
        if let NodeKind::Block { links } = &mut self.kind {
            links.retain(|l| *l != other);
        }
    }

    /// Attach a parameter.
    ///
    /// Parameter ids are unique per node. Declaring the same id twice is a
    /// bug in the node type and is rejected.
    pub fn add_parameter(&mut self, param: Parameter) -> Result<(), GraphError> {
        if self.params.contains_key(param.id()) {
            error!(node = %self.id, param = param.id(), "duplicate parameter id");
            return Err(GraphError::DuplicateParameter {
                node: self.id,
                param: param.id().to_string(),
            });
        }

        self.params.insert(param.id().to_string(), param);
        Ok(())
    }

    pub fn has_parameter(&self, id: &str) -> bool {
        self.params.contains_key(id)
    }

    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.params.get(id)
    }

    pub(crate) fn parameter_mut(&mut self, id: &str) -> Option<&mut Parameter> {
        self.params.get_mut(id)
    }

    /// Parameter by declaration index.
    pub fn parameter_at(&self, index: usize) -> Option<&Parameter> {
        self.params.get_index(index).map(|(_, p)| p)
    }

    /// Declaration index of a parameter.
    pub fn index_of_parameter(&self, id: &str) -> Option<usize> {
        self.params.get_index_of(id)
    }

    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    /// All parameters in declaration order.
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    /// Input parameters in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values().filter(|p| p.is_input())
    }

    /// Output parameters in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values().filter(|p| p.is_output())
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut FrameCache {
        &mut self.cache
    }
}
