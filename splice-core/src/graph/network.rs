//! Node Graph
//!
//! The graph owns every node and every edge. All topology changes go through
//! it so that the invariants below hold at all times:
//!
//! - an edge always runs from an output parameter to an input parameter;
//! - a non-array input has at most one incoming edge;
//! - the same output/input pair is never connected twice;
//! - the graph is acyclic;
//! - removing a node removes every edge that touches it.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::edge::{Edge, EdgeId};
use super::node::{Node, NodeId};
use super::observer::{GraphEvent, ObserverId, ObserverList};
use super::param::{ParamRef, ParamRole, Parameter};
use super::scheduler::Direction;
use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::time::TimeRange;
use crate::value::Value;

/// The node graph of one project or sequence.
#[derive(Debug, Default)]
pub struct NodeGraph {
    /// All nodes, in insertion order.
    pub(super) nodes: IndexMap<NodeId, Node>,

    /// All edges, in connection order.
    pub(super) edges: IndexMap<EdgeId, Edge>,

    next_edge_id: u64,

    pub(super) observers: ObserverList,

    pub(super) config: GraphConfig,
}

impl NodeGraph {
    /// Create a new empty graph with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty graph.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Add a node to the graph.
    ///
    /// Any edges the node's parameters claim to have are dropped; a node
    /// enters the graph unconnected.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = node.id();
        node.detach_all();

        debug!(node = %id, type_id = node.type_id(), "node added");
        self.nodes.insert(id, node);
        self.observers.notify(&GraphEvent::NodeAdded(id));
        id
    }

    /// Remove a node from the graph.
    ///
    /// Also removes all edges and block links involving this node.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let incident: Vec<EdgeId> = self
            .nodes
            .get(&node_id)?
            .parameters()
            .flat_map(|p| p.edges().iter().copied())
            .collect();

        for edge_id in incident {
            if let Err(err) = self.disconnect(edge_id) {
                warn!(node = %node_id, edge = %edge_id, %err, "failed to sever edge");
            }
        }

        let links: Vec<NodeId> = self.nodes.get(&node_id)?.links().to_vec();
        for other in links {
            if let Some(other) = self.nodes.get_mut(&other) {
                other.remove_link(node_id);
            }
        }

        let node = self.nodes.shift_remove(&node_id)?;
        debug!(node = %node_id, "node removed");
        self.observers.notify(&GraphEvent::NodeRemoved(node_id));
        Some(node)
    }

    /// Get a reference to a node.
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable reference to a node.
    ///
    /// Parameters may be added through this, but edges and values only
    /// change through the graph.
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        self.edges.get(&edge_id)
    }

    /// All edges, in connection order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Look up a parameter.
    pub fn parameter(&self, param: &ParamRef) -> Result<&Parameter, GraphError> {
        self.nodes
            .get(&param.node)
            .ok_or(GraphError::NodeNotFound(param.node))?
            .parameter(&param.param)
            .ok_or_else(|| GraphError::ParameterNotFound {
                node: param.node,
                param: param.param.clone(),
            })
    }

    fn parameter_with_role(
        &self,
        param: &ParamRef,
        role: ParamRole,
    ) -> Result<&Parameter, GraphError> {
        let found = self.parameter(param)?;
        if found.role() != role {
            return Err(GraphError::RoleMismatch {
                node: param.node,
                param: param.param.clone(),
                expected: role.as_str(),
            });
        }
        Ok(found)
    }

    /// The edge between an output and an input, if they are connected.
    pub fn find_edge(&self, output: &ParamRef, input: &ParamRef) -> Option<EdgeId> {
        let input_param = self.parameter(input).ok()?;
        input_param
            .edges()
            .iter()
            .copied()
            .find(|id| self.edges.get(id).is_some_and(|e| e.output() == output))
    }

    /// Connect an output to an input.
    ///
    /// Fails without changing anything if the endpoints are missing or have
    /// the wrong roles, if the pair is already connected, if a non-array
    /// input is already occupied, or if the edge would close a cycle.
    pub fn connect(&mut self, output: &ParamRef, input: &ParamRef) -> Result<EdgeId, GraphError> {
        self.parameter_with_role(output, ParamRole::Output)?;
        let input_param = self.parameter_with_role(input, ParamRole::Input)?;

        if self.find_edge(output, input).is_some() {
            return Err(GraphError::DuplicateEdge {
                output_node: output.node,
                output: output.param.clone(),
                input_node: input.node,
                input: input.param.clone(),
            });
        }

        if !input_param.accepts_edge() {
            return Err(GraphError::InputOccupied {
                node: input.node,
                param: input.param.clone(),
            });
        }

        if self.would_create_cycle(output.node, input.node) {
            return Err(GraphError::CycleDetected(output.node));
        }

        let edge_id = self.insert_edge(output.clone(), input.clone());
        debug!(edge = %edge_id, from = %output, to = %input, "edge added");
        self.observers.notify(&GraphEvent::EdgeAdded {
            edge: edge_id,
            output: output.node,
            input: input.node,
        });
        self.invalidate_after_topology_change(input.node);

        Ok(edge_id)
    }

    /// Insert an edge without validation. Both parameters must exist.
    pub(crate) fn insert_edge(&mut self, output: ParamRef, input: ParamRef) -> EdgeId {
        let edge_id = EdgeId::from(self.next_edge_id);
        self.next_edge_id += 1;

        for endpoint in [&output, &input] {
            if let Some(param) = self
                .nodes
                .get_mut(&endpoint.node)
                .and_then(|n| n.parameter_mut(&endpoint.param))
            {
                param.attach(edge_id);
            }
        }

        self.edges.insert(edge_id, Edge::new(edge_id, output, input));
        edge_id
    }

    /// Remove an edge.
    pub fn disconnect(&mut self, edge_id: EdgeId) -> Result<Edge, GraphError> {
        let edge = self
            .edges
            .shift_remove(&edge_id)
            .ok_or(GraphError::EdgeNotFound(edge_id))?;

        for endpoint in [edge.output(), edge.input()] {
            if let Some(param) = self
                .nodes
                .get_mut(&endpoint.node)
                .and_then(|n| n.parameter_mut(&endpoint.param))
            {
                param.detach(edge_id);
            }
        }

        debug!(edge = %edge_id, "edge removed");
        self.observers.notify(&GraphEvent::EdgeRemoved {
            edge: edge_id,
            output: edge.output_node(),
            input: edge.input_node(),
        });
        self.invalidate_after_topology_change(edge.input_node());

        Ok(edge)
    }

    fn invalidate_after_topology_change(&mut self, node: NodeId) {
        if !self.config.invalidate_on_topology_change {
            return;
        }
        if let Err(err) = self.invalidate_cache(node, TimeRange::all()) {
            warn!(node = %node, %err, "invalidation after topology change failed");
        }
    }

    /// Check if connecting `from_node` → `to_node` would create a cycle.
    ///
    /// Returns true if `to_node` can already reach `from_node`, including
    /// the degenerate case of connecting a node to itself.
    pub fn would_create_cycle(&self, from_node: NodeId, to_node: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(to_node);

        while let Some(current) = queue.pop_front() {
            if current == from_node {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Ok(downstream) = self.neighbours(current, Direction::Downstream) {
                queue.extend(downstream);
            }
        }

        false
    }

    /// Write a value to an input and invalidate everything downstream of it.
    ///
    /// Returns the previous value.
    pub fn set_value(&mut self, input: &ParamRef, value: Value) -> Result<Value, GraphError> {
        let param = self.parameter_with_role(input, ParamRole::Input)?;
        if param.data_type() != value.data_type() {
            return Err(GraphError::TypeMismatch {
                node: input.node,
                param: input.param.clone(),
                expected: param.data_type(),
                found: value.data_type(),
            });
        }

        let previous = self
            .nodes
            .get_mut(&input.node)
            .and_then(|n| n.parameter_mut(&input.param))
            .map(|p| p.replace_value(value))
            .ok_or_else(|| GraphError::ParameterNotFound {
                node: input.node,
                param: input.param.clone(),
            })?;

        self.observers.notify(&GraphEvent::ValueChanged {
            node: input.node,
            param: input.param.clone(),
        });
        self.invalidate_cache(input.node, TimeRange::all())?;

        Ok(previous)
    }

    /// Link two blocks to each other.
    ///
    /// Returns false if they were already linked.
    pub fn link_blocks(&mut self, a: NodeId, b: NodeId) -> Result<bool, GraphError> {
        for id in [a, b] {
            let node = self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))?;
            if !node.is_block() {
                return Err(GraphError::NotABlock(id));
            }
        }

        let mut added = false;
        for (from, to) in [(a, b), (b, a)] {
            if let Some(node) = self.nodes.get_mut(&from) {
                added |= node.add_link(to)?;
            }
        }

        if added {
            debug!(a = %a, b = %b, "blocks linked");
            self.observers.notify(&GraphEvent::BlocksLinked(a, b));
        }
        Ok(added)
    }

    /// Remove the link between two blocks, if any.
    pub fn unlink_blocks(&mut self, a: NodeId, b: NodeId) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(node) = self.nodes.get_mut(&from) {
                node.remove_link(to);
            }
        }
    }

    /// Register a callback for graph events.
    pub fn subscribe<F>(&mut self, notify: F) -> ObserverId
    where
        F: Fn(&GraphEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(notify)
    }

    /// Remove a callback registered with [`NodeGraph::subscribe`].
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }
}
