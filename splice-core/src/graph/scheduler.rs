//! Traversal and Invalidation
//!
//! Two walks over the graph, in opposite directions:
//!
//! 1. **Dependencies** walk input edges backward. For each input parameter,
//!    for each incoming edge, the upstream node is appended and then walked
//!    in turn. Nothing is deduplicated: a diamond yields the shared ancestor
//!    once per path.
//!
//! 2. **Invalidation** walks output edges forward. The starting node and
//!    every node reached record the stale range in their frame cache and
//!    observers are told, in depth-first order. By default a node reachable
//!    along two paths is invalidated twice; see
//!    [`GraphConfig::deduplicate_invalidation`](crate::config::GraphConfig).
//!
//! Both walks keep an explicit stack instead of recursing, so long chains
//! cannot overflow the thread stack, and both track the nodes on the current
//! path. Reaching a node that is already on the path means the graph has a
//! cycle, which `connect` never allows; the walk stops with
//! [`GraphError::CycleDetected`] before any node is touched.
//!
//! For render scheduling, [`NodeGraph::evaluation_order`] sorts the
//! deduplicated dependencies topologically (Kahn's algorithm) so that every
//! node comes after everything it reads from.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{error, trace};

use super::network::NodeGraph;
use super::node::NodeId;
use super::observer::GraphEvent;
use crate::error::GraphError;
use crate::time::TimeRange;

/// Which way a walk follows edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// From inputs to the outputs feeding them.
    Upstream,
    /// From outputs to the inputs they feed.
    Downstream,
}

type Neighbours = SmallVec<[NodeId; 4]>;

/// One level of the explicit traversal stack.
struct Frame {
    neighbours: Neighbours,
    cursor: usize,
}

/// Result of one [`NodeGraph::invalidate_cache`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    root: NodeId,
    range: TimeRange,
    visits: Vec<NodeId>,
}

impl Invalidation {
    /// The node the invalidation started from.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Downstream nodes invalidated, in visit order. The root is not
    /// included; a node reached along several paths appears once per path.
    pub fn visits(&self) -> &[NodeId] {
        &self.visits
    }

    /// How many times `node` was reached downstream of the root.
    pub fn visit_count(&self, node: NodeId) -> usize {
        self.visits.iter().filter(|v| **v == node).count()
    }

    /// True if the root has no downstream consumers.
    pub fn is_leaf(&self) -> bool {
        self.visits.is_empty()
    }
}

impl NodeGraph {
    /// Nodes adjacent to `node` in the given direction, in parameter
    /// declaration order and then edge order.
    pub(crate) fn neighbours(
        &self,
        node: NodeId,
        direction: Direction,
    ) -> Result<Neighbours, GraphError> {
        let found = self.nodes.get(&node).ok_or(GraphError::NodeNotFound(node))?;

        let mut out = Neighbours::new();
        for param in found.parameters() {
            let wanted = match direction {
                Direction::Upstream => param.is_input(),
                Direction::Downstream => param.is_output(),
            };
            if !wanted {
                continue;
            }

            for edge_id in param.edges() {
                if let Some(edge) = self.edges.get(edge_id) {
                    out.push(match direction {
                        Direction::Upstream => edge.output_node(),
                        Direction::Downstream => edge.input_node(),
                    });
                }
            }
        }

        Ok(out)
    }

    /// Depth-first preorder walk from `root`, root excluded.
    fn walk(
        &self,
        root: NodeId,
        direction: Direction,
        deduplicate: bool,
    ) -> Result<Vec<NodeId>, GraphError> {
        let mut visits = Vec::new();
        let mut seen = HashSet::new();
        let mut path = IndexSet::new();
        let mut stack = vec![Frame {
            neighbours: self.neighbours(root, direction)?,
            cursor: 0,
        }];
        path.insert(root);

        while let Some(frame) = stack.last_mut() {
            let next = frame.neighbours.get(frame.cursor).copied();
            let Some(next) = next else {
                stack.pop();
                path.pop();
                continue;
            };
            frame.cursor += 1;

            if path.contains(&next) {
                error!(node = %next, root = %root, ?direction, "cycle reached during traversal");
                return Err(GraphError::CycleDetected(next));
            }
            if deduplicate && !seen.insert(next) {
                continue;
            }

            visits.push(next);
            let neighbours = self.neighbours(next, direction)?;
            path.insert(next);
            stack.push(Frame {
                neighbours,
                cursor: 0,
            });
        }

        Ok(visits)
    }

    /// Every node `node` transitively reads from, depth first.
    ///
    /// The list may contain duplicates: an ancestor reachable along two
    /// paths is listed twice. Callers that need a set deduplicate.
    pub fn dependencies(&self, node: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.walk(node, Direction::Upstream, false)
    }

    /// Every node that transitively reads from `node`, depth first, with
    /// the same duplicate rules as [`NodeGraph::dependencies`].
    pub fn dependents(&self, node: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.walk(node, Direction::Downstream, false)
    }

    /// `node` and its dependencies, each once, ordered so that every node
    /// comes after all the nodes it reads from.
    pub fn evaluation_order(&self, node: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let mut members: IndexSet<NodeId> = self
            .walk(node, Direction::Upstream, true)?
            .into_iter()
            .rev()
            .collect();
        members.insert(node);

        // Calculate in-degrees (only counting edges within the member set)
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        let mut queue = VecDeque::new();
        for &member in &members {
            let degree = self
                .neighbours(member, Direction::Upstream)?
                .iter()
                .filter(|n| members.contains(*n))
                .count();
            in_degree.insert(member, degree);
            if degree == 0 {
                queue.push_back(member);
            }
        }

        // Kahn's algorithm
        let mut order = Vec::with_capacity(members.len());
        while let Some(current) = queue.pop_front() {
            order.push(current);

            for dependent in self.neighbours(current, Direction::Downstream)? {
                if let Some(degree) = in_degree.get_mut(&dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        Ok(order)
    }

    /// Mark `range` of `node`'s cached output stale, and the same range of
    /// every node downstream of it.
    ///
    /// Each node records the range in its own [`FrameCache`] and observers
    /// receive [`GraphEvent::CacheInvalidated`], root first, then in
    /// depth-first order along output edges.
    ///
    /// [`FrameCache`]: super::node::FrameCache
    pub fn invalidate_cache(
        &mut self,
        node: NodeId,
        range: TimeRange,
    ) -> Result<Invalidation, GraphError> {
        let visits = self.walk(
            node,
            Direction::Downstream,
            self.config.deduplicate_invalidation,
        )?;

        self.invalidate_one(node, range);
        for &visited in &visits {
            self.invalidate_one(visited, range);
        }

        trace!(root = %node, %range, visits = visits.len(), "cache invalidated");
        Ok(Invalidation {
            root: node,
            range,
            visits,
        })
    }

    fn invalidate_one(&mut self, node: NodeId, range: TimeRange) {
        if let Some(found) = self.nodes.get_mut(&node) {
            found.cache_mut().invalidate(range);
        }
        trace!(node = %node, %range, "node invalidated");
        self.observers
            .notify(&GraphEvent::CacheInvalidated { node, range });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::graph::{Node, Parameter};
    use crate::value::DataType;
    use std::sync::{Arc, Mutex};

    fn quiet_graph() -> NodeGraph {
        NodeGraph::with_config(GraphConfig {
            invalidate_on_topology_change: false,
            ..GraphConfig::default()
        })
    }

    /// A node with two inputs and one output.
    fn add(graph: &mut NodeGraph, name: &str) -> NodeId {
        graph.add_node(
            Node::standard("mix")
                .with_label(name)
                .with_parameter(Parameter::input("a", DataType::Texture))
                .unwrap()
                .with_parameter(Parameter::input("b", DataType::Texture))
                .unwrap()
                .with_parameter(Parameter::output("out", DataType::Texture))
                .unwrap(),
        )
    }

    fn link(graph: &mut NodeGraph, from: NodeId, to: NodeId, input: &str) {
        graph.connect(&from.param("out"), &to.param(input)).unwrap();
    }

    /// A -> B, A -> C, B -> D, C -> D
    fn diamond(graph: &mut NodeGraph) -> [NodeId; 4] {
        let a = add(graph, "a");
        let b = add(graph, "b");
        let c = add(graph, "c");
        let d = add(graph, "d");
        link(graph, a, b, "a");
        link(graph, a, c, "a");
        link(graph, b, d, "a");
        link(graph, c, d, "b");
        [a, b, c, d]
    }

    #[test]
    fn chain_dependencies_contain_every_ancestor() {
        let mut graph = quiet_graph();
        let a = add(&mut graph, "a");
        let b = add(&mut graph, "b");
        let c = add(&mut graph, "c");
        link(&mut graph, a, b, "a");
        link(&mut graph, b, c, "a");

        let deps = graph.dependencies(c).unwrap();
        assert_eq!(deps, vec![b, a]);
        assert!(graph.dependencies(a).unwrap().is_empty());
    }

    #[test]
    fn diamond_dependencies_repeat_shared_ancestor() {
        let mut graph = quiet_graph();
        let [a, b, c, d] = diamond(&mut graph);

        let deps = graph.dependencies(d).unwrap();
        assert_eq!(deps, vec![b, a, c, a]);
        assert_eq!(deps.iter().filter(|n| **n == a).count(), 2);
    }

    #[test]
    fn dependencies_of_missing_node_fail() {
        let graph = quiet_graph();
        let ghost = NodeId::new();
        assert_eq!(graph.dependencies(ghost), Err(GraphError::NodeNotFound(ghost)));
    }

    #[test]
    fn dependents_walk_forward() {
        let mut graph = quiet_graph();
        let [a, b, c, d] = diamond(&mut graph);

        assert_eq!(graph.dependents(a).unwrap(), vec![b, d, c, d]);
        assert!(graph.dependents(d).unwrap().is_empty());
    }

    #[test]
    fn invalidation_reaches_every_downstream_node_per_path() {
        let mut graph = quiet_graph();
        let [a, b, c, d] = diamond(&mut graph);

        let range = TimeRange::new(2, 4);
        let result = graph.invalidate_cache(a, range).unwrap();

        assert_eq!(result.root(), a);
        assert_eq!(result.visits(), &[b, d, c, d]);
        assert_eq!(result.visit_count(d), 2);
        assert_eq!(graph.node(d).unwrap().cache().invalidation_count(), 2);
        for node in [a, b, c, d] {
            assert!(graph.node(node).unwrap().cache().invalidated().intersects(&range));
        }
    }

    #[test]
    fn invalidation_does_not_flow_upstream() {
        let mut graph = quiet_graph();
        let [a, b, c, d] = diamond(&mut graph);

        graph.invalidate_cache(b, TimeRange::new(0, 1)).unwrap();

        assert!(graph.node(a).unwrap().cache().is_valid());
        assert!(graph.node(c).unwrap().cache().is_valid());
        assert!(!graph.node(b).unwrap().cache().is_valid());
        assert!(!graph.node(d).unwrap().cache().is_valid());
    }

    #[test]
    fn leaf_invalidation_makes_no_recursive_visits() {
        let mut graph = quiet_graph();
        let [_, _, _, d] = diamond(&mut graph);

        let result = graph.invalidate_cache(d, TimeRange::all()).unwrap();
        assert!(result.is_leaf());
        assert_eq!(graph.node(d).unwrap().cache().invalidation_count(), 1);
    }

    #[test]
    fn deduplicated_invalidation_visits_each_node_once() {
        let mut graph = NodeGraph::with_config(GraphConfig {
            invalidate_on_topology_change: false,
            deduplicate_invalidation: true,
            ..GraphConfig::default()
        });
        let [a, b, c, d] = diamond(&mut graph);

        let result = graph.invalidate_cache(a, TimeRange::all()).unwrap();
        assert_eq!(result.visits(), &[b, d, c]);
        assert_eq!(graph.node(d).unwrap().cache().invalidation_count(), 1);
    }

    #[test]
    fn observers_receive_invalidations_in_visit_order() {
        let mut graph = quiet_graph();
        let [a, b, c, d] = diamond(&mut graph);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        graph.subscribe(move |event| {
            if let GraphEvent::CacheInvalidated { node, .. } = event {
                sink.lock().unwrap().push(*node);
            }
        });

        graph.invalidate_cache(a, TimeRange::all()).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![a, b, d, c, d]);
    }

    #[test]
    fn cycles_are_reported_instead_of_looping() {
        let mut graph = quiet_graph();
        let a = add(&mut graph, "a");
        let b = add(&mut graph, "b");
        link(&mut graph, a, b, "a");

        // Bypass validation to simulate a corrupted graph.
        graph.insert_edge(b.param("out"), a.param("a"));

        assert_eq!(graph.dependencies(a), Err(GraphError::CycleDetected(a)));
        assert_eq!(
            graph.invalidate_cache(a, TimeRange::all()),
            Err(GraphError::CycleDetected(a))
        );
        assert!(graph.node(a).unwrap().cache().is_valid());
        assert!(graph.evaluation_order(b).is_err());
    }

    #[test]
    fn evaluation_order_puts_dependencies_first() {
        let mut graph = quiet_graph();
        let [a, b, c, d] = diamond(&mut graph);

        let order = graph.evaluation_order(d).unwrap();
        assert_eq!(order.len(), 4);
        assert_eq!(order.first(), Some(&a));
        assert_eq!(order.last(), Some(&d));

        let pos = |n: NodeId| order.iter().position(|x| *x == n).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(a) < pos(c));
        assert!(pos(b) < pos(d));
        assert!(pos(c) < pos(d));
    }

    #[test]
    fn evaluation_order_ignores_unrelated_nodes() {
        let mut graph = quiet_graph();
        let [a, b, _, _] = diamond(&mut graph);
        let unrelated = add(&mut graph, "unrelated");

        let order = graph.evaluation_order(b).unwrap();
        assert_eq!(order, vec![a, b]);
        assert!(!order.contains(&unrelated));
    }
}
