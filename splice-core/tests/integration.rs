//! Integration Tests for the Node Graph
//!
//! These tests drive the public API end to end: building graphs, walking
//! them, invalidating caches and round-tripping projects through XML.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use splice_core::graph::{GraphEvent, Node, NodeGraph, NodeId, Parameter};
use splice_core::time::{Rational, TimeRange};
use splice_core::undo::{MultiUndoCommand, UndoCommand};
use splice_core::value::{DataType, Value};
use splice_core::xml::{
    connect_nodes, read_graph, write_graph, Item, SerializedConnection, XmlNodeData,
};
use splice_core::{GraphConfig, GraphError};

fn quiet() -> GraphConfig {
    GraphConfig {
        invalidate_on_topology_change: false,
        ..GraphConfig::default()
    }
}

/// A node with one array input and one output, so any number of upstream
/// nodes can feed it.
fn merge_node(label: &str) -> Node {
    Node::standard("merge")
        .with_label(label)
        .with_parameter(Parameter::input("in", DataType::Texture).array())
        .unwrap()
        .with_parameter(Parameter::output("out", DataType::Texture))
        .unwrap()
}

fn feed(graph: &mut NodeGraph, from: NodeId, to: NodeId) {
    graph.connect(&from.param("out"), &to.param("in")).unwrap();
}

/// Chain A -> B -> C.
#[test]
fn chain_dependencies_and_invalidation() {
    let mut graph = NodeGraph::with_config(quiet());
    let a = graph.add_node(merge_node("A"));
    let b = graph.add_node(merge_node("B"));
    let c = graph.add_node(merge_node("C"));
    feed(&mut graph, a, b);
    feed(&mut graph, b, c);

    assert_eq!(graph.dependencies(c).unwrap(), vec![b, a]);
    assert_eq!(graph.dependencies(a).unwrap(), Vec::<NodeId>::new());

    let range = TimeRange::new(Rational::new(1, 2), 3);
    let invalidation = graph.invalidate_cache(a, range).unwrap();
    assert_eq!(invalidation.visits(), &[b, c]);

    for node in [a, b, c] {
        let cache = graph.node(node).unwrap().cache();
        assert!(cache.invalidated().intersects(&range));
        assert_eq!(cache.invalidation_count(), 1);
    }
}

/// Diamond A -> B, A -> C, B -> D, C -> D.
#[test]
fn diamond_reports_shared_nodes_once_per_path() {
    let mut graph = NodeGraph::with_config(quiet());
    let a = graph.add_node(merge_node("A"));
    let b = graph.add_node(merge_node("B"));
    let c = graph.add_node(merge_node("C"));
    let d = graph.add_node(merge_node("D"));
    feed(&mut graph, a, b);
    feed(&mut graph, a, c);
    feed(&mut graph, b, d);
    feed(&mut graph, c, d);

    assert_eq!(graph.dependencies(d).unwrap(), vec![b, a, c, a]);

    let invalidation = graph.invalidate_cache(a, TimeRange::all()).unwrap();
    assert_eq!(invalidation.visits(), &[b, d, c, d]);
    assert_eq!(invalidation.visit_count(d), 2);
    assert_eq!(graph.node(d).unwrap().cache().invalidation_count(), 2);

    let order = graph.evaluation_order(d).unwrap();
    assert_eq!(order.first(), Some(&a));
    assert_eq!(order.last(), Some(&d));
    assert_eq!(order.len(), 4);
}

#[test]
fn deduplicated_invalidation_visits_each_node_once() {
    let mut graph = NodeGraph::with_config(GraphConfig {
        deduplicate_invalidation: true,
        ..quiet()
    });
    let a = graph.add_node(merge_node("A"));
    let b = graph.add_node(merge_node("B"));
    let c = graph.add_node(merge_node("C"));
    let d = graph.add_node(merge_node("D"));
    feed(&mut graph, a, b);
    feed(&mut graph, a, c);
    feed(&mut graph, b, d);
    feed(&mut graph, c, d);

    let invalidation = graph.invalidate_cache(a, TimeRange::all()).unwrap();
    assert_eq!(invalidation.visits(), &[b, d, c]);
}

#[test]
fn setting_a_value_invalidates_downstream_only() {
    let mut graph = NodeGraph::with_config(quiet());
    let source = graph.add_node(merge_node("source"));
    let blur = graph.add_node(
        merge_node("blur")
            .with_parameter(Parameter::input("radius", DataType::Float))
            .unwrap(),
    );
    let viewer = graph.add_node(merge_node("viewer"));
    feed(&mut graph, source, blur);
    feed(&mut graph, blur, viewer);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    graph.subscribe(move |event| {
        if let GraphEvent::CacheInvalidated { node, .. } = event {
            sink.lock().unwrap().push(*node);
        }
    });

    let previous = graph
        .set_value(&blur.param("radius"), Value::Float(3.0))
        .unwrap();
    assert_eq!(previous, Value::Float(0.0));
    assert_eq!(*events.lock().unwrap(), vec![blur, viewer]);
    assert!(graph.node(source).unwrap().cache().is_valid());
}

#[test]
fn rejected_edits_leave_the_graph_unchanged() {
    let mut graph = NodeGraph::with_config(quiet());
    let a = graph.add_node(merge_node("A"));
    let b = graph.add_node(merge_node("B"));
    feed(&mut graph, a, b);

    assert_eq!(
        graph.connect(&b.param("out"), &a.param("in")),
        Err(GraphError::CycleDetected(b))
    );
    assert!(matches!(
        graph.connect(&a.param("out"), &b.param("in")),
        Err(GraphError::DuplicateEdge { .. })
    ));
    assert!(matches!(
        graph.set_value(&b.param("in"), Value::Int(1)),
        Err(GraphError::TypeMismatch { .. })
    ));
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.dependencies(a).unwrap(), Vec::<NodeId>::new());
}

#[test]
fn removing_a_node_severs_its_edges() {
    let mut graph = NodeGraph::with_config(quiet());
    let a = graph.add_node(merge_node("A"));
    let b = graph.add_node(merge_node("B"));
    let c = graph.add_node(merge_node("C"));
    feed(&mut graph, a, b);
    feed(&mut graph, b, c);

    graph.remove_node(b).unwrap();

    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.dependencies(c).unwrap(), Vec::<NodeId>::new());
    assert!(graph.invalidate_cache(a, TimeRange::all()).unwrap().is_leaf());
    assert_eq!(
        graph.dependencies(b),
        Err(GraphError::NodeNotFound(b))
    );
}

/// Build a small project with every feature the file format carries.
fn sample_project() -> (NodeGraph, Vec<Item>, [NodeId; 5]) {
    let mut graph = NodeGraph::with_config(quiet());

    let left = graph.add_node(merge_node("Left"));
    let right = graph.add_node(merge_node("Right"));
    let mix = graph.add_node(
        merge_node("Mix")
            .with_parameter(
                Parameter::input("amount", DataType::Float).with_value(Value::Float(0.25)),
            )
            .unwrap()
            .with_parameter(
                Parameter::input("tint", DataType::Color)
                    .with_value(Value::Color([1.0, 0.5, 0.0, 1.0])),
            )
            .unwrap()
            .with_parameter(
                Parameter::input("title", DataType::Text)
                    .with_value(Value::Text("<Intro> & \"Credits\"".into())),
            )
            .unwrap()
            .with_parameter(
                Parameter::input("offset", DataType::Rational)
                    .with_value(Value::Rational(Rational::new(1001, 30000))),
            )
            .unwrap(),
    );
    // Right feeds first so array edge order differs from node order.
    feed(&mut graph, right, mix);
    feed(&mut graph, left, mix);

    let video = graph.add_node(Node::block("clip").with_label("video"));
    let audio = graph.add_node(Node::block("clip").with_label("audio"));
    graph.link_blocks(video, audio).unwrap();

    let items = vec![Item::new("left.mov"), Item::new("right.mov")];
    (graph, items, [left, right, mix, video, audio])
}

#[test]
fn project_round_trips_through_xml() {
    let (graph, items, [left, right, mix, video, audio]) = sample_project();

    let xml = write_graph(&graph, &items).unwrap();
    let loaded = read_graph(&xml, &quiet()).unwrap();
    let map = |id: NodeId| loaded.tokens[&id.raw()];

    assert_eq!(loaded.graph.node_count(), graph.node_count());
    assert_eq!(loaded.graph.edge_count(), graph.edge_count());
    assert_eq!(loaded.report.skipped(), 0);
    assert_eq!(loaded.report.blocks_linked, 1);

    for original in graph.nodes() {
        let copy = loaded.graph.node(map(original.id())).unwrap();
        assert_eq!(copy.type_id(), original.type_id());
        assert_eq!(copy.label(), original.label());
        assert_eq!(copy.is_block(), original.is_block());

        let ids: Vec<_> = copy.parameters().map(|p| p.id().to_string()).collect();
        let expected: Vec<_> = original.parameters().map(|p| p.id().to_string()).collect();
        assert_eq!(ids, expected);

        for param in original.parameters() {
            let restored = copy.parameter(param.id()).unwrap();
            assert_eq!(restored.value(), param.value());
            assert_eq!(restored.is_array(), param.is_array());
            assert_eq!(restored.role(), param.role());
        }
    }

    // Array input edges keep their order.
    assert_eq!(
        loaded.graph.dependencies(map(mix)).unwrap(),
        vec![map(right), map(left)]
    );
    assert_eq!(
        loaded.graph.node(map(video)).unwrap().links(),
        &[map(audio)]
    );

    let names: Vec<_> = loaded.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["left.mov", "right.mov"]);

    // Saving the loaded graph again is stable apart from the tokens.
    let again = read_graph(&write_graph(&loaded.graph, &loaded.items).unwrap(), &quiet()).unwrap();
    assert_eq!(again.graph.node_count(), graph.node_count());
    assert_eq!(again.graph.edge_count(), graph.edge_count());
}

#[test]
fn loader_tolerates_dangling_references() {
    let xml = r#"<graph version="1"><nodes>
        <node token="1" type="merge" label="A">
          <param id="in" role="input" type="texture" array="1"/>
          <param id="out" role="output" type="texture"/>
        </node>
        <node token="2" type="merge" label="B">
          <param id="in" role="input" type="texture" array="1"/>
          <param id="out" role="output" type="texture"/>
          <connection input="in" node="1" output="out"/>
          <connection input="in" node="9" output="out"/>
          <connection input="missing" node="1" output="out"/>
          <link token="1"/>
        </node>
    </nodes></graph>"#;

    let loaded = read_graph(xml, &quiet()).unwrap();

    assert_eq!(loaded.graph.edge_count(), 1);
    assert_eq!(loaded.report.connected, 1);
    assert_eq!(loaded.report.missing_source, 1);
    assert_eq!(loaded.report.missing_destination, 1);
    // Node 1 is not a block.
    assert_eq!(loaded.report.unresolved_links, 1);
}

#[test]
fn duplicate_tokens_resolve_to_the_last_node() {
    let xml = r#"<graph><nodes>
        <node token="5" type="merge" label="first">
          <param id="out" role="output" type="texture"/>
        </node>
        <node token="5" type="merge" label="second">
          <param id="out" role="output" type="texture"/>
        </node>
        <node token="6" type="merge" label="sink">
          <param id="in" role="input" type="texture" array="1"/>
          <connection input="in" node="5" output="out"/>
        </node>
    </nodes></graph>"#;

    let loaded = read_graph(xml, &quiet()).unwrap();
    let sink = loaded.tokens[&6];
    let source = loaded.graph.dependencies(sink).unwrap();

    assert_eq!(loaded.graph.node_count(), 3);
    assert_eq!(source.len(), 1);
    assert_eq!(loaded.graph.node(source[0]).unwrap().label(), "second");
}

#[test]
fn pasted_connections_become_one_undo_step() {
    let mut graph = NodeGraph::with_config(quiet());
    let a = graph.add_node(merge_node("A"));
    let b = graph.add_node(merge_node("B"));
    let c = graph.add_node(merge_node("C"));

    let mut data = XmlNodeData::new();
    data.register_node(100, a);
    data.register_node(101, b);
    for (input, token) in [(b, 100), (c, 101)] {
        data.add_connection(SerializedConnection {
            input: input.param("in"),
            output_node: token,
            output: "out".to_string(),
        });
    }

    let mut paste = MultiUndoCommand::new("Paste");
    let report = connect_nodes(&mut graph, &data, Some(&mut paste));
    assert_eq!(report.deferred, 2);
    assert_eq!(graph.edge_count(), 0);

    paste.redo(&mut graph).unwrap();
    assert_eq!(graph.dependencies(c).unwrap(), vec![b, a]);

    paste.undo(&mut graph).unwrap();
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn pasted_cycle_is_skipped_without_losing_later_connections() {
    let mut graph = NodeGraph::with_config(quiet());
    let a = graph.add_node(merge_node("A"));
    let b = graph.add_node(merge_node("B"));
    let c = graph.add_node(merge_node("C"));

    let mut data = XmlNodeData::new();
    data.register_node(100, a);
    data.register_node(101, b);
    // b -> a closes a cycle once a -> b exists.
    for (input, token) in [(b, 100), (a, 101), (c, 100)] {
        data.add_connection(SerializedConnection {
            input: input.param("in"),
            output_node: token,
            output: "out".to_string(),
        });
    }

    let mut paste = MultiUndoCommand::new("Paste");
    let report = connect_nodes(&mut graph, &data, Some(&mut paste));
    assert_eq!(report.deferred, 3);

    paste.redo(&mut graph).unwrap();
    assert_eq!(graph.edge_count(), 2);
    assert_eq!(graph.dependencies(b).unwrap(), vec![a]);
    assert_eq!(graph.dependencies(c).unwrap(), vec![a]);
    assert!(graph.dependencies(a).unwrap().is_empty());

    paste.undo(&mut graph).unwrap();
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn config_loads_from_json() {
    let config = GraphConfig::from_json(r#"{ "deduplicate_invalidation": true }"#).unwrap();
    assert!(config.deduplicate_invalidation);
    assert!(config.invalidate_on_topology_change);
    assert!(!config.strict_links);
}

/// Random DAG: node count plus candidate edges, oriented low to high index.
fn dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..10).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..24)))
}

fn build(n: usize, edges: &[(usize, usize)]) -> (NodeGraph, Vec<NodeId>) {
    let mut graph = NodeGraph::with_config(quiet());
    let ids: Vec<_> = (0..n)
        .map(|i| graph.add_node(merge_node(&i.to_string())))
        .collect();

    for &(x, y) in edges {
        let (from, to) = (x.min(y), x.max(y));
        if from != to {
            // Repeated pairs are rejected as duplicates.
            let _ = graph.connect(&ids[from].param("out"), &ids[to].param("in"));
        }
    }
    (graph, ids)
}

proptest! {
    #[test]
    fn traversal_stays_within_reachable_nodes((n, edges) in dag()) {
        let (mut graph, ids) = build(n, &edges);
        let index: HashMap<NodeId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        for (i, &id) in ids.iter().enumerate() {
            for dep in graph.dependencies(id).unwrap() {
                prop_assert!(index[&dep] < i);
            }

            let order = graph.evaluation_order(id).unwrap();
            prop_assert_eq!(order.last(), Some(&id));
            let position: HashMap<NodeId, usize> =
                order.iter().enumerate().map(|(p, id)| (*id, p)).collect();
            for edge in graph.edges() {
                if let (Some(from), Some(to)) =
                    (position.get(&edge.output_node()), position.get(&edge.input_node()))
                {
                    prop_assert!(from < to);
                }
            }
        }

        let root = ids[0];
        let dependents = graph.dependents(root).unwrap();
        let invalidation = graph.invalidate_cache(root, TimeRange::all()).unwrap();
        prop_assert_eq!(invalidation.visits(), dependents.as_slice());

        for &id in &ids {
            let count = graph.node(id).unwrap().cache().invalidation_count();
            if id == root {
                prop_assert_eq!(count, 1);
            } else {
                prop_assert_eq!(count, invalidation.visit_count(id) as u64);
            }
        }
    }
}
