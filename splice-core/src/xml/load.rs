//! Project Reader
//!
//! Rebuilds a [`NodeGraph`] from the document written by
//! [`write_graph`](super::write_graph). Loading runs in two phases:
//!
//! 1. Every node is created with its parameters and values. Connections and
//!    block links are recorded in an [`XmlNodeData`] by token.
//! 2. [`connect_nodes`] and [`link_blocks`] resolve the tokens.
//!
//! Malformed structure (a missing required attribute, an unknown role or
//! type) fails the load. A value that does not parse keeps the parameter's
//! default. Unknown elements are skipped so newer files still open.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::GraphConfig;
use crate::error::XmlError;
use crate::graph::{Node, NodeGraph, NodeId, NodeKind, ParamRole, Parameter};
use crate::value::{DataType, Value};

use super::data::{BlockLink, Item, ItemId, SerializedConnection, XmlNodeData};
use super::link::{connect_nodes, link_blocks, LinkReport};
use super::reader::XmlCursor;

/// Result of a successful load.
#[derive(Debug)]
pub struct LoadedGraph {
    pub graph: NodeGraph,
    pub items: Vec<Item>,
    /// Saved token of each loaded node.
    pub tokens: HashMap<u64, NodeId>,
    /// Saved token of each loaded item, so other project data can refer to
    /// items the way it was saved.
    pub item_tokens: HashMap<u64, ItemId>,
    pub report: LinkReport,
}

/// Parse a graph document.
///
/// With [`GraphConfig::strict_links`] set, any skipped connection or block
/// link fails the load with [`XmlError::UnresolvedLinks`].
pub fn read_graph(xml: &str, config: &GraphConfig) -> Result<LoadedGraph, XmlError> {
    let mut cursor = XmlCursor::new(xml);

    if !cursor.read_next_start_element()? {
        return Err(XmlError::UnexpectedRoot(String::new()));
    }
    if cursor.name() != "graph" {
        return Err(XmlError::UnexpectedRoot(cursor.name().to_string()));
    }
    if let Some(version) = cursor.attribute("version") {
        debug!(version, "reading graph document");
    }

    let mut graph = NodeGraph::with_config(config.clone());
    let mut data = XmlNodeData::new();
    let mut items = Vec::new();

    while cursor.read_next_start_element()? {
        let name = cursor.name().to_string();
        match name.as_str() {
            "items" => read_items(&mut cursor, &mut data, &mut items)?,
            "nodes" => read_nodes(&mut cursor, &mut graph, &mut data)?,
            _ => {
                debug!(element = %name, "skipping unknown element");
                cursor.skip_current_element()?;
            }
        }
    }

    let mut report = connect_nodes(&mut graph, &data, None);
    report.merge(link_blocks(&mut graph, &data));

    if config.strict_links && report.skipped() > 0 {
        return Err(XmlError::UnresolvedLinks(report.skipped()));
    }

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        items = items.len(),
        skipped = report.skipped(),
        "graph loaded"
    );

    let (tokens, item_tokens) = data.into_tokens();
    Ok(LoadedGraph {
        graph,
        items,
        tokens,
        item_tokens,
        report,
    })
}

fn read_items(
    cursor: &mut XmlCursor<'_>,
    data: &mut XmlNodeData,
    items: &mut Vec<Item>,
) -> Result<(), XmlError> {
    while cursor.read_next_start_element()? {
        if cursor.name() == "item" {
            let token: u64 = cursor.parse_attribute("token")?;
            let item = Item::new(cursor.attribute("name").unwrap_or_default());
            data.register_item(token, item.id);
            items.push(item);
        }
        cursor.skip_current_element()?;
    }
    Ok(())
}

fn read_nodes(
    cursor: &mut XmlCursor<'_>,
    graph: &mut NodeGraph,
    data: &mut XmlNodeData,
) -> Result<(), XmlError> {
    while cursor.read_next_start_element()? {
        if cursor.name() == "node" {
            read_node(cursor, graph, data)?;
        } else {
            cursor.skip_current_element()?;
        }
    }
    Ok(())
}

fn read_node(
    cursor: &mut XmlCursor<'_>,
    graph: &mut NodeGraph,
    data: &mut XmlNodeData,
) -> Result<(), XmlError> {
    let token: u64 = cursor.parse_attribute("token")?;
    let type_id = cursor.required_attribute("type")?.to_string();
    let kind = match cursor.attribute("kind").unwrap_or("standard") {
        "standard" => NodeKind::Standard,
        "block" => NodeKind::block(),
        other => {
            return Err(XmlError::InvalidAttribute {
                element: "node".to_string(),
                attribute: "kind",
                value: other.to_string(),
            })
        }
    };

    let mut node = Node::new(type_id, kind);
    if let Some(label) = cursor.attribute("label") {
        node.set_label(label);
    }
    let id = node.id();

    let mut connections = Vec::new();
    let mut links = Vec::new();

    while cursor.read_next_start_element()? {
        match cursor.name() {
            "param" => {
                let param = read_param(cursor)?;
                node.add_parameter(param)?;
            }
            "connection" => {
                connections.push(SerializedConnection {
                    input: id.param(cursor.required_attribute("input")?),
                    output_node: cursor.parse_attribute("node")?,
                    output: cursor.required_attribute("output")?.to_string(),
                });
                cursor.skip_current_element()?;
            }
            "link" => {
                links.push(BlockLink {
                    block: id,
                    link: cursor.parse_attribute("token")?,
                });
                cursor.skip_current_element()?;
            }
            _ => cursor.skip_current_element()?,
        }
    }

    graph.add_node(node);
    data.register_node(token, id);
    for connection in connections {
        data.add_connection(connection);
    }
    for link in links {
        data.add_block_link(link);
    }
    Ok(())
}

fn read_param(cursor: &mut XmlCursor<'_>) -> Result<Parameter, XmlError> {
    let id = cursor.required_attribute("id")?.to_string();

    let role_name = cursor.required_attribute("role")?;
    let role = ParamRole::from_name(role_name).ok_or_else(|| XmlError::InvalidAttribute {
        element: "param".to_string(),
        attribute: "role",
        value: role_name.to_string(),
    })?;

    let type_name = cursor.required_attribute("type")?;
    let data_type = DataType::from_name(type_name).ok_or_else(|| XmlError::InvalidAttribute {
        element: "param".to_string(),
        attribute: "type",
        value: type_name.to_string(),
    })?;

    let array = matches!(cursor.attribute("array"), Some("1" | "true"));

    let mut param = match role {
        ParamRole::Input => Parameter::input(id, data_type),
        ParamRole::Output => Parameter::output(id, data_type),
    };
    if array {
        param = param.array();
    }

    while cursor.read_next_start_element()? {
        if cursor.name() != "value" {
            cursor.skip_current_element()?;
            continue;
        }

        let text = cursor.read_element_text()?;
        match Value::parse(data_type, &text) {
            Ok(value) => param = param.with_value(value),
            Err(err) => warn!(param = %param.id(), %err, "keeping default value"),
        }
    }

    Ok(param)
}
