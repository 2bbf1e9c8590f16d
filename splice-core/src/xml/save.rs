//! Project Writer
//!
//! Serializes a [`NodeGraph`] and its items to the document format read by
//! [`read_graph`](super::read_graph):
//!
//! ```xml
//! <graph version="1">
//!   <items>
//!     <item token="3" name="clip.mp4"/>
//!   </items>
//!   <nodes>
//!     <node token="12" type="blur" label="" kind="standard">
//!       <param id="texture" role="input" type="texture" array="0"/>
//!       <param id="radius" role="input" type="float" array="0">
//!         <value>2.5</value>
//!       </param>
//!       <connection input="texture" node="11" output="out"/>
//!     </node>
//!   </nodes>
//! </graph>
//! ```
//!
//! Node and item tokens are their raw ids. Connections are written on the
//! destination node, input by input, preserving edge order.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::debug;

use crate::error::XmlError;
use crate::graph::{Node, NodeGraph, NodeKind, Parameter};

use super::data::Item;

/// Document format version written by [`write_graph`].
pub const FORMAT_VERSION: u32 = 1;

type XmlWriter = Writer<Vec<u8>>;

/// Serialize a graph and its items to an XML string.
pub fn write_graph(graph: &NodeGraph, items: &[Item]) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let version = FORMAT_VERSION.to_string();
    writer.write_event(Event::Start(
        BytesStart::new("graph").with_attributes([("version", version.as_str())]),
    ))?;

    writer.write_event(Event::Start(BytesStart::new("items")))?;
    for item in items {
        let token = item.id.raw().to_string();
        writer.write_event(Event::Empty(BytesStart::new("item").with_attributes([
            ("token", token.as_str()),
            ("name", item.name.as_str()),
        ])))?;
    }
    writer.write_event(Event::End(BytesEnd::new("items")))?;

    writer.write_event(Event::Start(BytesStart::new("nodes")))?;
    for node in graph.nodes() {
        write_node(&mut writer, graph, node)?;
    }
    writer.write_event(Event::End(BytesEnd::new("nodes")))?;

    writer.write_event(Event::End(BytesEnd::new("graph")))?;

    let xml = String::from_utf8(writer.into_inner())?;
    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        items = items.len(),
        bytes = xml.len(),
        "graph serialized"
    );
    Ok(xml)
}

fn write_node(writer: &mut XmlWriter, graph: &NodeGraph, node: &Node) -> Result<(), XmlError> {
    let token = node.id().raw().to_string();
    let kind = match node.kind() {
        NodeKind::Standard => "standard",
        NodeKind::Block { .. } => "block",
    };

    writer.write_event(Event::Start(BytesStart::new("node").with_attributes([
        ("token", token.as_str()),
        ("type", node.type_id()),
        ("label", node.label()),
        ("kind", kind),
    ])))?;

    for param in node.parameters() {
        write_param(writer, param)?;
    }

    for input in node.inputs() {
        for edge_id in input.edges() {
            let Some(edge) = graph.edge(*edge_id) else {
                continue;
            };
            let source = edge.output_node().raw().to_string();
            writer.write_event(Event::Empty(BytesStart::new("connection").with_attributes([
                ("input", input.id()),
                ("node", source.as_str()),
                ("output", edge.output().param.as_str()),
            ])))?;
        }
    }

    for link in node.links() {
        let token = link.raw().to_string();
        writer.write_event(Event::Empty(
            BytesStart::new("link").with_attributes([("token", token.as_str())]),
        ))?;
    }

    writer.write_event(Event::End(BytesEnd::new("node")))?;
    Ok(())
}

fn write_param(writer: &mut XmlWriter, param: &Parameter) -> Result<(), XmlError> {
    let element = BytesStart::new("param").with_attributes([
        ("id", param.id()),
        ("role", param.role().as_str()),
        ("type", param.data_type().as_str()),
        ("array", if param.is_array() { "1" } else { "0" }),
    ]);

    if !(param.is_input() && param.data_type().is_storable()) {
        writer.write_event(Event::Empty(element))?;
        return Ok(());
    }

    writer.write_event(Event::Start(element))?;
    let text = param.value().to_text();
    writer.write_event(Event::Start(BytesStart::new("value")))?;
    writer.write_event(Event::Text(BytesText::new(&text)))?;
    writer.write_event(Event::End(BytesEnd::new("value")))?;
    writer.write_event(Event::End(BytesEnd::new("param")))?;
    Ok(())
}
