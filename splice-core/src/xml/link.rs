//! Deferred Linking
//!
//! Connections and block links in a project file name their far end by
//! token. Once every node is loaded, these passes resolve the tokens and
//! rebuild the topology. A reference that cannot be resolved is skipped and
//! counted. One bad reference never aborts the rest of the load.

use tracing::{debug, warn};

use crate::graph::NodeGraph;
use crate::undo::{EdgeAddCommand, MultiUndoCommand};

use super::data::XmlNodeData;

/// Outcome of the linking passes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkReport {
    /// Edges created directly in the graph.
    pub connected: usize,
    /// Edges queued as child commands instead of being created.
    pub deferred: usize,
    /// Connections whose source token is not registered.
    pub missing_source: usize,
    /// Connections whose destination input no longer exists.
    pub missing_destination: usize,
    /// Connections whose source node lacks the named output.
    pub missing_output: usize,
    /// Connections the graph refused (cycle, occupied input, wrong role).
    pub rejected: usize,
    /// Block pairs newly linked.
    pub blocks_linked: usize,
    /// Block links whose target is missing or is not a block.
    pub unresolved_links: usize,
}

impl LinkReport {
    /// Total references that were dropped.
    pub fn skipped(&self) -> usize {
        self.missing_source
            + self.missing_destination
            + self.missing_output
            + self.rejected
            + self.unresolved_links
    }

    /// Add another report's counters to this one.
    pub fn merge(&mut self, other: LinkReport) {
        self.connected += other.connected;
        self.deferred += other.deferred;
        self.missing_source += other.missing_source;
        self.missing_destination += other.missing_destination;
        self.missing_output += other.missing_output;
        self.rejected += other.rejected;
        self.blocks_linked += other.blocks_linked;
        self.unresolved_links += other.unresolved_links;
    }
}

/// Recreate the saved connections.
///
/// With a `command`, each resolved connection is appended to it as an
/// [`EdgeAddCommand`] and nothing is applied; the edges appear when the
/// command is redone. A queued connection the graph refuses at that point
/// is skipped with a warning, like an immediate one, so the rest of the
/// command still applies. Without a command, edges are created immediately.
pub fn connect_nodes(
    graph: &mut NodeGraph,
    data: &XmlNodeData,
    mut command: Option<&mut MultiUndoCommand>,
) -> LinkReport {
    let mut report = LinkReport::default();

    for connection in data.connections() {
        let Some(source) = data.node(connection.output_node) else {
            warn!(
                token = connection.output_node,
                input = %connection.input,
                "connection source not found"
            );
            report.missing_source += 1;
            continue;
        };

        let Some(destination) = graph.node(connection.input.node) else {
            warn!(input = %connection.input, "connection destination node not found");
            report.missing_destination += 1;
            continue;
        };
        if !destination.has_parameter(&connection.input.param) {
            warn!(input = %connection.input, "connection destination input not found");
            report.missing_destination += 1;
            continue;
        }

        let has_output = graph
            .node(source)
            .is_some_and(|n| n.has_parameter(&connection.output));
        if !has_output {
            warn!(
                node = %source,
                output = %connection.output,
                "connection source output not found"
            );
            report.missing_output += 1;
            continue;
        }

        let output = source.param(connection.output.clone());
        match command.as_mut() {
            Some(command) => {
                command.add_child(Box::new(
                    EdgeAddCommand::new(output, connection.input.clone()).skip_rejected(),
                ));
                report.deferred += 1;
            }
            None => match graph.connect(&output, &connection.input) {
                Ok(_) => report.connected += 1,
                Err(err) => {
                    warn!(%output, input = %connection.input, %err, "connection rejected");
                    report.rejected += 1;
                }
            },
        }
    }

    debug!(
        connected = report.connected,
        deferred = report.deferred,
        skipped = report.skipped(),
        "connections restored"
    );
    report
}

/// Re-establish the saved links between blocks.
///
/// Each link is saved on both blocks, so the second record of a pair is
/// already satisfied and is not counted again.
pub fn link_blocks(graph: &mut NodeGraph, data: &XmlNodeData) -> LinkReport {
    let mut report = LinkReport::default();

    for link in data.block_links() {
        let Some(target) = data.node(link.link) else {
            warn!(block = %link.block, token = link.link, "linked block not found");
            report.unresolved_links += 1;
            continue;
        };

        match graph.link_blocks(link.block, target) {
            Ok(true) => report.blocks_linked += 1,
            Ok(false) => {}
            Err(err) => {
                warn!(block = %link.block, %target, %err, "block link rejected");
                report.unresolved_links += 1;
            }
        }
    }

    debug!(
        linked = report.blocks_linked,
        unresolved = report.unresolved_links,
        "block links restored"
    );
    report
}
