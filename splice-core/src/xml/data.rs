//! Load Context
//!
//! While a project is read, nodes refer to each other by the integer tokens
//! they were saved with. Everything that cannot be resolved until all nodes
//! exist is parked in [`XmlNodeData`] and linked afterwards.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::graph::{NodeId, ParamRef};

/// Identifier of a project item (footage, sequence, folder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(u64);

impl ItemId {
    /// Generate a new unique item ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// A project item as far as the graph is concerned: an id and a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
        }
    }
}

/// A saved edge waiting for its source node to be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedConnection {
    /// Destination input on an already loaded node.
    pub input: ParamRef,
    /// Token of the node that owns the source output.
    pub output_node: u64,
    /// Id of the source output.
    pub output: String,
}

/// A saved block link waiting for its target to be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLink {
    pub block: NodeId,
    /// Token of the linked block.
    pub link: u64,
}

/// Token tables and pending references for one project load.
#[derive(Debug, Default)]
pub struct XmlNodeData {
    node_ptrs: HashMap<u64, NodeId>,
    desired_connections: Vec<SerializedConnection>,
    block_links: Vec<BlockLink>,
    item_ptrs: HashMap<u64, ItemId>,
    collisions: usize,
}

impl XmlNodeData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a token to a loaded node.
    ///
    /// If the token was already registered the new node replaces the old
    /// one, and the replaced node is returned. Two nodes with one token
    /// means the file is corrupt; the collision is logged and counted.
    pub fn register_node(&mut self, token: u64, node: NodeId) -> Option<NodeId> {
        let previous = self.node_ptrs.insert(token, node);
        if let Some(previous) = previous {
            self.collisions += 1;
            warn!(token, replaced = %previous, by = %node, "duplicate node token");
        }
        previous
    }

    /// The node registered under `token`, if any.
    pub fn node(&self, token: u64) -> Option<NodeId> {
        self.node_ptrs.get(&token).copied()
    }

    /// Map a token to a loaded item. Last registration wins, as for nodes.
    pub fn register_item(&mut self, token: u64, item: ItemId) -> Option<ItemId> {
        let previous = self.item_ptrs.insert(token, item);
        if previous.is_some() {
            self.collisions += 1;
            warn!(token, "duplicate item token");
        }
        previous
    }

    pub fn item(&self, token: u64) -> Option<ItemId> {
        self.item_ptrs.get(&token).copied()
    }

    pub fn add_connection(&mut self, connection: SerializedConnection) {
        self.desired_connections.push(connection);
    }

    pub fn add_block_link(&mut self, link: BlockLink) {
        self.block_links.push(link);
    }

    /// Pending connections, in the order they were read.
    pub fn connections(&self) -> &[SerializedConnection] {
        &self.desired_connections
    }

    /// Pending block links, in the order they were read.
    pub fn block_links(&self) -> &[BlockLink] {
        &self.block_links
    }

    /// Number of distinct node tokens.
    pub fn node_count(&self) -> usize {
        self.node_ptrs.len()
    }

    /// Number of token collisions seen, nodes and items combined.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Consume the context, keeping the node and item token tables.
    pub fn into_tokens(self) -> (HashMap<u64, NodeId>, HashMap<u64, ItemId>) {
        (self.node_ptrs, self.item_ptrs)
    }
}
