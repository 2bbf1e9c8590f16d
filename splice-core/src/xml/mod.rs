//! Project Serialization
//!
//! Graphs are saved as XML. Nodes are written one after another and refer
//! to each other by integer token, so a connection may name a node that
//! appears later in the file. Loading therefore creates every node first
//! and links them once the whole document has been read.

mod data;
mod link;
mod load;
mod reader;
mod save;

pub use data::{BlockLink, Item, ItemId, SerializedConnection, XmlNodeData};
pub use link::{connect_nodes, link_blocks, LinkReport};
pub use load::{read_graph, LoadedGraph};
pub use reader::XmlCursor;
pub use save::{write_graph, FORMAT_VERSION};
