//! Node Graph
//!
//! This module implements the node graph that connects every processing step
//! of a sequence, from footage through effects to the viewer.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes own an ordered list of parameters (inputs and outputs)
//! - Edges run from one node's output parameter to another node's input
//!
//! When an input's value changes, the node and everything downstream of it
//! must discard its cached frames for the affected time range. Render
//! scheduling walks the other way, from a node back to everything it reads.
//!
//! # Design Decisions
//!
//! 1. Nodes and edges live in one arena owned by [`NodeGraph`], keyed by id.
//!    Parameters store edge ids, never references, so nodes can be moved and
//!    removed without dangling pointers.
//!
//! 2. Dependencies are recomputed from the edges on every query. Edges
//!    change constantly while editing, and a cached closure would go stale.
//!
//! 3. Edge creation rejects cycles, so traversal never needs to. Traversal
//!    still tracks its own path and reports a cycle as an error instead of
//!    looping forever.

mod edge;
mod network;
mod node;
mod observer;
mod param;
mod scheduler;

pub use edge::{Edge, EdgeId};
pub use network::NodeGraph;
pub use node::{FrameCache, Node, NodeId, NodeKind};
pub use observer::{GraphEvent, ObserverId, ObserverList};
pub use param::{ParamRef, ParamRole, Parameter};
pub use scheduler::Invalidation;
