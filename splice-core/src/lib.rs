//! Splice Core
//!
//! This crate provides the node graph at the heart of the Splice video
//! editor. It implements:
//!
//! - Parameters, edges and nodes with typed inputs and outputs
//! - Upstream dependency queries and evaluation ordering
//! - Downstream cache invalidation over a time range
//! - Undoable graph edits
//! - XML project saving, and loading with deferred token linking
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Node, parameter and edge model plus traversal
//! - `time`: Exact rational time and time range sets
//! - `value`: Parameter data types and values
//! - `undo`: Reversible graph edit commands
//! - `xml`: Project serialization and the load-time linker
//! - `config`: Graph behavior switches
//!
//! # Example
//!
//! ```rust
//! use splice_core::graph::{Node, NodeGraph, Parameter};
//! use splice_core::time::TimeRange;
//! use splice_core::value::DataType;
//!
//! let mut graph = NodeGraph::new();
//!
//! let media = graph.add_node(
//!     Node::standard("media")
//!         .with_parameter(Parameter::output("out", DataType::Texture))?,
//! );
//! let blur = graph.add_node(
//!     Node::standard("blur")
//!         .with_parameter(Parameter::input("texture", DataType::Texture))?,
//! );
//! graph.connect(&media.param("out"), &blur.param("texture"))?;
//!
//! // Rendering the blur needs the media first.
//! assert_eq!(graph.dependencies(blur)?, vec![media]);
//!
//! // Replacing the footage makes the blur stale too.
//! let invalidation = graph.invalidate_cache(media, TimeRange::new(0, 10))?;
//! assert_eq!(invalidation.visits(), &[blur]);
//! # Ok::<(), splice_core::GraphError>(())
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod time;
pub mod undo;
pub mod value;
pub mod xml;

pub use config::GraphConfig;
pub use error::{GraphError, ValueParseError, XmlError};
pub use graph::{Node, NodeGraph, NodeId, ParamRef, Parameter};
pub use time::{Rational, TimeRange};
pub use value::{DataType, Value};
