//! Undo Commands
//!
//! Graph edits made from the UI are wrapped in commands so they can be
//! undone. A [`MultiUndoCommand`] groups several edits (for instance every
//! connection restored while pasting nodes) into one undo step. A group is
//! atomic: if one child fails, the children already applied are reverted.

use std::fmt;

use tracing::{error, warn};

use crate::error::GraphError;
use crate::graph::{Edge, EdgeId, NodeGraph, ParamRef};
use crate::value::Value;

/// A reversible edit to a [`NodeGraph`].
pub trait UndoCommand: fmt::Debug + Send {
    /// Apply (or re-apply) the edit.
    fn redo(&mut self, graph: &mut NodeGraph) -> Result<(), GraphError>;

    /// Revert the edit.
    fn undo(&mut self, graph: &mut NodeGraph) -> Result<(), GraphError>;

    /// Short description shown in the edit menu.
    fn name(&self) -> &str;
}

/// A group of commands applied and reverted as one.
#[derive(Debug, Default)]
pub struct MultiUndoCommand {
    name: String,
    children: Vec<Box<dyn UndoCommand>>,
}

impl MultiUndoCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Append a command. It runs after every command added before it.
    pub fn add_child(&mut self, child: Box<dyn UndoCommand>) {
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = &dyn UndoCommand> {
        self.children.iter().map(|c| c.as_ref())
    }
}

impl UndoCommand for MultiUndoCommand {
    fn redo(&mut self, graph: &mut NodeGraph) -> Result<(), GraphError> {
        for index in 0..self.children.len() {
            let Err(err) = self.children[index].redo(graph) else {
                continue;
            };

            for applied in self.children[..index].iter_mut().rev() {
                if let Err(rollback) = applied.undo(graph) {
                    error!(command = applied.name(), %rollback, "rollback failed");
                }
            }
            return Err(err);
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut NodeGraph) -> Result<(), GraphError> {
        for child in self.children.iter_mut().rev() {
            child.undo(graph)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Connect an output to an input.
#[derive(Debug, Clone)]
pub struct EdgeAddCommand {
    output: ParamRef,
    input: ParamRef,
    edge: Option<EdgeId>,
    skip_rejected: bool,
}

impl EdgeAddCommand {
    pub fn new(output: ParamRef, input: ParamRef) -> Self {
        Self {
            output,
            input,
            edge: None,
            skip_rejected: false,
        }
    }

    /// If the graph refuses the connection on redo, log it and do nothing
    /// instead of failing. Used for connections restored from a file, where
    /// one bad record must not cost the others.
    pub fn skip_rejected(mut self) -> Self {
        self.skip_rejected = true;
        self
    }

    /// The edge created by the last redo, if any.
    pub fn edge(&self) -> Option<EdgeId> {
        self.edge
    }

    pub fn output(&self) -> &ParamRef {
        &self.output
    }

    pub fn input(&self) -> &ParamRef {
        &self.input
    }
}

impl UndoCommand for EdgeAddCommand {
    fn redo(&mut self, graph: &mut NodeGraph) -> Result<(), GraphError> {
        match graph.connect(&self.output, &self.input) {
            Ok(edge) => self.edge = Some(edge),
            Err(err) if self.skip_rejected => {
                warn!(output = %self.output, input = %self.input, %err, "connection skipped");
                self.edge = None;
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut NodeGraph) -> Result<(), GraphError> {
        if let Some(edge) = self.edge.take() {
            graph.disconnect(edge)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Connect"
    }
}

/// Remove an existing edge.
#[derive(Debug, Clone)]
pub struct EdgeRemoveCommand {
    edge: EdgeId,
    removed: Option<Edge>,
}

impl EdgeRemoveCommand {
    pub fn new(edge: EdgeId) -> Self {
        Self {
            edge,
            removed: None,
        }
    }
}

impl UndoCommand for EdgeRemoveCommand {
    fn redo(&mut self, graph: &mut NodeGraph) -> Result<(), GraphError> {
        self.removed = Some(graph.disconnect(self.edge)?);
        Ok(())
    }

    fn undo(&mut self, graph: &mut NodeGraph) -> Result<(), GraphError> {
        if let Some(edge) = self.removed.take() {
            // Reconnecting allocates a fresh id; track it for the next redo.
            self.edge = graph.connect(edge.output(), edge.input())?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Disconnect"
    }
}

/// Set the value of an input.
#[derive(Debug, Clone)]
pub struct SetValueCommand {
    input: ParamRef,
    value: Value,
    previous: Option<Value>,
}

impl SetValueCommand {
    pub fn new(input: ParamRef, value: Value) -> Self {
        Self {
            input,
            value,
            previous: None,
        }
    }
}

impl UndoCommand for SetValueCommand {
    fn redo(&mut self, graph: &mut NodeGraph) -> Result<(), GraphError> {
        self.previous = Some(graph.set_value(&self.input, self.value.clone())?);
        Ok(())
    }

    fn undo(&mut self, graph: &mut NodeGraph) -> Result<(), GraphError> {
        if let Some(previous) = self.previous.take() {
            graph.set_value(&self.input, previous)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Set Value"
    }
}
