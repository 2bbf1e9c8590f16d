//! Node Parameters
//!
//! A parameter is a named, typed slot on a node. Inputs carry a value and
//! receive edges; outputs send edges downstream and may fan out.

use smallvec::SmallVec;

use super::edge::EdgeId;
use super::node::NodeId;
use crate::value::{DataType, Value};

/// Direction of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    /// Receives data from an upstream output.
    Input,
    /// Provides data to downstream inputs.
    Output,
}

impl ParamRole {
    /// Name used in saved projects and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamRole::Input => "input",
            ParamRole::Output => "output",
        }
    }

    /// Look a role up by its saved name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "input" => Some(ParamRole::Input),
            "output" => Some(ParamRole::Output),
            _ => None,
        }
    }
}

/// A parameter owned by a node.
#[derive(Debug, Clone)]
pub struct Parameter {
    id: String,
    role: ParamRole,
    data_type: DataType,

    /// Array inputs accept any number of incoming edges.
    array: bool,

    /// Current value. Always [`Value::None`] on outputs.
    value: Value,

    /// Attached edges, in connection order.
    edges: SmallVec<[EdgeId; 1]>,
}

impl Parameter {
    fn new(id: impl Into<String>, role: ParamRole, data_type: DataType) -> Self {
        let value = match role {
            ParamRole::Input => data_type.default_value(),
            ParamRole::Output => Value::None,
        };

        Self {
            id: id.into(),
            role,
            data_type,
            array: false,
            value,
            edges: SmallVec::new(),
        }
    }

    /// Declare an input.
    pub fn input(id: impl Into<String>, data_type: DataType) -> Self {
        Self::new(id, ParamRole::Input, data_type)
    }

    /// Declare an output.
    pub fn output(id: impl Into<String>, data_type: DataType) -> Self {
        Self::new(id, ParamRole::Output, data_type)
    }

    /// Let this input accept several incoming edges. No effect on outputs.
    pub fn array(mut self) -> Self {
        self.array = self.role == ParamRole::Input;
        self
    }

    /// Set the initial value of an input.
    ///
    /// Values of another type, and any value on an output, are ignored.
    pub fn with_value(mut self, value: Value) -> Self {
        if self.role == ParamRole::Input && value.data_type() == self.data_type {
            self.value = value;
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> ParamRole {
        self.role
    }

    pub fn is_input(&self) -> bool {
        self.role == ParamRole::Input
    }

    pub fn is_output(&self) -> bool {
        self.role == ParamRole::Output
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Edges attached to this parameter, in connection order.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn is_connected(&self) -> bool {
        !self.edges.is_empty()
    }

    /// True if another edge may be attached.
    pub fn accepts_edge(&self) -> bool {
        match self.role {
            ParamRole::Output => true,
            ParamRole::Input => self.array || self.edges.is_empty(),
        }
    }

    /// Replace the value, returning the previous one.
    pub(crate) fn replace_value(&mut self, value: Value) -> Value {
        std::mem::replace(&mut self.value, value)
    }

    pub(crate) fn attach(&mut self, edge: EdgeId) {
        self.edges.push(edge);
    }

    pub(crate) fn detach(&mut self, edge: EdgeId) {
        self.edges.retain(|e| *e != edge);
    }

    pub(crate) fn clear_edges(&mut self) {
        self.edges.clear();
    }
}

/// Names a parameter on a specific node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamRef {
    pub node: NodeId,
    pub param: String,
}

impl ParamRef {
    pub fn new(node: NodeId, param: impl Into<String>) -> Self {
        Self {
            node,
            param: param.into(),
        }
    }
}

impl std::fmt::Display for ParamRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node, self.param)
    }
}
