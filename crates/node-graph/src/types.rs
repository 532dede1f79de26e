//! Core types for node graphs
//!
//! These types define the instances that live in a graph: nodes with their
//! data payload and canvas position, and the connections between sockets.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for a connection
pub type ConnectionId = String;

/// Free-form key/value payload carried by a node
pub type NodeData = serde_json::Map<String, serde_json::Value>;

/// A point on the editor canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Create a position
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Shift this position by a delta
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Both coordinates are finite; NaN and infinities do not survive JSON
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// The data type carried by a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketType {
    /// Expression/geometry data
    ExprSocket,
    /// Single float value
    FloatSocket,
    /// Vector data (vec2, vec3, vec4)
    VectorSocket,
    /// Boolean value
    BoolSocket,
    /// String/text data
    StringSocket,
    /// Material definition
    MaterialSocket,
    /// State data
    StateSocket,
}

impl SocketType {
    /// Check if an output of this type can feed an input of another type
    pub fn is_compatible_with(&self, other: &SocketType) -> bool {
        // Scalars promote into vectors and expressions accept anything numeric
        match (self, other) {
            (a, b) if a == b => true,
            (SocketType::FloatSocket, SocketType::VectorSocket) => true,
            (SocketType::FloatSocket | SocketType::VectorSocket, SocketType::ExprSocket) => true,
            _ => false,
        }
    }
}

/// Outcome of validating a definition, node data or a guide document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A result with no errors and no warnings
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Build a result from collected diagnostics
    pub fn from_diagnostics(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Add an error and mark the result invalid
    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    /// Add a warning
    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInstance {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Node type (references a NodeDefinition)
    pub node_type: String,
    /// Data payload for this instance
    pub data: NodeData,
    /// Position on the canvas
    pub position: Position,
}

impl NodeInstance {
    /// Create a node with a freshly generated id
    pub fn new(node_type: impl Into<String>, data: NodeData, position: Position) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), node_type, data, position)
    }

    /// Create a node with a caller-supplied id
    pub fn with_id(
        id: impl Into<String>,
        node_type: impl Into<String>,
        data: NodeData,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data,
            position,
        }
    }

    /// Get a data value
    pub fn get_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}

/// A directed connection from an output socket to an input socket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Source node ID
    pub source: NodeId,
    /// Source output socket key
    pub source_output: String,
    /// Target node ID
    pub target: NodeId,
    /// Target input socket key
    pub target_input: String,
}

impl Connection {
    /// Create a connection with a freshly generated id
    pub fn new(
        source: impl Into<String>,
        source_output: impl Into<String>,
        target: impl Into<String>,
        target_input: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            source_output: source_output.into(),
            target: target.into(),
            target_input: target_input.into(),
        }
    }

    /// Replace the generated id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Check if this connection touches a node
    pub fn involves_node(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// Check if this connection feeds a specific input
    pub fn connects_to_input(&self, node_id: &str, input: &str) -> bool {
        self.target == node_id && self.target_input == input
    }

    /// Check if this connection leaves a specific output
    pub fn comes_from_output(&self, node_id: &str, output: &str) -> bool {
        self.source == node_id && self.source_output == output
    }

    /// Check if two connections join the same sockets, ignoring ids
    pub fn same_endpoints(&self, other: &Connection) -> bool {
        self.source == other.source
            && self.source_output == other.source_output
            && self.target == other.target
            && self.target_input == other.target_input
    }
}
