//! Graph validation
//!
//! Checks referential integrity, duplicate connections and, when a registry
//! is supplied, node types, socket keys, socket compatibility and required
//! inputs. Every problem is collected, not just the first.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::graph::{Graph, GraphStats};
use crate::registry::NodeRegistry;
use crate::types::{SocketType, ValidationResult};

/// A validation problem with location context
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationIssue {
    /// A connection references a node that is not in the graph
    #[serde(rename_all = "camelCase")]
    UnknownNode {
        connection_id: String,
        node_id: String,
    },
    /// Two connections join the same sockets
    #[serde(rename_all = "camelCase")]
    DuplicateConnection {
        connection_id: String,
        duplicate_of: String,
    },
    /// A node has a type the registry does not know
    #[serde(rename_all = "camelCase")]
    UnknownNodeType {
        node_id: String,
        node_type: String,
    },
    /// A connection names a socket its node's definition does not declare
    #[serde(rename_all = "camelCase")]
    UnknownSocket {
        connection_id: String,
        node_id: String,
        socket: String,
    },
    /// A connection joins sockets of incompatible types
    #[serde(rename_all = "camelCase")]
    IncompatibleSockets {
        connection_id: String,
        source_type: SocketType,
        target_type: SocketType,
    },
    /// A required input is neither connected nor set in the node's data
    #[serde(rename_all = "camelCase")]
    UnconnectedRequiredInput {
        node_id: String,
        input: String,
    },
    /// Nodes without any connection
    #[serde(rename_all = "camelCase")]
    IsolatedNodes { node_ids: Vec<String> },
    /// The connections form at least one cycle
    CycleDetected,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNode { connection_id, node_id } => {
                write!(f, "Connection '{}' references unknown node '{}'", connection_id, node_id)
            }
            Self::DuplicateConnection {
                connection_id,
                duplicate_of,
            } => {
                write!(
                    f,
                    "Connection '{}' duplicates connection '{}'",
                    connection_id, duplicate_of
                )
            }
            Self::UnknownNodeType { node_id, node_type } => {
                write!(f, "Unknown node type '{}' for node '{}'", node_type, node_id)
            }
            Self::UnknownSocket {
                connection_id,
                node_id,
                socket,
            } => {
                write!(
                    f,
                    "Connection '{}' uses unknown socket '{}' on node '{}'",
                    connection_id, socket, node_id
                )
            }
            Self::IncompatibleSockets {
                connection_id,
                source_type,
                target_type,
            } => {
                write!(
                    f,
                    "Connection '{}' joins incompatible sockets: {:?} -> {:?}",
                    connection_id, source_type, target_type
                )
            }
            Self::UnconnectedRequiredInput { node_id, input } => {
                write!(f, "Required input '{}' on node '{}' is not connected", input, node_id)
            }
            Self::IsolatedNodes { node_ids } => {
                write!(f, "Found {} isolated nodes: {}", node_ids.len(), node_ids.join(", "))
            }
            Self::CycleDetected => write!(f, "Cycle detected in graph"),
        }
    }
}

impl std::error::Error for ValidationIssue {}

/// Outcome of validating a graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub stats: GraphStats,
}

impl GraphValidationReport {
    /// Flatten into string diagnostics
    pub fn to_result(&self) -> ValidationResult {
        ValidationResult::from_diagnostics(
            self.errors.iter().map(ToString::to_string).collect(),
            self.warnings.iter().map(ToString::to_string).collect(),
        )
    }
}

/// Validate a graph
///
/// Pass a registry to enable node type, socket and required input checks.
pub fn validate_graph(graph: &Graph, registry: Option<&NodeRegistry>) -> GraphValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    validate_connection_references(graph, &mut errors);
    detect_duplicate_connections(graph, &mut errors);

    if let Some(registry) = registry {
        validate_node_types(graph, registry, &mut errors);
        validate_sockets(graph, registry, &mut errors);
        validate_required_inputs(graph, registry, &mut errors);
    }

    let isolated = graph.isolated_nodes();
    if !isolated.is_empty() {
        warnings.push(ValidationIssue::IsolatedNodes { node_ids: isolated });
    }
    if has_cycle(graph) {
        warnings.push(ValidationIssue::CycleDetected);
    }

    GraphValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        stats: graph.stats(),
    }
}

/// Check that all connection endpoints exist
fn validate_connection_references(graph: &Graph, errors: &mut Vec<ValidationIssue>) {
    for connection in graph.connections() {
        for node_id in [&connection.source, &connection.target] {
            if !graph.contains_node(node_id) {
                errors.push(ValidationIssue::UnknownNode {
                    connection_id: connection.id.clone(),
                    node_id: node_id.clone(),
                });
            }
        }
    }
}

fn detect_duplicate_connections(graph: &Graph, errors: &mut Vec<ValidationIssue>) {
    let mut seen: HashMap<(&str, &str, &str, &str), &str> = HashMap::new();
    for c in graph.connections() {
        let key = (
            c.source.as_str(),
            c.source_output.as_str(),
            c.target.as_str(),
            c.target_input.as_str(),
        );
        match seen.get(&key) {
            Some(first) => errors.push(ValidationIssue::DuplicateConnection {
                connection_id: c.id.clone(),
                duplicate_of: first.to_string(),
            }),
            None => {
                seen.insert(key, &c.id);
            }
        }
    }
}

/// Check that all nodes have known types in the registry
fn validate_node_types(graph: &Graph, registry: &NodeRegistry, errors: &mut Vec<ValidationIssue>) {
    for node in graph.nodes() {
        if !registry.has(&node.node_type) {
            errors.push(ValidationIssue::UnknownNodeType {
                node_id: node.id.clone(),
                node_type: node.node_type.clone(),
            });
        }
    }
}

/// Check socket keys and types of every connection between known nodes
fn validate_sockets(graph: &Graph, registry: &NodeRegistry, errors: &mut Vec<ValidationIssue>) {
    let definition_of = |node_id: &str| {
        graph
            .node(node_id)
            .and_then(|node| registry.get(&node.node_type))
    };

    for c in graph.connections() {
        let (Some(source), Some(target)) = (definition_of(&c.source), definition_of(&c.target)) else {
            continue;
        };
        let output = source.find_output(&c.source_output);
        let input = target.find_input(&c.target_input);

        if output.is_none() {
            errors.push(ValidationIssue::UnknownSocket {
                connection_id: c.id.clone(),
                node_id: c.source.clone(),
                socket: c.source_output.clone(),
            });
        }
        if input.is_none() {
            errors.push(ValidationIssue::UnknownSocket {
                connection_id: c.id.clone(),
                node_id: c.target.clone(),
                socket: c.target_input.clone(),
            });
        }
        if let (Some(output), Some(input)) = (output, input) {
            if !output.socket_type.is_compatible_with(&input.socket_type) {
                errors.push(ValidationIssue::IncompatibleSockets {
                    connection_id: c.id.clone(),
                    source_type: output.socket_type,
                    target_type: input.socket_type,
                });
            }
        }
    }
}

/// Check that required inputs are connected or have a data value
fn validate_required_inputs(graph: &Graph, registry: &NodeRegistry, errors: &mut Vec<ValidationIssue>) {
    for node in graph.nodes() {
        let Some(definition) = registry.get(&node.node_type) else {
            continue;
        };
        let connected = graph.connected_inputs(&node.id);
        for input in definition.inputs.iter().filter(|i| i.required) {
            let has_data_value = node.data.get(&input.key).is_some_and(|v| !v.is_null());
            if !connected.contains(input.key.as_str()) && !has_data_value {
                errors.push(ValidationIssue::UnconnectedRequiredInput {
                    node_id: node.id.clone(),
                    input: input.key.clone(),
                });
            }
        }
    }
}

/// Detect cycles using Kahn's algorithm (topological sort)
///
/// Connections with a missing endpoint are ignored.
fn has_cycle(graph: &Graph) -> bool {
    let edges: Vec<(&str, &str)> = graph
        .connections()
        .iter()
        .filter(|c| graph.contains_node(&c.source) && graph.contains_node(&c.target))
        .map(|c| (c.source.as_str(), c.target.as_str()))
        .collect();

    let mut in_degree: HashMap<&str, usize> = graph.nodes().iter().map(|n| (n.id.as_str(), 0)).collect();
    for (_, target) in &edges {
        if let Some(degree) = in_degree.get_mut(target) {
            *degree += 1;
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    while let Some(node_id) = queue.pop_front() {
        visited.insert(node_id);
        for (source, target) in &edges {
            if *source == node_id {
                if let Some(degree) = in_degree.get_mut(target) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(target);
                    }
                }
            }
        }
    }

    visited.len() < graph.node_count()
}
