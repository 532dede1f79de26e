//! Graph store
//!
//! `Graph` holds node instances, connections and the position index. It
//! performs plain collection operations; policy (self-loops, single-input
//! replacement, existence checks) lives in the manager.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{Connection, NodeId, NodeInstance, Position};

/// A node removed from the graph together with the connections that went
/// with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedNode {
    pub node: NodeInstance,
    pub connections: Vec<Connection>,
}

/// Summary of a graph's contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub node_count: usize,
    pub connection_count: usize,
    /// Distinct node types in first-seen order
    pub node_types: Vec<String>,
    /// Nodes with no connections
    pub isolated_nodes: Vec<NodeId>,
}

/// In-memory node graph
///
/// Deserializing rebuilds the graph node by node, so the position index is
/// derived from the nodes and repeated ids keep their first occurrence.
/// Connections to a missing node or from a node to itself are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "GraphRecord")]
pub struct Graph {
    nodes: Vec<NodeInstance>,
    connections: Vec<Connection>,
    /// Mirrors each node's position
    positions: IndexMap<NodeId, Position>,
}

/// Wire form of a graph before its invariants are restored
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRecord {
    #[serde(default)]
    nodes: Vec<NodeInstance>,
    #[serde(default)]
    connections: Vec<Connection>,
}

impl From<GraphRecord> for Graph {
    fn from(record: GraphRecord) -> Self {
        let mut graph = Graph::new();
        for node in record.nodes {
            let id = node.id.clone();
            if !graph.add_node(node) {
                log::warn!("Dropped duplicate node '{}' while restoring graph", id);
            }
        }
        for connection in record.connections {
            let linked = connection.source != connection.target
                && graph.contains_node(&connection.source)
                && graph.contains_node(&connection.target);
            if !linked || !graph.add_connection(connection.clone()) {
                log::warn!("Dropped connection '{}' while restoring graph", connection.id);
            }
        }
        graph
    }
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node
    ///
    /// Returns false, leaving the graph unchanged, if the id is taken.
    pub fn add_node(&mut self, node: NodeInstance) -> bool {
        if self.contains_node(&node.id) {
            return false;
        }
        self.positions.insert(node.id.clone(), node.position);
        self.nodes.push(node);
        true
    }

    /// Remove a node and every connection touching it
    pub fn remove_node(&mut self, id: &str) -> Option<RemovedNode> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(index);
        self.positions.shift_remove(id);

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(|c| c.involves_node(id));
        self.connections = kept;

        Some(RemovedNode {
            node,
            connections: removed,
        })
    }

    /// Add a connection
    ///
    /// Returns false if a connection with the same endpoints or the same id
    /// already exists. Endpoints are not checked here.
    pub fn add_connection(&mut self, connection: Connection) -> bool {
        let duplicate = self
            .connections
            .iter()
            .any(|c| c.id == connection.id || c.same_endpoints(&connection));
        if duplicate {
            return false;
        }
        self.connections.push(connection);
        true
    }

    /// Remove a connection by id
    pub fn remove_connection(&mut self, id: &str) -> Option<Connection> {
        let index = self.connections.iter().position(|c| c.id == id)?;
        Some(self.connections.remove(index))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Find a node by ID
    pub fn node(&self, id: &str) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut NodeInstance> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> &[NodeInstance] {
        &self.nodes
    }

    /// Connections in insertion order
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Position index keyed by node id
    pub fn positions(&self) -> &IndexMap<NodeId, Position> {
        &self.positions
    }

    /// Connections touching a node
    pub fn node_connections<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.involves_node(node_id))
    }

    /// Connections coming into a node
    pub fn node_input_connections<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.target == node_id)
    }

    /// Connections going out of a node
    pub fn node_output_connections<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.source == node_id)
    }

    /// Input keys of a node that have at least one connection
    ///
    /// The keys borrow from the graph only, not from `node_id`.
    pub fn connected_inputs(&self, node_id: &str) -> HashSet<&str> {
        self.connections
            .iter()
            .filter(|c| c.target == node_id)
            .map(|c| c.target_input.as_str())
            .collect()
    }

    /// First connection feeding a specific input
    pub fn connection_into(&self, target: &str, target_input: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.connects_to_input(target, target_input))
    }

    /// Move a node, keeping the position index in sync
    pub fn update_node_position(&mut self, id: &str, position: Position) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.position = position;
                self.positions.insert(id.to_string(), position);
                true
            }
            None => false,
        }
    }

    /// Set one data key on a node
    ///
    /// Returns `None` if the node is absent, otherwise the previous value.
    pub fn update_node_data(
        &mut self,
        id: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<Option<serde_json::Value>> {
        self.node_mut(id).map(|node| node.data.insert(key.into(), value))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }

    /// Nodes with no connections
    pub fn isolated_nodes(&self) -> Vec<NodeId> {
        let connected: HashSet<&str> = self
            .connections
            .iter()
            .flat_map(|c| [c.source.as_str(), c.target.as_str()])
            .collect();
        self.nodes
            .iter()
            .filter(|n| !connected.contains(n.id.as_str()))
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn stats(&self) -> GraphStats {
        let mut node_types: Vec<String> = Vec::new();
        for node in &self.nodes {
            if !node_types.contains(&node.node_type) {
                node_types.push(node.node_type.clone());
            }
        }
        GraphStats {
            node_count: self.nodes.len(),
            connection_count: self.connections.len(),
            node_types,
            isolated_nodes: self.isolated_nodes(),
        }
    }
}
