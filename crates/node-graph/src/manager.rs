//! Graph manager
//!
//! `GraphManager` is the mutation façade over a [`Graph`]. It enforces the
//! editor's connection rules (no self-loops, one connection per
//! non-variadic input), records structural changes in a bounded history and
//! notifies subscribers after every successful mutation.
//!
//! # Example
//!
//! ```ignore
//! use node_graph::{GraphManager, NodeMoved, Position, VariadicPolicy};
//!
//! let mut manager = GraphManager::new();
//! manager.set_variadic_policy(VariadicPolicy::new().with("Union", "expr"));
//! manager.on::<NodeMoved, _>(|moved| {
//!     println!("{} -> {:?}", moved.node_id, moved.position);
//!     Ok(())
//! });
//!
//! let a = manager.create_node("Box3D", Position::new(0.0, 0.0), Default::default());
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::ManagerConfig;
use crate::error::Result;
use crate::events::{
    ConnectionAdded, ConnectionRemoved, EventBus, EventError, EventPayload, EventSink, GraphCleared,
    GraphEvent, GraphEventKind, GraphLoaded, ListenerId, NodeAdded, NodeMoved, NodeRemoved, NodeUpdated,
    RemovalReason,
};
use crate::graph::{Graph, GraphStats};
use crate::history::{ChangeHistory, ChangeKind, ChangeRecord, Snapshot};
use crate::policy::VariadicPolicy;
use crate::registry::NodeRegistry;
use crate::serialization::{from_guide_json, guide_to_string, parse_guide_json, to_guide_json, GuideDocument};
use crate::types::{Connection, ConnectionId, NodeData, NodeId, NodeInstance, Position};
use crate::validation::{validate_graph, GraphValidationReport};

/// Mutation façade over a graph
#[derive(Debug)]
pub struct GraphManager {
    graph: Graph,
    policy: VariadicPolicy,
    events: EventBus,
    history: ChangeHistory,
    config: ManagerConfig,
}

impl GraphManager {
    /// Create a manager over an empty graph
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Create a manager with custom configuration
    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            graph: Graph::new(),
            policy: VariadicPolicy::new(),
            events: EventBus::new(),
            history: ChangeHistory::new(config.max_history),
            config,
        }
    }

    /// Create a manager over an existing graph
    pub fn with_graph(graph: Graph) -> Self {
        let mut manager = Self::new();
        manager.graph = graph;
        manager
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // Variadic policy

    /// Replace the variadic input policy
    ///
    /// Existing connections are left as they are; the policy applies to
    /// connections made afterwards.
    pub fn set_variadic_policy(&mut self, policy: VariadicPolicy) {
        self.policy = policy;
    }

    pub fn variadic_policy(&self) -> &VariadicPolicy {
        &self.policy
    }

    // Events

    /// Subscribe to one event payload type
    pub fn on<P, F>(&mut self, listener: F) -> ListenerId
    where
        P: EventPayload,
        F: FnMut(&P) -> std::result::Result<(), EventError> + Send + 'static,
    {
        self.events.on::<P, F>(listener)
    }

    /// Subscribe to one event kind
    pub fn on_kind<F>(&mut self, kind: GraphEventKind, listener: F) -> ListenerId
    where
        F: FnMut(&GraphEvent) -> std::result::Result<(), EventError> + Send + 'static,
    {
        self.events.on_kind(kind, listener)
    }

    /// Subscribe to every event
    pub fn on_any<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&GraphEvent) -> std::result::Result<(), EventError> + Send + 'static,
    {
        self.events.on_any(listener)
    }

    /// Forward every event to a sink
    pub fn attach_sink(&mut self, sink: Arc<dyn EventSink>) -> ListenerId {
        self.events.attach_sink(sink)
    }

    /// Remove a subscription
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    fn emit(&mut self, event: impl Into<GraphEvent>) {
        self.events.emit(&event.into());
    }

    fn record(&mut self, kind: ChangeKind, data: Value) {
        self.history.push(ChangeRecord::new(kind, data));
    }

    // Nodes

    /// Add an existing node instance
    ///
    /// Returns `None` if a node with the same id is already present or its
    /// position is not finite.
    pub fn add_node(&mut self, node: NodeInstance) -> Option<NodeId> {
        if !node.position.is_finite() {
            log::warn!("Rejected node '{}' with non-finite position", node.id);
            return None;
        }
        if !self.graph.add_node(node.clone()) {
            log::warn!("Node '{}' already exists", node.id);
            return None;
        }
        log::debug!("Added node '{}' ({})", node.id, node.node_type);
        self.record(ChangeKind::AddNode, json!({ "node": node }));
        let id = node.id.clone();
        self.emit(NodeAdded { node });
        Some(id)
    }

    /// Create and add a node with a fresh id
    pub fn create_node(&mut self, node_type: &str, position: Position, data: NodeData) -> Option<NodeId> {
        self.add_node(NodeInstance::new(node_type, data, position))
    }

    /// Remove a node and every connection touching it
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(removed) = self.graph.remove_node(id) else {
            return false;
        };
        log::debug!(
            "Removed node '{}' and {} connection(s)",
            id,
            removed.connections.len()
        );
        let removed_connections = removed.connections.iter().map(|c| c.id.clone()).collect();
        self.record(
            ChangeKind::RemoveNode,
            json!({ "node": removed.node, "connections": removed.connections }),
        );
        self.emit(NodeRemoved {
            node_id: id.to_string(),
            removed_connections,
        });
        true
    }

    /// Set one data key on a node
    pub fn update_node_data(&mut self, id: &str, key: &str, value: Value) -> bool {
        let Some(previous) = self.graph.update_node_data(id, key, value.clone()) else {
            return false;
        };
        self.record(
            ChangeKind::UpdateNode,
            json!({ "nodeId": id, "key": key, "value": value, "previous": previous }),
        );
        self.emit(NodeUpdated {
            node_id: id.to_string(),
            key: key.to_string(),
            value,
            previous,
        });
        true
    }

    /// Move a node on the canvas
    ///
    /// Moves are reported to listeners but not recorded in history. A
    /// non-finite position is rejected.
    pub fn move_node(&mut self, id: &str, position: Position) -> bool {
        if !position.is_finite() {
            log::warn!("Rejected non-finite position for node '{}'", id);
            return false;
        }
        if !self.graph.update_node_position(id, position) {
            return false;
        }
        self.emit(NodeMoved {
            node_id: id.to_string(),
            position,
        });
        true
    }

    // Connections

    /// Connect an output socket to an input socket
    ///
    /// Returns `None` when either node is missing, when source and target
    /// are the same node, or when an identical connection exists. Connecting
    /// into a non-variadic input first removes the connection already there.
    pub fn add_connection(
        &mut self,
        source: &str,
        source_output: &str,
        target: &str,
        target_input: &str,
    ) -> Option<ConnectionId> {
        let Some(target_type) = self.graph.node(target).map(|n| n.node_type.clone()) else {
            log::debug!("Cannot connect: target node '{}' not found", target);
            return None;
        };
        if !self.graph.contains_node(source) {
            log::debug!("Cannot connect: source node '{}' not found", source);
            return None;
        }
        if source == target {
            log::debug!("Cannot connect node '{}' to itself", source);
            return None;
        }

        let connection = Connection::new(source, source_output, target, target_input);
        if self.graph.connections().iter().any(|c| c.same_endpoints(&connection)) {
            return None;
        }

        if !self.policy.is_variadic(&target_type, target_input) {
            let displaced: Vec<ConnectionId> = self
                .graph
                .node_input_connections(target)
                .filter(|c| c.target_input == target_input)
                .map(|c| c.id.clone())
                .collect();
            for id in displaced {
                log::debug!("Replacing connection '{}' into {}.{}", id, target, target_input);
                self.detach_connection(&id, RemovalReason::Replaced);
            }
        }

        let id = connection.id.clone();
        if !self.graph.add_connection(connection.clone()) {
            return None;
        }
        self.record(ChangeKind::AddConnection, json!({ "connection": connection }));
        self.emit(ConnectionAdded { connection });
        Some(id)
    }

    /// Remove a connection
    pub fn remove_connection(&mut self, id: &str) -> bool {
        self.detach_connection(id, RemovalReason::Explicit)
    }

    fn detach_connection(&mut self, id: &str, reason: RemovalReason) -> bool {
        let Some(connection) = self.graph.remove_connection(id) else {
            return false;
        };
        self.record(ChangeKind::RemoveConnection, json!({ "connection": connection }));
        self.emit(ConnectionRemoved {
            connection_id: connection.id,
            reason,
        });
        true
    }

    // Queries

    /// Shared view of the underlying graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn node(&self, id: &str) -> Option<&NodeInstance> {
        self.graph.node(id)
    }

    pub fn node_data(&self, id: &str, key: &str) -> Option<&Value> {
        self.graph.node(id).and_then(|n| n.get_data(key))
    }

    pub fn nodes(&self) -> &[NodeInstance] {
        self.graph.nodes()
    }

    pub fn connections(&self) -> &[Connection] {
        self.graph.connections()
    }

    pub fn node_connections(&self, id: &str) -> Vec<&Connection> {
        self.graph
            .connections()
            .iter()
            .filter(|c| c.involves_node(id))
            .collect()
    }

    pub fn connected_inputs(&self, id: &str) -> HashSet<&str> {
        self.graph.connected_inputs(id)
    }

    pub fn is_input_connected(&self, id: &str, input: &str) -> bool {
        self.graph.connection_into(id, input).is_some()
    }

    pub fn graph_stats(&self) -> GraphStats {
        self.graph.stats()
    }

    /// Validate the current graph, optionally against a registry
    pub fn validate_graph(&self, registry: Option<&NodeRegistry>) -> GraphValidationReport {
        validate_graph(&self.graph, registry)
    }

    // Whole-graph operations

    fn snapshot(&self) -> Option<Snapshot> {
        match Snapshot::capture(&self.graph) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::error!("Failed to snapshot graph: {}", e);
                None
            }
        }
    }

    fn replace_graph(&mut self, graph: Graph, kind: ChangeKind, data: Value) {
        let mut record = ChangeRecord::new(kind, data);
        if let Some(snapshot) = self.snapshot() {
            record = record.with_snapshot(snapshot);
        }
        self.graph = graph;
        self.history.push(record);
    }

    /// Remove every node and connection
    pub fn clear_graph(&mut self) {
        let data = json!({
            "nodeCount": self.graph.node_count(),
            "connectionCount": self.graph.connection_count(),
        });
        self.replace_graph(Graph::new(), ChangeKind::ClearGraph, data);
        self.emit(GraphCleared {});
    }

    /// Replace the graph with one module of a guide document
    ///
    /// On failure the current graph is kept and false is returned.
    pub fn load_from_guide_json(&mut self, document: &GuideDocument, module: &str) -> bool {
        let graph = match from_guide_json(document, module) {
            Ok(graph) => graph,
            Err(e) => {
                log::error!("Failed to load module '{}': {}", module, e);
                return false;
            }
        };
        let loaded = GraphLoaded {
            module: module.to_string(),
            node_count: graph.node_count(),
            connection_count: graph.connection_count(),
        };
        self.replace_graph(graph, ChangeKind::LoadGraph, json!(loaded));
        self.emit(loaded);
        true
    }

    /// Parse guide document text and load one module
    pub fn load_from_guide_str(&mut self, text: &str, module: &str) -> bool {
        match parse_guide_json(text) {
            Ok(document) => self.load_from_guide_json(&document, module),
            Err(e) => {
                log::error!("Failed to parse guide document: {}", e);
                false
            }
        }
    }

    /// Export the graph as a guide document
    pub fn export_to_guide_json(&self, module: &str) -> GuideDocument {
        to_guide_json(&self.graph, module)
    }

    /// Export the graph under the configured default module
    pub fn export_default_module(&self) -> GuideDocument {
        self.export_to_guide_json(&self.config.default_module)
    }

    /// Export the graph as guide document text
    pub fn export_to_guide_string(&self, module: &str) -> Result<String> {
        guide_to_string(&self.export_to_guide_json(module))
    }

    // History

    pub fn change_history(&self) -> &ChangeHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl Default for GraphManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecEventSink;
    use crate::serialization::create_empty_guide_json;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Mutex;

    fn node(id: &str, node_type: &str) -> NodeInstance {
        NodeInstance::with_id(id, node_type, NodeData::new(), Position::default())
    }

    fn manager_with_sink() -> (GraphManager, Arc<VecEventSink>) {
        let mut manager = GraphManager::new();
        let sink = Arc::new(VecEventSink::new());
        manager.attach_sink(sink.clone());
        (manager, sink)
    }

    #[test]
    fn test_add_nodes() {
        let (mut manager, sink) = manager_with_sink();
        assert_eq!(manager.add_node(node("a", "Box3D")), Some("a".to_string()));
        assert_eq!(manager.add_node(node("a", "Sphere3D")), None);

        let id = manager
            .create_node("Sphere3D", Position::new(1.0, 2.0), NodeData::new())
            .unwrap();
        assert_eq!(manager.node(&id).map(|n| n.position), Some(Position::new(1.0, 2.0)));
        assert_eq!(sink.kinds(), vec![GraphEventKind::NodeAdded; 2]);
        assert_eq!(manager.change_history().len(), 2);
    }

    #[test]
    fn test_connection_rules() {
        let mut manager = GraphManager::new();
        manager.add_node(node("a", "Box3D"));
        manager.add_node(node("b", "Translate3D"));

        assert!(manager.add_connection("a", "expr", "ghost", "expr").is_none());
        assert!(manager.add_connection("ghost", "expr", "b", "expr").is_none());
        assert!(manager.add_connection("a", "expr", "a", "size").is_none());

        let id = manager.add_connection("a", "expr", "b", "expr").unwrap();
        assert!(manager.add_connection("a", "expr", "b", "expr").is_none());
        assert_eq!(manager.connections().len(), 1);
        assert!(manager.is_input_connected("b", "expr"));
        let inputs = {
            let target = "b".to_string();
            manager.connected_inputs(&target)
        };
        assert_eq!(inputs, HashSet::from(["expr"]));
        assert!(manager.connected_inputs("a").is_empty());
        assert!(manager.remove_connection(&id));
        assert!(!manager.remove_connection(&id));
    }

    #[test]
    fn test_single_input_is_replaced() {
        let (mut manager, sink) = manager_with_sink();
        manager.add_node(node("a", "Box3D"));
        manager.add_node(node("s", "Sphere3D"));
        manager.add_node(node("t", "Translate3D"));
        sink.clear();

        let first = manager.add_connection("a", "expr", "t", "expr").unwrap();
        let second = manager.add_connection("s", "expr", "t", "expr").unwrap();

        assert_eq!(manager.connections().len(), 1);
        assert_eq!(manager.connections()[0].id, second);
        assert_eq!(
            sink.events()[1],
            GraphEvent::ConnectionRemoved(ConnectionRemoved {
                connection_id: first,
                reason: RemovalReason::Replaced,
            })
        );
        assert_eq!(
            sink.kinds(),
            vec![
                GraphEventKind::ConnectionAdded,
                GraphEventKind::ConnectionRemoved,
                GraphEventKind::ConnectionAdded,
            ]
        );
    }

    #[test]
    fn test_variadic_inputs_accumulate() {
        let mut manager = GraphManager::new();
        manager.set_variadic_policy(VariadicPolicy::new().with("Union", "expr"));
        manager.add_node(node("u", "Union"));
        for id in ["a", "b", "c"] {
            manager.add_node(node(id, "Box3D"));
            assert!(manager.add_connection(id, "expr", "u", "expr").is_some());
        }
        assert_eq!(manager.graph().node_input_connections("u").count(), 3);
        assert!(manager.variadic_policy().is_variadic("Union", "expr"));
    }

    #[test]
    fn test_remove_node_cascades() {
        let (mut manager, sink) = manager_with_sink();
        manager.add_node(node("a", "Box3D"));
        manager.add_node(node("b", "Translate3D"));
        let conn = manager.add_connection("a", "expr", "b", "expr").unwrap();

        assert!(manager.remove_node("a"));
        assert!(!manager.remove_node("a"));
        assert!(manager.connections().is_empty());
        assert_eq!(
            sink.events().last(),
            Some(&GraphEvent::NodeRemoved(NodeRemoved {
                node_id: "a".to_string(),
                removed_connections: vec![conn],
            }))
        );
        let last = manager.change_history().last().unwrap();
        assert_eq!(last.kind, ChangeKind::RemoveNode);
        assert_eq!(last.data["connections"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_update_and_move() {
        let (mut manager, sink) = manager_with_sink();
        manager.add_node(node("a", "Box3D"));
        let history_before = manager.change_history().len();

        assert!(manager.update_node_data("a", "size", json!(2.0)));
        assert!(!manager.update_node_data("zz", "size", json!(2.0)));
        assert_eq!(manager.node_data("a", "size"), Some(&json!(2.0)));

        assert!(manager.move_node("a", Position::new(9.0, 9.0)));
        assert!(!manager.move_node("zz", Position::default()));
        assert_eq!(manager.graph().positions()["a"], Position::new(9.0, 9.0));

        // Non-finite moves leave the node where it was
        assert!(!manager.move_node("a", Position::new(f64::NAN, 0.0)));
        assert!(!manager.move_node("a", Position::new(0.0, f64::INFINITY)));
        assert_eq!(manager.node("a").map(|n| n.position), Some(Position::new(9.0, 9.0)));

        // Moves are not recorded
        assert_eq!(manager.change_history().len(), history_before + 1);
        assert_eq!(
            sink.kinds()[1..],
            [GraphEventKind::NodeUpdated, GraphEventKind::NodeMoved]
        );
    }

    #[test]
    fn test_typed_listener_and_off() {
        let mut manager = GraphManager::new();
        let moves = Arc::new(Mutex::new(Vec::new()));
        let seen = moves.clone();
        let id = manager.on::<NodeMoved, _>(move |moved| {
            seen.lock().unwrap().push(moved.position);
            Ok(())
        });
        manager.add_node(node("a", "Box3D"));
        manager.move_node("a", Position::new(1.0, 1.0));
        assert!(manager.off(id));
        manager.move_node("a", Position::new(2.0, 2.0));
        assert_eq!(*moves.lock().unwrap(), vec![Position::new(1.0, 1.0)]);
    }

    #[test]
    fn test_failing_listener_does_not_affect_mutation() {
        let (mut manager, sink) = manager_with_sink();
        manager.on_kind(GraphEventKind::NodeAdded, |_| Err(EventError::new("listener failed")));
        manager.on::<NodeAdded, _>(|_| panic!("listener bug"));
        let late = Arc::new(VecEventSink::new());
        manager.attach_sink(late.clone());

        assert!(manager.add_node(node("a", "Box3D")).is_some());
        assert!(manager.node("a").is_some());
        assert_eq!(sink.kinds().len(), 1);
        assert_eq!(late.kinds(), vec![GraphEventKind::NodeAdded]);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut manager = GraphManager::with_config(ManagerConfig {
            max_history: 5,
            ..ManagerConfig::default()
        });
        for i in 0..20 {
            manager.add_node(node(&format!("n{i}"), "Box3D"));
        }
        assert_eq!(manager.change_history().len(), 5);
        let first = manager.change_history().records().next().unwrap();
        assert_eq!(first.data["node"]["id"], "n15");

        manager.clear_history();
        assert!(manager.change_history().is_empty());
    }

    #[test]
    fn test_clear_graph_keeps_snapshot() {
        let (mut manager, sink) = manager_with_sink();
        manager.add_node(node("a", "Box3D"));
        manager.add_node(node("b", "Translate3D"));
        manager.add_connection("a", "expr", "b", "expr");
        let before = manager.graph().clone();

        manager.clear_graph();
        assert!(manager.graph().is_empty());
        assert_eq!(sink.kinds().last(), Some(&GraphEventKind::GraphCleared));

        let record = manager.change_history().last().unwrap();
        assert_eq!(record.kind, ChangeKind::ClearGraph);
        assert_eq!(record.data["nodeCount"], 2);
        let restored = record.snapshot.as_ref().unwrap().restore().unwrap();
        assert_eq!(restored, before);
    }

    #[test]
    fn test_load_and_export() {
        let mut source = GraphManager::new();
        source.add_node(node("a", "Box3D"));
        source.add_node(node("b", "Translate3D"));
        source.add_connection("a", "expr", "b", "expr");
        let text = source.export_to_guide_string("base").unwrap();

        let (mut manager, sink) = manager_with_sink();
        manager.add_node(node("old", "Sphere3D"));

        assert!(!manager.load_from_guide_str(&text, "missing"));
        assert!(!manager.load_from_guide_str("{ nope", "base"));
        assert!(manager.node("old").is_some());

        assert!(manager.load_from_guide_str(&text, "base"));
        assert!(manager.node("old").is_none());
        assert_eq!(manager.nodes().len(), 2);
        assert_eq!(
            sink.events().last(),
            Some(&GraphEvent::GraphLoaded(GraphLoaded {
                module: "base".to_string(),
                node_count: 2,
                connection_count: 1,
            }))
        );
        let record = manager.change_history().last().unwrap();
        assert_eq!(record.kind, ChangeKind::LoadGraph);
        assert!(record.snapshot.is_some());

        assert_eq!(manager.export_default_module(), source.export_to_guide_json("base"));

        assert!(manager.load_from_guide_json(&create_empty_guide_json("base"), "base"));
        assert!(manager.graph().is_empty());
    }

    #[test]
    fn test_non_finite_node_is_rejected() {
        let mut manager = GraphManager::new();
        let mut stray = node("a", "Box3D");
        stray.position = Position::new(f64::INFINITY, 0.0);
        assert!(manager.add_node(stray).is_none());
        assert!(manager.graph().is_empty());
        assert!(manager.change_history().is_empty());

        manager.add_node(node("b", "Box3D"));
        manager.move_node("b", Position::new(f64::NAN, f64::NAN));
        let text = manager.export_to_guide_string("base").unwrap();
        assert!(GraphManager::new().load_from_guide_str(&text, "base"));
    }

    /// Connections that point at missing nodes or loop back on their own
    /// node are dropped while loading
    #[test]
    fn test_load_drops_broken_connections() {
        let mut source = Graph::new();
        source.add_node(node("a", "Box3D"));
        source.add_node(node("b", "Translate3D"));
        source.add_connection(Connection::new("a", "expr", "b", "expr"));
        source.add_connection(Connection::new("a", "expr", "ghost", "expr"));
        source.add_connection(Connection::new("a", "expr", "a", "size"));
        let document = to_guide_json(&source, "base");

        let (mut manager, sink) = manager_with_sink();
        assert!(manager.load_from_guide_json(&document, "base"));
        assert_eq!(manager.connections().len(), 1);
        assert_eq!(manager.connections()[0].target, "b");
        assert!(manager.validate_graph(None).is_valid);
        assert_eq!(
            sink.events().last(),
            Some(&GraphEvent::GraphLoaded(GraphLoaded {
                module: "base".to_string(),
                node_count: 2,
                connection_count: 1,
            }))
        );
    }

    #[test]
    fn test_validate_graph_reports_isolated_nodes() {
        let mut manager = GraphManager::with_graph(Graph::new());
        manager.add_node(node("a", "Box3D"));
        let report = manager.validate_graph(None);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(manager.graph_stats().isolated_nodes, vec!["a"]);
    }

    /// Random mutation sequences never break referential integrity or the
    /// single-connection rule
    #[test]
    fn test_random_mutations_keep_integrity() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut manager = GraphManager::new();
        manager.set_variadic_policy(VariadicPolicy::new().with("Union", "expr"));
        let types = ["Box3D", "Translate3D", "Union"];
        let inputs = ["expr", "offset"];
        let mut next = 0;

        for _ in 0..2000 {
            let ids: Vec<String> = manager.nodes().iter().map(|n| n.id.clone()).collect();
            let pick = |rng: &mut StdRng| ids[rng.random_range(0..ids.len())].clone();

            match rng.random_range(0..6) {
                0 | 1 => {
                    next += 1;
                    let node_type = types[rng.random_range(0..types.len())];
                    manager.add_node(node(&format!("n{next}"), node_type));
                }
                2 if !ids.is_empty() => {
                    let id = pick(&mut rng);
                    manager.remove_node(&id);
                }
                3 if !ids.is_empty() => {
                    let (source, target) = (pick(&mut rng), pick(&mut rng));
                    let input = inputs[rng.random_range(0..inputs.len())];
                    manager.add_connection(&source, "expr", &target, input);
                }
                4 if !manager.connections().is_empty() => {
                    let index = rng.random_range(0..manager.connections().len());
                    let id = manager.connections()[index].id.clone();
                    manager.remove_connection(&id);
                }
                5 if !ids.is_empty() => {
                    let id = pick(&mut rng);
                    let position = Position::new(rng.random_range(0.0..500.0), rng.random_range(0.0..500.0));
                    manager.move_node(&id, position);
                }
                _ => {}
            }

            let graph = manager.graph();
            for c in graph.connections() {
                assert!(graph.contains_node(&c.source));
                assert!(graph.contains_node(&c.target));
                assert_ne!(c.source, c.target);
            }
            assert_eq!(graph.positions().len(), graph.node_count());
            for n in graph.nodes() {
                assert_eq!(graph.positions().get(&n.id), Some(&n.position));
                for input in inputs {
                    let count = graph
                        .node_input_connections(&n.id)
                        .filter(|c| c.target_input == input)
                        .count();
                    if !manager.variadic_policy().is_variadic(&n.node_type, input) {
                        assert!(count <= 1, "{}.{} has {} connections", n.id, input, count);
                    }
                }
            }
            assert!(validate_graph(graph, None).is_valid);
        }
    }
}
