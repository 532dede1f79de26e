//! Guide document serialization
//!
//! The guide document is the wire format shared with the code-generation
//! backend:
//!
//! ```json
//! {
//!   "moduleList": {
//!     "base": {
//!       "nodes": [{ "id": "box-1", "name": "Box3D", "data": { "size": 1.0 } }],
//!       "connections": [{ "source": "box-1", "sourceOutput": "expr",
//!                         "target": "move-1", "targetInput": "expr" }],
//!       "positions": { "box-1": { "x": 100, "y": 100 } }
//!     }
//!   }
//! }
//! ```
//!
//! Connection ids and node positions inside `nodes` are not part of the
//! format; positions travel in the module's `positions` map.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::types::{Connection, NodeData, NodeInstance, Position, ValidationResult};

/// Root of a guide document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideDocument {
    pub module_list: IndexMap<String, GuideModule>,
}

impl GuideDocument {
    pub fn module(&self, name: &str) -> Option<&GuideModule> {
        self.module_list.get(name)
    }
}

/// One named module of a guide document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideModule {
    pub nodes: Vec<GuideNode>,
    #[serde(default)]
    pub connections: Vec<GuideConnection>,
    #[serde(default)]
    pub positions: IndexMap<String, Position>,
}

/// A node on the wire; `name` carries the node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub data: NodeData,
}

/// A connection on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideConnection {
    pub source: String,
    pub source_output: String,
    pub target: String,
    pub target_input: String,
}

/// Write a graph as a single-module guide document
pub fn to_guide_json(graph: &Graph, module: &str) -> GuideDocument {
    let guide_module = GuideModule {
        nodes: graph
            .nodes()
            .iter()
            .map(|node| GuideNode {
                id: node.id.clone(),
                name: node.node_type.clone(),
                data: node.data.clone(),
            })
            .collect(),
        connections: graph
            .connections()
            .iter()
            .map(|c| GuideConnection {
                source: c.source.clone(),
                source_output: c.source_output.clone(),
                target: c.target.clone(),
                target_input: c.target_input.clone(),
            })
            .collect(),
        positions: graph
            .positions()
            .iter()
            .map(|(id, position)| (id.clone(), *position))
            .collect(),
    };

    let mut document = GuideDocument::default();
    document.module_list.insert(module.to_string(), guide_module);
    document
}

/// Build a graph from one module of a guide document
///
/// Nodes without a position entry sit at the origin and position entries
/// without a node are dropped. Connections receive fresh ids. Repeated
/// node ids and repeated connections keep their first occurrence.
/// Connections to a missing node or from a node to itself are dropped.
pub fn from_guide_json(document: &GuideDocument, module: &str) -> Result<Graph> {
    let guide_module = document
        .module(module)
        .ok_or_else(|| GraphError::ModuleNotFound(module.to_string()))?;

    let mut graph = Graph::new();
    for node in &guide_module.nodes {
        let position = guide_module
            .positions
            .get(&node.id)
            .copied()
            .unwrap_or_default();
        let instance = NodeInstance::with_id(node.id.clone(), node.name.clone(), node.data.clone(), position);
        if !graph.add_node(instance) {
            log::warn!("Dropped duplicate node '{}' in module '{}'", node.id, module);
        }
    }
    for c in &guide_module.connections {
        if c.source == c.target {
            log::warn!("Dropped self-loop on '{}' in module '{}'", c.source, module);
            continue;
        }
        if let Some(missing) = [&c.source, &c.target].into_iter().find(|id| !graph.contains_node(id)) {
            log::warn!(
                "Dropped connection {}.{} -> {}.{}: node '{}' not found",
                c.source,
                c.source_output,
                c.target,
                c.target_input,
                missing
            );
            continue;
        }
        let connection = Connection::new(
            c.source.clone(),
            c.source_output.clone(),
            c.target.clone(),
            c.target_input.clone(),
        );
        if !graph.add_connection(connection) {
            log::debug!(
                "Dropped duplicate connection {}.{} -> {}.{}",
                c.source,
                c.source_output,
                c.target,
                c.target_input
            );
        }
    }
    Ok(graph)
}

/// Parse guide document text
pub fn parse_guide_json(text: &str) -> Result<GuideDocument> {
    Ok(serde_json::from_str(text)?)
}

/// Render a guide document as pretty JSON
pub fn guide_to_string(document: &GuideDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

fn non_empty_str(value: Option<&Value>) -> bool {
    value.and_then(Value::as_str).is_some_and(|s| !s.is_empty())
}

/// Check the structure of an untyped guide document
///
/// Reports every structural problem found. Connections pointing at nodes
/// missing from their module are warnings.
pub fn validate_guide_json(document: &Value) -> ValidationResult {
    let mut result = ValidationResult::ok();

    let Some(root) = document.as_object() else {
        result.push_error("Guide JSON must be an object");
        return result;
    };
    let Some(modules) = root.get("moduleList").and_then(Value::as_object) else {
        result.push_error("Guide JSON must have a moduleList property");
        return result;
    };

    for (name, module) in modules {
        let Some(module) = module.as_object() else {
            result.push_error(format!("Module '{name}' must be an object"));
            continue;
        };

        let nodes = module.get("nodes").and_then(Value::as_array);
        let connections = module.get("connections").and_then(Value::as_array);
        let positions = module.get("positions").and_then(Value::as_object);
        if nodes.is_none() {
            result.push_error(format!("Module '{name}' must have a nodes array"));
        }
        if connections.is_none() {
            result.push_error(format!("Module '{name}' must have a connections array"));
        }
        if positions.is_none() {
            result.push_error(format!("Module '{name}' must have a positions object"));
        }

        for (index, node) in nodes.into_iter().flatten().enumerate() {
            if !non_empty_str(node.get("id")) {
                result.push_error(format!("Node {index} in module '{name}' must have a string id"));
            }
            if !non_empty_str(node.get("name")) {
                result.push_error(format!(
                    "Node {index} in module '{name}' must have a string name (type)"
                ));
            }
            if !node.get("data").is_some_and(Value::is_object) {
                result.push_error(format!("Node {index} in module '{name}' must have a data object"));
            }
        }

        for (index, connection) in connections.into_iter().flatten().enumerate() {
            for field in ["source", "sourceOutput", "target", "targetInput"] {
                if !non_empty_str(connection.get(field)) {
                    result.push_error(format!(
                        "Connection {index} in module '{name}' must have a string {field}"
                    ));
                }
            }
        }

        for (id, position) in positions.into_iter().flatten() {
            let numeric = |axis: &str| position.get(axis).is_some_and(Value::is_number);
            if !(numeric("x") && numeric("y")) {
                result.push_error(format!(
                    "Position '{id}' in module '{name}' must have numeric x and y"
                ));
            }
        }

        if let (Some(nodes), Some(connections)) = (nodes, connections) {
            let ids: HashSet<&str> = nodes
                .iter()
                .filter_map(|n| n.get("id").and_then(Value::as_str))
                .collect();
            for (index, connection) in connections.iter().enumerate() {
                for (field, role) in [("source", "source"), ("target", "target")] {
                    if let Some(id) = connection.get(field).and_then(Value::as_str) {
                        if !id.is_empty() && !ids.contains(id) {
                            result.push_warning(format!(
                                "Connection {index} references non-existent {role} node '{id}'"
                            ));
                        }
                    }
                }
            }
        }
    }

    result
}

/// Check guide document text, reporting unparsable JSON as an error
pub fn validate_guide_str(text: &str) -> ValidationResult {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => validate_guide_json(&value),
        Err(e) => ValidationResult::from_diagnostics(vec![format!("Invalid JSON: {e}")], Vec::new()),
    }
}

/// A document with one empty module
pub fn create_empty_guide_json(module: &str) -> GuideDocument {
    let mut document = GuideDocument::default();
    document
        .module_list
        .insert(module.to_string(), GuideModule::default());
    document
}

/// Merge every module of `addition` into `target_module` of a copy of `base`
///
/// Incoming node ids that collide with ids already in the target get a
/// `_1`, `_2`, ... suffix. Their position entries move with them, and
/// connections from the same incoming module are rewritten to the new ids.
pub fn merge_guide_json(base: &GuideDocument, addition: &GuideDocument, target_module: &str) -> GuideDocument {
    let mut result = base.clone();
    let target = result
        .module_list
        .entry(target_module.to_string())
        .or_default();
    let mut existing: HashSet<String> = target.nodes.iter().map(|n| n.id.clone()).collect();

    for module in addition.module_list.values() {
        let mut renamed: HashMap<&str, String> = HashMap::new();

        for node in &module.nodes {
            let mut id = node.id.clone();
            let mut counter = 1;
            while existing.contains(&id) {
                id = format!("{}_{}", node.id, counter);
                counter += 1;
            }
            existing.insert(id.clone());

            if let Some(position) = module.positions.get(&node.id) {
                target.positions.insert(id.clone(), *position);
            }
            if id != node.id {
                renamed.entry(node.id.as_str()).or_insert_with(|| id.clone());
            }
            target.nodes.push(GuideNode {
                id,
                name: node.name.clone(),
                data: node.data.clone(),
            });
        }

        let resolve = |id: &String| renamed.get(id.as_str()).cloned().unwrap_or_else(|| id.clone());
        for connection in &module.connections {
            target.connections.push(GuideConnection {
                source: resolve(&connection.source),
                source_output: connection.source_output.clone(),
                target: resolve(&connection.target),
                target_input: connection.target_input.clone(),
            });
        }
    }

    result
}

/// Compact summary of a graph for logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugGraph {
    pub summary: DebugSummary,
    pub nodes: Vec<DebugNode>,
    pub connections: Vec<DebugConnection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSummary {
    pub nodes: usize,
    pub connections: usize,
    pub node_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: Position,
    pub data_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugConnection {
    pub id: String,
    /// `source.output → target.input`
    pub flow: String,
}

/// Summarize a graph for logs and bug reports
pub fn to_debug_format(graph: &Graph) -> DebugGraph {
    let stats = graph.stats();
    DebugGraph {
        summary: DebugSummary {
            nodes: stats.node_count,
            connections: stats.connection_count,
            node_types: stats.node_types,
        },
        nodes: graph
            .nodes()
            .iter()
            .map(|node| DebugNode {
                id: node.id.clone(),
                node_type: node.node_type.clone(),
                position: node.position,
                data_keys: node.data.keys().cloned().collect(),
            })
            .collect(),
        connections: graph
            .connections()
            .iter()
            .map(|c| DebugConnection {
                id: c.id.clone(),
                flow: format!(
                    "{}.{} → {}.{}",
                    c.source, c.source_output, c.target, c.target_input
                ),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Graph {
        let mut graph = Graph::new();
        let mut data = NodeData::new();
        data.insert("size".to_string(), json!([1.0, 2.0, 3.0]));
        graph.add_node(NodeInstance::with_id("box", "Box3D", data, Position::new(100.0, 100.0)));
        graph.add_node(NodeInstance::with_id("move", "Translate3D", NodeData::new(), Position::new(350.0, 100.0)));
        graph.add_connection(Connection::new("box", "expr", "move", "expr"));
        graph
    }

    #[test]
    fn test_to_guide_json_shape() {
        let document = to_guide_json(&sample(), "base");
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["moduleList"]["base"]["nodes"][0]["name"], "Box3D");
        assert_eq!(json["moduleList"]["base"]["connections"][0]["sourceOutput"], "expr");
        assert_eq!(json["moduleList"]["base"]["positions"]["move"]["x"], 350.0);
        assert!(json["moduleList"]["base"]["connections"][0].get("id").is_none());
        assert!(validate_guide_json(&json).is_valid);
    }

    #[test]
    fn test_round_trip_preserves_graph() {
        let graph = sample();
        let document = to_guide_json(&graph, "base");
        let text = guide_to_string(&document).unwrap();
        let restored = from_guide_json(&parse_guide_json(&text).unwrap(), "base").unwrap();

        assert_eq!(restored.nodes(), graph.nodes());
        assert_eq!(restored.positions(), graph.positions());
        assert_eq!(restored.connection_count(), 1);
        assert!(restored.connections()[0].same_endpoints(&graph.connections()[0]));
        assert_ne!(restored.connections()[0].id, graph.connections()[0].id);
    }

    #[test]
    fn test_from_guide_json_missing_module() {
        let document = create_empty_guide_json("base");
        let err = from_guide_json(&document, "other").unwrap_err();
        assert!(matches!(err, GraphError::ModuleNotFound(m) if m == "other"));
        assert!(from_guide_json(&document, "base").unwrap().is_empty());
    }

    #[test]
    fn test_from_guide_json_positions() {
        let document: GuideDocument = serde_json::from_value(json!({
            "moduleList": { "base": {
                "nodes": [
                    { "id": "a", "name": "Box3D", "data": {} },
                    { "id": "a", "name": "Sphere3D", "data": {} },
                    { "id": "b", "name": "Sphere3D", "data": {} }
                ],
                "connections": [],
                "positions": { "a": { "x": 5, "y": 6 }, "ghost": { "x": 1, "y": 1 } }
            }}
        }))
        .unwrap();
        let graph = from_guide_json(&document, "base").unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node("a").map(|n| n.node_type.as_str()), Some("Box3D"));
        assert_eq!(graph.node("a").map(|n| n.position), Some(Position::new(5.0, 6.0)));
        assert_eq!(graph.node("b").map(|n| n.position), Some(Position::default()));
        assert!(!graph.positions().contains_key("ghost"));
    }

    #[test]
    fn test_from_guide_json_drops_broken_connections() {
        let document: GuideDocument = serde_json::from_value(json!({
            "moduleList": { "base": {
                "nodes": [
                    { "id": "a", "name": "Box3D", "data": {} },
                    { "id": "b", "name": "Translate3D", "data": {} }
                ],
                "connections": [
                    { "source": "a", "sourceOutput": "expr", "target": "ghost", "targetInput": "expr" },
                    { "source": "ghost", "sourceOutput": "expr", "target": "b", "targetInput": "expr" },
                    { "source": "a", "sourceOutput": "expr", "target": "a", "targetInput": "size" },
                    { "source": "a", "sourceOutput": "expr", "target": "b", "targetInput": "expr" }
                ],
                "positions": {}
            }}
        }))
        .unwrap();
        let graph = from_guide_json(&document, "base").unwrap();
        assert_eq!(graph.connection_count(), 1);
        let kept = &graph.connections()[0];
        assert_eq!((kept.source.as_str(), kept.target.as_str()), ("a", "b"));
        assert!(crate::validation::validate_graph(&graph, None).is_valid);
    }

    #[test]
    fn test_validate_root_errors() {
        let result = validate_guide_json(&json!([1, 2]));
        assert_eq!(result.errors, vec!["Guide JSON must be an object"]);

        let result = validate_guide_json(&json!({ "modules": {} }));
        assert_eq!(result.errors, vec!["Guide JSON must have a moduleList property"]);

        let result = validate_guide_str("{ not json");
        assert!(!result.is_valid);
        assert!(result.errors[0].starts_with("Invalid JSON"));
    }

    #[test]
    fn test_validate_module_errors() {
        let result = validate_guide_json(&json!({
            "moduleList": {
                "broken": 3,
                "base": {
                    "nodes": [ { "id": "", "name": 4 } ],
                    "connections": [ { "source": "a", "sourceOutput": "expr", "target": "ghost" } ],
                    "positions": { "a": { "x": "1", "y": 2 } }
                },
                "empty": {}
            }
        }));
        assert!(!result.is_valid);
        let mut expected = [
            "Module 'broken' must be an object",
            "Node 0 in module 'base' must have a string id",
            "Node 0 in module 'base' must have a string name (type)",
            "Node 0 in module 'base' must have a data object",
            "Connection 0 in module 'base' must have a string targetInput",
            "Position 'a' in module 'base' must have numeric x and y",
            "Module 'empty' must have a nodes array",
            "Module 'empty' must have a connections array",
            "Module 'empty' must have a positions object",
        ];
        // Module iteration order follows the JSON map
        let mut errors = result.errors.clone();
        errors.sort();
        expected.sort();
        assert_eq!(errors, expected);
        assert_eq!(
            result.warnings,
            vec![
                "Connection 0 references non-existent source node 'a'",
                "Connection 0 references non-existent target node 'ghost'",
            ]
        );
    }

    #[test]
    fn test_merge_renames_and_rewrites_endpoints() {
        let base = to_guide_json(&sample(), "base");
        let addition = to_guide_json(&sample(), "imported");
        let merged = merge_guide_json(&base, &addition, "base");

        let module = merged.module("base").unwrap();
        let ids: Vec<&str> = module.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["box", "move", "box_1", "move_1"]);
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());

        assert_eq!(module.positions["box_1"], Position::new(100.0, 100.0));
        let added = &module.connections[1];
        assert_eq!((added.source.as_str(), added.target.as_str()), ("box_1", "move_1"));

        // Merging twice keeps counting
        let merged = merge_guide_json(&merged, &addition, "base");
        let module = merged.module("base").unwrap();
        assert!(module.nodes.iter().any(|n| n.id == "box_2"));
        assert!(base.module("base").map(|m| m.nodes.len()) == Some(2));
    }

    #[test]
    fn test_merge_into_new_module() {
        let merged = merge_guide_json(&create_empty_guide_json("base"), &to_guide_json(&sample(), "x"), "scene");
        assert_eq!(merged.module_list.len(), 2);
        assert_eq!(merged.module("scene").map(|m| m.nodes.len()), Some(2));
        assert_eq!(merged.module("scene").map(|m| m.connections[0].source.clone()), Some("box".to_string()));
    }

    #[test]
    fn test_debug_format() {
        let debug = to_debug_format(&sample());
        assert_eq!(debug.summary.nodes, 2);
        assert_eq!(debug.summary.node_types, vec!["Box3D", "Translate3D"]);
        assert_eq!(debug.nodes[0].data_keys, vec!["size"]);
        assert_eq!(debug.connections[0].flow, "box.expr → move.expr");
    }
}
