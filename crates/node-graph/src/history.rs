//! Change history
//!
//! A bounded log of structural mutations kept by the manager. Records are
//! diagnostic: they describe what changed but are never replayed. Clearing
//! or replacing the whole graph stores a zstd-compressed snapshot of the
//! graph that was discarded.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SNAPSHOT_COMPRESSION_LEVEL;
use crate::error::{GraphError, Result};
use crate::graph::Graph;

/// Kind of recorded mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    AddNode,
    RemoveNode,
    UpdateNode,
    AddConnection,
    RemoveConnection,
    ClearGraph,
    LoadGraph,
}

/// Compressed copy of a graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    bytes: Vec<u8>,
}

impl Snapshot {
    /// Compress a graph
    pub fn capture(graph: &Graph) -> Result<Self> {
        let json = serde_json::to_vec(graph)?;
        let bytes = zstd::encode_all(&json[..], SNAPSHOT_COMPRESSION_LEVEL)
            .map_err(|e| GraphError::Compression(e.to_string()))?;
        Ok(Self { bytes })
    }

    /// Decompress the stored graph
    pub fn restore(&self) -> Result<Graph> {
        let json = zstd::decode_all(&self.bytes[..])
            .map_err(|e| GraphError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Compressed size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One recorded mutation
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub timestamp: DateTime<Utc>,
    /// What changed (node, connection, key/value...)
    pub data: serde_json::Value,
    /// Graph discarded by a clear or load
    pub snapshot: Option<Snapshot>,
}

impl ChangeRecord {
    pub fn new(kind: ChangeKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            data,
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}

/// Ring buffer of change records, oldest first
#[derive(Debug, Clone)]
pub struct ChangeHistory {
    records: VecDeque<ChangeRecord>,
    max_records: usize,
}

impl ChangeHistory {
    /// Create a history keeping at most `max_records` entries
    pub fn new(max_records: usize) -> Self {
        Self {
            records: VecDeque::new(),
            max_records: max_records.max(1),
        }
    }

    /// Append a record, evicting the oldest beyond capacity
    pub fn push(&mut self, record: ChangeRecord) {
        self.records.push_back(record);
        while self.records.len() > self.max_records {
            self.records.pop_front();
        }
    }

    /// Records, oldest first
    pub fn records(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&ChangeRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Connection, NodeData, NodeInstance, Position};
    use serde_json::json;

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let mut history = ChangeHistory::new(3);
        for i in 0..5 {
            history.push(ChangeRecord::new(ChangeKind::AddNode, json!({ "i": i })));
        }
        assert_eq!(history.len(), 3);
        let kept: Vec<i64> = history
            .records()
            .filter_map(|r| r.data["i"].as_i64())
            .collect();
        assert_eq!(kept, vec![2, 3, 4]);
        assert_eq!(history.last().map(|r| r.data["i"].clone()), Some(json!(4)));

        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut history = ChangeHistory::new(0);
        history.push(ChangeRecord::new(ChangeKind::ClearGraph, json!({})));
        history.push(ChangeRecord::new(ChangeKind::ClearGraph, json!({})));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut graph = Graph::new();
        graph.add_node(NodeInstance::with_id("a", "Box3D", NodeData::new(), Position::new(1.0, 2.0)));
        graph.add_node(NodeInstance::with_id("b", "Translate3D", NodeData::new(), Position::default()));
        graph.add_connection(Connection::new("a", "expr", "b", "expr"));

        let snapshot = Snapshot::capture(&graph).unwrap();
        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.restore().unwrap(), graph);
    }

    #[test]
    fn test_change_kind_names() {
        assert_eq!(serde_json::to_value(ChangeKind::RemoveConnection).unwrap(), "remove-connection");
    }
}
