//! Host storage boundary. Table nodes live in a host surface (a canvas, a
//! plugin runtime) that owns per-node key/value state and materialized
//! connectors; the core only ever talks to these traits.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connector::Connector;

/// Namespace tag for all per-node fields this crate persists.
pub const NAMESPACE: &str = "dbmlTable";

pub const KEY_PARENT_ID: &str = "parentId";
pub const KEY_SIBLINGS: &str = "siblings";
pub const KEY_TABLE: &str = "table";
pub const KEY_TABLE_DEF: &str = "tableDef";
pub const KEY_DOCUMENT: &str = "dbml";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Per-node key/value storage. Values are opaque strings at this boundary;
/// the core owns serialization. Writes to another node are fire-and-forget
/// read-modify-write; there are no cross-node transactions.
pub trait NodeStore {
    fn get(&self, node: &NodeId, namespace: &str, key: &str) -> Option<String>;

    /// Writing to an unknown node id registers it.
    fn set(&mut self, node: &NodeId, namespace: &str, key: &str, value: &str);

    /// Every node currently alive on the host surface, in a stable order.
    fn live_nodes(&self) -> Vec<NodeId>;

    fn is_live(&self, node: &NodeId) -> bool {
        self.live_nodes().iter().any(|n| n == node)
    }

    /// Live nodes whose persisted parent id matches. Deleted nodes are
    /// naturally excluded, which is what lets stale sibling ids self-heal.
    fn find_sibling_nodes(&self, parent_id: &NodeId) -> Vec<NodeId> {
        self.live_nodes()
            .into_iter()
            .filter(|n| {
                self.get(n, NAMESPACE, KEY_PARENT_ID).as_deref() == Some(parent_id.as_str())
            })
            .collect()
    }
}

/// Materialized edges on the host surface. Lookup is only ever by the
/// refDef marker (the host keys it under its `dbmlTableRef` field), never
/// by node pair.
pub trait ConnectorStore {
    fn connector_exists(&self, marker: &str) -> bool;
    fn add_connector(&mut self, connector: Connector);
    fn connectors(&self) -> &[Connector];
}

/// In-memory implementation of both stores, for tests and the CLI.
/// Node order is insertion order so sibling scans are deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: Vec<(NodeId, HashMap<(String, String), String>)>,
    connectors: Vec<Connector>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: impl Into<String>) -> NodeId {
        let id = NodeId::new(id);
        if !self.nodes.iter().any(|(n, _)| *n == id) {
            self.nodes.push((id.clone(), HashMap::new()));
        }
        id
    }

    /// Simulates node deletion on the host surface. Persisted sibling sets
    /// elsewhere keep the id; readers skip it.
    pub fn remove_node(&mut self, id: &NodeId) {
        self.nodes.retain(|(n, _)| n != id);
    }
}

impl NodeStore for MemoryStore {
    fn get(&self, node: &NodeId, namespace: &str, key: &str) -> Option<String> {
        self.nodes
            .iter()
            .find(|(n, _)| n == node)?
            .1
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
    }

    fn set(&mut self, node: &NodeId, namespace: &str, key: &str, value: &str) {
        let idx = match self.nodes.iter().position(|(n, _)| n == node) {
            Some(idx) => idx,
            None => {
                self.nodes.push((node.clone(), HashMap::new()));
                self.nodes.len() - 1
            }
        };
        self.nodes[idx]
            .1
            .insert((namespace.to_string(), key.to_string()), value.to_string());
    }

    fn live_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|(n, _)| n.clone()).collect()
    }
}

impl ConnectorStore for MemoryStore {
    fn connector_exists(&self, marker: &str) -> bool {
        self.connectors.iter().any(|c| c.ref_def == marker)
    }

    fn add_connector(&mut self, connector: Connector) {
        self.connectors.push(connector);
    }

    fn connectors(&self) -> &[Connector] {
        &self.connectors
    }
}
