//! Typed access to a table node's persisted state, plus the host-triggered
//! operations on a node: duplicate into the sibling group, resolve
//! connectors, collect the editing context.

use crate::canonical::{Document, Field, FieldDefault, Table};
use crate::connector::{self, Resolution};
use crate::duplicate::{self, DuplicateError};
use crate::flatten;
use crate::group::{self, SiblingTable};
use crate::store::{
    ConnectorStore, KEY_DOCUMENT, KEY_PARENT_ID, KEY_SIBLINGS, KEY_TABLE, KEY_TABLE_DEF,
    NAMESPACE, NodeId, NodeStore,
};

/// Seed text for a freshly placed node, before the first edit.
pub const PLACEHOLDER_TEXT: &str = "Table table_name{
  id int [pk]
  active bool [not null, default: \"1\"]
  created_at timestamp
  updated_at timestamp
}
";

/// Table card shown until an edit replaces it.
pub fn sample_table() -> Table {
    Table {
        name: "table_name".to_string(),
        alias: None,
        note: Some("This is a sample table".to_string()),
        schema_name: Some("public".to_string()),
        fields: vec![
            Field {
                name: "id".to_string(),
                field_type: "int".to_string(),
                pk: Some(true),
                not_null: None,
                unique: None,
                note: None,
                field_default: None,
            },
            Field {
                name: "active".to_string(),
                field_type: "bool".to_string(),
                pk: None,
                not_null: Some(true),
                unique: None,
                note: None,
                field_default: Some(FieldDefault {
                    value: "1".to_string(),
                    kind: "string".to_string(),
                }),
            },
            Field {
                name: "created_at".to_string(),
                field_type: "timestamp".to_string(),
                pk: None,
                not_null: None,
                unique: None,
                note: None,
                field_default: None,
            },
            Field {
                name: "updated_at".to_string(),
                field_type: "timestamp".to_string(),
                pk: None,
                not_null: None,
                unique: None,
                note: None,
                field_default: None,
            },
        ],
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("node {0} has no persisted {1}")]
    MissingState(NodeId, &'static str),
    #[error(transparent)]
    Duplicate(#[from] DuplicateError),
}

pub fn table<S: NodeStore + ?Sized>(store: &S, node: &NodeId) -> Option<Table> {
    let raw = store.get(node, NAMESPACE, KEY_TABLE)?;
    serde_json::from_str(&raw).ok()
}

pub fn set_table<S: NodeStore + ?Sized>(store: &mut S, node: &NodeId, table: &Table) {
    let raw = serde_json::to_string(table).unwrap();
    store.set(node, NAMESPACE, KEY_TABLE, &raw);
}

pub fn document<S: NodeStore + ?Sized>(store: &S, node: &NodeId) -> Option<Document> {
    let raw = store.get(node, NAMESPACE, KEY_DOCUMENT)?;
    serde_json::from_str(&raw).ok()
}

pub fn set_document<S: NodeStore + ?Sized>(store: &mut S, node: &NodeId, doc: &Document) {
    let raw = serde_json::to_string(doc).unwrap();
    store.set(node, NAMESPACE, KEY_DOCUMENT, &raw);
}

pub fn table_def<S: NodeStore + ?Sized>(store: &S, node: &NodeId) -> Option<String> {
    store.get(node, NAMESPACE, KEY_TABLE_DEF)
}

pub fn set_table_def<S: NodeStore + ?Sized>(store: &mut S, node: &NodeId, def: &str) {
    store.set(node, NAMESPACE, KEY_TABLE_DEF, def);
}

pub fn parent_id<S: NodeStore + ?Sized>(store: &S, node: &NodeId) -> Option<NodeId> {
    store.get(node, NAMESPACE, KEY_PARENT_ID).map(NodeId)
}

pub fn set_parent_id<S: NodeStore + ?Sized>(store: &mut S, node: &NodeId, parent: &NodeId) {
    store.set(node, NAMESPACE, KEY_PARENT_ID, parent.as_str());
}

pub fn siblings<S: NodeStore + ?Sized>(store: &S, node: &NodeId) -> Vec<NodeId> {
    store
        .get(node, NAMESPACE, KEY_SIBLINGS)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

pub fn set_siblings<S: NodeStore + ?Sized>(store: &mut S, node: &NodeId, ids: &[NodeId]) {
    let raw = serde_json::to_string(ids).unwrap();
    store.set(node, NAMESPACE, KEY_SIBLINGS, &raw);
}

/// Duplicate this node's table onto a freshly created host node. The parent
/// id is assigned once, on the first duplication, and shared by every copy;
/// the clone receives the rewritten text, table, and document, and every
/// group member learns about the new sibling.
pub fn add_copy<S: NodeStore>(
    store: &mut S,
    source: &NodeId,
    clone: NodeId,
) -> Result<NodeId, NodeError> {
    let parent = match parent_id(store, source) {
        Some(p) => p,
        None => {
            set_parent_id(store, source, source);
            source.clone()
        }
    };

    let def = table_def(store, source)
        .ok_or_else(|| NodeError::MissingState(source.clone(), KEY_TABLE_DEF))?;
    let tbl =
        table(store, source).ok_or_else(|| NodeError::MissingState(source.clone(), KEY_TABLE))?;
    let doc = document(store, source)
        .ok_or_else(|| NodeError::MissingState(source.clone(), KEY_DOCUMENT))?;

    let dup = duplicate::duplicate_table(&def, &tbl, &doc)?;

    set_table_def(store, &clone, &dup.table_def);
    set_table(store, &clone, &dup.table);
    set_document(store, &clone, &dup.document);
    set_parent_id(store, &clone, &parent);

    group::register_sibling(store, &parent, &clone, std::slice::from_ref(source));

    Ok(clone)
}

/// Materialize connectors for every ref in this node's document, against
/// the persisted sibling set.
pub fn connect<S: NodeStore + ConnectorStore>(store: &mut S, node: &NodeId) -> Resolution {
    let refs = document(store, node)
        .map(|doc| flatten::flatten_refs(&doc))
        .unwrap_or_default();
    let sibling_ids = siblings(store, node);
    connector::resolve_connectors(store, &refs, &sibling_ids)
}

/// What the editing surface is opened with: the node's draft text and the
/// other tables it can reference.
#[derive(Debug, Clone, PartialEq)]
pub struct EditContext {
    pub table_def: String,
    pub sibling_tables: Vec<SiblingTable>,
}

pub fn edit_context<S: NodeStore>(store: &S, node: &NodeId) -> EditContext {
    let raw = store
        .get(node, NAMESPACE, KEY_SIBLINGS)
        .unwrap_or_else(|| "[]".to_string());
    EditContext {
        table_def: table_def(store, node).unwrap_or_else(|| PLACEHOLDER_TEXT.to_string()),
        sibling_tables: group::other_sibling_tables(store, &raw, node),
    }
}
