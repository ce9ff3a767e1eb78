//! Messages from the editing surface. Each message is the authoritative
//! replacement of the node's table/document state, never a delta; a parse
//! failure keeps the draft text and leaves the prior state intact.

use serde::{Deserialize, Serialize};

use crate::canonical::Document;
use crate::flatten;
use crate::node;
use crate::store::{NodeId, NodeStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "text")]
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// The edited source text, verbatim.
    pub text: String,
    /// Canonical document JSON; `None` exactly when `dbml_error` is set.
    pub dbml: Option<String>,
    #[serde(rename = "dbmlError")]
    pub dbml_error: Option<String>,
    pub language: String,
    #[serde(rename = "buttonAction", skip_serializing_if = "Option::is_none", default)]
    pub button_action: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Table, draft text, and document replaced together.
    Updated,
    /// Empty editor buffer; the card falls back to the sample table.
    Reset,
    /// The message carried an error (or an unreadable payload); the draft
    /// text was kept and everything else left as it was.
    Rejected(String),
}

pub fn apply_message<S: NodeStore>(
    store: &mut S,
    node_id: &NodeId,
    msg: &EditorMessage,
) -> ApplyOutcome {
    if let Some(err) = &msg.dbml_error {
        node::set_table_def(store, node_id, &msg.text);
        tracing::warn!(node = %node_id, error = %err, "schema parse failed, keeping draft");
        return ApplyOutcome::Rejected(err.clone());
    }

    if msg.text.is_empty() {
        node::set_table(store, node_id, &node::sample_table());
        return ApplyOutcome::Reset;
    }

    let raw = match msg.dbml.as_deref() {
        Some(raw) => raw,
        None => return ApplyOutcome::Rejected("message carried no document".to_string()),
    };
    let doc: Document = match serde_json::from_str(raw) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(node = %node_id, error = %err, "unreadable document payload");
            return ApplyOutcome::Rejected(err.to_string());
        }
    };

    if let Some(first) = flatten::flatten_tables(&doc).first() {
        node::set_table(store, node_id, first);
    }
    node::set_table_def(store, node_id, &msg.text);
    node::set_document(store, node_id, &doc);

    ApplyOutcome::Updated
}
