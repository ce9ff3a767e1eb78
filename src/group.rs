//! Sibling groups: every node descended (by duplication) from a common
//! parent shares that parent's id and carries a persisted set of the other
//! members. There is no central directory; membership propagates by writing
//! to each member's own storage.

use crate::canonical::Table;
use crate::node;
use crate::store::{NodeId, NodeStore};

/// A sibling's current table state with its node id attached.
#[derive(Debug, Clone, PartialEq)]
pub struct SiblingTable {
    pub node_id: NodeId,
    pub table: Table,
}

/// Add `new_member` to the group under `parent_id`. Visits every live node
/// sharing the parent, unions its persisted sibling set with `existing`
/// plus `new_member`, and writes the union back. Returns the union of
/// everything written. Nodes that no longer resolve are skipped; their ids
/// age out of persisted sets by being ignored on read.
pub fn register_sibling<S: NodeStore>(
    store: &mut S,
    parent_id: &NodeId,
    new_member: &NodeId,
    existing: &[NodeId],
) -> Vec<NodeId> {
    let members = store.find_sibling_nodes(parent_id);
    tracing::debug!(
        parent = %parent_id,
        new = %new_member,
        members = members.len(),
        "registering sibling"
    );

    let mut union: Vec<NodeId> = Vec::new();
    for member in &members {
        let mut ids = node::siblings(store, member);
        for id in existing.iter().chain(std::iter::once(new_member)) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        node::set_siblings(store, member, &ids);
        for id in ids {
            if !union.contains(&id) {
                union.push(id);
            }
        }
    }
    union
}

/// Resolve a persisted sibling-id blob to the other members' table states,
/// dropping `self_id` and any id that no longer points at a live node.
pub fn other_sibling_tables<S: NodeStore>(
    store: &S,
    siblings_json: &str,
    self_id: &NodeId,
) -> Vec<SiblingTable> {
    let ids: Vec<NodeId> = serde_json::from_str(siblings_json).unwrap_or_default();

    ids.into_iter()
        .filter(|id| id != self_id)
        .filter_map(|id| {
            if !store.is_live(&id) {
                tracing::debug!(node = %id, "skipping deleted sibling");
                return None;
            }
            let table = node::table(store, &id)?;
            Some(SiblingTable { node_id: id, table })
        })
        .collect()
}
