//! Resolve refs into directed edges between live table nodes. Creation is
//! idempotent: an edge is materialized at most once per refDef, enforced by
//! the marker existence check alone.

use serde::{Deserialize, Serialize};

use crate::canonical::{DEFAULT_SCHEMA, Endpoint, Ref, Table};
use crate::node;
use crate::store::{ConnectorStore, NodeId, NodeStore};

/// End-cap styling derived from an endpoint's cardinality marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrokeCap {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "ARROW_LINES")]
    ArrowLines,
}

impl StrokeCap {
    /// The "one" side gets no cap; every other marker gets arrow lines.
    pub fn for_relation(relation: &str) -> Self {
        if relation == "1" {
            Self::None
        } else {
            Self::ArrowLines
        }
    }
}

/// A materialized directed edge between two table nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "startCap")]
    pub start_cap: StrokeCap,
    #[serde(rename = "endCap")]
    pub end_cap: StrokeCap,
    /// The refDef marker used for dedup lookups.
    #[serde(rename = "refDef")]
    pub ref_def: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// An endpoint's `(schema, table)` matched no live sibling node:
    /// deleted, renamed-but-not-repropagated, or genuinely dangling.
    EndpointUnresolved { schema: String, table: String },
    /// A connector with the same refDef already exists.
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skip {
    pub ref_def: String,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub created: Vec<Connector>,
    pub skipped: Vec<Skip>,
}

/// Resolve every ref against the sibling nodes' current table states.
/// Per-ref failures skip that ref and continue; the batch never aborts.
pub fn resolve_connectors<S: NodeStore + ConnectorStore>(
    store: &mut S,
    refs: &[Ref],
    siblings: &[NodeId],
) -> Resolution {
    let tables: Vec<(NodeId, Table)> = siblings
        .iter()
        .filter_map(|id| node::table(store, id).map(|t| (id.clone(), t)))
        .collect();

    let mut resolution = Resolution::default();

    for r in refs {
        let source = find_node(&tables, &r.from);
        let target = find_node(&tables, &r.to);

        let (source, target) = match (source, target) {
            (Some(s), Some(t)) => (s.clone(), t.clone()),
            (None, _) => {
                tracing::debug!(ref_def = %r.ref_def, table = %r.from.table, "source endpoint unresolved");
                resolution.skipped.push(Skip {
                    ref_def: r.ref_def.clone(),
                    reason: SkipReason::EndpointUnresolved {
                        schema: r.from.schema.clone(),
                        table: r.from.table.clone(),
                    },
                });
                continue;
            }
            (_, None) => {
                tracing::debug!(ref_def = %r.ref_def, table = %r.to.table, "target endpoint unresolved");
                resolution.skipped.push(Skip {
                    ref_def: r.ref_def.clone(),
                    reason: SkipReason::EndpointUnresolved {
                        schema: r.to.schema.clone(),
                        table: r.to.table.clone(),
                    },
                });
                continue;
            }
        };

        if store.connector_exists(&r.ref_def) {
            resolution.skipped.push(Skip {
                ref_def: r.ref_def.clone(),
                reason: SkipReason::AlreadyExists,
            });
            continue;
        }

        let connector = Connector {
            source,
            target,
            start_cap: StrokeCap::for_relation(&r.from.relation),
            end_cap: StrokeCap::for_relation(&r.to.relation),
            ref_def: r.ref_def.clone(),
        };
        store.add_connector(connector.clone());
        resolution.created.push(connector);
    }

    resolution
}

fn find_node<'a>(tables: &'a [(NodeId, Table)], ep: &Endpoint) -> Option<&'a NodeId> {
    tables
        .iter()
        .find(|(_, t)| {
            t.name == ep.table && t.schema_name.as_deref().unwrap_or(DEFAULT_SCHEMA) == ep.schema
        })
        .map(|(id, _)| id)
}
